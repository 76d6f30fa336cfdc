use serde::Serialize;
use std::fmt;

/// Closed classification of why a network operation did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FailureKind {
    /// No response was received (timeout, DNS failure, refused connection, offline).
    Transport,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError(u16),
    ClientError(u16),
}

impl FailureKind {
    /// Map a non-2xx status code to its kind. Total over every `u16`.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError(status),
            code => Self::ClientError(code),
        }
    }

    /// True for failures worth retrying: transport, 429, 5xx and 408.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport | Self::RateLimited | Self::ServerError(_) => true,
            Self::ClientError(code) => *code == 408,
            Self::Unauthorized | Self::Forbidden | Self::NotFound => false,
        }
    }

    /// HTTP status carried by this kind, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport => None,
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound => Some(404),
            Self::RateLimited => Some(429),
            Self::ServerError(code) | Self::ClientError(code) => Some(*code),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Unauthorized => write!(f, "unauthorized (401)"),
            Self::Forbidden => write!(f, "forbidden (403)"),
            Self::NotFound => write!(f, "not found (404)"),
            Self::RateLimited => write!(f, "rate limited (429)"),
            Self::ServerError(code) => write!(f, "server error ({})", code),
            Self::ClientError(code) => write!(f, "client error ({})", code),
        }
    }
}

/// Errors surfaced by the network and AI layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP {kind} failure: {message}")]
    Http { kind: FailureKind, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error [{code}]: {message}")]
    Business { code: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("All AI models failed (tried: {tried}). Last error: {last}")]
    ModelsExhausted { tried: String, last: String },

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    pub fn http(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Http {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::http(FailureKind::Transport, message)
    }

    /// The classified failure kind, for HTTP-level errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Http { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Body decode errors arrive after a response was received; everything
        // else means the exchange never completed.
        if err.is_decode() {
            return Self::Business {
                code: "decode_error".into(),
                message: err.to_string(),
            };
        }
        Self::transport(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_status_mapping() {
        assert_eq!(FailureKind::from_status(401), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(403), FailureKind::Forbidden);
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(429), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(503), FailureKind::ServerError(503));
        assert_eq!(FailureKind::from_status(418), FailureKind::ClientError(418));
    }

    #[test]
    fn every_error_status_maps_deterministically() {
        for status in 400u16..=599 {
            let first = FailureKind::from_status(status);
            assert_eq!(first, FailureKind::from_status(status));
            assert_eq!(first.status(), Some(status));
        }
    }

    #[test]
    fn retry_eligible_set() {
        assert!(FailureKind::Transport.is_retryable());
        assert!(FailureKind::RateLimited.is_retryable());
        assert!(FailureKind::ServerError(500).is_retryable());
        assert!(FailureKind::ServerError(599).is_retryable());
        assert!(FailureKind::ClientError(408).is_retryable());
        assert!(!FailureKind::ClientError(400).is_retryable());
        assert!(!FailureKind::Unauthorized.is_retryable());
        assert!(!FailureKind::Forbidden.is_retryable());
        assert!(!FailureKind::NotFound.is_retryable());
    }
}
