//! Tri-state results handed to the presentation layer.

use crate::error::{Error, FailureKind};
use serde::Serialize;

/// User-facing view of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    /// Whether offering a retry makes sense.
    pub recoverable: bool,
    pub kind: Option<FailureKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error(ErrorReport),
}

impl<T> Resource<T> {
    pub fn from_result(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Error(describe_error(&err)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Error(report) => Some(report),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Self::Loading => Resource::Loading,
            Self::Success(value) => Resource::Success(f(value)),
            Self::Error(report) => Resource::Error(report),
        }
    }
}

fn kind_message(kind: FailureKind, detail: &str) -> String {
    match kind {
        FailureKind::Transport => "Network error. Please check your connection.".into(),
        FailureKind::Unauthorized => "Unauthorized. Please check your API key.".into(),
        FailureKind::Forbidden => "Access forbidden.".into(),
        FailureKind::NotFound => "Resource not found.".into(),
        FailureKind::RateLimited => "Too many requests. Please try again later.".into(),
        FailureKind::ServerError(_) => "Server error. Please try again later.".into(),
        FailureKind::ClientError(408) => "Request timed out. Please try again.".into(),
        FailureKind::ClientError(400) => "Bad request. Please try again.".into(),
        FailureKind::ClientError(code) => format!("HTTP error {}: {}", code, detail),
    }
}

/// Map an error to its user-facing message and retry hint.
pub fn describe_error(err: &Error) -> ErrorReport {
    match err {
        Error::Http { kind, message } => ErrorReport {
            message: kind_message(*kind, message),
            recoverable: kind.is_retryable(),
            kind: Some(*kind),
        },
        Error::Configuration(msg) => ErrorReport {
            message: format!("Configuration error: {}", msg),
            recoverable: false,
            kind: None,
        },
        Error::Business { message, .. } => ErrorReport {
            message: message.clone(),
            recoverable: false,
            kind: None,
        },
        Error::ModelsExhausted { .. } => ErrorReport {
            message: "AI service is unavailable right now. Please try again later.".into(),
            recoverable: true,
            kind: None,
        },
        Error::Json(_) => ErrorReport {
            message: "Received an unexpected response from the server.".into(),
            recoverable: false,
            kind: None,
        },
        Error::Store(msg) => ErrorReport {
            message: format!("Local storage error: {}", msg),
            recoverable: false,
            kind: None,
        },
    }
}
