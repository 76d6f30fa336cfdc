//! Turn a completed non-2xx exchange into a typed failure.

use super::sanitize::sanitize_error_body;
use crate::error::{Error, FailureKind};
use serde::Deserialize;

/// Error payload shapes returned by the news and AI providers.
///
/// NewsAPI: `{"status":"error","code":"apiKeyInvalid","message":"..."}`.
/// OpenAI-compatible: `{"error":{"message":"...","code":401}}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<NestedError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NestedError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Best server-supplied message, if any non-blank one exists.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.as_deref()))
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Human-readable message: server body message, then status line, then `HTTP {code}`.
pub fn failure_message(status: u16, status_line: Option<&str>, body: &str) -> String {
    if let Some(message) = ErrorBody::parse(body).as_ref().and_then(ErrorBody::message) {
        return sanitize_error_body(message);
    }
    match status_line.map(str::trim).filter(|s| !s.is_empty()) {
        Some(line) => line.to_string(),
        None => format!("HTTP {}", status),
    }
}

/// Classify a non-2xx response. The kind depends on the status alone.
pub fn classify_response(status: u16, status_line: Option<&str>, body: &str) -> Error {
    let kind = FailureKind::from_status(status);
    let message = failure_message(status, status_line, body);
    Error::http(kind, message)
}

/// Classify a failure where no response was received.
pub fn classify_transport(err: &reqwest::Error) -> Error {
    let detail = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    Error::transport(format!("{}: {}", detail, sanitize_error_body(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(err: Error) -> FailureKind {
        err.failure_kind().unwrap()
    }

    #[test]
    fn prefers_body_message() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        assert_eq!(
            failure_message(401, Some("Unauthorized"), body),
            "Your API key is invalid."
        );
    }

    #[test]
    fn reads_nested_openai_error() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        assert_eq!(failure_message(429, None, body), "Rate limit exceeded");
    }

    #[test]
    fn falls_back_to_status_line_then_generic() {
        assert_eq!(failure_message(502, Some("Bad Gateway"), "<html>"), "Bad Gateway");
        assert_eq!(failure_message(599, None, ""), "HTTP 599");
        assert_eq!(failure_message(520, Some("  "), "{}"), "HTTP 520");
    }

    #[test]
    fn body_does_not_change_kind() {
        let a = classify_response(500, None, "");
        let b = classify_response(500, Some("Internal Server Error"), r#"{"message":"boom"}"#);
        assert_eq!(kind_of(a), kind_of(b));
        assert_eq!(kind_of(classify_response(408, None, "")), FailureKind::ClientError(408));
    }
}
