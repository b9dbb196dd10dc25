//! Error types for the HTTP layer.

use thiserror::Error;

/// Errors produced while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}{}", render_detail(.detail))]
    Status {
        /// HTTP status code.
        status: u16,
        /// `detail` string from the error body, when present.
        detail: Option<String>,
    },

    /// A success body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ApiError {
    /// Backend-supplied detail message, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code, if the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message to show the user: the backend detail when present, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().map_or_else(|| fallback.to_string(), str::to_string)
    }
}

fn render_detail(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Convenience result alias for HTTP operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_detail() {
        let err = ApiError::Status {
            status: 400,
            detail: Some("missing topic".to_string()),
        };
        assert_eq!(err.user_message("Failed to start conversation"), "missing topic");
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "backend returned status 400: missing topic");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = ApiError::Status {
            status: 500,
            detail: None,
        };
        assert_eq!(err.user_message("Failed to send message"), "Failed to send message");
        assert_eq!(err.to_string(), "backend returned status 500");

        let err = ApiError::HttpClient("tls backend unavailable".to_string());
        assert_eq!(err.detail(), None);
        assert_eq!(err.status(), None);
    }
}
