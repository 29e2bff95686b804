//! Error types for the webhook transport.

use thiserror::Error;

/// Classified webhook transport failures.
///
/// The display strings are user-facing: the webhook client flattens these
/// into the `error` side of a [`crate::webhook::ChatResponse`] instead of
/// returning `Err`, so the chat loop never has to unwind.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The 20 second request timer expired and the request was cancelled.
    #[error("The request timed out. Please try again.")]
    Timeout,

    /// Connection-level failure: the endpoint is not responding at all, as
    /// opposed to responding with an HTTP error status.
    #[error("Cannot connect to AI service. Please check if the webhook server is running.")]
    Unreachable,

    /// The endpoint answered with a failure status. The message comes from
    /// the body's `error` or `message` field when present, else the status.
    #[error("{0}")]
    Status(String),

    /// Any other transport error, surfaced as-is.
    #[error("{0}")]
    Other(String),
}

impl WebhookError {
    /// Classifies a reqwest failure into one of the reportable kinds.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable
        } else {
            Self::Other(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        assert!(WebhookError::Timeout.to_string().contains("timed out"));
    }

    #[test]
    fn test_unreachable_display() {
        assert!(WebhookError::Unreachable
            .to_string()
            .contains("webhook server is running"));
    }

    #[test]
    fn test_status_display_is_verbatim() {
        let err = WebhookError::Status("HTTP 502".to_string());
        assert_eq!(err.to_string(), "HTTP 502");
    }
}
