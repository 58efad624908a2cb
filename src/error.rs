//! Error taxonomy for an interactive exec session
//!
//! Every stage of the broker → profile → stream → pump chain reports failures
//! through [`TunnelError`], so callers can tell a condition worth retrying
//! apart from a fatal protocol mismatch without inspecting strings.

use thiserror::Error;

use crate::config::ConfigError;
use crate::kubernetes::config::ProfileError;

/// Errors that can end an exec session
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Authorization rejected: {0}")]
    Auth(String),

    #[error("Malformed broker response: missing {}", .missing.join(", "))]
    MalformedResponse { missing: Vec<String> },

    #[error("Broker request failed: {0}")]
    Broker(#[from] reqwest::Error),

    #[error("Failed to prepare access profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Status: {status} - Message: {message}")]
    RemoteFailure { status: String, message: String },

    #[error("Stream closed before the remote process reported its status")]
    StreamClosed,

    #[error("Session interrupted by {0}")]
    Interrupted(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations
pub type TunnelResult<T> = Result<T, TunnelError>;

impl TunnelError {
    /// Process exit code reported at the CLI boundary for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether re-running the whole session chain may succeed.
    ///
    /// No component retries internally; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TunnelError::Auth(_) | TunnelError::Broker(_) | TunnelError::Connect(_)
        )
    }

    /// Whether the error indicates a backend protocol mismatch.
    ///
    /// Local output may be partially written at this point, so the process
    /// must not carry on with another session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TunnelError::ProtocolViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(TunnelError::Auth("expired".into()).is_retryable());
        assert!(TunnelError::Connect("pod pending".into()).is_retryable());
        assert!(!TunnelError::ProtocolViolation("channel 9".into()).is_retryable());
        assert!(TunnelError::ProtocolViolation("channel 9".into()).is_fatal());
        assert!(!TunnelError::StreamClosed.is_fatal());
        assert_eq!(TunnelError::StreamClosed.exit_code(), 1);
        assert!(!TunnelError::Interrupted("SIGTERM").is_retryable());
        assert_eq!(TunnelError::Interrupted("SIGTERM").exit_code(), 1);
    }

    #[test]
    fn test_malformed_response_lists_fields() {
        let err = TunnelError::MalformedResponse {
            missing: vec!["namespace".into(), "tmp_session_token".into()],
        };
        assert_eq!(
            err.to_string(),
            "Malformed broker response: missing namespace, tmp_session_token"
        );
    }

    #[test]
    fn test_remote_failure_message() {
        let err = TunnelError::RemoteFailure {
            status: "Failure".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Status: Failure - Message: boom");
    }
}
