//! Client error taxonomy
//!
//! Transport and decode failures never surface here — they are contained
//! inside the connection manager and codec and only drive the
//! reconnect/fallback algorithm. What remains is what a caller can see.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The primary transport is not connected; `send` is invalid.
    #[error("not connected on primary transport")]
    NotConnected,

    /// An approve/deny call was rejected. Transient and retryable; the
    /// pending approval is retained until a confirmation is observed.
    #[error("approval action failed: {0}")]
    ApprovalAction(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),

    #[error("config error: {0}")]
    Config(String),
}
