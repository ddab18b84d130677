//! Error taxonomy for bridge operations.
//!
//! Every operation the host can invoke resolves to `Result<_, BridgeError>`.
//! Failures that happen off the caller's path (delivery on the UI thread,
//! script execution, flushes) are logged instead and never surface here.
//!
//! Channel operations on a platform without channel support are not an
//! error: they succeed as no-ops so callers stay portable.

// Rust guideline compliant 2026-02

use crate::transport::TransportError;

/// Errors returned to the host by bridge operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed input, such as channel options missing `id` or `name`.
    ///
    /// Reported synchronously; no state was changed.
    InvalidArgument(String),
    /// The push transport reported a failure. The message is verbatim.
    Transport(String),
    /// An event could not be converted into the outgoing payload shape.
    Formatting(String),
    /// The host invoked an action name this bridge does not know.
    InvalidAction(String),
}

impl BridgeError {
    /// Shorthand for [`BridgeError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The message the host receives as its error callback value.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(msg)
            | Self::Transport(msg)
            | Self::Formatting(msg)
            | Self::InvalidAction(msg) => msg,
        }
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::Transport(msg) => write!(f, "{msg}"),
            Self::Formatting(msg) => write!(f, "Formatting failed: {msg}"),
            Self::InvalidAction(action) => write!(f, "Invalid action: {action}"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
