//! Error types shared by the connection core.
//!
//! Component boundaries never panic or propagate failures upward as
//! exceptions; they return a [`JarvisError`] which callers fold into state
//! (see [`crate::session::ConnectionState::error_kind`]).

use serde::{Deserialize, Serialize};

/// Broad classification of a failure, surfaced alongside error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Realtime session open failure, mid-session error, teardown failure.
    Transport,
    /// Bluetooth disabled, permission missing, no paired device.
    Hardware,
    /// Glasses audio routing could not start or stop.
    Routing,
    /// Message store or database readiness failure.
    Storage,
    /// Startup sequencing failure.
    Initialization,
    /// Invalid or missing configuration.
    Config,
}

/// Error returned across component seams.
#[derive(Debug, thiserror::Error)]
pub enum JarvisError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("audio routing error: {0}")]
    Routing(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("initialization error: {0}")]
    Initialization(String),

    #[error("config error: {0}")]
    Config(String),
}

impl JarvisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Hardware(_) => ErrorKind::Hardware,
            Self::Routing(_) => ErrorKind::Routing,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Initialization(_) => ErrorKind::Initialization,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Message without the classification prefix, as shown to users.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(m)
            | Self::Hardware(m)
            | Self::Routing(m)
            | Self::Storage(m)
            | Self::Initialization(m)
            | Self::Config(m) => m,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, JarvisError>;
