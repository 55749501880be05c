//! Bluetooth glasses connectivity, as seen by the connection core.
//!
//! Discovery, pairing and the radio link itself live in the platform layer;
//! the core only reads the connection state and a few capability checks.

mod memory;

pub use memory::InMemoryGlassesManager;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlassesConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlassesConnectionState {
    pub connection_status: GlassesConnectionStatus,
    pub error_message: Option<String>,
}

impl GlassesConnectionState {
    pub fn with_status(connection_status: GlassesConnectionStatus) -> Self {
        Self {
            connection_status,
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            connection_status: GlassesConnectionStatus::Error,
            error_message: Some(message.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status == GlassesConnectionStatus::Connected
    }
}

/// Glasses connection owner
#[async_trait::async_trait]
pub trait GlassesConnectionManager: Send + Sync {
    /// Subscribe to glasses connection changes
    fn connection_state(&self) -> watch::Receiver<GlassesConnectionState>;

    /// Bluetooth permissions granted by the user
    fn has_permissions(&self) -> bool;

    fn is_bluetooth_enabled(&self) -> bool;

    /// A previously paired device is remembered
    fn has_persisted_device(&self) -> bool;

    /// Reconnect to the persisted device unless already connected
    async fn ensure_auto_reconnect(&self) -> Result<()>;

    /// Refresh the Bluetooth adapter and permission snapshot
    async fn update_bluetooth_state(&self);
}
