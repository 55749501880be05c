use super::{GlassesConnectionManager, GlassesConnectionState, GlassesConnectionStatus};
use crate::error::{JarvisError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

/// Process-local glasses manager.
///
/// The platform Bluetooth layer reports link changes through
/// [`Self::set_status`]; reconnects are resolved against the persisted
/// device and adapter flags without touching a radio.
pub struct InMemoryGlassesManager {
    state: watch::Sender<GlassesConnectionState>,
    permissions_granted: AtomicBool,
    bluetooth_enabled: AtomicBool,
    persisted_device: Mutex<Option<String>>,
    reconnect_calls: AtomicUsize,
}

impl InMemoryGlassesManager {
    pub fn new(persisted_device: Option<String>, bluetooth_enabled: bool, permissions_granted: bool) -> Self {
        let (state, _) = watch::channel(GlassesConnectionState::default());
        Self {
            state,
            permissions_granted: AtomicBool::new(permissions_granted),
            bluetooth_enabled: AtomicBool::new(bluetooth_enabled),
            persisted_device: Mutex::new(persisted_device),
            reconnect_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: GlassesConnectionStatus) {
        info!("Glasses connection status: {:?}", status);
        self.state.send_replace(GlassesConnectionState::with_status(status));
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let state = GlassesConnectionState::error(message);
        warn!("Glasses connection error: {:?}", state.error_message);
        self.state.send_replace(state);
    }

    pub fn set_permissions(&self, granted: bool) {
        self.permissions_granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_bluetooth_enabled(&self, enabled: bool) {
        self.bluetooth_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Remember a paired device (or forget it with `None`)
    pub fn persist_device(&self, device: Option<String>) {
        if let Ok(mut persisted) = self.persisted_device.lock() {
            *persisted = device;
        }
    }

    /// How often a reconnect was requested
    pub fn reconnect_calls(&self) -> usize {
        self.reconnect_calls.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> GlassesConnectionState {
        self.state.borrow().clone()
    }

    fn persisted_device_name(&self) -> Option<String> {
        self.persisted_device.lock().ok().and_then(|d| d.clone())
    }
}

#[async_trait::async_trait]
impl GlassesConnectionManager for InMemoryGlassesManager {
    fn connection_state(&self) -> watch::Receiver<GlassesConnectionState> {
        self.state.subscribe()
    }

    fn has_permissions(&self) -> bool {
        self.permissions_granted.load(Ordering::SeqCst)
    }

    fn is_bluetooth_enabled(&self) -> bool {
        self.bluetooth_enabled.load(Ordering::SeqCst)
    }

    fn has_persisted_device(&self) -> bool {
        self.persisted_device_name().is_some()
    }

    async fn ensure_auto_reconnect(&self) -> Result<()> {
        self.reconnect_calls.fetch_add(1, Ordering::SeqCst);

        if self.current().is_connected() {
            return Ok(());
        }

        let device = self
            .persisted_device_name()
            .ok_or_else(|| JarvisError::Hardware("no paired glasses".to_string()))?;

        if !self.is_bluetooth_enabled() {
            self.set_error("Bluetooth is disabled");
            return Err(JarvisError::Hardware("Bluetooth is disabled".to_string()));
        }

        info!("Reconnecting to glasses {}", device);
        self.set_status(GlassesConnectionStatus::Connecting);
        self.set_status(GlassesConnectionStatus::Connected);
        Ok(())
    }

    async fn update_bluetooth_state(&self) {
        info!(
            "Bluetooth snapshot: enabled={}, permissions={}, paired={}",
            self.is_bluetooth_enabled(),
            self.has_permissions(),
            self.has_persisted_device()
        );
    }
}
