use crate::bridge::GlassesAudioBridge;
use crate::messages::MessageRepository;
use crate::session::{ConnectionOrchestrator, SessionConfig};
use crate::startup::StartupCoordinator;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConnectionOrchestrator>,
    pub bridge: Arc<GlassesAudioBridge>,
    pub startup: Arc<StartupCoordinator>,
    pub messages: Arc<dyn MessageRepository>,
    /// Session settings used when a connect request carries no overrides
    pub session_config: SessionConfig,
}
