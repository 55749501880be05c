//! Realtime session orchestration
//!
//! This module provides the `ConnectionOrchestrator` that manages:
//! - The realtime session lifecycle (connect / disconnect)
//! - Reduction of transport events into the canonical `ConnectionState`
//! - Persistence of transcripts and bot responses as conversation messages
//! - Microphone, camera and raw audio forwarding to the transport

mod config;
mod event;
mod orchestrator;
mod state;
mod transport;

pub use config::SessionConfig;
pub use event::{TransportEvent, TransportState};
pub use orchestrator::ConnectionOrchestrator;
pub use state::ConnectionState;
pub use transport::{EventStream, RealtimeTransport};
