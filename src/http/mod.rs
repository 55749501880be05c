//! HTTP control API for the companion UI
//!
//! This module exposes the connection core over REST:
//! - GET /connection - Current connection state
//! - POST /connection/connect - Start a realtime session
//! - POST /connection/disconnect - End the realtime session
//! - POST /connection/microphone, /connection/camera - Input toggles
//! - POST /glasses/integration - Enable/disable the glasses audio path
//! - GET /glasses/routing - Glasses audio routing status
//! - GET /initialization - Startup progress
//! - GET /messages - Recent conversation messages
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
