pub mod client;
pub mod messages;
pub mod transport;

pub use client::NatsClient;
pub use messages::{AudioFrameMessage, ControlCommand, ControlMessage, SessionStartMessage};
pub use transport::NatsTransport;
