pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod glasses;
pub mod http;
pub mod messages;
pub mod nats;
pub mod session;
pub mod startup;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioFrame, AudioRoutingManager, ChannelBackend,
    FileBackend, FrameInjector, GlassesAudioRouter, RoutingStatus,
};
pub use bridge::GlassesAudioBridge;
pub use config::Config;
pub use error::{ErrorKind, JarvisError};
pub use glasses::{
    GlassesConnectionManager, GlassesConnectionState, GlassesConnectionStatus,
    InMemoryGlassesManager,
};
pub use http::{create_router, AppState};
pub use messages::{ContentType, DatabaseInitializer, InMemoryMessageStore, Message, MessageRepository};
pub use nats::NatsTransport;
pub use session::{
    ConnectionOrchestrator, ConnectionState, RealtimeTransport, SessionConfig, TransportEvent,
    TransportState,
};
pub use startup::{InitializationState, RetryPolicy, StartupCoordinator, StartupOptions};
