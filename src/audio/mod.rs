pub mod backend;
pub mod convert;
pub mod file;
pub mod frames;
pub mod router;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame, ChannelBackend, FrameInjector};
pub use file::{AudioFile, FileBackend};
pub use frames::{frame_channel, FrameSink, FrameStream};
pub use router::{AudioRoutingManager, GlassesAudioRouter, RoutingStatus};
