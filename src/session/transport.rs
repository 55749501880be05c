use super::config::SessionConfig;
use super::event::TransportEvent;
use crate::error::Result;
use futures::stream::BoxStream;

/// Events of one session, in emission order.
///
/// An `Err` item means the stream broke; the session ends there.
pub type EventStream = BoxStream<'static, Result<TransportEvent>>;

/// Client for the remote realtime voice-bot.
///
/// Implementations:
/// - NATS: [`crate::nats::NatsTransport`]
/// - Tests: scripted transports feeding canned events
#[async_trait::async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open a session and return its event stream
    ///
    /// Suspends until the stream is established; fails with a transport
    /// error when the endpoint is unreachable or rejects the credentials.
    async fn start_realtime_session(&self, config: SessionConfig) -> Result<EventStream>;

    /// Tear down the current session, if any
    async fn stop_realtime_session(&self) -> Result<()>;

    fn toggle_microphone(&self, enabled: bool);

    fn toggle_camera(&self, enabled: bool);

    /// Route bot audio to the loudspeaker instead of the earpiece
    fn set_speaker_mode(&self, enabled: bool);

    /// Inject captured PCM (16-bit little endian) as the user's audio input
    fn send_audio_data(&self, pcm: &[u8]);
}
