use super::client::NatsClient;
use super::messages::{ControlCommand, SessionStartMessage};
use crate::error::{JarvisError, Result};
use crate::session::{EventStream, RealtimeTransport, SessionConfig, TransportEvent, TransportState};
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outbound queue depth per session (~1s of 20ms audio frames)
const OUTBOUND_CAPACITY: usize = 64;

enum Outbound {
    Audio(Vec<u8>),
    Control(ControlCommand),
}

struct ActiveSession {
    client: Arc<NatsClient>,
    pump: JoinHandle<()>,
}

type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;
type OutboundSlot = Arc<StdMutex<Option<mpsc::Sender<Outbound>>>>;

/// Realtime transport speaking to the voice bot over NATS.
///
/// Each session gets its own NATS connection, an event subscription and an
/// outbound pump so that the synchronous toggles and audio injection never
/// wait on the network.
pub struct NatsTransport {
    nats_url: String,
    sample_rate: u32,
    channels: u16,
    active: SessionSlot,
    outbound: OutboundSlot,
}

impl NatsTransport {
    pub fn new(nats_url: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        Self {
            nats_url: nats_url.into(),
            sample_rate,
            channels,
            active: Arc::new(Mutex::new(None)),
            outbound: Arc::new(StdMutex::new(None)),
        }
    }

    /// Whether a session's NATS connection is still open
    pub async fn has_active_session(&self) -> bool {
        self.active.lock().await.is_some()
    }

    fn enqueue(&self, item: Outbound) {
        let Ok(outbound) = self.outbound.lock() else {
            return;
        };
        match outbound.as_ref() {
            Some(tx) => {
                if tx.try_send(item).is_err() {
                    debug!("Outbound queue full or closed, dropping item");
                }
            }
            None => debug!("No realtime session, dropping outbound item"),
        }
    }

    fn control(&self, command: ControlCommand) {
        self.enqueue(Outbound::Control(command));
    }
}

async fn teardown(session: ActiveSession) {
    if let Err(e) = session.client.publish_control(ControlCommand::Stop).await {
        warn!("Failed to send stop command: {:#}", e);
    }

    session.pump.abort();
    if let Err(e) = session.pump.await {
        if e.is_panic() {
            error!("Outbound pump panicked: {}", e);
        }
    }

    if let Err(e) = session.client.close().await {
        warn!("Failed to close NATS session: {:#}", e);
    }
}

#[async_trait::async_trait]
impl RealtimeTransport for NatsTransport {
    async fn start_realtime_session(&self, config: SessionConfig) -> Result<EventStream> {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.take() {
            info!("Replacing previous realtime session");
            teardown(previous).await;
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let client = NatsClient::connect(&self.nats_url, session_id.clone())
            .await
            .map_err(|e| JarvisError::Transport(format!("{:#}", e)))?;
        let client = Arc::new(client);

        let subscriber = client
            .subscribe_events()
            .await
            .map_err(|e| JarvisError::Transport(format!("{:#}", e)))?;

        client
            .publish_session_start(&SessionStartMessage {
                session_id: session_id.clone(),
                base_url: config.base_url.clone(),
                bot_id: config.bot_id.clone(),
                api_key: config.api_key.clone(),
                enable_mic: config.enable_mic,
                enable_cam: config.enable_cam,
                custom_headers: config.custom_headers.clone(),
            })
            .await
            .map_err(|e| JarvisError::Transport(format!("{:#}", e)))?;

        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let pump = tokio::spawn(run_outbound(
            Arc::clone(&client),
            rx,
            self.sample_rate,
            self.channels,
        ));

        if let Ok(mut outbound) = self.outbound.lock() {
            *outbound = Some(tx);
        }
        *active = Some(ActiveSession { client, pump });

        info!("Realtime session {} open", session_id);

        let events = subscriber.filter_map(|msg| async move {
            match serde_json::from_slice::<TransportEvent>(&msg.payload) {
                Ok(event) => Some(Ok::<_, JarvisError>(event)),
                Err(e) => {
                    warn!("Failed to parse realtime event: {}", e);
                    None
                }
            }
        });

        let deadline: BoxFuture<'static, ()> = match config.max_session {
            Some(limit) => tokio::time::sleep(limit).boxed(),
            None => future::pending().boxed(),
        };
        let slot = Arc::clone(&self.active);
        let outbound = Arc::clone(&self.outbound);
        let ended = stream::once(async move {
            info!("Realtime event stream ended");
            release_session(slot, outbound, session_id).await;
            Ok::<_, JarvisError>(TransportEvent::Disconnected)
        });

        let connected = stream::once(future::ready(Ok::<_, JarvisError>(
            TransportEvent::TransportStateChanged {
                state: TransportState::Connected,
            },
        )));

        Ok(connected
            .chain(events.take_until(deadline))
            .chain(ended)
            .boxed())
    }

    async fn stop_realtime_session(&self) -> Result<()> {
        if let Ok(mut outbound) = self.outbound.lock() {
            outbound.take();
        }

        let session = self.active.lock().await.take();
        if let Some(session) = session {
            info!("Stopping realtime session {}", session.client.session_id());
            teardown(session).await;
        }
        Ok(())
    }

    fn toggle_microphone(&self, enabled: bool) {
        self.control(ControlCommand::Microphone { enabled });
    }

    fn toggle_camera(&self, enabled: bool) {
        self.control(ControlCommand::Camera { enabled });
    }

    fn set_speaker_mode(&self, enabled: bool) {
        self.control(ControlCommand::SpeakerMode { enabled });
    }

    fn send_audio_data(&self, pcm: &[u8]) {
        self.enqueue(Outbound::Audio(pcm.to_vec()));
    }
}

/// Tear down `session_id` if it is still the active session
async fn release_session(active: SessionSlot, outbound: OutboundSlot, session_id: String) {
    let mut active = active.lock().await;
    // A newer session may already have replaced this one
    if !active
        .as_ref()
        .is_some_and(|s| s.client.session_id() == session_id)
    {
        return;
    }

    if let Ok(mut outbound) = outbound.lock() {
        outbound.take();
    }
    if let Some(session) = active.take() {
        info!("Closing ended realtime session {}", session_id);
        teardown(session).await;
    }
}

async fn run_outbound(
    client: Arc<NatsClient>,
    mut rx: mpsc::Receiver<Outbound>,
    sample_rate: u32,
    channels: u16,
) {
    let mut sequence: u32 = 0;

    while let Some(item) = rx.recv().await {
        let result = match item {
            Outbound::Audio(pcm) => {
                let sent = client
                    .publish_audio_frame(&pcm, sample_rate, channels, sequence)
                    .await;
                sequence = sequence.wrapping_add(1);
                sent
            }
            Outbound::Control(command) => client.publish_control(command).await,
        };

        // Keep the session alive even if a single publish fails
        if let Err(e) = result {
            error!("Failed to publish to realtime session: {:#}", e);
        }
    }

    debug!("Outbound pump stopped after {} audio frames", sequence);
}
