use super::config::SessionConfig;
use super::event::TransportEvent;
use super::state::ConnectionState;
use super::transport::RealtimeTransport;
use crate::messages::MessageRepository;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Owns the canonical [`ConnectionState`] and the realtime session lifecycle.
///
/// There is one orchestrator per transport. It is the only writer of the
/// connection state; everything else subscribes through [`Self::subscribe`].
pub struct ConnectionOrchestrator {
    /// Realtime client the sessions run on
    transport: Arc<dyn RealtimeTransport>,

    /// Where transcripts and bot responses are persisted
    messages: Arc<dyn MessageRepository>,

    /// Published connection state
    state: Arc<watch::Sender<ConnectionState>>,

    /// The in-flight session task, if any. Held across the connect guard so
    /// two concurrent connects cannot both start a session.
    session: Mutex<Option<SessionTask>>,
}

struct SessionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionTask {
    /// Cancel the task and wait for it to finish
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!("Session task panicked: {}", e);
            }
        }
    }
}

impl ConnectionOrchestrator {
    pub fn new(transport: Arc<dyn RealtimeTransport>, messages: Arc<dyn MessageRepository>) -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            transport,
            messages,
            state: Arc::new(state),
            session: Mutex::new(None),
        }
    }

    /// Subscribe to connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Current connection state snapshot
    pub fn current_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Whether a session task is running
    pub async fn has_active_session(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Start a realtime session.
    ///
    /// Ignored while already connecting or connected. Failures end up in
    /// `error_message`; nothing is returned to the caller.
    pub async fn connect(&self, config: SessionConfig) {
        let mut session = self.session.lock().await;

        let busy = {
            let current = self.state.borrow();
            current.is_connecting || current.is_connected
        };
        if busy {
            warn!("Connect requested while a session is already active, ignoring");
            return;
        }

        if let Some(previous) = session.take() {
            debug!("Stopping previous session task");
            previous.stop().await;
        }

        info!("Connecting realtime session to {}", config.base_url);
        self.state.send_modify(|s| s.begin_connecting(config.clone()));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_session(
            Arc::clone(&self.transport),
            Arc::clone(&self.messages),
            Arc::clone(&self.state),
            config,
            cancel.clone(),
        ));

        *session = Some(SessionTask { cancel, handle });
    }

    /// End the current session and tear the transport down.
    ///
    /// Safe to call in any state, including when nothing is connected.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;

        if let Some(task) = session.take() {
            info!("Disconnecting realtime session");
            task.stop().await;
        }

        let teardown = self.transport.stop_realtime_session().await;
        self.state.send_modify(|s| {
            s.reset_session();
            if let Err(e) = &teardown {
                s.record_error(e);
            }
        });

        if let Err(e) = teardown {
            error!("Failed to stop realtime session: {}", e);
        }
    }

    pub fn toggle_microphone(&self, enabled: bool) {
        debug!("Microphone {}", if enabled { "enabled" } else { "disabled" });
        self.transport.toggle_microphone(enabled);
    }

    pub fn toggle_camera(&self, enabled: bool) {
        debug!("Camera {}", if enabled { "enabled" } else { "disabled" });
        self.transport.toggle_camera(enabled);
    }

    pub fn set_speaker_mode(&self, enabled: bool) {
        self.transport.set_speaker_mode(enabled);
    }

    /// Forward captured glasses audio to the transport
    pub fn send_audio_data(&self, pcm: &[u8]) {
        self.transport.send_audio_data(pcm);
    }
}

impl Drop for ConnectionOrchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.session.get_mut().as_ref() {
            task.cancel.cancel();
        }
    }
}

/// Body of the session task: open the stream and reduce its events in order
async fn run_session(
    transport: Arc<dyn RealtimeTransport>,
    messages: Arc<dyn MessageRepository>,
    state: Arc<watch::Sender<ConnectionState>>,
    config: SessionConfig,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Session cancelled while opening");
            return;
        }
        opened = transport.start_realtime_session(config) => opened,
    };

    let mut events = match opened {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to start realtime session: {}", e);
            state.send_modify(|s| s.fail(&e));
            return;
        }
    };

    info!("Realtime session event stream open");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Session task cancelled");
                return;
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => apply_event(&state, messages.as_ref(), event).await,
            Some(Err(e)) => {
                error!("Realtime event stream failed: {}", e);
                state.send_modify(|s| s.fail(&e));
                return;
            }
            None => {
                info!("Realtime event stream ended");
                state.send_modify(|s| {
                    if s.is_connected || s.is_connecting {
                        s.reset_session();
                    }
                });
                return;
            }
        }
    }
}

async fn apply_event(
    state: &watch::Sender<ConnectionState>,
    messages: &dyn MessageRepository,
    event: TransportEvent,
) {
    log_event(&event);

    let mut to_persist = None;
    state.send_modify(|s| to_persist = s.reduce(&event));

    if let Some(message) = to_persist {
        let from_user = message.is_from_user;
        match messages.insert_message(message).await {
            Ok(id) => debug!("Persisted realtime message {} (from_user={})", id, from_user),
            Err(e) => error!("Failed to persist realtime message: {}", e),
        }
    }
}

fn log_event(event: &TransportEvent) {
    match event {
        TransportEvent::TransportStateChanged { state } => {
            info!("Transport state changed: {:?}", state)
        }
        TransportEvent::BotReady { .. } => info!("Bot ready"),
        TransportEvent::Error { message, cause } => {
            warn!("Transport error: {} (cause: {:?})", message, cause)
        }
        TransportEvent::Disconnected => info!("Transport disconnected"),
        TransportEvent::AudioLevelChanged { .. } => {}
        TransportEvent::RequestCanceled { request_id } => {
            info!("Request {} canceled", request_id)
        }
        other => debug!("Transport event: {}", other.name()),
    }
}
