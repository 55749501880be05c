//! Glasses ↔ realtime session audio bridge
//!
//! Keeps the audio source consistent with glasses and transport connectivity:
//! - Glasses connected: capture from the glasses, phone microphone off
//! - Glasses gone, errored, or routing failed: phone microphone on
//! - Transport down: glasses routing stopped
//! - Glasses capture ended on its own: phone microphone on
//!
//! Three observers run concurrently, one per state stream (glasses,
//! connection, routing). Each falls back to the phone microphone on its own,
//! so their interleaving does not matter. Watch channels coalesce updates,
//! so observers act on the state they see rather than on the transitions.
//! At most one input source is active at a time: every switch to the glasses
//! disables the phone microphone and every fallback re-enables it.

use crate::audio::{frame_channel, AudioRoutingManager, FrameStream, RoutingStatus};
use crate::glasses::{GlassesConnectionManager, GlassesConnectionState, GlassesConnectionStatus};
use crate::session::{ConnectionOrchestrator, ConnectionState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default capacity of the glasses → transport frame queue (~1s of 20ms frames)
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 50;

/// Cross-wires glasses connectivity, the orchestrator and audio routing
pub struct GlassesAudioBridge {
    core: Arc<BridgeCore>,
    observers: Mutex<Option<Observers>>,
}

struct Observers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

struct BridgeCore {
    glasses: Arc<dyn GlassesConnectionManager>,
    orchestrator: Arc<ConnectionOrchestrator>,
    router: Arc<dyn AudioRoutingManager>,
    frame_queue_capacity: usize,
    integration_enabled: AtomicBool,
    /// Task draining captured frames into the transport; also serializes
    /// setup and teardown of the glasses input
    forwarder: Mutex<Option<Forwarder>>,
}

struct Forwarder {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Forwarder {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!("Glasses frame forwarder panicked: {}", e);
            }
        }
    }
}

impl GlassesAudioBridge {
    pub fn new(
        glasses: Arc<dyn GlassesConnectionManager>,
        orchestrator: Arc<ConnectionOrchestrator>,
        router: Arc<dyn AudioRoutingManager>,
        frame_queue_capacity: usize,
    ) -> Self {
        Self {
            core: Arc::new(BridgeCore {
                glasses,
                orchestrator,
                router,
                frame_queue_capacity: frame_queue_capacity.max(1),
                integration_enabled: AtomicBool::new(true),
                forwarder: Mutex::new(None),
            }),
            observers: Mutex::new(None),
        }
    }

    /// Start observing glasses and connection state
    pub async fn start(&self) {
        let mut observers = self.observers.lock().await;
        if observers.is_some() {
            warn!("Glasses audio bridge already started");
            return;
        }

        let cancel = CancellationToken::new();
        let glasses_rx = self.core.glasses.connection_state();
        let connection_rx = self.core.orchestrator.subscribe();
        let routing_rx = self.core.router.is_routing_active();

        let handles = vec![
            tokio::spawn(observe_glasses(
                Arc::clone(&self.core),
                glasses_rx,
                cancel.clone(),
            )),
            tokio::spawn(observe_connection(
                Arc::clone(&self.core),
                connection_rx,
                cancel.clone(),
            )),
            tokio::spawn(observe_routing(
                Arc::clone(&self.core),
                routing_rx,
                cancel.clone(),
            )),
        ];

        *observers = Some(Observers { cancel, handles });
        info!("Glasses audio bridge started");
    }

    /// Switch the transport input to the glasses microphone.
    ///
    /// Returns whether glasses audio is now routed; on failure the phone
    /// microphone is re-enabled.
    pub async fn setup_glasses_audio_input(&self) -> bool {
        self.core.setup_glasses_audio_input().await
    }

    /// Manual override of the glasses audio path
    pub async fn set_glasses_integration_enabled(&self, enabled: bool) {
        self.core.integration_enabled.store(enabled, Ordering::SeqCst);
        info!(
            "Glasses integration {}",
            if enabled { "enabled" } else { "disabled" }
        );

        if enabled {
            if self.core.glasses_connected() {
                self.core.setup_glasses_audio_input().await;
            }
        } else {
            self.core.fall_back_to_phone_mic().await;
        }
    }

    pub fn is_glasses_integration_enabled(&self) -> bool {
        self.core.integration_enabled.load(Ordering::SeqCst)
    }

    pub fn routing_status(&self) -> RoutingStatus {
        self.core.router.routing_status()
    }

    /// Stop both observers and the glasses route.
    ///
    /// Safe to call repeatedly and from any state.
    pub async fn cleanup(&self) {
        if let Some(observers) = self.observers.lock().await.take() {
            observers.cancel.cancel();
            for handle in observers.handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!("Bridge observer panicked: {}", e);
                    }
                }
            }
            info!("Glasses audio bridge observers stopped");
        }

        self.core.stop_glasses_input().await;
    }
}

impl Drop for GlassesAudioBridge {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.get_mut().as_ref() {
            observers.cancel.cancel();
        }
    }
}

impl BridgeCore {
    fn glasses_connected(&self) -> bool {
        self.glasses.connection_state().borrow().is_connected()
    }

    fn integration_enabled(&self) -> bool {
        self.integration_enabled.load(Ordering::SeqCst)
    }

    async fn setup_glasses_audio_input(&self) -> bool {
        let mut forwarder = self.forwarder.lock().await;

        let routing = *self.router.is_routing_active().borrow();
        let forwarding = forwarder.as_ref().is_some_and(|f| !f.handle.is_finished());
        if routing && forwarding {
            debug!("Glasses audio input already set up");
            return true;
        }

        if let Some(previous) = forwarder.take() {
            previous.stop().await;
        }

        let (sink, stream) = frame_channel(self.frame_queue_capacity);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(forward_frames(
            stream,
            Arc::clone(&self.orchestrator),
            cancel.clone(),
        ));
        let candidate = Forwarder { cancel, handle };

        match self.router.start_audio_routing(sink).await {
            Ok(true) => {
                self.orchestrator.toggle_microphone(false);
                *forwarder = Some(candidate);
                info!("Audio input switched to glasses microphone");
                true
            }
            Ok(false) => {
                warn!("Glasses audio routing did not start, using phone microphone");
                candidate.stop().await;
                self.orchestrator.toggle_microphone(true);
                false
            }
            Err(e) => {
                error!("Failed to set up glasses audio: {}, using phone microphone", e);
                candidate.stop().await;
                self.orchestrator.toggle_microphone(true);
                false
            }
        }
    }

    async fn stop_glasses_input(&self) {
        let mut forwarder = self.forwarder.lock().await;
        self.router.stop_audio_routing().await;
        if let Some(previous) = forwarder.take() {
            previous.stop().await;
        }
    }

    async fn fall_back_to_phone_mic(&self) {
        self.stop_glasses_input().await;
        self.orchestrator.toggle_microphone(true);
    }

    /// Whether glasses audio is routed or still has a forwarder installed
    async fn glasses_input_installed(&self) -> bool {
        let forwarder = self.forwarder.lock().await;
        forwarder.is_some() || *self.router.is_routing_active().borrow()
    }

    async fn on_glasses_state(
        &self,
        state: &GlassesConnectionState,
        previous: Option<GlassesConnectionStatus>,
    ) {
        match state.connection_status {
            GlassesConnectionStatus::Connected => {
                if self.integration_enabled() {
                    info!("Glasses connected, setting up glasses audio");
                    self.setup_glasses_audio_input().await;
                } else {
                    debug!("Glasses connected, integration disabled");
                }
            }
            GlassesConnectionStatus::Disconnected | GlassesConnectionStatus::Error => {
                info!(
                    "Glasses {:?} ({:?}), falling back to phone microphone",
                    state.connection_status, state.error_message
                );
                self.fall_back_to_phone_mic().await;
            }
            GlassesConnectionStatus::Connecting => {
                // A Disconnected or Error published just before this may
                // have been coalesced away
                if previous == Some(GlassesConnectionStatus::Connected)
                    || self.glasses_input_installed().await
                {
                    info!("Glasses reconnecting, falling back to phone microphone");
                    self.fall_back_to_phone_mic().await;
                } else {
                    debug!("Glasses connecting");
                }
            }
        }
    }

    /// Routing went inactive; fall back unless the bridge stopped it itself
    async fn on_routing_stopped(&self) {
        let mut forwarder = self.forwarder.lock().await;
        if *self.router.is_routing_active().borrow() {
            return;
        }
        // Bridge-initiated stops clear the slot under this lock
        let Some(previous) = forwarder.take() else {
            return;
        };

        warn!("Glasses audio capture ended, falling back to phone microphone");
        self.router.stop_audio_routing().await;
        previous.stop().await;
        self.orchestrator.toggle_microphone(true);
    }

    async fn on_connection_state(&self, state: &ConnectionState, was_connected: bool) {
        if state.is_connected {
            // The rising edge also counts: the observer may not see the
            // pre-ready state when updates arrive back to back.
            if (!state.bot_ready || !was_connected)
                && self.integration_enabled()
                && self.glasses_connected()
            {
                debug!("Transport connected with glasses paired, setting up glasses audio");
                self.setup_glasses_audio_input().await;
            }
        } else {
            self.stop_glasses_input().await;
        }

        if state.bot_is_speaking {
            // Bot audio playback on the glasses speaker is not wired yet
            debug!("Bot speaking");
        }
    }
}

async fn observe_glasses(
    core: Arc<BridgeCore>,
    mut rx: watch::Receiver<GlassesConnectionState>,
    cancel: CancellationToken,
) {
    let mut previous = None;
    loop {
        let state = rx.borrow_and_update().clone();
        core.on_glasses_state(&state, previous).await;
        previous = Some(state.connection_status);

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("Glasses state stream closed");
                    break;
                }
            }
        }
    }
}

async fn observe_connection(
    core: Arc<BridgeCore>,
    mut rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
) {
    let mut was_connected = false;
    loop {
        let state = rx.borrow_and_update().clone();
        core.on_connection_state(&state, was_connected).await;
        was_connected = state.is_connected;

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("Connection state stream closed");
                    break;
                }
            }
        }
    }
}

async fn observe_routing(
    core: Arc<BridgeCore>,
    mut rx: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("Routing state stream closed");
                    break;
                }
            }
        }

        let active = *rx.borrow_and_update();
        if !active {
            core.on_routing_stopped().await;
        }
    }
}

async fn forward_frames(
    mut frames: FrameStream,
    orchestrator: Arc<ConnectionOrchestrator>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(pcm) => orchestrator.send_audio_data(&pcm),
                None => break,
            },
        }
    }
    debug!("Glasses frame forwarder stopped");
}
