// Shared test collaborators: a scripted realtime transport, a scripted
// audio router and a scripted glasses manager.

#![allow(dead_code)]

use jarvis_realtime::audio::{AudioRoutingManager, FrameSink, RoutingStatus};
use jarvis_realtime::error::{JarvisError, Result};
use jarvis_realtime::glasses::{
    GlassesConnectionManager, GlassesConnectionState, GlassesConnectionStatus,
};
use jarvis_realtime::session::{EventStream, RealtimeTransport, SessionConfig, TransportEvent};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use futures::stream::StreamExt;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Await a watch value matching `pred`, failing the test after two seconds
pub async fn wait_for_state<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let result = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
    result.clone()
}

pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), fut)
        .await
        .expect("operation timed out")
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
pub struct ScriptedTransport {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub mic: Mutex<Vec<bool>>,
    pub camera: Mutex<Vec<bool>>,
    pub speaker: Mutex<Vec<bool>>,
    pub audio: Mutex<Vec<Vec<u8>>>,
    /// Fail the next session open with this message
    pub fail_start: Mutex<Option<String>>,
    /// Fail teardown with this message
    pub fail_stop: Mutex<Option<String>>,
    /// When set, session open blocks until `release` is notified
    pub hold_open: AtomicBool,
    pub release: Notify,
    sessions: Mutex<Vec<mpsc::UnboundedSender<Result<TransportEvent>>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an event into the latest session
    pub fn emit(&self, event: TransportEvent) {
        let sessions = self.sessions.lock().unwrap();
        let tx = sessions.last().expect("no session opened");
        tx.send(Ok(event)).expect("session stream dropped");
    }

    /// Break the latest session's stream
    pub fn emit_error(&self, err: JarvisError) {
        let sessions = self.sessions.lock().unwrap();
        sessions.last().expect("no session opened").send(Err(err)).unwrap();
    }

    /// End the latest session's stream
    pub fn close_stream(&self) {
        self.sessions.lock().unwrap().pop();
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Whether a session stream is open to emit into
    pub fn has_session(&self) -> bool {
        !self.sessions.lock().unwrap().is_empty()
    }

    pub fn mic_calls(&self) -> Vec<bool> {
        self.mic.lock().unwrap().clone()
    }

    pub fn last_mic(&self) -> Option<bool> {
        self.mic.lock().unwrap().last().copied()
    }

    pub fn audio_frames(&self) -> usize {
        self.audio.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RealtimeTransport for ScriptedTransport {
    async fn start_realtime_session(&self, _config: SessionConfig) -> Result<EventStream> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        if self.hold_open.load(Ordering::SeqCst) {
            self.release.notified().await;
        }

        if let Some(message) = self.fail_start.lock().unwrap().take() {
            return Err(JarvisError::Transport(message));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn stop_realtime_session(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().clear();
        match self.fail_stop.lock().unwrap().take() {
            Some(message) => Err(JarvisError::Transport(message)),
            None => Ok(()),
        }
    }

    fn toggle_microphone(&self, enabled: bool) {
        self.mic.lock().unwrap().push(enabled);
    }

    fn toggle_camera(&self, enabled: bool) {
        self.camera.lock().unwrap().push(enabled);
    }

    fn set_speaker_mode(&self, enabled: bool) {
        self.speaker.lock().unwrap().push(enabled);
    }

    fn send_audio_data(&self, pcm: &[u8]) {
        self.audio.lock().unwrap().push(pcm.to_vec());
    }
}

// ============================================================================
// Audio routing
// ============================================================================

pub enum StartBehavior {
    Succeed,
    Refuse,
    Fail,
}

pub struct ScriptedRouter {
    pub behavior: Mutex<StartBehavior>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub sink: Mutex<Option<FrameSink>>,
    active: watch::Sender<bool>,
    level: watch::Sender<f32>,
}

impl ScriptedRouter {
    pub fn new(behavior: StartBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sink: Mutex::new(None),
            active: watch::channel(false).0,
            level: watch::channel(0.0).0,
        }
    }

    pub fn set_behavior(&self, behavior: StartBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Simulate the capture source ending on its own
    pub fn end_capture(&self) {
        self.active.send_replace(false);
    }

    /// Simulate one captured frame
    pub fn capture(&self, pcm: Vec<u8>) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.push(pcm),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl AudioRoutingManager for ScriptedRouter {
    async fn start_audio_routing(&self, sink: FrameSink) -> Result<bool> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match *self.behavior.lock().unwrap() {
            StartBehavior::Succeed => {
                if let Some(old) = self.sink.lock().unwrap().replace(sink) {
                    old.close();
                }
                self.active.send_replace(true);
                Ok(true)
            }
            StartBehavior::Refuse => Ok(false),
            StartBehavior::Fail => Err(JarvisError::Routing("SCO link refused".into())),
        }
    }

    async fn stop_audio_routing(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().unwrap().take() {
            sink.close();
        }
        self.active.send_replace(false);
    }

    fn is_routing_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    fn audio_level(&self) -> watch::Receiver<f32> {
        self.level.subscribe()
    }

    fn routing_status(&self) -> RoutingStatus {
        RoutingStatus {
            active: self.is_active(),
            backend: "scripted".into(),
            frames_routed: 0,
            frames_dropped: 0,
            audio_level: 0.0,
        }
    }
}

// ============================================================================
// Glasses
// ============================================================================

/// Glasses manager whose precondition answers are scripted per check
pub struct ScriptedGlasses {
    state: watch::Sender<GlassesConnectionState>,
    /// Answers for successive permission checks; the last one repeats
    pub permissions: Mutex<VecDeque<bool>>,
    pub bluetooth_enabled: AtomicBool,
    pub persisted_device: AtomicBool,
    /// Errors returned by successive reconnect calls
    pub reconnect_errors: Mutex<VecDeque<String>>,
    pub permission_checks: Mutex<Vec<Instant>>,
    pub reconnect_calls: AtomicUsize,
    pub bluetooth_refreshes: AtomicUsize,
}

impl ScriptedGlasses {
    pub fn new(permissions: Vec<bool>) -> Self {
        Self {
            state: watch::channel(GlassesConnectionState::default()).0,
            permissions: Mutex::new(permissions.into()),
            bluetooth_enabled: AtomicBool::new(true),
            persisted_device: AtomicBool::new(true),
            reconnect_errors: Mutex::new(VecDeque::new()),
            permission_checks: Mutex::new(Vec::new()),
            reconnect_calls: AtomicUsize::new(0),
            bluetooth_refreshes: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: GlassesConnectionStatus) {
        self.state
            .send_replace(GlassesConnectionState::with_status(status));
    }

    pub fn checks(&self) -> Vec<Instant> {
        self.permission_checks.lock().unwrap().clone()
    }

    pub fn reconnects(&self) -> usize {
        self.reconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GlassesConnectionManager for ScriptedGlasses {
    fn connection_state(&self) -> watch::Receiver<GlassesConnectionState> {
        self.state.subscribe()
    }

    fn has_permissions(&self) -> bool {
        self.permission_checks.lock().unwrap().push(Instant::now());
        let mut answers = self.permissions.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap_or(false)
        } else {
            answers.front().copied().unwrap_or(false)
        }
    }

    fn is_bluetooth_enabled(&self) -> bool {
        self.bluetooth_enabled.load(Ordering::SeqCst)
    }

    fn has_persisted_device(&self) -> bool {
        self.persisted_device.load(Ordering::SeqCst)
    }

    async fn ensure_auto_reconnect(&self) -> Result<()> {
        self.reconnect_calls.fetch_add(1, Ordering::SeqCst);
        match self.reconnect_errors.lock().unwrap().pop_front() {
            Some(message) => Err(JarvisError::Hardware(message)),
            None => {
                self.set_status(GlassesConnectionStatus::Connected);
                Ok(())
            }
        }
    }

    async fn update_bluetooth_state(&self) {
        self.bluetooth_refreshes.fetch_add(1, Ordering::SeqCst);
    }
}
