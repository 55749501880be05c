use super::backend::{AudioBackend, AudioBackendConfig};
use super::convert::{process_frame, rms_level, to_pcm_bytes};
use super::frames::FrameSink;
use crate::error::{JarvisError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Snapshot of the glasses audio route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingStatus {
    pub active: bool,
    pub backend: String,
    pub frames_routed: u64,
    pub frames_dropped: u64,
    pub audio_level: f32,
}

/// Owner of the glasses microphone capture
#[async_trait::async_trait]
pub trait AudioRoutingManager: Send + Sync {
    /// Start delivering captured frames (16kHz mono PCM) into `sink`.
    ///
    /// Starting while already routing swaps in the new sink. `Ok(false)`
    /// means routing could not start.
    async fn start_audio_routing(&self, sink: FrameSink) -> Result<bool>;

    /// Stop capture; a no-op when not routing
    async fn stop_audio_routing(&self);

    fn is_routing_active(&self) -> watch::Receiver<bool>;

    fn audio_level(&self) -> watch::Receiver<f32>;

    fn routing_status(&self) -> RoutingStatus;
}

type SinkSlot = Arc<std::sync::Mutex<Option<FrameSink>>>;

/// Routes frames from an [`AudioBackend`] into the current [`FrameSink`]
pub struct GlassesAudioRouter {
    backend: Mutex<Box<dyn AudioBackend>>,
    backend_name: String,
    config: AudioBackendConfig,
    sink: SinkSlot,
    pump: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
    active: Arc<watch::Sender<bool>>,
    level: Arc<watch::Sender<f32>>,
    frames_routed: Arc<AtomicU64>,
}

impl GlassesAudioRouter {
    pub fn new(backend: Box<dyn AudioBackend>, config: AudioBackendConfig) -> Self {
        let backend_name = backend.name().to_string();
        let (active, _) = watch::channel(false);
        let (level, _) = watch::channel(0.0);
        Self {
            backend: Mutex::new(backend),
            backend_name,
            config,
            sink: Arc::new(std::sync::Mutex::new(None)),
            pump: Mutex::new(None),
            active: Arc::new(active),
            level: Arc::new(level),
            frames_routed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Install a new sink, closing the previous one
    fn replace_sink(&self, sink: Option<FrameSink>) {
        let previous = match self.sink.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, sink),
            Err(_) => None,
        };
        if let Some(previous) = previous {
            previous.close();
        }
    }

    fn current_sink(&self) -> Option<FrameSink> {
        self.sink.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait::async_trait]
impl AudioRoutingManager for GlassesAudioRouter {
    async fn start_audio_routing(&self, sink: FrameSink) -> Result<bool> {
        let mut backend = self.backend.lock().await;

        if sink.is_closed() {
            warn!("Refusing to route glasses audio into a closed sink");
            return Ok(false);
        }

        self.replace_sink(Some(sink));

        if *self.active.borrow() {
            debug!("Glasses audio already routing, switched sink");
            return Ok(true);
        }

        let mut audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.replace_sink(None);
                return Err(JarvisError::Routing(format!(
                    "failed to start {}: {:#}",
                    self.backend_name, e
                )));
            }
        };

        let cancel = CancellationToken::new();
        let sink_slot = Arc::clone(&self.sink);
        let active = Arc::clone(&self.active);
        let level = Arc::clone(&self.level);
        let frames_routed = Arc::clone(&self.frames_routed);
        let target_rate = self.config.target_sample_rate;
        let target_channels = self.config.target_channels;
        let task_cancel = cancel.clone();

        // The pump clears this when capture ends
        self.active.send_replace(true);

        let pump = tokio::spawn(async move {
            info!("Glasses audio pump started");

            loop {
                let frame = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    frame = audio_rx.recv() => match frame {
                        Some(frame) => frame,
                        None => {
                            info!("Glasses capture ended");
                            break;
                        }
                    },
                };

                let frame = process_frame(frame, target_rate, target_channels);
                level.send_replace(rms_level(&frame.samples));

                let sink = sink_slot.lock().ok().and_then(|s| s.clone());
                if let Some(sink) = sink {
                    if sink.push(to_pcm_bytes(&frame.samples)) {
                        frames_routed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            active.send_replace(false);
            level.send_replace(0.0);
            info!("Glasses audio pump stopped");
        });

        *self.pump.lock().await = Some((cancel, pump));
        info!("Glasses audio routing started ({})", self.backend_name);

        Ok(true)
    }

    async fn stop_audio_routing(&self) {
        let mut backend = self.backend.lock().await;

        if let Some((cancel, pump)) = self.pump.lock().await.take() {
            cancel.cancel();
            if let Err(e) = pump.await {
                error!("Glasses audio pump panicked: {}", e);
            }
            info!("Glasses audio routing stopped");
        }

        if backend.is_capturing() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop {}: {}", self.backend_name, e);
            }
        }

        self.replace_sink(None);
        self.active.send_replace(false);
        self.level.send_replace(0.0);
    }

    fn is_routing_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    fn audio_level(&self) -> watch::Receiver<f32> {
        self.level.subscribe()
    }

    fn routing_status(&self) -> RoutingStatus {
        RoutingStatus {
            active: *self.active.borrow(),
            backend: self.backend_name.clone(),
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_dropped: self.current_sink().map(|s| s.dropped()).unwrap_or(0),
            audio_level: *self.level.borrow(),
        }
    }
}
