use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for the voice bot
            target_channels: 1,        // Mono
            buffer_duration_ms: 20,    // 20ms frames, the usual Bluetooth SCO cadence
        }
    }
}

/// Glasses audio capture backend trait
///
/// Implementations:
/// - Channel: frames pushed by the platform Bluetooth layer
/// - File: replay a WAV recording (for demos and testing without glasses)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Backend fed by the platform Bluetooth layer through a [`FrameInjector`]
pub struct ChannelBackend {
    slot: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    capacity: usize,
}

/// Handle the platform layer pushes captured glasses frames into
#[derive(Clone)]
pub struct FrameInjector {
    slot: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
}

impl ChannelBackend {
    pub fn new(config: &AudioBackendConfig) -> (Self, FrameInjector) {
        // Roughly one second of frames
        let capacity = (1000 / config.buffer_duration_ms.max(1)).max(1) as usize;
        let slot = Arc::new(Mutex::new(None));
        (
            Self {
                slot: Arc::clone(&slot),
                capacity,
            },
            FrameInjector { slot },
        )
    }
}

impl FrameInjector {
    /// Hand one captured frame to the backend.
    ///
    /// Never blocks the capture thread; returns false when the frame was
    /// dropped because capture is stopped or the backend is saturated.
    pub fn push(&self, frame: AudioFrame) -> bool {
        let Ok(slot) = self.slot.lock() else {
            return false;
        };
        match slot.as_ref() {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for ChannelBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        // The backend holds one reference; the rest belong to injectors
        if Arc::strong_count(&self.slot) < 2 {
            anyhow::bail!("no frame injector attached to glasses capture");
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("glasses frame slot poisoned"))?;
        *slot = Some(tx);
        info!("Glasses channel capture started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.take().is_some() {
                debug!("Glasses channel capture stopped");
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        "glasses-channel"
    }
}
