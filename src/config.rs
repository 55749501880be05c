use crate::audio::AudioBackendConfig;
use crate::session::SessionConfig;
use crate::startup::{RetryPolicy, StartupOptions};
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transport: TransportConfig,
    pub glasses: GlassesConfig,
    pub startup: StartupConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct TransportConfig {
    pub nats_url: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub bot_id: Option<String>,
    pub enable_mic: bool,
    pub enable_cam: bool,
    /// 0 disables the session time limit
    pub max_session_secs: u64,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct GlassesConfig {
    pub persisted_device: Option<String>,
    pub bluetooth_enabled: bool,
    pub permissions_granted: bool,
}

#[derive(Debug, Deserialize)]
pub struct StartupConfig {
    pub settle_delay_ms: u64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_ms: u64,
    pub frame_queue_capacity: usize,
    pub replay_file: Option<PathBuf>,
}

impl Config {
    /// Load `path` (extension optional) with `JARVIS__SECTION__KEY` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("JARVIS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        let t = &self.transport;
        SessionConfig {
            enable_mic: t.enable_mic,
            enable_cam: t.enable_cam,
            bot_id: t.bot_id.clone(),
            base_url: t.base_url.clone(),
            api_key: t.api_key.clone(),
            custom_headers: t.custom_headers.clone(),
            max_session: (t.max_session_secs > 0).then(|| Duration::from_secs(t.max_session_secs)),
        }
    }

    pub fn startup_options(&self) -> StartupOptions {
        let s = &self.startup;
        StartupOptions {
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            reconnect: RetryPolicy {
                max_attempts: s.reconnect_attempts,
                delay: Duration::from_millis(s.reconnect_delay_ms),
                ..RetryPolicy::default()
            },
            poll_interval: Duration::from_millis(s.poll_interval_ms.max(1)),
        }
    }

    pub fn audio_backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.audio.sample_rate,
            target_channels: self.audio.channels,
            buffer_duration_ms: self.audio.frame_ms,
        }
    }
}
