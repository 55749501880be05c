use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Glasses audio frame published to the voice bot
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
}

/// Request to open a realtime session on the bot side
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartMessage {
    pub session_id: String,
    pub base_url: String,
    pub bot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub enable_mic: bool,
    pub enable_cam: bool,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

/// In-session command sent to the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    Microphone { enabled: bool },
    Camera { enabled: bool },
    SpeakerMode { enabled: bool },
    Stop,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub command: ControlCommand,
}

pub const SESSION_START_SUBJECT: &str = "realtime.session.start";

pub fn events_subject(session_id: &str) -> String {
    format!("realtime.events.{}", session_id)
}

pub fn control_subject(session_id: &str) -> String {
    format!("realtime.control.{}", session_id)
}

pub fn audio_subject(session_id: &str) -> String {
    format!("audio.frame.session-{}", session_id)
}
