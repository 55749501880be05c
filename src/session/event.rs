use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the realtime transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

/// Event emitted by a realtime transport session.
///
/// Produced by the transport, consumed exactly once by the orchestrator,
/// never persisted. On the wire each event is a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    TransportStateChanged {
        state: TransportState,
    },
    BotReady {
        #[serde(default)]
        data: serde_json::Value,
    },
    UserTranscript {
        text: String,
        timestamp: DateTime<Utc>,
    },
    BotResponse {
        text: String,
        timestamp: DateTime<Utc>,
    },
    BotStartedSpeaking {
        timestamp: DateTime<Utc>,
    },
    BotStoppedSpeaking {
        timestamp: DateTime<Utc>,
    },
    UserStartedSpeaking {
        timestamp: DateTime<Utc>,
    },
    UserStoppedSpeaking {
        timestamp: DateTime<Utc>,
    },
    AudioLevelChanged {
        level: f32,
        is_user: bool,
    },
    Error {
        message: String,
        #[serde(default)]
        cause: Option<String>,
    },
    Disconnected,

    // Text chat mode
    TextResponseStarted {
        request_id: String,
    },
    TextResponsePartial {
        request_id: String,
        text: String,
    },
    TextResponseComplete {
        request_id: String,
        text: String,
    },
    MediaProcessingStarted {
        request_id: String,
        media_type: String,
    },
    MediaTranscriptionComplete {
        request_id: String,
        text: String,
    },
    MediaAnalysisComplete {
        request_id: String,
        text: String,
    },
    RequestCanceled {
        request_id: String,
    },
    Bye,
}

impl TransportEvent {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransportStateChanged { .. } => "transport_state_changed",
            Self::BotReady { .. } => "bot_ready",
            Self::UserTranscript { .. } => "user_transcript",
            Self::BotResponse { .. } => "bot_response",
            Self::BotStartedSpeaking { .. } => "bot_started_speaking",
            Self::BotStoppedSpeaking { .. } => "bot_stopped_speaking",
            Self::UserStartedSpeaking { .. } => "user_started_speaking",
            Self::UserStoppedSpeaking { .. } => "user_stopped_speaking",
            Self::AudioLevelChanged { .. } => "audio_level_changed",
            Self::Error { .. } => "error",
            Self::Disconnected => "disconnected",
            Self::TextResponseStarted { .. } => "text_response_started",
            Self::TextResponsePartial { .. } => "text_response_partial",
            Self::TextResponseComplete { .. } => "text_response_complete",
            Self::MediaProcessingStarted { .. } => "media_processing_started",
            Self::MediaTranscriptionComplete { .. } => "media_transcription_complete",
            Self::MediaAnalysisComplete { .. } => "media_analysis_complete",
            Self::RequestCanceled { .. } => "request_canceled",
            Self::Bye => "bye",
        }
    }
}
