use super::config::SessionConfig;
use super::event::{TransportEvent, TransportState};
use crate::error::{ErrorKind, JarvisError};
use crate::messages::Message;
use serde::{Deserialize, Serialize};

/// Canonical connection state published by the orchestrator.
///
/// `is_connected` implies `transport_state == Connected`, `is_connecting`
/// implies `transport_state == Connecting`, and the two flags are never
/// both set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub bot_ready: bool,
    pub bot_is_speaking: bool,
    pub user_is_speaking: bool,
    pub bot_audio_level: f32,
    pub user_audio_level: f32,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub config: Option<SessionConfig>,
    pub transport_state: TransportState,
}

impl ConnectionState {
    /// State entered when a connect attempt starts
    pub fn begin_connecting(&mut self, config: SessionConfig) {
        self.is_connecting = true;
        self.is_connected = false;
        self.transport_state = TransportState::Connecting;
        self.error_message = None;
        self.error_kind = None;
        self.config = Some(config);
    }

    /// Session could not be established or broke while running
    pub fn fail(&mut self, err: &JarvisError) {
        self.is_connecting = false;
        self.is_connected = false;
        self.transport_state = TransportState::Error;
        self.record_error(err);
    }

    pub fn record_error(&mut self, err: &JarvisError) {
        self.error_message = Some(err.message().to_string());
        self.error_kind = Some(err.kind());
    }

    /// Clear every per-session flag after the session ended
    pub fn reset_session(&mut self) {
        self.is_connecting = false;
        self.is_connected = false;
        self.bot_ready = false;
        self.bot_is_speaking = false;
        self.user_is_speaking = false;
        self.bot_audio_level = 0.0;
        self.user_audio_level = 0.0;
        self.transport_state = TransportState::Idle;
    }

    /// Apply one transport event.
    ///
    /// Returns the message to persist, if the event produces one.
    pub fn reduce(&mut self, event: &TransportEvent) -> Option<Message> {
        match event {
            TransportEvent::TransportStateChanged { state } => {
                self.transport_state = *state;
                self.is_connected = *state == TransportState::Connected;
                self.is_connecting = *state == TransportState::Connecting;
                None
            }
            TransportEvent::BotReady { .. } => {
                self.bot_ready = true;
                None
            }
            TransportEvent::UserTranscript { text, timestamp } => {
                Some(Message::realtime_transcript(text.clone(), *timestamp))
            }
            TransportEvent::BotResponse { text, timestamp } => {
                Some(Message::realtime_response(text.clone(), *timestamp))
            }
            TransportEvent::BotStartedSpeaking { .. } => {
                self.bot_is_speaking = true;
                None
            }
            TransportEvent::BotStoppedSpeaking { .. } => {
                self.bot_is_speaking = false;
                None
            }
            TransportEvent::UserStartedSpeaking { .. } => {
                self.user_is_speaking = true;
                None
            }
            TransportEvent::UserStoppedSpeaking { .. } => {
                self.user_is_speaking = false;
                None
            }
            TransportEvent::AudioLevelChanged { level, is_user } => {
                let level = level.clamp(0.0, 1.0);
                if *is_user {
                    self.user_audio_level = level;
                } else {
                    self.bot_audio_level = level;
                }
                None
            }
            TransportEvent::Error { message, .. } => {
                self.error_message = Some(message.clone());
                self.error_kind = Some(ErrorKind::Transport);
                None
            }
            TransportEvent::Disconnected => {
                self.reset_session();
                None
            }
            // Text chat mode events are only logged
            TransportEvent::TextResponseStarted { .. }
            | TransportEvent::TextResponsePartial { .. }
            | TransportEvent::TextResponseComplete { .. }
            | TransportEvent::MediaProcessingStarted { .. }
            | TransportEvent::MediaTranscriptionComplete { .. }
            | TransportEvent::MediaAnalysisComplete { .. }
            | TransportEvent::RequestCanceled { .. }
            | TransportEvent::Bye => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state_changed(state: TransportState) -> TransportEvent {
        TransportEvent::TransportStateChanged { state }
    }

    #[test]
    fn transport_state_drives_flags() {
        let mut state = ConnectionState::default();

        state.reduce(&state_changed(TransportState::Connecting));
        assert!(state.is_connecting && !state.is_connected);

        state.reduce(&state_changed(TransportState::Connected));
        assert!(state.is_connected && !state.is_connecting);
        assert_eq!(state.transport_state, TransportState::Connected);

        state.reduce(&state_changed(TransportState::Disconnecting));
        assert!(!state.is_connected && !state.is_connecting);
    }

    #[test]
    fn speaking_events_flip_flags() {
        let mut state = ConnectionState::default();
        let now = Utc::now();

        state.reduce(&TransportEvent::BotStartedSpeaking { timestamp: now });
        state.reduce(&TransportEvent::UserStartedSpeaking { timestamp: now });
        assert!(state.bot_is_speaking && state.user_is_speaking);

        state.reduce(&TransportEvent::BotStoppedSpeaking { timestamp: now });
        assert!(!state.bot_is_speaking && state.user_is_speaking);
    }

    #[test]
    fn transcripts_become_messages() {
        let mut state = ConnectionState::default();
        let now = Utc::now();

        let msg = state
            .reduce(&TransportEvent::UserTranscript {
                text: "hello".into(),
                timestamp: now,
            })
            .unwrap();
        assert!(msg.is_from_user);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.timestamp, now);

        let msg = state
            .reduce(&TransportEvent::BotResponse {
                text: "hi".into(),
                timestamp: now,
            })
            .unwrap();
        assert!(!msg.is_from_user);
    }

    #[test]
    fn audio_level_is_clamped() {
        let mut state = ConnectionState::default();
        state.reduce(&TransportEvent::AudioLevelChanged {
            level: 3.0,
            is_user: false,
        });
        assert_eq!(state.bot_audio_level, 1.0);
        assert_eq!(state.user_audio_level, 0.0);
    }

    #[test]
    fn fail_sets_error_state() {
        let mut state = ConnectionState::default();
        state.begin_connecting(SessionConfig::default());
        state.fail(&JarvisError::Transport("unreachable".into()));

        assert!(!state.is_connecting && !state.is_connected);
        assert_eq!(state.transport_state, TransportState::Error);
        assert_eq!(state.error_message.as_deref(), Some("unreachable"));
        assert_eq!(state.error_kind, Some(ErrorKind::Transport));
    }
}
