use base64::Engine;
use jarvis_realtime::audio::convert::to_pcm_bytes;
use jarvis_realtime::nats::messages::{
    audio_subject, control_subject, events_subject, AudioFrameMessage, ControlCommand,
    ControlMessage, SessionStartMessage, SESSION_START_SUBJECT,
};
use futures::StreamExt;
use jarvis_realtime::session::{RealtimeTransport, SessionConfig, TransportEvent, TransportState};
use jarvis_realtime::NatsTransport;
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "3f2a".to_string(),
        sequence: 7,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 640]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"session_id\":\"3f2a\""));
    assert!(json.contains("\"sequence\":7"));
    assert!(json.contains("16000"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "3f2a");
    assert_eq!(deserialized.sample_rate, 16000);
    assert_eq!(deserialized.channels, 1);
    assert_eq!(deserialized.sequence, 7);
}

#[test]
fn test_session_start_omits_missing_api_key() {
    let msg = SessionStartMessage {
        session_id: "3f2a".to_string(),
        base_url: "http://localhost:7860".to_string(),
        bot_id: Some("jarvis".to_string()),
        api_key: None,
        enable_mic: true,
        enable_cam: false,
        custom_headers: HashMap::from([("x-device".to_string(), "frames-01".to_string())]),
    };

    let json = serde_json::to_value(&msg).unwrap();
    assert!(json.get("api_key").is_none());
    assert_eq!(json["bot_id"], "jarvis");
    assert_eq!(json["enable_mic"], true);
    assert_eq!(json["custom_headers"]["x-device"], "frames-01");
}

#[test]
fn test_session_start_headers_default_to_empty() {
    let json = r#"{
        "session_id": "3f2a",
        "base_url": "http://localhost:7860",
        "bot_id": null,
        "enable_mic": true,
        "enable_cam": false
    }"#;

    let msg: SessionStartMessage = serde_json::from_str(json).unwrap();
    assert!(msg.custom_headers.is_empty());
    assert!(msg.bot_id.is_none());
    assert!(msg.api_key.is_none());
}

#[test]
fn test_control_message_is_flat() {
    let msg = ControlMessage {
        session_id: "3f2a".to_string(),
        command: ControlCommand::Microphone { enabled: false },
    };

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "session_id": "3f2a",
            "command": "microphone",
            "enabled": false
        })
    );

    let stop: ControlMessage =
        serde_json::from_str(r#"{"session_id":"3f2a","command":"stop"}"#).unwrap();
    assert_eq!(stop.command, ControlCommand::Stop);

    let speaker: ControlMessage = serde_json::from_str(
        r#"{"session_id":"3f2a","command":"speaker_mode","enabled":true}"#,
    )
    .unwrap();
    assert_eq!(speaker.command, ControlCommand::SpeakerMode { enabled: true });
}

#[test]
fn test_subjects() {
    assert_eq!(SESSION_START_SUBJECT, "realtime.session.start");
    assert_eq!(events_subject("3f2a"), "realtime.events.3f2a");
    assert_eq!(control_subject("3f2a"), "realtime.control.3f2a");
    assert_eq!(audio_subject("3f2a"), "audio.frame.session-3f2a");
}

#[test]
fn test_transport_event_deserialization() {
    let json = r#"{
        "type": "user_transcript",
        "text": "turn on the lights",
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;
    match serde_json::from_str::<TransportEvent>(json).unwrap() {
        TransportEvent::UserTranscript { text, timestamp } => {
            assert_eq!(text, "turn on the lights");
            assert_eq!(timestamp.to_rfc3339(), "2025-10-27T14:30:05+00:00");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let state: TransportEvent =
        serde_json::from_str(r#"{"type":"transport_state_changed","state":"CONNECTED"}"#).unwrap();
    assert_eq!(
        state,
        TransportEvent::TransportStateChanged {
            state: TransportState::Connected
        }
    );

    let disconnected: TransportEvent = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
    assert_eq!(disconnected, TransportEvent::Disconnected);
}

#[test]
fn test_transport_event_optional_fields() {
    let ready: TransportEvent = serde_json::from_str(r#"{"type":"bot_ready"}"#).unwrap();
    assert_eq!(
        ready,
        TransportEvent::BotReady {
            data: serde_json::Value::Null
        }
    );

    let error: TransportEvent =
        serde_json::from_str(r#"{"type":"error","message":"boom"}"#).unwrap();
    assert_eq!(
        error,
        TransportEvent::Error {
            message: "boom".into(),
            cause: None
        }
    );
}

#[test]
fn test_unknown_event_type_rejected() {
    assert!(serde_json::from_str::<TransportEvent>(r#"{"type":"telemetry"}"#).is_err());
}

#[test]
fn test_pcm_encoding_roundtrip() {
    let original_samples: Vec<i16> = vec![100, -200, 300, -400];

    let encoded = base64::engine::general_purpose::STANDARD.encode(to_pcm_bytes(&original_samples));

    let decoded_bytes = base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .unwrap();

    let decoded_samples: Vec<i16> = decoded_bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    assert_eq!(decoded_samples, original_samples);
}

#[tokio::test]
async fn test_unreachable_server_leaves_no_session() {
    let transport = NatsTransport::new("nats://127.0.0.1:1", 16000, 1);

    let result = transport.start_realtime_session(SessionConfig::default()).await;

    assert!(result.is_err());
    assert!(!transport.has_active_session().await);
}

#[tokio::test]
#[ignore = "requires a NATS server on localhost:4222"]
async fn test_session_limit_closes_connection() {
    let transport = NatsTransport::new("nats://localhost:4222", 16000, 1);
    let config = SessionConfig {
        max_session: Some(Duration::from_millis(200)),
        ..SessionConfig::default()
    };

    let events: Vec<_> = transport
        .start_realtime_session(config)
        .await
        .unwrap()
        .collect()
        .await;

    assert!(matches!(
        events.last(),
        Some(Ok(TransportEvent::Disconnected))
    ));
    assert!(!transport.has_active_session().await);
}
