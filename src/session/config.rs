use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for one realtime session.
///
/// Passed by value into every connect attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether the transport should open its own microphone input
    pub enable_mic: bool,

    /// Whether the transport should open the camera
    pub enable_cam: bool,

    /// Bot to talk to; the endpoint default is used when absent
    pub bot_id: Option<String>,

    /// Base URL of the realtime voice-bot endpoint
    pub base_url: String,

    /// API key sent with the session request, if the endpoint needs one.
    /// Never serialized, so published state does not carry it.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Extra headers forwarded with the session request; may hold
    /// credentials, so they are not serialized either
    #[serde(default, skip_serializing)]
    pub custom_headers: HashMap<String, String>,

    /// Upper bound on session length; the session ends with a disconnect
    /// once it elapses
    #[serde(default, with = "optional_secs")]
    pub max_session: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enable_mic: true,
            enable_cam: false,
            bot_id: None,
            base_url: "http://localhost:7860".to_string(),
            api_key: None,
            custom_headers: HashMap::new(),
            max_session: Some(Duration::from_secs(600)), // 10 minutes
        }
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
