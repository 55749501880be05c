use super::messages::{
    audio_subject, control_subject, events_subject, AudioFrameMessage, ControlCommand,
    ControlMessage, SessionStartMessage, SESSION_START_SUBJECT,
};
use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ask the bot side to open the session
    pub async fn publish_session_start(&self, message: &SessionStartMessage) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        self.client
            .publish(SESSION_START_SUBJECT.to_string(), payload.into())
            .await
            .context("Failed to publish session start")?;

        info!("Requested realtime session {}", self.session_id);
        Ok(())
    }

    /// Publish audio frame to NATS
    pub async fn publish_audio_frame(
        &self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        sequence: u32,
    ) -> Result<()> {
        let subject = audio_subject(&self.session_id);

        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish audio frame")?;

        Ok(())
    }

    pub async fn publish_control(&self, command: ControlCommand) -> Result<()> {
        let message = ControlMessage {
            session_id: self.session_id.clone(),
            command,
        };
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(control_subject(&self.session_id), payload.into())
            .await
            .context("Failed to publish control command")?;

        debug!("Sent control command {:?}", message.command);
        Ok(())
    }

    /// Subscribe to the session's event subject
    pub async fn subscribe_events(&self) -> Result<async_nats::Subscriber> {
        let subject = events_subject(&self.session_id);

        info!("Subscribing to realtime events on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to realtime events")?;

        Ok(subscriber)
    }

    /// Flush pending publishes before the session is dropped
    pub async fn close(&self) -> Result<()> {
        info!("Closing NATS session {}", self.session_id);
        self.client.flush().await.context("Failed to flush NATS")?;
        Ok(())
    }
}
