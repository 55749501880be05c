//! Conversation messages and the storage seams the connection core writes to.
//!
//! Persistence itself belongs to the message repository; the core only
//! inserts realtime transcripts and bot responses as they arrive.

mod store;

pub use store::InMemoryMessageStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Kind of content a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Text,
    Voice,
    Photo,
    RealtimeTranscript,
    RealtimeResponse,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Row id, assigned by the repository on insert
    pub id: Option<i64>,

    pub content: String,

    pub is_from_user: bool,

    pub content_type: ContentType,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// What the user said during a realtime session
    pub fn realtime_transcript(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            content: content.into(),
            is_from_user: true,
            content_type: ContentType::RealtimeTranscript,
            timestamp,
        }
    }

    /// What the bot answered during a realtime session
    pub fn realtime_response(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            content: content.into(),
            is_from_user: false,
            content_type: ContentType::RealtimeResponse,
            timestamp,
        }
    }
}

/// Message persistence
#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    /// Store a message and return its id
    async fn insert_message(&self, message: Message) -> Result<i64>;

    /// Stream of the latest `limit` messages, oldest first, re-emitted on
    /// every change
    fn recent_messages(&self, limit: usize) -> BoxStream<'static, Vec<Message>>;
}

/// Storage readiness, awaited before anything reads persisted settings
#[async_trait::async_trait]
pub trait DatabaseInitializer: Send + Sync {
    /// Idempotent; returns once storage is usable
    async fn initialize_if_needed(&self) -> Result<()>;
}
