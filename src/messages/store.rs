use super::{DatabaseInitializer, Message, MessageRepository};
use crate::error::{JarvisError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

/// Process-local message store.
///
/// Keeps every inserted message in memory and republishes the full list
/// through a watch channel so `recent_messages` subscribers see each insert.
pub struct InMemoryMessageStore {
    /// Whether `initialize_if_needed` has completed
    initialized: AtomicBool,

    /// All messages, in insertion order
    messages: watch::Sender<Vec<Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            initialized: AtomicBool::new(false),
            messages,
        }
    }

    /// Snapshot of every stored message
    pub fn all(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageStore {
    async fn insert_message(&self, mut message: Message) -> Result<i64> {
        if !self.is_initialized() {
            return Err(JarvisError::Storage(
                "message store used before initialization".to_string(),
            ));
        }

        let mut id = 0;
        self.messages.send_modify(|messages| {
            id = messages.len() as i64 + 1;
            message.id = Some(id);
            messages.push(message);
        });

        debug!("Inserted message {}", id);
        Ok(id)
    }

    fn recent_messages(&self, limit: usize) -> BoxStream<'static, Vec<Message>> {
        let rx = self.messages.subscribe();
        stream::unfold((rx, true), move |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            // Only the tail is cloned out of the shared list
            let recent = latest(&rx.borrow_and_update(), limit);
            Some((recent, (rx, false)))
        })
        .boxed()
    }
}

fn latest(messages: &[Message], limit: usize) -> Vec<Message> {
    messages[messages.len().saturating_sub(limit)..].to_vec()
}

#[async_trait::async_trait]
impl DatabaseInitializer for InMemoryMessageStore {
    async fn initialize_if_needed(&self) -> Result<()> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            info!("Message store initialized");
        }
        Ok(())
    }
}
