//! Live-room chat.

use bookvision_core::{ChatError, ChatLog, ChatMessage};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::storage::{BlobStore, CHAT_MESSAGES_KEY, Scope, StorageError};

#[derive(Debug, Error)]
pub enum ChatServiceError {
    #[error(transparent)]
    Invalid(#[from] ChatError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The shared chat log.
pub struct ChatService {
    store: BlobStore,
    write_lock: Mutex<()>,
}

impl ChatService {
    #[must_use]
    pub fn new(store: BlobStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<ChatLog, StorageError> {
        let messages = self
            .store
            .get_json::<Vec<ChatMessage>>(&Scope::Shared, CHAT_MESSAGES_KEY)
            .await?;
        Ok(messages.map(ChatLog::new).unwrap_or_default())
    }

    /// Messages oldest first; with `since`, only those strictly newer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    pub async fn messages(&self, since: Option<i64>) -> Result<Vec<ChatMessage>, StorageError> {
        let log = self.load().await?;
        Ok(match since {
            Some(since) => log.since(since),
            None => log.messages().to_vec(),
        })
    }

    /// Append a message by `author`.
    ///
    /// # Errors
    ///
    /// Returns `ChatServiceError::Invalid` for blank text, or a storage
    /// error.
    pub async fn post(&self, author: String, text: &str) -> Result<ChatMessage, ChatServiceError> {
        let message = ChatMessage::new(author, text, Utc::now())?;

        let _guard = self.write_lock.lock().await;
        let mut log = self.load().await?;
        log.push(message.clone());
        self.store
            .set_json(&Scope::Shared, CHAT_MESSAGES_KEY, &log)
            .await?;

        tracing::debug!(message_id = %message.id, "Chat message posted");
        Ok(message)
    }
}
