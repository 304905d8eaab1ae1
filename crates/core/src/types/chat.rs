//! Live-room chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::MessageId;

/// Number of messages kept in the shared chat log.
pub const CHAT_HISTORY_LIMIT: usize = 100;

/// Name shown for authors with neither a full name nor an email.
pub const ANONYMOUS_AUTHOR: &str = "Anônimo";

/// Errors building a chat message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("message text cannot be empty")]
    EmptyText,
}

/// A message in the shared chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user: String,
    pub text: String,
    pub timestamp: i64,
}

impl ChatMessage {
    /// Build a message from raw input, trimming the text.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyText`] if the text is blank.
    pub fn new(user: String, text: &str, now: DateTime<Utc>) -> Result<Self, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }
        Ok(Self {
            id: MessageId::generate(),
            user,
            text: text.to_owned(),
            timestamp: now.timestamp_millis(),
        })
    }
}

/// Display name for a chat author: full name, else the email's local part,
/// else [`ANONYMOUS_AUTHOR`].
#[must_use]
pub fn author_name(full_name: Option<&str>, email: Option<&Email>) -> String {
    full_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .or_else(|| email.map(|e| e.local_part().to_owned()))
        .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_owned())
}

/// The shared chat log, oldest first, bounded to [`CHAT_HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatLog(Vec<ChatMessage>);

impl ChatLog {
    /// Wrap a stored message list, trimming it to the limit.
    #[must_use]
    pub fn new(mut messages: Vec<ChatMessage>) -> Self {
        let overflow = messages.len().saturating_sub(CHAT_HISTORY_LIMIT);
        messages.drain(..overflow);
        Self(messages)
    }

    /// Append a message, dropping the oldest ones past the limit.
    pub fn push(&mut self, message: ChatMessage) {
        self.0.push(message);
        let overflow = self.0.len().saturating_sub(CHAT_HISTORY_LIMIT);
        self.0.drain(..overflow);
    }

    /// Messages strictly newer than `since` (milliseconds).
    #[must_use]
    pub fn since(&self, since: i64) -> Vec<ChatMessage> {
        self.0
            .iter()
            .filter(|m| m.timestamp > since)
            .cloned()
            .collect()
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_new_trims_and_rejects_blank() {
        let msg = ChatMessage::new("ana".into(), "  bom dia  ", at(5)).unwrap();
        assert_eq!(msg.text, "bom dia");
        assert_eq!(msg.timestamp, 5);
        assert_eq!(
            ChatMessage::new("ana".into(), "   ", at(5)),
            Err(ChatError::EmptyText)
        );
    }

    #[test]
    fn test_author_name_fallbacks() {
        let email = Email::parse("joao.silva@example.com").unwrap();
        assert_eq!(author_name(Some("João Silva"), Some(&email)), "João Silva");
        assert_eq!(author_name(Some("  "), Some(&email)), "joao.silva");
        assert_eq!(author_name(None, None), ANONYMOUS_AUTHOR);
    }

    #[test]
    fn test_push_keeps_last_hundred() {
        let mut log = ChatLog::default();
        for i in 0..105 {
            log.push(ChatMessage::new("u".into(), &format!("m{i}"), at(i)).unwrap());
        }
        assert_eq!(log.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(log.messages().first().unwrap().text, "m5");
        assert_eq!(log.messages().last().unwrap().text, "m104");
    }

    #[test]
    fn test_since_filters_strictly_newer() {
        let mut log = ChatLog::default();
        for i in 1..=3 {
            log.push(ChatMessage::new("u".into(), "x", at(i * 1000)).unwrap());
        }
        assert_eq!(log.since(2000).len(), 1);
        assert_eq!(log.since(0).len(), 3);
    }

    #[test]
    fn test_new_trims_oversized_stored_log() {
        let messages = (0..120)
            .map(|i| ChatMessage::new("u".into(), "x", at(i)).unwrap())
            .collect();
        let log = ChatLog::new(messages);
        assert_eq!(log.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(log.messages().first().unwrap().timestamp, 20);
    }
}
