use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{MockMateError, Result};

/// One chat message inside a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-session message transcripts.
///
/// This is storage only: history is appended and served in order, but no
/// delivery guarantees between live peers are defined here.
pub struct MessageLog {
    state: Arc<RwLock<LogState>>,
}

struct LogState {
    transcripts: HashMap<String, Vec<Message>>,
    next_serial: u64,
}

impl MessageLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(RwLock::new(LogState {
                transcripts: HashMap::new(),
                next_serial: 1,
            })),
        })
    }

    /// Append a message to a session's transcript. The log assigns the
    /// message id and timestamp.
    pub async fn append(
        &self,
        session_id: &str,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Message> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(MockMateError::EmptyMessage);
        }

        let mut state = self.state.write().await;
        let message = Message {
            id: format!("msg-{}", state.next_serial),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content,
            timestamp: Utc::now(),
        };
        state.next_serial += 1;

        state
            .transcripts
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());

        tracing::info!(
            session_id = %session_id,
            message_id = %message.id,
            sender_id = %message.sender_id,
            "Message appended"
        );
        Ok(message)
    }

    /// Full transcript for a session, oldest first. Sessions without any
    /// messages yield an empty list.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let state = self.state.read().await;
        state
            .transcripts
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the transcript of a deleted session.
    pub async fn clear(&self, session_id: &str) -> bool {
        let mut state = self.state.write().await;
        state.transcripts.remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_assigns_ids_and_order() {
        let log = MessageLog::new();

        let first = log
            .append("session-000002", "user-6", "Jordan Parker", "Welcome everyone")
            .await
            .unwrap();
        let second = log
            .append("session-000002", "user-7", "Riley Cooper", "Glad to be here")
            .await
            .unwrap();

        assert_ne!(first.id, second.id);

        let history = log.history("session-000002").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], first);
        assert_eq!(history[1], second);
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[tokio::test]
    async fn test_history_unknown_session_is_empty() {
        let log = MessageLog::new();
        assert!(log.history("session-000099").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let log = MessageLog::new();
        let result = log.append("session-000001", "user-1", "Alex", "   ").await;
        assert!(matches!(result, Err(MockMateError::EmptyMessage)));
        assert!(log.history("session-000001").await.is_empty());
    }

    #[tokio::test]
    async fn test_transcripts_are_isolated_per_session() {
        let log = MessageLog::new();
        log.append("session-000001", "user-1", "Alex", "In the first session")
            .await
            .unwrap();
        log.append("session-000002", "user-6", "Jordan", "In the second session")
            .await
            .unwrap();

        assert_eq!(log.history("session-000001").await.len(), 1);
        assert_eq!(log.history("session-000002").await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_transcript() {
        let log = MessageLog::new();
        log.append("session-000001", "user-1", "Alex", "hello")
            .await
            .unwrap();

        assert!(log.clear("session-000001").await);
        assert!(log.history("session-000001").await.is_empty());
        assert!(!log.clear("session-000001").await);
    }
}
