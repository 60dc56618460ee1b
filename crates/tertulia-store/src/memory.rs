//! Process-local message history.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{MessageStore, StoreError, StoredMessage};

/// An in-memory [`MessageStore`].
///
/// Cheap to clone — clones share the same log, which is how tests hand
/// one copy to the server and keep another to assert persistence
/// against. History does not survive the process; this is the demo and
/// test backend, not a durability story.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    log: Arc<Mutex<Vec<StoredMessage>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of messages across all channels.
    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }

    /// Whether the store holds no messages.
    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.is_empty()
    }
}

impl MessageStore for MemoryStore {
    async fn append(&self, message: StoredMessage) -> Result<(), StoreError> {
        tracing::debug!(
            channel = %message.channel,
            user = %message.user,
            "message stored"
        );
        self.log.lock().await.push(message);
        Ok(())
    }

    async fn recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let log = self.log.lock().await;
        let matching: Vec<&StoredMessage> =
            log.iter().filter(|m| m.channel == channel).collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_recent_returns_oldest_first() {
        let store = MemoryStore::new();
        store
            .append(StoredMessage::text("general", "alice", "first"))
            .await
            .unwrap();
        store
            .append(StoredMessage::text("general", "bob", "second"))
            .await
            .unwrap();

        let history = store.recent("general", 50).await.unwrap();

        assert_eq!(history.len(), 2);
        assert!(matches!(
            &history[0].body,
            crate::MessageBody::Text { text } if text == "first"
        ));
        assert!(matches!(
            &history[1].body,
            crate::MessageBody::Text { text } if text == "second"
        ));
    }

    #[tokio::test]
    async fn test_recent_honors_the_limit_keeping_newest() {
        let store = MemoryStore::new();
        for i in 0..10 {
            store
                .append(StoredMessage::text("general", "alice", format!("m{i}")))
                .await
                .unwrap();
        }

        let history = store.recent("general", 3).await.unwrap();

        let texts: Vec<&str> = history
            .iter()
            .map(|m| match &m.body {
                crate::MessageBody::Text { text } => text.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(texts, ["m7", "m8", "m9"]);
    }

    #[tokio::test]
    async fn test_recent_is_scoped_to_the_channel() {
        let store = MemoryStore::new();
        store
            .append(StoredMessage::text("general", "alice", "here"))
            .await
            .unwrap();
        store
            .append(StoredMessage::text("random", "bob", "elsewhere"))
            .await
            .unwrap();

        let history = store.recent("general", 50).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user, "alice");
    }

    #[tokio::test]
    async fn test_recent_of_unknown_channel_is_empty() {
        let store = MemoryStore::new();

        assert!(store.recent("ghost-town", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_the_same_log() {
        let store = MemoryStore::new();
        let observer = store.clone();

        store
            .append(StoredMessage::text("general", "alice", "hi"))
            .await
            .unwrap();

        assert_eq!(observer.len().await, 1);
    }
}
