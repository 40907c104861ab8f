//! In-memory thread store (non-persistent).

use super::{Message, ThreadStore, TurnGuard};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One thread: a turn lock plus its messages.
///
/// The turn lock serializes exchanges; the message lock only guards the
/// vector, so history reads never wait for a running exchange.
#[derive(Default)]
struct ThreadSlot {
    turn: Arc<Mutex<()>>,
    messages: std::sync::RwLock<Vec<Message>>,
}

impl ThreadSlot {
    fn snapshot(&self) -> Vec<Message> {
        match self.messages.read() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push_all(&self, new: impl IntoIterator<Item = Message>) -> Vec<Message> {
        let mut messages = match self.messages.write() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.extend(new);
        messages.clone()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<String, Arc<ThreadSlot>>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing(&self, thread_id: &str) -> Option<Arc<ThreadSlot>> {
        self.threads.read().await.get(thread_id).cloned()
    }

    async fn slot(&self, thread_id: &str) -> Arc<ThreadSlot> {
        if let Some(slot) = self.existing(thread_id).await {
            return slot;
        }
        let mut threads = self.threads.write().await;
        Arc::clone(threads.entry(thread_id.to_string()).or_default())
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get(&self, thread_id: &str) -> Vec<Message> {
        match self.existing(thread_id).await {
            Some(slot) => slot.snapshot(),
            None => Vec::new(),
        }
    }

    async fn append(&self, thread_id: &str, message: Message) {
        self.slot(thread_id).await.push_all([message]);
    }

    async fn append_exchange(
        &self,
        thread_id: &str,
        user: Message,
        assistant: Message,
    ) -> Vec<Message> {
        self.slot(thread_id).await.push_all([user, assistant])
    }

    async fn begin_turn(&self, thread_id: &str) -> TurnGuard {
        let turn = Arc::clone(&self.slot(thread_id).await.turn);
        TurnGuard::new(turn.lock_owned().await)
    }

    async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::thread_store::MessageRole;
    use std::time::Duration;

    #[tokio::test]
    async fn unseen_thread_is_empty_and_not_created() {
        let store = InMemoryThreadStore::new();
        assert!(store.get("nope").await.is_empty());
        assert_eq!(store.thread_count().await, 0);
    }

    #[tokio::test]
    async fn append_creates_thread_and_preserves_order() {
        let store = InMemoryThreadStore::new();
        store.append("t1", Message::user("first")).await;
        store.append("t1", Message::assistant("second")).await;

        let history = store.get("t1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].content, "second");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(store.thread_count().await, 1);
    }

    #[tokio::test]
    async fn append_exchange_returns_snapshot_ending_with_pair() {
        let store = InMemoryThreadStore::new();
        store.append("t1", Message::user("old")).await;
        let after = store
            .append_exchange("t1", Message::user("q"), Message::assistant("a"))
            .await;
        assert_eq!(after.len(), 3);
        assert_eq!(after[1].content, "q");
        assert_eq!(after[2].content, "a");
        assert_eq!(store.get("t1").await, after);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = InMemoryThreadStore::new();
        store.append("a", Message::user("for a")).await;
        store.append("b", Message::user("for b")).await;
        let a = store.get("a").await;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "for a");
        assert!(store.get("b").await.iter().all(|m| m.content != "for a"));
    }

    #[tokio::test]
    async fn turn_lock_serializes_same_thread_only() {
        let store = InMemoryThreadStore::new();
        let guard = store.begin_turn("busy").await;

        // A different thread is not blocked.
        tokio::time::timeout(Duration::from_millis(200), store.begin_turn("other"))
            .await
            .expect("other thread should not wait");

        // The same thread waits until the guard is dropped.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), store.begin_turn("busy")).await;
        assert!(blocked.is_err());

        // Reads are not blocked by a running turn.
        tokio::time::timeout(Duration::from_millis(200), store.get("busy"))
            .await
            .expect("reads should not wait");

        drop(guard);
        tokio::time::timeout(Duration::from_millis(200), store.begin_turn("busy"))
            .await
            .expect("turn should be free after drop");
    }
}
