//! Conversation history storage, keyed by thread id.

mod memory;

pub use memory::InMemoryThreadStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

/// Author of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry in a thread's history. Never edited once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// RFC 3339 creation time
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(MessageRole::Assistant, content)
    }

    fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(now_string()),
        }
    }
}

/// Held for the duration of one question/answer exchange on a thread.
///
/// Dropping the guard lets the next exchange on the same thread proceed.
pub struct TurnGuard {
    _guard: OwnedMutexGuard<()>,
}

impl TurnGuard {
    pub(crate) fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

#[async_trait]
pub trait ThreadStore: Send + Sync {
    fn is_persistent(&self) -> bool;

    /// Messages of `thread_id` in conversational order; empty when unseen.
    async fn get(&self, thread_id: &str) -> Vec<Message>;

    /// Append one message, creating the thread if needed.
    async fn append(&self, thread_id: &str, message: Message);

    /// Append a user message and its answer back to back.
    ///
    /// Returns the thread's messages after the append.
    async fn append_exchange(
        &self,
        thread_id: &str,
        user: Message,
        assistant: Message,
    ) -> Vec<Message>;

    /// Wait for exclusive use of `thread_id` for one exchange.
    async fn begin_turn(&self, thread_id: &str) -> TurnGuard;

    async fn thread_count(&self) -> usize;
}

pub fn now_string() -> String {
    chrono::Utc::now().to_rfc3339()
}
