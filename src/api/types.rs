//! API request and response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::thread_store::Message;

/// Request to answer a research question.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    /// The research question to answer
    pub question: String,

    /// Optional thread ID for conversation continuity
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Answer plus the thread's full history after this exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// The answer report with references
    pub answer: String,

    /// The question as answered, trimmed
    pub question: String,

    /// The thread ID used
    pub thread_id: String,

    /// Full conversation history, oldest first
    pub chat_history: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub total_messages: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Threads currently held in memory
    pub threads: usize,
}

/// API metadata served at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfoResponse {
    pub message: String,
    pub version: String,
    /// Route -> short description
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
