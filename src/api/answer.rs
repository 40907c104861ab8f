//! Question answering and chat history endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use super::thread_store::Message;
use super::types::{AnswerResponse, ChatHistoryResponse, QuestionRequest};

/// `POST /answer`: research a question and extend the thread's history.
///
/// The thread's turn lock is held from the history read until both messages
/// are appended, so exchanges on one thread never interleave.
pub async fn post_answer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let Json(req) = body?;

    let question = req.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::Validation("question is required".to_string()));
    }
    let thread_id = resolve_thread_id(req.thread_id, &state.default_thread_id);
    let request_id = Uuid::new_v4();

    tracing::info!(
        %request_id,
        thread_id = %thread_id,
        question = %preview(&question, 100),
        "Processing question"
    );

    let _turn = state.store.begin_turn(&thread_id).await;
    let history = state.store.get(&thread_id).await;
    let user_message = Message::user(question.clone());

    let run = state.agent.answer(&question, &history).await?;

    tracing::info!(
        %request_id,
        tool_calls = run.tool_calls,
        iterations = run.iterations,
        "Answer generated"
    );
    for step in &run.steps {
        tracing::debug!(%request_id, kind = ?step.kind, "{}", step.content);
    }

    let chat_history = state
        .store
        .append_exchange(&thread_id, user_message, Message::assistant(run.answer.clone()))
        .await;

    Ok(Json(AnswerResponse {
        answer: run.answer,
        question,
        thread_id,
        chat_history,
    }))
}

/// `GET /chat-history/:thread_id`: unknown threads have an empty history.
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<ChatHistoryResponse> {
    tracing::info!(thread_id = %thread_id, "Retrieving chat history");
    let messages = state.store.get(&thread_id).await;
    Json(ChatHistoryResponse {
        total_messages: messages.len(),
        thread_id,
        messages,
    })
}

fn resolve_thread_id(requested: Option<String>, default: &str) -> String {
    requested
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
