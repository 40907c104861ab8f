//! HTTP route wiring and server startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::answer;
use super::thread_store::{InMemoryThreadStore, ThreadStore};
use super::types::{ApiInfoResponse, HealthResponse};
use crate::agent::Agent;
use crate::config::Config;

/// Shared application state.
pub struct AppState {
    pub default_thread_id: String,
    pub store: Arc<dyn ThreadStore>,
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            default_thread_id: config.default_thread_id.clone(),
            store: Arc::new(InMemoryThreadStore::new()),
            agent: Arc::new(Agent::new(config)),
        }
    }
}

/// Build the router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health))
        .route("/answer", post(answer::post_answer))
        .route("/chat-history/:thread_id", get(answer::get_chat_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(&config));
    tracing::info!(
        persistent = state.store.is_persistent(),
        default_thread_id = %state.default_thread_id,
        "Thread store ready"
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        threads: state.store.thread_count().await,
    })
}

async fn api_info() -> Json<ApiInfoResponse> {
    let endpoints = [
        ("POST /answer", "Answer a research question with cited sources"),
        ("GET /chat-history/{thread_id}", "Conversation history for a thread"),
        ("GET /health", "Health check"),
    ]
    .into_iter()
    .map(|(path, desc)| (path.to_string(), desc.to_string()))
    .collect::<BTreeMap<_, _>>();

    Json(ApiInfoResponse {
        message: "Research Agent API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}
