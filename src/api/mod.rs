//! HTTP API: question answering, chat history, health.

mod answer;
mod error;
mod routes;
pub mod thread_store;
pub mod types;

pub use error::ApiError;
pub use routes::{router, serve, AppState};
