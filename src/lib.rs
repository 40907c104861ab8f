//! # Research Agent
//!
//! An HTTP service that answers research questions with cited sources.
//!
//! This library provides:
//! - An HTTP API for questions and per-thread chat history
//! - A tool-based agent loop that searches the web and reads pages
//! - An OpenAI-compatible chat completions client
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a question via the API
//! 2. Build context with system prompt, thread history and available tools
//! 3. Call LLM, parse response, execute any tool calls
//! 4. Feed results back to LLM, repeat until it answers or the budget runs out
//!
//! ## Example
//!
//! ```rust,ignore
//! use research_agent::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(&config);
//! let run = agent.answer("What is the tallest building in Europe?", &[]).await?;
//! println!("{}", run.answer);
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
