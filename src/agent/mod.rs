//! Agent module - the research agent's orchestration logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with system prompt, recent thread history and the question
//! 2. Call the LLM with the search and scrape tools
//! 3. If the LLM requests tool calls, execute them and feed results back
//! 4. Repeat until the LLM produces a final answer or the budget runs out

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, AgentError, AgentRun, AgentStep, StepKind};
pub use prompt::{build_system_prompt, BUDGET_EXHAUSTED_NOTE, FALLBACK_ANSWER};
