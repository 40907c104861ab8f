//! Core agent loop implementation.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::api::thread_store::{Message, MessageRole};
use crate::config::{AgentConfig, Config};
use crate::llm::{
    ChatMessage, ChatResponse, LlmClient, LlmError, OpenAiClient, Role, ToolCall,
};
use crate::tools::{ToolDispatch, ToolName, ToolRegistry};

use super::prompt::{build_system_prompt, BUDGET_EXHAUSTED_NOTE, FALLBACK_ANSWER};

#[derive(Debug, Error)]
pub enum AgentError {
    /// The language model itself could not be reached or answered garbage.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Kinds of entries in the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Text the model produced alongside tool calls
    Thinking,
    ToolCall,
    ToolResult,
    /// Final answer
    Response,
}

/// A single entry in the execution log.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub timestamp: String,
    pub kind: StepKind,
    pub content: String,
}

/// Outcome of answering one question.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    /// Tool invocations that counted against the budget
    pub tool_calls: usize,
    /// Model round-trips, including a forced final one
    pub iterations: usize,
}

/// The research agent.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    model: String,
    limits: AgentConfig,
}

impl Agent {
    /// Create an agent backed by the configured LLM and tool adapters.
    pub fn new(config: &Config) -> Self {
        let llm = Arc::new(OpenAiClient::new(
            config.llm.api_key.clone(),
            &config.llm.base_url,
        ));
        let tools = ToolRegistry::from_config(&config.tools);
        Self::with_parts(llm, tools, config.llm.model.clone(), config.agent.clone())
    }

    pub fn with_parts(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        model: String,
        limits: AgentConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            model,
            limits,
        }
    }

    /// Answer `question` given the prior messages of its thread.
    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<AgentRun, AgentError> {
        let mut run = AgentRun {
            answer: String::new(),
            steps: Vec::new(),
            tool_calls: 0,
            iterations: 0,
        };

        let mut messages = self.initial_messages(question, history);
        let tool_schemas = self.tools.get_tool_schemas();

        while run.iterations < self.limits.max_iterations
            && run.tool_calls < self.limits.max_tool_calls
        {
            run.iterations += 1;
            tracing::debug!(iteration = run.iterations, "Agent iteration");

            let response = self
                .llm
                .chat_completion(&self.model, &messages, Some(tool_schemas.as_slice()))
                .await?;

            let Some(tool_calls) = response.tool_calls.clone().filter(|c| !c.is_empty()) else {
                return Ok(self.finish(run, response));
            };

            if let Some(thought) = &response.content {
                run.steps.push(step(StepKind::Thinking, thought.clone()));
            }
            messages.push(ChatMessage {
                role: Role::Assistant,
                content: response.content.clone(),
                tool_calls: Some(tool_calls.clone()),
                tool_call_id: None,
            });

            // Every call gets an answer, even ones that are not executed.
            for tool_call in &tool_calls {
                let result = self.run_tool_call(tool_call, &mut run).await;
                messages.push(ChatMessage::tool_result(tool_call.id.clone(), result));
            }
        }

        tracing::info!(
            iterations = run.iterations,
            tool_calls = run.tool_calls,
            "Agent budget exhausted, forcing final answer"
        );
        messages.push(ChatMessage::system(BUDGET_EXHAUSTED_NOTE));
        run.iterations += 1;
        let response = self
            .llm
            .chat_completion(&self.model, &messages, None)
            .await?;
        Ok(self.finish(run, response))
    }

    fn initial_messages(&self, question: &str, history: &[Message]) -> Vec<ChatMessage> {
        let recent = history.len().saturating_sub(self.limits.max_context_messages);

        let mut messages = Vec::with_capacity(history.len() - recent + 2);
        messages.push(ChatMessage::system(build_system_prompt(&self.tools)));
        messages.extend(history[recent..].iter().map(|m| match m.role {
            MessageRole::User => ChatMessage::user(m.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
        }));
        messages.push(ChatMessage::user(question));
        messages
    }

    /// Execute one requested tool call and return the text for the model.
    async fn run_tool_call(&self, tool_call: &ToolCall, run: &mut AgentRun) -> String {
        let name = tool_call.function.name.as_str();
        run.steps.push(step(
            StepKind::ToolCall,
            format!(
                "Calling tool: {} with args: {}",
                name, tool_call.function.arguments
            ),
        ));

        let result = match ToolName::parse(name) {
            None => {
                tracing::warn!(tool = %name, "Model requested an unknown tool");
                ToolDispatch::Unknown(name.to_string()).into_context_text()
            }
            Some(_) if run.tool_calls >= self.limits.max_tool_calls => {
                format!(
                    "Error: tool call budget of {} exhausted; '{}' was not executed.",
                    self.limits.max_tool_calls, name
                )
            }
            Some(_) => {
                run.tool_calls += 1;
                let args = parse_arguments(&tool_call.function.arguments);
                tracing::info!(tool = %name, call = run.tool_calls, "Executing tool call");
                self.tools.dispatch(name, &args).await.into_context_text()
            }
        };

        run.steps.push(step(
            StepKind::ToolResult,
            truncate_for_log(&result, 1000),
        ));
        result
    }

    fn finish(&self, mut run: AgentRun, response: ChatResponse) -> AgentRun {
        let answer = response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("No final message content found, returning fallback answer");
                FALLBACK_ANSWER.to_string()
            });

        run.steps
            .push(step(StepKind::Response, truncate_for_log(&answer, 2000)));
        run.answer = answer;
        run
    }
}

/// Tool arguments arrive as JSON text; anything unparseable becomes `{}`.
fn parse_arguments(raw: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if value.is_object() => value,
        _ => serde_json::Value::Object(Default::default()),
    }
}

fn step(kind: StepKind, content: String) -> AgentStep {
    AgentStep {
        timestamp: crate::api::thread_store::now_string(),
        kind,
        content,
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}
