//! Tools the agent can call: web search and page scraping.
//!
//! The set of tools is closed. [`ToolName`] maps the names the model sees to
//! the registered implementations; anything else lands in
//! [`ToolDispatch::Unknown`] so the agent can re-prompt instead of failing.

mod robots;
mod search;
mod web;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::ToolsConfig;
use crate::llm::ToolSchema;

pub use robots::RobotsRules;
pub use search::{AnswerBox, KnowledgeGraph, SearchResponse, SearchResult, SerperSearch};
pub use web::{extract_page, ScrapeWebPage, ScrapedPage, BROWSER_USER_AGENT};

#[derive(Debug, Error)]
pub enum ToolError {
    /// The remote service was unreachable, timed out or answered with an error.
    #[error("{0}")]
    RemoteService(String),

    /// The site's robots.txt disallows fetching this URL.
    #[error("fetching {0} is disallowed by robots.txt")]
    Disallowed(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A capability the agent may invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name exposed to the model.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool and render its result as text for the model context.
    async fn execute(&self, args: &Value) -> Result<String, ToolError>;
}

/// The tools the agent knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    SearchWeb,
    ScrapeWebPage,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::SearchWeb, ToolName::ScrapeWebPage];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchWeb => "search_web",
            ToolName::ScrapeWebPage => "scrape_web_page",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// Outcome of dispatching one tool call.
#[derive(Debug)]
pub enum ToolDispatch {
    Output(String),
    Failed(ToolError),
    Unknown(String),
}

impl ToolDispatch {
    /// Text handed back to the model as the tool message content.
    pub fn into_context_text(self) -> String {
        match self {
            ToolDispatch::Output(text) => text,
            ToolDispatch::Failed(ToolError::RemoteService(e)) => {
                format!("Error: tool call failed: {}", e)
            }
            ToolDispatch::Failed(e) => format!("Error: {}", e),
            ToolDispatch::Unknown(name) => format!(
                "Error: unknown tool '{}'. Available tools: {}",
                name,
                ToolName::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Registered implementations, one per [`ToolName`].
#[derive(Clone)]
pub struct ToolRegistry {
    search: Arc<dyn Tool>,
    scrape: Arc<dyn Tool>,
}

impl ToolRegistry {
    pub fn new(search: Arc<dyn Tool>, scrape: Arc<dyn Tool>) -> Self {
        Self { search, scrape }
    }

    /// Build the registry with the Serper search and HTTP scraping adapters.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(
            Arc::new(SerperSearch::new(config)),
            Arc::new(ScrapeWebPage::new(config)),
        )
    }

    fn get(&self, name: ToolName) -> &Arc<dyn Tool> {
        match name {
            ToolName::SearchWeb => &self.search,
            ToolName::ScrapeWebPage => &self.scrape,
        }
    }

    /// Name and description of each tool, for the system prompt.
    pub fn list_tools(&self) -> Vec<(&'static str, String)> {
        ToolName::ALL
            .iter()
            .map(|name| (name.as_str(), self.get(*name).description().to_string()))
            .collect()
    }

    /// Function-calling schemas sent to the model.
    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        ToolName::ALL
            .iter()
            .map(|name| {
                let tool = self.get(*name);
                ToolSchema::function(name.as_str(), tool.description(), tool.parameters_schema())
            })
            .collect()
    }

    /// Run the tool called `name`, folding failures into the outcome.
    pub async fn dispatch(&self, name: &str, args: &Value) -> ToolDispatch {
        let Some(tool_name) = ToolName::parse(name) else {
            return ToolDispatch::Unknown(name.to_string());
        };

        let tool = self.get(tool_name);
        match tool.execute(args).await {
            Ok(output) => ToolDispatch::Output(output),
            Err(e) => {
                tracing::warn!(tool = tool.name(), error = %e, "Tool call failed");
                ToolDispatch::Failed(e)
            }
        }
    }
}

/// Pull a required string argument out of the tool arguments object.
fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{}' argument", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "echoes its input"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, args: &Value) -> Result<String, ToolError> {
            Ok(format!("{}:{}", self.0, args))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: &Value) -> Result<String, ToolError> {
            Err(ToolError::RemoteService("HTTP 503".to_string()))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(Echo("search")), Arc::new(Broken))
    }

    #[test]
    fn tool_names_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(ToolName::parse(name.as_str()), Some(name));
        }
        assert_eq!(ToolName::parse("run_command"), None);
    }

    #[test]
    fn schemas_cover_every_tool() {
        let names: Vec<String> = registry()
            .get_tool_schemas()
            .into_iter()
            .map(|s| s.function.name)
            .collect();
        assert_eq!(names, vec!["search_web", "scrape_web_page"]);
    }

    #[tokio::test]
    async fn dispatch_routes_by_name() {
        let out = registry()
            .dispatch("search_web", &json!({"query": "q"}))
            .await;
        assert!(matches!(out, ToolDispatch::Output(ref s) if s.starts_with("search:")));
    }

    #[tokio::test]
    async fn dispatch_folds_failures_into_context_text() {
        let out = registry().dispatch("scrape_web_page", &json!({})).await;
        let text = out.into_context_text();
        assert!(text.starts_with("Error:"));
        assert!(text.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_tools() {
        let out = registry().dispatch("delete_everything", &json!({})).await;
        assert!(matches!(out, ToolDispatch::Unknown(ref n) if n == "delete_everything"));
        let text = out.into_context_text();
        assert!(text.contains("search_web"));
        assert!(text.contains("scrape_web_page"));
    }

    #[test]
    fn required_str_rejects_blank() {
        let err = required_str(&json!({"query": "  "}), "query").unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
