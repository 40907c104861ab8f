//! Web search through the Serper API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{required_str, Tool, ToolError};
use crate::config::ToolsConfig;

/// One organic search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename(deserialize = "link"))]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// Featured answer Serper returns for factual queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Results of one search, bounded to the configured top-N.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_box: Option<AnswerBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<KnowledgeGraph>,
}

#[derive(Debug, Deserialize)]
struct SerperBody {
    #[serde(default)]
    organic: Vec<SearchResult>,
    #[serde(default, rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    #[serde(default, rename = "knowledgeGraph")]
    knowledge_graph: Option<KnowledgeGraph>,
}

/// Search the web with Serper (Google results).
pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
}

impl SerperSearch {
    pub fn new(config: &ToolsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: config.serper_api_key.clone(),
            endpoint: format!("{}/search", config.serper_base_url.trim_end_matches('/')),
            max_results: config.search_results.max(1),
        }
    }

    /// Run a search and return at most `max_results` organic hits.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": self.max_results }))
            .send()
            .await
            .map_err(|e| ToolError::RemoteService(format!("search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::RemoteService(format!(
                "search API returned HTTP {}",
                status
            )));
        }

        let body: SerperBody = response
            .json()
            .await
            .map_err(|e| ToolError::RemoteService(format!("invalid search response: {}", e)))?;

        let mut results = body.organic;
        results.truncate(self.max_results);

        tracing::info!(query = %query, results = results.len(), "Search completed");

        Ok(SearchResponse {
            query: query.to_string(),
            results,
            answer_box: body.answer_box,
            knowledge_graph: body.knowledge_graph,
        })
    }
}

#[async_trait]
impl Tool for SerperSearch {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web to find relevant URLs and information. Returns result titles, URLs and snippets, plus a direct answer or knowledge-graph summary when available."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<String, ToolError> {
        let query = required_str(args, "query")?;
        let response = self.search(query).await?;
        Ok(format_results(&response))
    }
}

/// Render search results as compact text for the model.
fn format_results(response: &SearchResponse) -> String {
    let mut sections = Vec::new();

    if let Some(answer) = &response.answer_box {
        let text = if answer.answer.is_empty() {
            &answer.snippet
        } else {
            &answer.answer
        };
        if !text.is_empty() {
            sections.push(format!("Direct answer ({}): {}", answer.title, text));
        }
    }

    if let Some(graph) = &response.knowledge_graph {
        if !graph.title.is_empty() {
            sections.push(format!("Knowledge graph: {} - {}", graph.title, graph.description));
        }
    }

    for (i, result) in response.results.iter().enumerate() {
        sections.push(format!(
            "{}. **{}**\n{}\nURL: {}",
            i + 1,
            result.title,
            result.snippet,
            result.url
        ));
    }

    if sections.is_empty() {
        format!("No results found for: {}", response.query)
    } else {
        sections.join("\n\n")
    }
}
