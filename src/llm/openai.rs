//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatMessage, ChatResponse, LlmClient, LlmError, ToolCall, ToolSchema};

/// Completions can take much longer than tool fetches.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, LlmError> {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": 0,
        });
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        tracing::debug!(
            model = %model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate_body(&text, 500),
            });
        }

        parse_response(&text)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Decode a chat-completions response body into the next model turn.
fn parse_response(body: &str) -> Result<ChatResponse, LlmError> {
    let parsed: CompletionBody =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

    // Some providers send content as an array of text parts.
    let content = match choice.message.content {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("");
            Some(joined)
        }
        _ => None,
    }
    .filter(|s| !s.trim().is_empty());

    let tool_calls = choice
        .message
        .tool_calls
        .filter(|calls| !calls.is_empty());

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason: choice.finish_reason,
    })
}

fn truncate_body(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    #[test]
    fn parses_tool_call_turn() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "search_web", "arguments": "{\"query\":\"rust async\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let resp = parse_response(body).unwrap();
        assert!(resp.content.is_none());
        let calls = resp.tool_calls.expect("tool calls");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_abc");
        assert_eq!(calls[0].function.name, "search_web");
        assert_eq!(calls[0].function.arguments, r#"{"query":"rust async"}"#);
        assert_eq!(resp.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn parses_text_turn() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Answer [1]"},"finish_reason":"stop"}]}"#;
        let resp = parse_response(body).unwrap();
        assert_eq!(resp.content.as_deref(), Some("Answer [1]"));
        assert!(!resp.has_tool_calls());
    }

    #[test]
    fn joins_content_parts() {
        let body = r#"{"choices":[{"message":{"content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}}]}"#;
        let resp = parse_response(body).unwrap();
        assert_eq!(resp.content.as_deref(), Some("ab"));
    }

    #[test]
    fn empty_choices_is_invalid() {
        let err = parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });

        let client = OpenAiClient::new("k".to_string(), &format!("http://{}/v1/", addr));
        let err = client
            .chat_completion("m", &[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn sends_tools_and_bearer_auth() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(
                |headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let tool_name = body["tools"][0]["function"]["name"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({
                        "choices": [{
                            "message": {"content": format!("{}|{}", auth, tool_name)},
                            "finish_reason": "stop"
                        }]
                    }))
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });

        let client = OpenAiClient::new("secret".to_string(), &format!("http://{}/v1", addr));
        let schema = ToolSchema::function("search_web", "search", json!({"type": "object"}));
        let resp = client
            .chat_completion("m", &[ChatMessage::user("hi")], Some(std::slice::from_ref(&schema)))
            .await
            .unwrap();
        assert_eq!(resp.content.as_deref(), Some("Bearer secret|search_web"));
    }
}
