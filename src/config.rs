//! Configuration management for the research agent.
//!
//! Configuration is set via environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completions service.
//! - `SERPER_API_KEY` - Required. API key for the Serper search API.
//! - `OPENAI_BASE_URL` - Optional. Defaults to `https://api.openai.com/v1`.
//! - `OPENAI_MODEL` - Optional. Defaults to `gpt-4-turbo-preview`.
//! - `SERPER_BASE_URL` - Optional. Defaults to `https://google.serper.dev`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_TOOL_CALLS` - Optional. Tool invocations allowed per question. Defaults to `8`.
//! - `MAX_ITERATIONS` - Optional. Model rounds allowed per question. Defaults to `12`.
//! - `MAX_CONTEXT_MESSAGES` - Optional. Thread messages replayed to the model. Defaults to `20`.
//! - `SEARCH_RESULTS` - Optional. Organic results kept per search. Defaults to `10`.
//! - `SCRAPE_MAX_CHARS` - Optional. Scraped content budget in characters. Defaults to `10000`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Outbound HTTP timeout. Defaults to `30`.
//! - `RESPECT_ROBOTS_TXT` - Optional. Consult robots.txt before scraping. Defaults to `true`.
//! - `DEFAULT_THREAD_ID` - Optional. Thread used when a request names none. Defaults to `default`.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";
pub const DEFAULT_THREAD_ID: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Language model settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the chat-completions endpoint
    pub api_key: String,

    /// Base URL of an OpenAI-compatible API (no trailing `/chat/completions`)
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,
}

/// Search and scrape tool settings.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Serper API key
    pub serper_api_key: String,

    /// Serper API base URL
    pub serper_base_url: String,

    /// Maximum organic results returned by a search
    pub search_results: usize,

    /// Character budget for scraped page content
    pub scrape_max_chars: usize,

    /// Timeout applied to every outbound tool request
    pub request_timeout: Duration,

    /// Whether robots.txt is consulted before scraping
    pub respect_robots_txt: bool,
}

/// Agent loop bounds.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Tool invocations allowed per question
    pub max_tool_calls: usize,

    /// Model round-trips allowed per question
    pub max_iterations: usize,

    /// Most recent thread messages replayed into the model context
    pub max_context_messages: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 8,
            max_iterations: 12,
            max_context_messages: 20,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Thread used when a request does not name one
    pub default_thread_id: String,

    pub llm: LlmConfig,

    pub tools: ToolsConfig,

    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` or `SERPER_API_KEY`
    /// is not set, and `ConfigError::InvalidValue` for unparseable overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let openai_api_key = required("OPENAI_API_KEY")?;
        let serper_api_key = required("SERPER_API_KEY")?;

        let defaults = AgentConfig::default();

        let llm = LlmConfig {
            api_key: openai_api_key,
            base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        let tools = ToolsConfig {
            serper_api_key,
            serper_base_url: lookup("SERPER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SERPER_BASE_URL.to_string()),
            search_results: parse_or(&lookup, "SEARCH_RESULTS", 10)?,
            scrape_max_chars: parse_or(&lookup, "SCRAPE_MAX_CHARS", 10_000)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            respect_robots_txt: lookup("RESPECT_ROBOTS_TXT")
                .map(|v| {
                    parse_bool(&v)
                        .map_err(|e| ConfigError::InvalidValue("RESPECT_ROBOTS_TXT".to_string(), e))
                })
                .transpose()?
                .unwrap_or(true),
        };

        let agent = AgentConfig {
            max_tool_calls: parse_or(&lookup, "MAX_TOOL_CALLS", defaults.max_tool_calls)?,
            max_iterations: parse_or(&lookup, "MAX_ITERATIONS", defaults.max_iterations)?,
            max_context_messages: parse_or(
                &lookup,
                "MAX_CONTEXT_MESSAGES",
                defaults.max_context_messages,
            )?,
        };
        if agent.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let default_thread_id = lookup("DEFAULT_THREAD_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_ID.to_string());

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8000)?,
            default_thread_id,
            llm,
            tools,
            agent,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(openai_api_key: String, serper_api_key: String) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            default_thread_id: DEFAULT_THREAD_ID.to_string(),
            llm: LlmConfig {
                api_key: openai_api_key,
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
            },
            tools: ToolsConfig {
                serper_api_key,
                serper_base_url: DEFAULT_SERPER_BASE_URL.to_string(),
                search_results: 10,
                scrape_max_chars: 10_000,
                request_timeout: Duration::from_secs(30),
                respect_robots_txt: true,
            },
            agent: AgentConfig::default(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
