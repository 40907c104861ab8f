//! Page scraping: fetch a URL and extract title, description and main text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;

use super::robots::RobotsRules;
use super::{required_str, Tool, ToolError};
use crate::config::ToolsConfig;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const NO_TITLE: &str = "No title found";

/// Containers tried in order before falling back to the whole body.
const MAIN_SELECTORS: [&str; 5] = ["main", "article", "[role='main']", ".content", "#content"];

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: [&str; 9] = [
    "script", "style", "nav", "footer", "header", "aside", "noscript", "template", "svg",
];

/// Text extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Main text, at most the configured character budget
    pub content: String,
    /// Whether `content` was cut to fit the budget
    pub truncated: bool,
}

/// Fetch a web page and extract its readable content.
pub struct ScrapeWebPage {
    client: reqwest::Client,
    max_chars: usize,
    respect_robots_txt: bool,
    /// robots.txt rules keyed by origin (`scheme://host:port`)
    robots: RwLock<HashMap<String, Arc<RobotsRules>>>,
}

impl ScrapeWebPage {
    pub fn new(config: &ToolsConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_chars: config.scrape_max_chars,
            respect_robots_txt: config.respect_robots_txt,
            robots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch `url` and extract its content.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedPage, ToolError> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::InvalidArguments(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        if self.respect_robots_txt && !self.robots_allows(&parsed).await {
            tracing::info!(url = %url, "Skipping page disallowed by robots.txt");
            return Err(ToolError::Disallowed(url.to_string()));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| unavailable(format!("{}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(unavailable(format!(
                "unsupported content type '{}'",
                content_type
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read body: {}", e)))?;

        let page = extract_page(url, &body, self.max_chars);
        tracing::info!(
            url = %url,
            chars = page.content.chars().count(),
            truncated = page.truncated,
            "Scraped page"
        );
        Ok(page)
    }

    async fn robots_allows(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let path = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };

        if let Some(rules) = self.robots.read().await.get(&origin) {
            return rules.is_allowed(&path);
        }

        let rules = Arc::new(self.fetch_robots(&origin).await);
        self.robots
            .write()
            .await
            .insert(origin, Arc::clone(&rules));
        rules.is_allowed(&path)
    }

    async fn fetch_robots(&self, origin: &str) -> RobotsRules {
        let robots_url = format!("{}/robots.txt", origin);
        match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => RobotsRules::parse(&body),
                Err(_) => RobotsRules::allow_all(),
            },
            Ok(resp) => {
                tracing::debug!(url = %robots_url, status = %resp.status(), "No robots.txt");
                RobotsRules::allow_all()
            }
            Err(e) => {
                tracing::debug!(url = %robots_url, error = %e, "robots.txt unreachable");
                RobotsRules::allow_all()
            }
        }
    }
}

fn unavailable(reason: String) -> ToolError {
    ToolError::RemoteService(format!("page unavailable: {}", reason))
}

#[async_trait]
impl Tool for ScrapeWebPage {
    fn name(&self) -> &str {
        "scrape_web_page"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its title, meta description and main text content (truncated). Use on the most relevant URLs from search results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The absolute http(s) URL of the page to scrape"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<String, ToolError> {
        let url = required_str(args, "url")?;
        let page = self.scrape(url).await?;
        serde_json::to_string(&page)
            .map_err(|e| ToolError::RemoteService(format!("failed to encode page: {}", e)))
    }
}

/// Extract title, description and main text from an HTML document.
///
/// `content` is whitespace-collapsed and holds at most `max_chars` characters.
pub fn extract_page(url: &str, html: &str, max_chars: usize) -> ScrapedPage {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, "title")
        .or_else(|| first_attr(&doc, "meta[property=\"og:title\"]", "content"))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = first_attr(&doc, "meta[name=\"description\"]", "content")
        .or_else(|| first_attr(&doc, "meta[property=\"og:description\"]", "content"))
        .unwrap_or_default();

    let root = MAIN_SELECTORS
        .iter()
        .find_map(|s| first_element(&doc, s))
        .or_else(|| first_element(&doc, "body"))
        .unwrap_or_else(|| doc.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let (content, truncated) = truncate_chars(&text, max_chars);

    ScrapedPage {
        url: url.to_string(),
        title,
        description,
        content,
        truncated,
    }
}

fn first_element<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    Some(el)
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let el = first_element(doc, selector)?;
    let t = el.text().collect::<Vec<_>>().join(" ");
    let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
    (!t.is_empty()).then_some(t)
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let el = first_element(doc, selector)?;
    let v = el.value().attr(attr)?.trim().to_string();
    (!v.is_empty()).then_some(v)
}

/// Append the text under `el`, skipping non-content subtrees.
fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if SKIPPED_ELEMENTS.contains(&child_el.value().name()) {
                continue;
            }
            collect_text(child_el, out);
        }
    }
}

/// Cut `s` to at most `max_chars` characters.
fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (s[..idx].to_string(), true),
        None => (s.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{http::header, http::StatusCode, routing::get, Router};

    async fn fixture(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        format!("http://{}", addr)
    }

    fn scraper_with(max_chars: usize, respect_robots_txt: bool) -> ScrapeWebPage {
        let mut config = Config::new("o".to_string(), "s".to_string()).tools;
        config.scrape_max_chars = max_chars;
        config.respect_robots_txt = respect_robots_txt;
        ScrapeWebPage::new(&config)
    }

    const ARTICLE: &str = r#"<!doctype html>
<html>
<head>
  <title> Quantum   Computing 101 </title>
  <meta name="description" content="An introduction to qubits.">
  <style>body { color: red; }</style>
</head>
<body>
  <header>Site header</header>
  <nav>Home | About</nav>
  <main>
    <h1>What is quantum computing?</h1>
    <p>Quantum computers use <b>qubits</b>.</p>
    <script>var tracking = 1;</script>
    <aside>Related links</aside>
  </main>
  <footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn extracts_title_description_and_main_text() {
        let page = extract_page("https://example.com", ARTICLE, 10_000);
        assert_eq!(page.title, "Quantum Computing 101");
        assert_eq!(page.description, "An introduction to qubits.");
        assert_eq!(
            page.content,
            "What is quantum computing? Quantum computers use qubits ."
        );
        assert!(!page.truncated);
    }

    #[test]
    fn falls_back_to_og_tags_and_body() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
            <meta property="og:description" content="OG description">
            </head><body><div>Plain body text</div><footer>skip me</footer></body></html>"#;
        let page = extract_page("https://example.com", html, 10_000);
        assert_eq!(page.title, "OG Title");
        assert_eq!(page.description, "OG description");
        assert_eq!(page.content, "Plain body text");
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let page = extract_page("https://example.com", "<p>hi</p>", 10_000);
        assert_eq!(page.title, NO_TITLE);
        assert_eq!(page.description, "");
    }

    #[test]
    fn long_content_is_cut_to_exactly_the_budget() {
        let body = "word ".repeat(5_000);
        let html = format!("<html><body><article>{}</article></body></html>", body);
        let page = extract_page("https://example.com", &html, 10_000);
        assert_eq!(page.content.chars().count(), 10_000);
        assert!(page.truncated);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let (out, truncated) = truncate_chars("ééééé", 3);
        assert_eq!(out, "ééé");
        assert!(truncated);
        let (out, truncated) = truncate_chars("abc", 3);
        assert_eq!(out, "abc");
        assert!(!truncated);
    }

    #[tokio::test]
    async fn scrape_fetches_html_with_browser_user_agent() {
        let app = Router::new().route(
            "/page",
            get(|headers: axum::http::HeaderMap| async move {
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    format!("<html><head><title>UA</title></head><body><main>{}</main></body></html>", ua),
                )
            }),
        );
        let base = fixture(app).await;

        let page = scraper_with(10_000, true)
            .scrape(&format!("{}/page", base))
            .await
            .expect("scrape");
        assert_eq!(page.title, "UA");
        assert_eq!(page.content, BROWSER_USER_AGENT);
    }

    #[tokio::test]
    async fn robots_disallow_skips_page() {
        let app = Router::new()
            .route(
                "/robots.txt",
                get(|| async { "User-agent: *\nDisallow: /private\n" }),
            )
            .route(
                "/private/page",
                get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>secret</p>") }),
            );
        let base = fixture(app).await;
        let url = format!("{}/private/page", base);

        let err = scraper_with(10_000, true).scrape(&url).await.unwrap_err();
        assert!(matches!(err, ToolError::Disallowed(_)));

        let page = scraper_with(10_000, false).scrape(&url).await.expect("scrape");
        assert_eq!(page.content, "secret");
    }

    #[tokio::test]
    async fn non_html_content_is_unavailable() {
        let app = Router::new().route(
            "/data.json",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{}") }),
        );
        let base = fixture(app).await;

        let err = scraper_with(10_000, true)
            .scrape(&format!("{}/data.json", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::RemoteService(ref m) if m.starts_with("page unavailable")));
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let app = Router::new().route("/gone", get(|| async { StatusCode::NOT_FOUND }));
        let base = fixture(app).await;

        let err = scraper_with(10_000, true)
            .scrape(&format!("{}/gone", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::RemoteService(ref m) if m.contains("404")));
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let scraper = scraper_with(10_000, true);
        let err = scraper.scrape("not a url").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        let err = scraper.scrape("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
