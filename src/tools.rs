//! # Web Search Module
//!
//! General-web search used by the web strategy. Results come from the
//! DuckDuckGo HTML endpoint, which needs no API key.
//!
//! The strategy depends on the [`WebSearch`] trait rather than the concrete
//! client, so tests can substitute canned results.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ResearchError;

const DUCKDUCKGO_HTML_BASE: &str = "https://html.duckduckgo.com/html/";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("web search failed: {0}")]
    SearchFailed(String),

    #[error("rate limited by search provider, please wait")]
    RateLimited,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<SearchError> for ResearchError {
    fn from(e: SearchError) -> Self {
        ResearchError::Upstream(e.to_string())
    }
}

// =============================================================================
// SEARCH RESULT
// =============================================================================
/// One result from a web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Anything that can answer a web search.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

// =============================================================================
// DUCKDUCKGO CLIENT
// =============================================================================
/// Web search over the DuckDuckGo HTML endpoint.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(max_results: usize) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: DUCKDUCKGO_HTML_BASE.to_string(),
            max_results,
        })
    }

    /// Point the client at another endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, query: &str) -> Result<String, SearchError> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::SearchFailed(format!("HTTP {status}")));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl WebSearch for WebSearchTool {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        info!(query = %query, "Performing web search");

        let body = self.fetch(query).await?;
        let results = parse_results(&body, self.max_results);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }
        Ok(results)
    }
}

// =============================================================================
// HTML PARSING
// =============================================================================
/// Extract up to `max` results from a DuckDuckGo HTML page.
///
/// Result anchors (`result__a`) give the title and the redirect URL; the
/// following `result__snippet` gives the description. If the page layout
/// has no result anchors, fall back to scanning redirect parameters.
pub fn parse_results(html: &str, max: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for block in html.split("class=\"result__a\"").skip(1) {
        if results.len() >= max {
            break;
        }
        let Some(url) = redirect_target(block) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = block
            .find('>')
            .and_then(|start| {
                let rest = &block[start + 1..];
                rest.find("</a>").map(|end| strip_tags(&rest[..end]))
            })
            .filter(|t| !t.is_empty())
            .or_else(|| extract_domain(&url))
            .unwrap_or_else(|| "Result".to_string());

        let snippet = block
            .split("result__snippet")
            .nth(1)
            .and_then(|rest| {
                let start = rest.find('>')? + 1;
                let end = rest[start..].find("</a>")? + start;
                Some(strip_tags(&rest[start..end]))
            })
            .unwrap_or_default();

        results.push(SearchResult { title, url, snippet });
    }

    if results.is_empty() {
        for segment in html.split("uddg=").skip(1) {
            if results.len() >= max {
                break;
            }
            let Some(url) = decode_redirect(segment) else {
                continue;
            };
            if seen.insert(url.clone()) {
                results.push(SearchResult {
                    title: extract_domain(&url).unwrap_or_else(|| "Result".to_string()),
                    url,
                    snippet: String::new(),
                });
            }
        }
    }

    results
}

fn redirect_target(block: &str) -> Option<String> {
    let href_start = block.find("href=\"")? + 6;
    let href = &block[href_start..href_start + block[href_start..].find('"')?];
    match href.split("uddg=").nth(1) {
        Some(encoded) => decode_redirect(encoded),
        None if href.starts_with("http") && !href.contains("duckduckgo.com") => {
            Some(href.to_string())
        }
        None => None,
    }
}

fn decode_redirect(segment: &str) -> Option<String> {
    let end = segment
        .find(|c: char| c == '&' || c == '"' || c == '\'')
        .unwrap_or(segment.len());
    let url = urlencoding::decode(&segment[..end]).ok()?.into_owned();
    (url.starts_with("http") && !url.contains("duckduckgo.com")).then_some(url)
}

fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the character entities that HTML pages and Atom feeds escape.
///
/// `&amp;` goes last so `&amp;lt;` stays the literal text `&lt;`.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Extract the host part of a URL.
pub fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Ftokio.rs%2Ftokio%2Ftutorial&amp;rut=abc">Tokio <b>Tutorial</b></a>
          <a class="result__snippet" href="x">Learn async &amp; await with Tokio.</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdocs.rs%2Ftokio&amp;rut=def">tokio - Rust</a>
          <a class="result__snippet" href="y">A runtime for writing reliable network applications.</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Ftokio.rs%2Ftokio%2Ftutorial&amp;rut=dup">Duplicate</a>
        </div>
    "#;

    #[test]
    fn test_parse_results_reads_titles_and_snippets() {
        let results = parse_results(PAGE, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Tokio Tutorial");
        assert_eq!(results[0].url, "https://tokio.rs/tokio/tutorial");
        assert_eq!(results[0].snippet, "Learn async & await with Tokio.");
        assert_eq!(results[1].url, "https://docs.rs/tokio");
    }

    #[test]
    fn test_parse_results_respects_max() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_parse_results_falls_back_to_redirects() {
        let html = r#"<a href="/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&rut=1">x</a>"#;
        let results = parse_results(html, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "www.rust-lang.org");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Q&amp;A &lt;b&gt; &quot;x&quot;"), "Q&A <b> \"x\"");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.example.com/page"),
            Some("www.example.com".to_string())
        );
        assert_eq!(extract_domain("not a url"), None);
    }

    #[test]
    fn test_search_error_becomes_upstream() {
        let err: ResearchError = SearchError::RateLimited.into();
        assert!(matches!(err, ResearchError::Upstream(_)));
    }
}
