//! # arXiv Module
//!
//! Academic paper search over the arXiv Atom API, used by the academic
//! strategy through the [`PaperSearch`] trait.
//!
//! The client spaces requests at least three seconds apart, as arXiv asks of
//! API users, and retries transient failures with exponential backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ResearchError;
use crate::tools::decode_entities;

const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = "ai-research-server/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);
const MAX_RETRIES: u32 = 2;
const RETRY_BASE_DELAY_MS: u64 = 1000;

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Debug, Error)]
pub enum ArxivError {
    #[error("arXiv request timed out")]
    Timeout,

    #[error("connection to arXiv failed: {0}")]
    Connection(String),

    #[error("arXiv rate limited the request")]
    RateLimited,

    #[error("arXiv server error ({0})")]
    ServerError(u16),

    #[error("arXiv returned HTTP {0}")]
    HttpError(u16),

    #[error("failed to read arXiv response: {0}")]
    Network(String),
}

impl ArxivError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ArxivError::Timeout
                | ArxivError::Connection(_)
                | ArxivError::RateLimited
                | ArxivError::ServerError(_)
        )
    }
}

impl From<ArxivError> for ResearchError {
    fn from(e: ArxivError) -> Self {
        ResearchError::Upstream(e.to_string())
    }
}

// =============================================================================
// MODELS
// =============================================================================
/// A paper entry from the arXiv API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub categories: Vec<String>,
    pub published: String,
    pub abs_url: String,
    pub pdf_url: String,
}

/// Anything that can search for academic papers.
#[async_trait]
pub trait PaperSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivPaper>, ArxivError>;
}

// =============================================================================
// CLIENT
// =============================================================================
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivClient {
    pub fn new() -> Result<Self, ArxivError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ArxivError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: ARXIV_API_BASE.to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
            max_retries: MAX_RETRIES,
            last_request: Mutex::new(None),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, url: &str) -> Result<String, ArxivError> {
        self.rate_limit().await;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ArxivError::Timeout
            } else if e.is_connect() {
                ArxivError::Connection(e.to_string())
            } else {
                ArxivError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200..=299 => response
                .text()
                .await
                .map_err(|e| ArxivError::Network(e.to_string())),
            429 => Err(ArxivError::RateLimited),
            500..=599 => Err(ArxivError::ServerError(status)),
            _ => Err(ArxivError::HttpError(status)),
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, ArxivError> {
        let mut attempt = 0;
        loop {
            match self.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1));
                    warn!(attempt, error = %e, "arXiv request failed, will retry");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl PaperSearch for ArxivClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivPaper>, ArxivError> {
        let url = build_search_url(&self.base_url, query, max_results);
        debug!(url = %url, "arXiv search");
        let body = self.fetch_with_retry(&url).await?;
        Ok(parse_atom_feed(&body))
    }
}

/// Relevance-sorted search over all fields.
pub fn build_search_url(base_url: &str, query: &str, max_results: usize) -> String {
    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
        base_url,
        urlencoding::encode(&format!("all:{query}")),
        max_results,
    )
}

// =============================================================================
// ATOM PARSING
// =============================================================================
/// Parse every `<entry>` of an arXiv Atom feed. Malformed entries are skipped.
pub fn parse_atom_feed(xml: &str) -> Vec<ArxivPaper> {
    let mut papers = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<entry>") {
        let Some(len) = rest[start..].find("</entry>") else {
            break;
        };
        let end = start + len + "</entry>".len();
        if let Some(paper) = parse_entry(&rest[start..end]) {
            papers.push(paper);
        }
        rest = &rest[end..];
    }

    papers
}

fn parse_entry(entry: &str) -> Option<ArxivPaper> {
    let id_url = tag_text(entry, "id")?;
    let arxiv_id = id_url
        .rsplit_once("/abs/")
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| id_url.clone());
    let title = normalize_whitespace(&tag_text(entry, "title")?);

    let authors = blocks(entry, "<author>", "</author>")
        .filter_map(|block| tag_text(block, "name"))
        .collect();

    let categories = blocks(entry, "<category", ">")
        .filter_map(|tag| attribute(tag, "term"))
        .collect();

    let mut pdf_url = String::new();
    for link in blocks(entry, "<link", ">") {
        if attribute(link, "title").as_deref() == Some("pdf") {
            pdf_url = attribute(link, "href").unwrap_or_default();
        }
    }
    if pdf_url.is_empty() {
        pdf_url = format!("https://arxiv.org/pdf/{arxiv_id}");
    }

    Some(ArxivPaper {
        title,
        authors,
        summary: normalize_whitespace(&tag_text(entry, "summary").unwrap_or_default()),
        categories,
        published: tag_text(entry, "published").unwrap_or_default(),
        abs_url: id_url,
        pdf_url,
        arxiv_id,
    })
}

/// Every `open ... close` slice of `xml`, in order.
fn blocks<'a>(xml: &'a str, open: &'a str, close: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let mut rest = xml;
    std::iter::from_fn(move || {
        let start = rest.find(open)?;
        let len = rest[start..].find(close)? + close.len();
        let block = &rest[start..start + len];
        rest = &rest[start + len..];
        Some(block)
    })
}

fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut search = xml;
    loop {
        let start = search.find(&open)?;
        let after = &search[start + open.len()..];
        // `<id` must not match `<idx>`.
        if after.starts_with('>') || after.starts_with(' ') {
            let content_start = after.find('>')? + 1;
            let content_end = after[content_start..].find(&close)? + content_start;
            return Some(decode_entities(after[content_start..content_end].trim()));
        }
        search = after;
    }
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!(" {name}=\"");
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(decode_entities(&tag[start..end]))
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
