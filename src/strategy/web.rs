//! General-web research: one web search, then synthesis over the results.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{require_query, ResearchMode, ResearchStrategy, StrategyFactory};
use crate::artifact::ResearchArtifact;
use crate::error::ResearchError;
use crate::progress::ProgressEmitter;
use crate::synthesis::{parse_model_output, SourceDigest, SynthesisRequest, Synthesizer};
use crate::tools::{SearchResult, WebSearch};

pub struct WebStrategy {
    search: Arc<dyn WebSearch>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl WebStrategy {
    pub fn new(search: Arc<dyn WebSearch>, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            search,
            synthesizer,
        }
    }
}

#[async_trait]
impl ResearchStrategy for WebStrategy {
    async fn research(&self, query: &str) -> Result<ResearchArtifact, ResearchError> {
        let query = require_query(query)?;
        info!(query = %query, "Starting web research");

        let results = self.search.search(query).await?;

        let request = SynthesisRequest {
            query: query.to_string(),
            mode: ResearchMode::Web,
            sources: results.iter().map(digest).collect(),
        };
        let reply = self.synthesizer.synthesize(&request).await?;
        let mut artifact = parse_model_output(&reply)?;

        if artifact.findings.is_empty() {
            artifact.findings = results.iter().map(finding).collect();
        }
        artifact.metadata.insert("mode".into(), json!("web"));
        artifact
            .metadata
            .insert("sourceCount".into(), json!(results.len()));
        artifact.metadata.insert(
            "sources".into(),
            Value::Array(results.iter().map(|r| json!(r.url)).collect()),
        );

        info!(query = %query, sources = results.len(), "Web research completed");
        Ok(artifact)
    }
}

fn digest(result: &SearchResult) -> SourceDigest {
    SourceDigest {
        title: result.title.clone(),
        url: result.url.clone(),
        excerpt: result.snippet.clone(),
    }
}

fn finding(result: &SearchResult) -> Value {
    json!({
        "title": result.title,
        "url": result.url,
        "snippet": result.snippet,
        "source": "web",
    })
}

/// Builds [`WebStrategy`] instances. The web variant reports no progress of
/// its own, so the emitter is not kept.
pub struct WebStrategyFactory {
    search: Arc<dyn WebSearch>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl WebStrategyFactory {
    pub fn new(search: Arc<dyn WebSearch>, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            search,
            synthesizer,
        }
    }
}

impl StrategyFactory for WebStrategyFactory {
    fn name(&self) -> &'static str {
        "web"
    }

    fn build(&self, _progress: ProgressEmitter) -> Box<dyn ResearchStrategy> {
        Box::new(WebStrategy::new(
            Arc::clone(&self.search),
            Arc::clone(&self.synthesizer),
        ))
    }
}
