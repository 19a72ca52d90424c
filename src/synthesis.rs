//! # Synthesis Module
//!
//! The generation backend that turns collected sources into a research
//! artifact. [`OllamaSynthesizer`] drives a local model through Rig's Ollama
//! provider; strategies only see the [`Synthesizer`] trait.
//!
//! Model output is untrusted. [`parse_model_output`] accepts a JSON object
//! (bare or inside a fenced block) and falls back to using plain text as the
//! summary.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::ResearchArtifact;
use crate::config::Config;
use crate::error::ResearchError;
use crate::strategy::ResearchMode;

/// Instructions for the model. Describes the artifact shape only.
const SYNTHESIS_PREAMBLE: &str = r#"
You are a research assistant. You receive a research question and a numbered
list of sources. Answer ONLY with one JSON object of this shape:

{
  "summary": "2-4 paragraph synthesis of the sources",
  "findings": [{"title": "...", "detail": "...", "source": "url"}],
  "keyInsights": ["..."],
  "statistics": [{"label": "...", "value": "...", "source": "url"}],
  "codeExamples": [{"language": "...", "code": "...", "description": "..."}],
  "suggestedQuestions": ["..."]
}

Use only the sources given. Leave a list empty rather than inventing entries.
"#;

/// One source handed to the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDigest {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

/// Everything the backend needs for one synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub query: String,
    pub mode: ResearchMode,
    pub sources: Vec<SourceDigest>,
}

impl SynthesisRequest {
    /// The user prompt sent alongside the preamble.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!(
            "Research question ({} research): {}\n\nSources:\n",
            self.mode.as_str(),
            self.query
        );
        if self.sources.is_empty() {
            prompt.push_str("(no sources were found)\n");
        }
        for (i, source) in self.sources.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {}\n   URL: {}\n   {}\n",
                i + 1,
                source.title,
                source.url,
                source.excerpt
            ));
        }
        prompt
    }
}

/// A generation backend. Returns the raw model reply.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, ResearchError>;
}

// =============================================================================
// OLLAMA BACKEND
// =============================================================================
pub struct OllamaSynthesizer {
    client: ollama::Client,
    model: String,
    temperature: f64,
}

impl OllamaSynthesizer {
    /// Create the Ollama client once, at startup.
    ///
    /// Rig reads the host from `OLLAMA_API_BASE_URL`, so the configured host
    /// is exported before the client is built.
    pub fn new(config: &Config) -> Self {
        std::env::set_var("OLLAMA_API_BASE_URL", &config.ollama_host);
        debug!(host = %config.ollama_host, model = %config.model, "Creating Ollama client");

        Self {
            client: ollama::Client::from_env(),
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
        }
    }
}

#[async_trait]
impl Synthesizer for OllamaSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, ResearchError> {
        info!(
            model = %self.model,
            sources = request.sources.len(),
            "Synthesizing research"
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYNTHESIS_PREAMBLE)
            .temperature(self.temperature)
            .build();

        agent
            .prompt(request.to_prompt().as_str())
            .await
            .map_err(|e| ResearchError::Upstream(format!("generation backend failed: {e}")))
    }
}

// =============================================================================
// OUTPUT PARSING
// =============================================================================
/// Turn a model reply into an artifact.
///
/// Fails only when no summary can be recovered, so every artifact that
/// leaves a strategy has non-empty summary text.
pub fn parse_model_output(reply: &str) -> Result<ResearchArtifact, ResearchError> {
    let artifact = match extract_json_object(reply) {
        Some(value) => ResearchArtifact::from_value_lenient(&value),
        None => ResearchArtifact {
            summary: reply.trim().to_string(),
            ..Default::default()
        },
    };

    if artifact.summary.trim().is_empty() {
        return Err(ResearchError::Upstream(
            "generation backend returned no summary".into(),
        ));
    }
    Ok(artifact)
}

fn extract_json_object(reply: &str) -> Option<serde_json::Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&reply[start..=end])
        .ok()
        .filter(serde_json::Value::is_object)
}
