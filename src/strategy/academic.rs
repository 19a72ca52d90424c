//! Academic research over arXiv.
//!
//! Reports progress while it works: `downloading` once the paper list
//! arrives, one `processing` event per paper, and `analyzing` before the
//! synthesis call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{require_query, ResearchMode, ResearchStrategy, StrategyFactory};
use crate::arxiv::{ArxivPaper, PaperSearch};
use crate::artifact::ResearchArtifact;
use crate::error::ResearchError;
use crate::progress::{ProgressEmitter, ProgressEvent, Stage};
use crate::synthesis::{parse_model_output, SourceDigest, SynthesisRequest, Synthesizer};

/// Abstracts longer than this are cut before they reach the model.
const MAX_EXCERPT_CHARS: usize = 1200;

pub struct AcademicStrategy {
    papers: Arc<dyn PaperSearch>,
    synthesizer: Arc<dyn Synthesizer>,
    progress: ProgressEmitter,
    max_papers: usize,
}

impl AcademicStrategy {
    pub fn new(
        papers: Arc<dyn PaperSearch>,
        synthesizer: Arc<dyn Synthesizer>,
        progress: ProgressEmitter,
        max_papers: usize,
    ) -> Self {
        Self {
            papers,
            synthesizer,
            progress,
            max_papers,
        }
    }
}

#[async_trait]
impl ResearchStrategy for AcademicStrategy {
    async fn research(&self, query: &str) -> Result<ResearchArtifact, ResearchError> {
        let query = require_query(query)?;
        info!(query = %query, max_papers = self.max_papers, "Starting academic research");

        let papers = self.papers.search(query, self.max_papers).await?;
        let total = papers.len() as u32;
        self.progress.emit(
            ProgressEvent::new(
                Stage::Downloading,
                format!("Downloaded metadata for {total} papers"),
            )
            .with_progress(total, total),
        );

        let mut sources = Vec::with_capacity(papers.len());
        for (i, paper) in papers.iter().enumerate() {
            self.progress.emit(
                ProgressEvent::new(Stage::Processing, format!("Processing \"{}\"", paper.title))
                    .with_progress(i as u32 + 1, total),
            );
            sources.push(digest(paper));
        }

        if self.progress.is_closed() {
            warn!(query = %query, "Caller disconnected, skipping synthesis");
            return Err(ResearchError::Upstream(
                "research stopped: caller disconnected".into(),
            ));
        }

        self.progress.emit(ProgressEvent::new(
            Stage::Analyzing,
            format!("Analyzing {total} papers"),
        ));
        let request = SynthesisRequest {
            query: query.to_string(),
            mode: ResearchMode::Academic,
            sources,
        };
        let reply = self.synthesizer.synthesize(&request).await?;
        let mut artifact = parse_model_output(&reply)?;

        if artifact.findings.is_empty() {
            artifact.findings = papers.iter().map(finding).collect();
        }
        artifact.metadata.insert("mode".into(), json!("academic"));
        artifact.metadata.insert("sourceCount".into(), json!(papers.len()));
        artifact.metadata.insert(
            "papers".into(),
            Value::Array(papers.iter().map(|p| json!(p.arxiv_id)).collect()),
        );

        info!(query = %query, papers = papers.len(), "Academic research completed");
        Ok(artifact)
    }
}

fn digest(paper: &ArxivPaper) -> SourceDigest {
    let mut excerpt: String = paper.summary.chars().take(MAX_EXCERPT_CHARS).collect();
    if paper.summary.chars().count() > MAX_EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    SourceDigest {
        title: paper.title.clone(),
        url: paper.abs_url.clone(),
        excerpt,
    }
}

fn finding(paper: &ArxivPaper) -> Value {
    json!({
        "title": paper.title,
        "url": paper.abs_url,
        "pdfUrl": paper.pdf_url,
        "authors": paper.authors,
        "published": paper.published,
        "snippet": paper.summary,
        "source": "arxiv",
    })
}

/// Builds one [`AcademicStrategy`] per request, wired to that request's emitter.
pub struct AcademicStrategyFactory {
    papers: Arc<dyn PaperSearch>,
    synthesizer: Arc<dyn Synthesizer>,
    max_papers: usize,
}

impl AcademicStrategyFactory {
    pub fn new(
        papers: Arc<dyn PaperSearch>,
        synthesizer: Arc<dyn Synthesizer>,
        max_papers: usize,
    ) -> Self {
        Self {
            papers,
            synthesizer,
            max_papers,
        }
    }
}

impl StrategyFactory for AcademicStrategyFactory {
    fn name(&self) -> &'static str {
        "academic"
    }

    fn build(&self, progress: ProgressEmitter) -> Box<dyn ResearchStrategy> {
        Box::new(AcademicStrategy::new(
            Arc::clone(&self.papers),
            Arc::clone(&self.synthesizer),
            progress,
            self.max_papers,
        ))
    }
}
