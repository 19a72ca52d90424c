//! Stub strategies shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_research_server::arxiv::{ArxivError, ArxivPaper, PaperSearch};
use ai_research_server::synthesis::{SynthesisRequest, Synthesizer};
use ai_research_server::tools::{SearchError, SearchResult, WebSearch};
use ai_research_server::{
    AcademicStrategyFactory, Orchestrator, ProgressEmitter, ProgressEvent, ResearchArtifact, ResearchError,
    ResearchStrategy, Stage, StrategyFactory, StrategyTable, StreamEvent,
    WebStrategyFactory,
};
use async_trait::async_trait;

/// What a stub strategy does when run.
#[derive(Clone)]
pub enum Behavior {
    Succeed(&'static str),
    Fail(&'static str),
    Panic,
}

/// Counts how often it was built and run; emits `progress_events` stages.
pub struct StubFactory {
    name: &'static str,
    behavior: Behavior,
    progress_events: Vec<Stage>,
    pub runs: AtomicUsize,
}

impl StubFactory {
    pub fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            progress_events: Vec::new(),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn with_progress(name: &'static str, behavior: Behavior, stages: Vec<Stage>) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            progress_events: stages,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

struct StubStrategy {
    factory: Arc<StubFactory>,
    progress: ProgressEmitter,
}

#[async_trait]
impl ResearchStrategy for StubStrategy {
    async fn research(&self, _query: &str) -> Result<ResearchArtifact, ResearchError> {
        self.factory.runs.fetch_add(1, Ordering::SeqCst);
        for stage in &self.factory.progress_events {
            self.progress.emit(ProgressEvent::new(*stage, format!("{stage:?}")));
        }
        match &self.factory.behavior {
            Behavior::Succeed(summary) => Ok(ResearchArtifact {
                summary: summary.to_string(),
                ..Default::default()
            }),
            Behavior::Fail(message) => Err(ResearchError::Upstream(message.to_string())),
            Behavior::Panic => panic!("strategy exploded"),
        }
    }
}

/// `Arc<StubFactory>` is the factory handed to the table, so the test keeps
/// a handle for inspecting run counts.
pub struct SharedStub(pub Arc<StubFactory>);

impl StrategyFactory for SharedStub {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn build(&self, progress: ProgressEmitter) -> Box<dyn ResearchStrategy> {
        Box::new(StubStrategy {
            factory: Arc::clone(&self.0),
            progress,
        })
    }
}

pub fn orchestrator(web: &Arc<StubFactory>, academic: &Arc<StubFactory>) -> Arc<Orchestrator> {
    let table = StrategyTable::new(
        Arc::new(SharedStub(Arc::clone(web))),
        Arc::new(SharedStub(Arc::clone(academic))),
    );
    Arc::new(Orchestrator::new(table))
}

/// Positions of every `research` and `error` event.
pub fn terminal_indices(events: &[StreamEvent]) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// CANNED COLLABORATORS FOR THE REAL STRATEGIES
// =============================================================================
pub struct CannedWeb(pub Vec<SearchResult>);

#[async_trait]
impl WebSearch for CannedWeb {
    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, SearchError> {
        Ok(self.0.clone())
    }
}

pub struct CannedPapers(pub Vec<ArxivPaper>);

#[async_trait]
impl PaperSearch for CannedPapers {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<ArxivPaper>, ArxivError> {
        Ok(self.0.iter().take(max_results).cloned().collect())
    }
}

/// Replies with a fixed model output and counts calls.
pub struct CannedSynthesizer {
    reply: &'static str,
    pub calls: AtomicUsize,
}

impl CannedSynthesizer {
    pub fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Synthesizer for CannedSynthesizer {
    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, ResearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

pub fn paper(id: &str, title: &str) -> ArxivPaper {
    ArxivPaper {
        arxiv_id: id.to_string(),
        title: title.to_string(),
        authors: vec!["Leslie Lamport".to_string()],
        summary: format!("{title} abstract."),
        categories: vec!["cs.DC".to_string()],
        published: "2001-11-01T00:00:00Z".to_string(),
        abs_url: format!("http://arxiv.org/abs/{id}"),
        pdf_url: format!("http://arxiv.org/pdf/{id}"),
    }
}

/// An orchestrator over the production strategies with canned backends.
pub fn real_orchestrator(
    results: Vec<SearchResult>,
    papers: Vec<ArxivPaper>,
    synthesizer: Arc<CannedSynthesizer>,
) -> Arc<Orchestrator> {
    let table = StrategyTable::new(
        Arc::new(WebStrategyFactory::new(
            Arc::new(CannedWeb(results)),
            synthesizer.clone(),
        )),
        Arc::new(AcademicStrategyFactory::new(
            Arc::new(CannedPapers(papers)),
            synthesizer,
            5,
        )),
    );
    Arc::new(Orchestrator::new(table))
}
