//! # AI Research Server
//!
//! A streaming research pipeline. A query and a mode select a research
//! strategy (general web or academic papers); the strategy's progress and
//! its final artifact are streamed to the caller as newline-delimited JSON.
//! Saved artifacts pass through a sanitizer before they reach storage.
//!
//! ```text
//! request -> Orchestrator -> StrategyTable -> Web | Academic strategy
//!                 |                                  |
//!                 +------ ProgressChannel <----------+ (ProgressEmitter)
//!                               |
//!                        NDJSON response body
//! ```

pub mod arxiv;
pub mod artifact;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod server;
pub mod store;
pub mod strategy;
pub mod synthesis;
pub mod tools;

pub use artifact::{sanitize, ResearchArtifact, ResearchQuery, SaveResearch, SanitizedResearchRecord};
pub use config::Config;
pub use error::ResearchError;
pub use orchestrator::Orchestrator;
pub use progress::{EventReceiver, ProgressChannel, ProgressEmitter, ProgressEvent, Stage, StreamEvent};
pub use server::{router, AppState};
pub use store::{InMemoryResearchStore, ResearchStore, StoredResearch};
pub use strategy::{
    AcademicStrategyFactory, ResearchMode, ResearchStrategy, StrategyFactory, StrategyTable,
    WebStrategyFactory,
};
pub use synthesis::{OllamaSynthesizer, Synthesizer};
