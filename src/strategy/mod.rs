//! # Strategy Module
//!
//! A research strategy turns a query into a [`ResearchArtifact`]. Two variants
//! exist today, selected by [`ResearchMode`]:
//!
//! - [`web::WebStrategy`]: general web search plus synthesis
//! - [`academic::AcademicStrategy`]: arXiv papers plus synthesis, reporting
//!   finer-grained progress as it goes
//!
//! Strategies are built per request by a [`StrategyFactory`], which receives
//! the request's [`ProgressEmitter`]. The emitter therefore never outlives
//! the request that owns it.

pub mod academic;
pub mod web;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::artifact::ResearchArtifact;
use crate::error::ResearchError;
use crate::progress::ProgressEmitter;

pub use academic::{AcademicStrategy, AcademicStrategyFactory};
pub use web::{WebStrategy, WebStrategyFactory};

// =============================================================================
// RESEARCH MODE
// =============================================================================
/// Which family of sources a request should be answered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    #[default]
    Web,
    Academic,
}

impl ResearchMode {
    /// Parse a request's mode. Anything other than `academic` means web.
    pub fn from_str_loose(mode: Option<&str>) -> Self {
        match mode.map(|m| m.trim().to_ascii_lowercase()) {
            Some(m) if m == "academic" => ResearchMode::Academic,
            _ => ResearchMode::Web,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchMode::Web => "web",
            ResearchMode::Academic => "academic",
        }
    }

    /// Human-readable source class, used in the initial `searching` event.
    pub fn source_label(&self) -> &'static str {
        match self {
            ResearchMode::Web => "the web",
            ResearchMode::Academic => "academic papers",
        }
    }
}

// =============================================================================
// STRATEGY CONTRACT
// =============================================================================
/// The research capability every strategy provides.
///
/// Implementations return a complete artifact or an error. A returned
/// artifact always has a non-empty summary.
#[async_trait]
pub trait ResearchStrategy: Send + Sync {
    async fn research(&self, query: &str) -> Result<ResearchArtifact, ResearchError>;
}

/// Builds one strategy instance per request.
pub trait StrategyFactory: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Build a strategy for one request. Strategies that do not report
    /// progress may ignore `progress`.
    fn build(&self, progress: ProgressEmitter) -> Box<dyn ResearchStrategy>;
}

// =============================================================================
// STRATEGY TABLE
// =============================================================================
/// Maps every [`ResearchMode`] to its strategy factory.
///
/// The match in [`resolve`](StrategyTable::resolve) is exhaustive, so adding
/// a mode fails to compile until it has a strategy.
#[derive(Clone)]
pub struct StrategyTable {
    web: Arc<dyn StrategyFactory>,
    academic: Arc<dyn StrategyFactory>,
}

impl StrategyTable {
    pub fn new(web: Arc<dyn StrategyFactory>, academic: Arc<dyn StrategyFactory>) -> Self {
        Self { web, academic }
    }

    pub fn resolve(&self, mode: ResearchMode) -> &dyn StrategyFactory {
        match mode {
            ResearchMode::Web => self.web.as_ref(),
            ResearchMode::Academic => self.academic.as_ref(),
        }
    }
}

/// Reject empty or whitespace-only queries. Shared by both variants.
pub(crate) fn require_query(query: &str) -> Result<&str, ResearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(ResearchError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}
