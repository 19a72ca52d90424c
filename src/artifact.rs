//! # Research Artifact Module
//!
//! The data that flows through the pipeline:
//! - [`ResearchQuery`]: the immutable input of one request
//! - [`ResearchArtifact`]: what a strategy produces
//! - [`SanitizedResearchRecord`]: the storage-ready projection
//!
//! It also holds the sanitizer that guards the persistence boundary. A save
//! request carries the artifact back from the caller, so nothing about its
//! shape can be trusted. Optional fields are coerced to empty values instead
//! of being rejected; only a missing `query` or `research` is a hard failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ResearchError;
use crate::strategy::ResearchMode;

// =============================================================================
// RESEARCH QUERY
// =============================================================================
/// One incoming research request. Created per request, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchQuery {
    pub text: String,
    pub mode: ResearchMode,
}

impl ResearchQuery {
    /// Build a query from raw request values. Unknown or absent modes fall back to web.
    pub fn new(text: impl Into<String>, mode: Option<&str>) -> Self {
        Self {
            text: text.into(),
            mode: ResearchMode::from_str_loose(mode),
        }
    }
}

// =============================================================================
// RESEARCH ARTIFACT
// =============================================================================
/// The structured result of one successful strategy run.
///
/// Findings, statistics and code examples are unstructured records, so they
/// stay as JSON values. The wire names are camelCase (`keyInsights`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchArtifact {
    pub summary: String,
    pub findings: Vec<Value>,
    pub key_insights: Vec<String>,
    pub statistics: Vec<Value>,
    pub code_examples: Vec<Value>,
    pub suggested_questions: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl ResearchArtifact {
    /// Build an artifact from loosely shaped JSON, such as model output.
    ///
    /// Uses the same coercion rules as [`sanitize`]: wrong shapes become empty
    /// values. Non-string entries in the string lists are dropped.
    pub fn from_value_lenient(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        let strings = |camel: &str, snake: &str| -> Vec<String> {
            coerce_sequence(field(obj, camel, snake))
                .0
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        };

        Self {
            summary: coerce_text(obj.get("summary")).0,
            findings: coerce_sequence(obj.get("findings")).0,
            key_insights: strings("keyInsights", "key_insights"),
            statistics: coerce_sequence(obj.get("statistics")).0,
            code_examples: coerce_sequence(field(obj, "codeExamples", "code_examples")).0,
            suggested_questions: strings("suggestedQuestions", "suggested_questions"),
            metadata: coerce_mapping(obj.get("metadata")).0,
        }
    }
}

// =============================================================================
// SANITIZED RECORD
// =============================================================================
/// Storage-ready projection of a [`ResearchArtifact`].
///
/// Every field is always present with the right shape. Field names follow the
/// persistence schema (snake_case).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitizedResearchRecord {
    pub summary: String,
    pub findings: Vec<Value>,
    pub key_insights: Vec<Value>,
    pub statistics: Vec<Value>,
    pub code_examples: Vec<Value>,
    pub suggested_questions: Vec<Value>,
    pub metadata: Map<String, Value>,
}

/// A validated save request, ready for the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveResearch {
    pub query: String,
    pub record: SanitizedResearchRecord,
}

/// Validate and sanitize a client-supplied `{ query, research }` payload.
///
/// `query` must be a non-empty string and `research` a non-empty object,
/// otherwise [`ResearchError::InvalidPayload`] is returned. Every other shape
/// problem is coerced away. Both camelCase and snake_case field names are
/// accepted, which makes sanitizing an already-sanitized record a no-op.
pub fn sanitize(payload: &Value) -> Result<SaveResearch, ResearchError> {
    let query = payload
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ResearchError::InvalidPayload("query is required".into()))?;

    let research = payload
        .get("research")
        .and_then(Value::as_object)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ResearchError::InvalidPayload("research is required".into()))?;

    let mut coerced = Vec::new();
    let mut track = |name: &'static str, was_coerced: bool| {
        if was_coerced {
            coerced.push(name);
        }
    };

    let (summary, c) = coerce_text(research.get("summary"));
    track("summary", c);
    let (findings, c) = coerce_sequence(research.get("findings"));
    track("findings", c);
    let (key_insights, c) = coerce_sequence(field(research, "keyInsights", "key_insights"));
    track("key_insights", c);
    let (statistics, c) = coerce_sequence(research.get("statistics"));
    track("statistics", c);
    let (code_examples, c) = coerce_sequence(field(research, "codeExamples", "code_examples"));
    track("code_examples", c);
    let (suggested_questions, c) =
        coerce_sequence(field(research, "suggestedQuestions", "suggested_questions"));
    track("suggested_questions", c);
    let (metadata, c) = coerce_mapping(research.get("metadata"));
    track("metadata", c);

    if !coerced.is_empty() {
        warn!(fields = ?coerced, "Coerced malformed research fields to empty values");
    }

    Ok(SaveResearch {
        query: query.to_string(),
        record: SanitizedResearchRecord {
            summary,
            findings,
            key_insights,
            statistics,
            code_examples,
            suggested_questions,
            metadata,
        },
    })
}

// =============================================================================
// COERCION HELPERS
// =============================================================================
// Each helper returns the coerced value and whether a present value had the
// wrong shape. Absent and null values are defaults, not coercions.

fn field<'a>(obj: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(snake))
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn coerce_text(value: Option<&Value>) -> (String, bool) {
    match value {
        Some(Value::String(s)) => (s.clone(), false),
        other => (String::new(), is_present(other)),
    }
}

fn coerce_sequence(value: Option<&Value>) -> (Vec<Value>, bool) {
    match value {
        Some(Value::Array(items)) => (items.clone(), false),
        other => (Vec::new(), is_present(other)),
    }
}

fn coerce_mapping(value: Option<&Value>) -> (Map<String, Value>, bool) {
    match value {
        Some(Value::Object(map)) => (map.clone(), false),
        other => (Map::new(), is_present(other)),
    }
}
