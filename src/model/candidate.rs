//! Transient, scored proposals produced by the decorators.
//!
//! A `Candidate` is never persisted directly: the pipeline creates it,
//! cleans it, and hands it back. The caller decides whether to commit it
//! through the graph services or the atomic insert.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a proposal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Manual,
    Heuristic,
    External,
}

/// A scored proposal carrying a subject-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<T> {
    #[serde(flatten)]
    pub payload: T,
    /// Expected in `[0, 1]`; the pipeline clamps anything else.
    pub confidence: f64,
    pub source: CandidateSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl<T> Candidate<T> {
    pub fn new(payload: T, confidence: f64, source: CandidateSource) -> Self {
        Self { payload, confidence, source, rationale: None, meta: None }
    }

    pub fn manual(payload: T) -> Self {
        Self::new(payload, MANUAL_CONFIDENCE, CandidateSource::Manual)
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.get_or_insert_with(Map::new).insert(key.into(), value.into());
        self
    }

    /// Force confidence into `[0, 1]`. NaN becomes 0.
    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }
}

/// Confidence given to hints supplied by the caller.
pub const MANUAL_CONFIDENCE: f64 = 0.5;

/// Confidence given to relations already confirmed in the store.
pub const PERSISTED_CONFIDENCE: f64 = 0.9;

/// Confidence given to clusters inherited from confirmed neighbours.
pub const INHERITED_CONFIDENCE: f64 = 0.7;

/// A proposed variant spelling. `locale` is absent for manual hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantProposal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// A proposed translation into `locale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationProposal {
    pub name: String,
    pub locale: String,
}

/// A proposed cluster, by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProposal {
    pub label: String,
}

pub type VariantCandidate = Candidate<VariantProposal>;
pub type TranslationCandidate = Candidate<TranslationProposal>;
pub type ClusterCandidate = Candidate<ClusterProposal>;
