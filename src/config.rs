//! Decorator configuration.
//!
//! The core consumes configuration, it does not load it: callers build a
//! `LexiconConfig` in code or hand over a JSON document. JSON is a partial
//! overlay, so `{"translation": {"maxCandidates": 5}}` keeps every other
//! translation default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decorator::DecoratorKind;
use crate::{Error, Result};

/// Per-decorator knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorConfig {
    /// When false the decorator proposes nothing.
    pub enabled: bool,
    /// Hard cap applied after filtering and dedupe.
    pub max_candidates: usize,
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    /// Lowercase dedupe keys before comparing.
    pub dedupe_case_insensitive: bool,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_candidates: 50,
            min_confidence: 0.35,
            dedupe_case_insensitive: true,
        }
    }
}

impl DecoratorConfig {
    /// Defaults tuned per subject.
    pub fn for_kind(kind: DecoratorKind) -> Self {
        let base = Self::default();
        match kind {
            DecoratorKind::Variant => Self { max_candidates: 50, min_confidence: 0.4, ..base },
            DecoratorKind::Translation => Self { max_candidates: 30, min_confidence: 0.4, ..base },
            DecoratorKind::Cluster => Self { max_candidates: 20, min_confidence: 0.4, ..base },
        }
    }

    fn validate(&self, kind: DecoratorKind) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Config(format!(
                "{kind} decorator: minConfidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Partial `DecoratorConfig`, layered over the subject defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DecoratorOverrides {
    enabled: Option<bool>,
    max_candidates: Option<usize>,
    min_confidence: Option<f64>,
    dedupe_case_insensitive: Option<bool>,
}

impl DecoratorOverrides {
    fn apply(self, base: DecoratorConfig) -> DecoratorConfig {
        DecoratorConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            max_candidates: self.max_candidates.unwrap_or(base.max_candidates),
            min_confidence: self.min_confidence.unwrap_or(base.min_confidence),
            dedupe_case_insensitive: self.dedupe_case_insensitive.unwrap_or(base.dedupe_case_insensitive),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLexiconConfig {
    variant: DecoratorOverrides,
    translation: DecoratorOverrides,
    cluster: DecoratorOverrides,
    external_timeout_ms: Option<u64>,
}

/// Configuration for the whole decoration layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LexiconConfig {
    pub variant: DecoratorConfig,
    pub translation: DecoratorConfig,
    pub cluster: DecoratorConfig,
    /// Budget for a single external-source lookup inside raw generation.
    pub external_timeout_ms: u64,
}

pub const DEFAULT_EXTERNAL_TIMEOUT_MS: u64 = 2_000;

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            variant: DecoratorConfig::for_kind(DecoratorKind::Variant),
            translation: DecoratorConfig::for_kind(DecoratorKind::Translation),
            cluster: DecoratorConfig::for_kind(DecoratorKind::Cluster),
            external_timeout_ms: DEFAULT_EXTERNAL_TIMEOUT_MS,
        }
    }
}

impl LexiconConfig {
    /// Parse a (possibly partial) camelCase JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawLexiconConfig = serde_json::from_str(json)?;
        let defaults = Self::default();
        let config = Self {
            variant: raw.variant.apply(defaults.variant),
            translation: raw.translation.apply(defaults.translation),
            cluster: raw.cluster.apply(defaults.cluster),
            external_timeout_ms: raw.external_timeout_ms.unwrap_or(defaults.external_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.variant.validate(DecoratorKind::Variant)?;
        self.translation.validate(DecoratorKind::Translation)?;
        self.cluster.validate(DecoratorKind::Cluster)?;
        if self.external_timeout_ms == 0 {
            return Err(Error::Config("externalTimeoutMs must be positive".into()));
        }
        Ok(())
    }

    pub fn decorator(&self, kind: DecoratorKind) -> &DecoratorConfig {
        match kind {
            DecoratorKind::Variant => &self.variant,
            DecoratorKind::Translation => &self.translation,
            DecoratorKind::Cluster => &self.cluster,
        }
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }
}
