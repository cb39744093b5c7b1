//! Decoration inputs: the name being decorated and the stored facts about it.

use serde::{Deserialize, Serialize};
use super::{ClusterCandidate, ClusterId, Gender, NameId, TranslationCandidate, VariantCandidate};

/// A translation hint supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationHint {
    pub name: String,
    pub locale: String,
}

impl TranslationHint {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self { name: name.into(), locale: locale.into() }
    }
}

/// Caller-supplied hints, one list per subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualHints {
    pub variants: Vec<String>,
    pub translations: Vec<TranslationHint>,
    pub clusters: Vec<String>,
}

/// The name being decorated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NameId>,
    pub name: String,
    pub locale: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub hints: ManualHints,
}

impl NameContext {
    pub fn new(name: impl Into<String>, locale: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: None,
            name: name.into(),
            locale: locale.into(),
            gender,
            hints: ManualHints::default(),
        }
    }

    pub fn with_variant_hint(mut self, name: impl Into<String>) -> Self {
        self.hints.variants.push(name.into());
        self
    }

    pub fn with_translation_hint(mut self, name: impl Into<String>, locale: impl Into<String>) -> Self {
        self.hints.translations.push(TranslationHint::new(name, locale));
        self
    }

    pub fn with_cluster_hint(mut self, label: impl Into<String>) -> Self {
        self.hints.clusters.push(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedVariant {
    pub id: Option<NameId>,
    pub name: String,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTranslation {
    pub id: Option<NameId>,
    pub name: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCluster {
    pub id: Option<ClusterId>,
    pub label: String,
}

/// Read snapshot of one name's stored relations.
///
/// Fetched fresh for every decoration call and never mutated while the
/// decorators run; it is the oracle for persisted-dedupe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedRelations {
    pub variants: Vec<PersistedVariant>,
    pub translations: Vec<PersistedTranslation>,
    pub clusters: Vec<PersistedCluster>,
}

impl PersistedRelations {
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty() && self.translations.is_empty() && self.clusters.is_empty()
    }
}

/// Merged output of all decorators for one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedResult {
    pub name: String,
    pub locale: String,
    pub gender: Gender,
    pub variants: Vec<VariantCandidate>,
    pub translations: Vec<TranslationCandidate>,
    pub clusters: Vec<ClusterCandidate>,
}
