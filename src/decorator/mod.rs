//! # Decorators
//!
//! A decorator turns a name into a bounded, confidence-filtered,
//! duplicate-free list of proposals for one subject (variant, translation
//! or cluster). All three share one pipeline:
//!
//! ```text
//! propose_raw ─► normalize ─► clamp ─► min-confidence ─► persisted-dedupe
//!             ─► candidate-dedupe ─► take(max_candidates)
//! ```
//!
//! A subject only supplies the capability methods of [`Decorator`]; the
//! fixed steps live in [`refine`]. Order is preserved end to end: the
//! first generated candidate wins every tie, nothing is sorted by
//! confidence.

pub mod variant;
pub mod translation;
pub mod cluster;
pub mod broker;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::config::{DecoratorConfig, LexiconConfig};
use crate::model::{Candidate, NameContext, PersistedRelations};
use crate::Result;

pub use variant::VariantDecorator;
pub use translation::TranslationDecorator;
pub use cluster::ClusterDecorator;
pub use broker::{DecoratorBroker, ExternalSources};

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorKind {
    Variant,
    Translation,
    Cluster,
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecoratorKind::Variant => "variant",
            DecoratorKind::Translation => "translation",
            DecoratorKind::Cluster => "cluster",
        })
    }
}

/// Static identity of a decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorMeta {
    pub id: &'static str,
    pub kind: DecoratorKind,
    /// Lower runs first when a caller orders decorators.
    pub priority: u32,
}

// ============================================================================
// Decorator trait
// ============================================================================

/// Subject-specific capabilities plugged into the shared pipeline.
///
/// Only `propose_raw` may be fallible or slow; the remaining hooks are
/// pure and must not panic on odd data.
#[async_trait]
pub trait Decorator: Send + Sync {
    type Payload: Send + Sync + 'static;

    fn meta(&self) -> &DecoratorMeta;

    fn config(&self) -> &DecoratorConfig;

    /// Generate unfiltered proposals. Must not dedupe or limit.
    async fn propose_raw(
        &self,
        ctx: &NameContext,
        persisted: &PersistedRelations,
    ) -> Result<Vec<Candidate<Self::Payload>>>;

    /// Key that identifies duplicates among candidates.
    fn dedupe_key(&self, payload: &Self::Payload) -> String;

    /// Whether the payload is already a stored relation of the name.
    fn in_persisted(&self, persisted: &PersistedRelations, payload: &Self::Payload) -> bool;

    /// Subject-specific cleanup. Identity by default.
    fn normalize(&self, candidate: Candidate<Self::Payload>) -> Candidate<Self::Payload> {
        candidate
    }

    /// Run the full pipeline. A disabled decorator proposes nothing.
    async fn propose(
        &self,
        ctx: &NameContext,
        persisted: &PersistedRelations,
    ) -> Result<Vec<Candidate<Self::Payload>>> {
        if !self.config().enabled {
            return Ok(Vec::new());
        }
        let raw = self.propose_raw(ctx, persisted).await?;
        let generated = raw.len();
        let refined = refine(self, raw, persisted);
        tracing::debug!(
            decorator = self.meta().id,
            name = %ctx.name,
            generated,
            kept = refined.len(),
            "proposed candidates"
        );
        Ok(refined)
    }
}

/// Steps 2–7 of the pipeline over an already generated list.
///
/// Pure: the same `raw` and `persisted` always give the same output, in
/// the same order.
pub fn refine<D: Decorator + ?Sized>(
    decorator: &D,
    raw: Vec<Candidate<D::Payload>>,
    persisted: &PersistedRelations,
) -> Vec<Candidate<D::Payload>> {
    let config = decorator.config();
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|c| decorator.normalize(c))
        .map(Candidate::clamp_confidence)
        .filter(|c| c.confidence >= config.min_confidence)
        .filter(|c| !decorator.in_persisted(persisted, &c.payload))
        .filter(|c| {
            let key = decorator.dedupe_key(&c.payload);
            let key = if config.dedupe_case_insensitive { key.to_lowercase() } else { key };
            seen.insert(key)
        })
        .take(config.max_candidates)
        .collect()
}

// ============================================================================
// External-source slot
// ============================================================================

/// A remote or expensive proposal source (dictionary API, knowledge base).
///
/// Wired into a decorator's raw generation. A failing or slow source only
/// costs its own candidates: the decorator logs and carries on.
#[async_trait]
pub trait ExternalProposals<P>: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, ctx: &NameContext) -> Result<Vec<Candidate<P>>>;
}

/// An external source together with its time budget.
pub struct ExternalSlot<P> {
    source: Arc<dyn ExternalProposals<P>>,
    timeout: Duration,
}

impl<P> Clone for ExternalSlot<P> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source), timeout: self.timeout }
    }
}

impl<P: Send + 'static> ExternalSlot<P> {
    pub fn new(source: Arc<dyn ExternalProposals<P>>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Slot using the configured lookup budget.
    pub fn from_config(source: Arc<dyn ExternalProposals<P>>, config: &LexiconConfig) -> Self {
        Self::new(source, config.external_timeout())
    }

    /// Look up candidates, degrading to none on error or timeout.
    pub async fn candidates(&self, ctx: &NameContext) -> Vec<Candidate<P>> {
        match tokio::time::timeout(self.timeout, self.source.lookup(ctx)).await {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(err)) => {
                tracing::warn!(source = self.source.name(), name = %ctx.name, error = %err, "external lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    source = self.source.name(),
                    name = %ctx.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "external lookup timed out"
                );
                Vec::new()
            }
        }
    }
}

/// Collect the optional external slot's candidates.
pub(crate) async fn external_candidates<P: Send + 'static>(
    slot: Option<&ExternalSlot<P>>,
    ctx: &NameContext,
) -> Vec<Candidate<P>> {
    match slot {
        Some(slot) => slot.candidates(ctx).await,
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateSource, ClusterProposal};
    use proptest::prelude::*;

    /// Minimal decorator whose raw output is fixed up front.
    struct Fixed {
        meta: DecoratorMeta,
        config: DecoratorConfig,
        raw: Vec<Candidate<ClusterProposal>>,
    }

    impl Fixed {
        fn new(config: DecoratorConfig, raw: Vec<(&str, f64)>) -> Self {
            Self {
                meta: DecoratorMeta { id: "fixed", kind: DecoratorKind::Cluster, priority: 0 },
                config,
                raw: raw
                    .into_iter()
                    .map(|(l, c)| Candidate::new(ClusterProposal { label: l.into() }, c, CandidateSource::Heuristic))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Decorator for Fixed {
        type Payload = ClusterProposal;

        fn meta(&self) -> &DecoratorMeta { &self.meta }
        fn config(&self) -> &DecoratorConfig { &self.config }

        async fn propose_raw(&self, _: &NameContext, _: &PersistedRelations) -> Result<Vec<Candidate<ClusterProposal>>> {
            Ok(self.raw.clone())
        }

        fn dedupe_key(&self, p: &ClusterProposal) -> String {
            p.label.clone()
        }

        fn in_persisted(&self, persisted: &PersistedRelations, p: &ClusterProposal) -> bool {
            persisted.clusters.iter().any(|c| c.label == p.label)
        }
    }

    fn labels(out: &[Candidate<ClusterProposal>]) -> Vec<String> {
        out.iter().map(|c| c.payload.label.clone()).collect()
    }

    #[test]
    fn test_filter_then_bound_keeps_generation_order() {
        let config = DecoratorConfig { max_candidates: 2, min_confidence: 0.4, ..Default::default() };
        let d = Fixed::new(config, vec![("low", 0.1), ("b", 0.5), ("a", 0.9), ("c", 0.8)]);
        let out = refine(&d, d.raw.clone(), &PersistedRelations::default());
        assert_eq!(labels(&out), vec!["b", "a"]);
    }

    #[test]
    fn test_clamps_before_filtering() {
        let config = DecoratorConfig { min_confidence: 0.4, ..Default::default() };
        let d = Fixed::new(config, vec![("over", 3.0), ("under", -1.0)]);
        let out = refine(&d, d.raw.clone(), &PersistedRelations::default());
        assert_eq!(labels(&out), vec!["over"]);
        assert_eq!(out[0].confidence, 1.0);
    }

    #[test]
    fn test_case_flag_controls_dedupe() {
        let raw = vec![("Biblical", 0.5), ("biblical", 0.9)];

        let insensitive = Fixed::new(DecoratorConfig::default(), raw.clone());
        let out = refine(&insensitive, insensitive.raw.clone(), &PersistedRelations::default());
        assert_eq!(labels(&out), vec!["Biblical"]);
        assert_eq!(out[0].confidence, 0.5);

        let sensitive = Fixed::new(
            DecoratorConfig { dedupe_case_insensitive: false, ..Default::default() },
            raw,
        );
        let out = refine(&sensitive, sensitive.raw.clone(), &PersistedRelations::default());
        assert_eq!(labels(&out), vec!["Biblical", "biblical"]);
    }

    #[tokio::test]
    async fn test_disabled_short_circuits() {
        let config = DecoratorConfig { enabled: false, ..Default::default() };
        let d = Fixed::new(config, vec![("a", 0.9)]);
        let ctx = NameContext::new("Maria", "es", Default::default());
        assert!(d.propose(&ctx, &PersistedRelations::default()).await.unwrap().is_empty());
    }

    struct Broken;

    #[async_trait]
    impl ExternalProposals<ClusterProposal> for Broken {
        fn name(&self) -> &str { "broken" }
        async fn lookup(&self, _: &NameContext) -> Result<Vec<Candidate<ClusterProposal>>> {
            Err(crate::Error::StorageError("remote unavailable".into()))
        }
    }

    struct Slow;

    #[async_trait]
    impl ExternalProposals<ClusterProposal> for Slow {
        fn name(&self) -> &str { "slow" }
        async fn lookup(&self, _: &NameContext) -> Result<Vec<Candidate<ClusterProposal>>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![Candidate::manual(ClusterProposal { label: "late".into() })])
        }
    }

    #[tokio::test]
    async fn test_external_slot_degrades() {
        let ctx = NameContext::new("Maria", "es", Default::default());

        let broken = ExternalSlot::new(Arc::new(Broken), Duration::from_millis(50));
        assert!(broken.candidates(&ctx).await.is_empty());

        let slow = ExternalSlot::new(Arc::new(Slow), Duration::from_millis(20));
        assert!(slow.candidates(&ctx).await.is_empty());
    }

    fn raw_strategy() -> impl Strategy<Value = Vec<(String, f64)>> {
        proptest::collection::vec(("[a-cA-C]{1,2}", -2.0f64..3.0), 0..40)
    }

    proptest! {
        #[test]
        fn prop_output_confidence_in_unit_interval(raw in raw_strategy(), max in 0usize..10) {
            let config = DecoratorConfig { max_candidates: max, min_confidence: 0.0, ..Default::default() };
            let d = Fixed::new(config, raw.iter().map(|(l, c)| (l.as_str(), *c)).collect());
            let out = refine(&d, d.raw.clone(), &PersistedRelations::default());
            prop_assert!(out.len() <= max);
            for c in &out {
                prop_assert!((0.0..=1.0).contains(&c.confidence));
            }
        }

        #[test]
        fn prop_refine_is_deterministic(raw in raw_strategy()) {
            let d = Fixed::new(DecoratorConfig::default(), raw.iter().map(|(l, c)| (l.as_str(), *c)).collect());
            let first = refine(&d, d.raw.clone(), &PersistedRelations::default());
            let second = refine(&d, d.raw.clone(), &PersistedRelations::default());
            prop_assert_eq!(first, second);
        }
    }
}
