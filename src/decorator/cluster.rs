//! Semantic clusters the decorated name may belong to.

use async_trait::async_trait;

use crate::config::DecoratorConfig;
use crate::model::*;
use crate::text::{clean_locale, eq_fold, strip_accents};
use crate::Result;
use super::{external_candidates, Decorator, DecoratorKind, DecoratorMeta, ExternalSlot};

const BIBLICAL_NAMES: &[&str] = &["maria", "jose", "jesus", "john"];
const BIBLICAL_CONFIDENCE: f64 = 0.7;

const SLAVIC_SUFFIXES: &[&str] = &["ov", "ova"];
const SLAVIC_CONFIDENCE: f64 = 0.6;

/// Locale → cultural cluster label.
const LOCALE_CLUSTERS: &[(&str, &str)] = &[("es", "spanish"), ("fr", "french")];
const LOCALE_CONFIDENCE: f64 = 0.6;

pub struct ClusterDecorator {
    meta: DecoratorMeta,
    config: DecoratorConfig,
    external: Option<ExternalSlot<ClusterProposal>>,
}

impl Default for ClusterDecorator {
    fn default() -> Self {
        Self::new(DecoratorConfig::for_kind(DecoratorKind::Cluster))
    }
}

impl ClusterDecorator {
    pub fn new(config: DecoratorConfig) -> Self {
        Self {
            meta: DecoratorMeta { id: "cluster-decorator", kind: DecoratorKind::Cluster, priority: 30 },
            config,
            external: None,
        }
    }

    pub fn with_external(mut self, slot: ExternalSlot<ClusterProposal>) -> Self {
        self.external = Some(slot);
        self
    }
}

fn heuristic(label: &str, confidence: f64, rationale: &str) -> ClusterCandidate {
    Candidate::new(ClusterProposal { label: label.to_string() }, confidence, CandidateSource::Heuristic)
        .with_rationale(rationale)
}

#[async_trait]
impl Decorator for ClusterDecorator {
    type Payload = ClusterProposal;

    fn meta(&self) -> &DecoratorMeta {
        &self.meta
    }

    fn config(&self) -> &DecoratorConfig {
        &self.config
    }

    async fn propose_raw(
        &self,
        ctx: &NameContext,
        _persisted: &PersistedRelations,
    ) -> Result<Vec<ClusterCandidate>> {
        let mut raw: Vec<ClusterCandidate> = ctx
            .hints
            .clusters
            .iter()
            .map(|label| {
                Candidate::manual(ClusterProposal { label: label.clone() })
                    .with_rationale("Manually provided cluster")
            })
            .collect();

        let folded = strip_accents(ctx.name.trim()).to_lowercase();
        if BIBLICAL_NAMES.contains(&folded.as_str()) {
            raw.push(heuristic("biblical", BIBLICAL_CONFIDENCE, "Name of biblical origin"));
        }
        if SLAVIC_SUFFIXES.iter().any(|suffix| folded.ends_with(suffix)) {
            raw.push(heuristic("slavic", SLAVIC_CONFIDENCE, "Slavic surname-style suffix"));
        }

        let locale = clean_locale(&ctx.locale);
        if let Some((_, label)) = LOCALE_CLUSTERS.iter().find(|(l, _)| *l == locale) {
            raw.push(heuristic(label, LOCALE_CONFIDENCE, "Common in this locale"));
        }

        raw.extend(external_candidates(self.external.as_ref(), ctx).await);
        Ok(raw)
    }

    fn dedupe_key(&self, p: &ClusterProposal) -> String {
        p.label.to_lowercase()
    }

    fn in_persisted(&self, persisted: &PersistedRelations, p: &ClusterProposal) -> bool {
        persisted.clusters.iter().any(|c| eq_fold(&c.label, &p.label))
    }

    fn normalize(&self, mut c: ClusterCandidate) -> ClusterCandidate {
        c.payload.label = c.payload.label.trim().to_string();
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(out: &[ClusterCandidate]) -> Vec<(&str, f64)> {
        out.iter().map(|c| (c.payload.label.as_str(), c.confidence)).collect()
    }

    #[tokio::test]
    async fn test_biblical_and_locale_heuristics() {
        let d = ClusterDecorator::default();
        let ctx = NameContext::new("José", "ES", Gender::Male);
        let out = d.propose(&ctx, &PersistedRelations::default()).await.unwrap();
        assert_eq!(labels(&out), vec![("biblical", 0.7), ("spanish", 0.6)]);
    }

    #[tokio::test]
    async fn test_slavic_suffix() {
        let d = ClusterDecorator::default();
        let ctx = NameContext::new("Ivanova", "ru", Gender::Female);
        let out = d.propose(&ctx, &PersistedRelations::default()).await.unwrap();
        assert_eq!(labels(&out), vec![("slavic", 0.6)]);
    }

    #[tokio::test]
    async fn test_manual_label_dedupes_heuristic_case_insensitively() {
        let d = ClusterDecorator::default();
        let persisted = PersistedRelations {
            clusters: vec![PersistedCluster { id: Some(ClusterId(1)), label: "French".into() }],
            ..Default::default()
        };
        let ctx = NameContext::new("John", "fr", Gender::Male).with_cluster_hint(" Biblical ");
        let out = d.propose(&ctx, &persisted).await.unwrap();
        assert_eq!(labels(&out), vec![("Biblical", 0.5)]);
        assert_eq!(out[0].source, CandidateSource::Manual);
    }

    #[tokio::test]
    async fn test_respects_max_candidates() {
        let d = ClusterDecorator::new(DecoratorConfig {
            max_candidates: 1,
            ..DecoratorConfig::for_kind(DecoratorKind::Cluster)
        });
        let ctx = NameContext::new("Maria", "es", Gender::Female);
        let out = d.propose(&ctx, &PersistedRelations::default()).await.unwrap();
        assert_eq!(labels(&out), vec![("biblical", 0.7)]);
    }
}
