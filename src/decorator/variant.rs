//! Variant spellings of the decorated name.

use async_trait::async_trait;

use crate::config::DecoratorConfig;
use crate::model::*;
use crate::text::{clean_locale, eq_fold, strip_accents};
use crate::Result;
use super::{external_candidates, Decorator, DecoratorKind, DecoratorMeta, ExternalSlot};

/// Confidence of the accent-stripped self-variant.
const ACCENT_STRIPPED_CONFIDENCE: f64 = 0.6;

pub struct VariantDecorator {
    meta: DecoratorMeta,
    config: DecoratorConfig,
    external: Option<ExternalSlot<VariantProposal>>,
}

impl Default for VariantDecorator {
    fn default() -> Self {
        Self::new(DecoratorConfig::for_kind(DecoratorKind::Variant))
    }
}

impl VariantDecorator {
    pub fn new(config: DecoratorConfig) -> Self {
        Self {
            meta: DecoratorMeta { id: "variant-decorator", kind: DecoratorKind::Variant, priority: 10 },
            config,
            external: None,
        }
    }

    pub fn with_external(mut self, slot: ExternalSlot<VariantProposal>) -> Self {
        self.external = Some(slot);
        self
    }
}

#[async_trait]
impl Decorator for VariantDecorator {
    type Payload = VariantProposal;

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
    ) -> Result<Vec<VariantCandidate>> {
        let mut raw: Vec<VariantCandidate> = ctx
            .hints
            .variants
            .iter()
            .map(|hint| {
                Candidate::manual(VariantProposal { name: hint.clone(), locale: None })
                    .with_rationale("Manually provided variant")
            })
            .collect();

        let stripped = strip_accents(&ctx.name);
        if stripped != ctx.name {
            raw.push(
                Candidate::new(
                    VariantProposal { name: stripped, locale: Some(ctx.locale.clone()) },
                    ACCENT_STRIPPED_CONFIDENCE,
                    CandidateSource::Heuristic,
                )
                .with_rationale("Spelling without diacritics"),
            );
        }

        raw.extend(external_candidates(self.external.as_ref(), ctx).await);
        Ok(raw)
    }

    fn dedupe_key(&self, p: &VariantProposal) -> String {
        format!("{}|{}", p.name.to_lowercase(), p.locale.as_deref().unwrap_or(""))
    }

    fn in_persisted(&self, persisted: &PersistedRelations, p: &VariantProposal) -> bool {
        persisted.variants.iter().any(|v| {
            eq_fold(&v.name, &p.name)
                && match (&v.locale, &p.locale) {
                    (Some(a), Some(b)) => eq_fold(a, b),
                    _ => true,
                }
        })
    }

    fn normalize(&self, mut c: VariantCandidate) -> VariantCandidate {
        c.payload.name = c.payload.name.trim().to_string();
        c.payload.locale = c
            .payload
            .locale
            .take()
            .map(|l| clean_locale(&l))
            .filter(|l| !l.is_empty());
        c
    }
}
