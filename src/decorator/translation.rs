//! Translations of the decorated name into other locales.

use async_trait::async_trait;

use crate::config::DecoratorConfig;
use crate::model::*;
use crate::text::{clean_locale, eq_fold};
use crate::Result;
use super::{external_candidates, Decorator, DecoratorKind, DecoratorMeta, ExternalSlot};

const DICTIONARY_CONFIDENCE: f64 = 0.7;
const FALLBACK_CONFIDENCE: f64 = 0.4;
const FALLBACK_LOCALE: &str = "en";

/// Lowercase name → `(locale, translation)` in proposal order.
const DICTIONARY: &[(&str, &[(&str, &str)])] = &[
    ("john", &[("es", "juan"), ("fr", "jean"), ("it", "giovanni")]),
    ("mary", &[("es", "maria"), ("fr", "marie"), ("it", "maria")]),
];

fn dictionary_entries(name: &str) -> &'static [(&'static str, &'static str)] {
    let key = name.trim().to_lowercase();
    DICTIONARY
        .iter()
        .find(|(source, _)| *source == key)
        .map(|(_, entries)| *entries)
        .unwrap_or(&[])
}

pub struct TranslationDecorator {
    meta: DecoratorMeta,
    config: DecoratorConfig,
    external: Option<ExternalSlot<TranslationProposal>>,
}

impl Default for TranslationDecorator {
    fn default() -> Self {
        Self::new(DecoratorConfig::for_kind(DecoratorKind::Translation))
    }
}

impl TranslationDecorator {
    pub fn new(config: DecoratorConfig) -> Self {
        Self {
            meta: DecoratorMeta { id: "translation-decorator", kind: DecoratorKind::Translation, priority: 20 },
            config,
            external: None,
        }
    }

    pub fn with_external(mut self, slot: ExternalSlot<TranslationProposal>) -> Self {
        self.external = Some(slot);
        self
    }
}

#[async_trait]
impl Decorator for TranslationDecorator {
    type Payload = TranslationProposal;

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
    ) -> Result<Vec<TranslationCandidate>> {
        // Manual hints first so they win dedupe against the dictionary.
        let mut raw: Vec<TranslationCandidate> = ctx
            .hints
            .translations
            .iter()
            .filter(|h| !h.name.trim().is_empty() && !h.locale.trim().is_empty())
            .map(|h| {
                Candidate::manual(TranslationProposal { name: h.name.clone(), locale: h.locale.clone() })
                    .with_rationale("Manually provided translation")
            })
            .collect();

        raw.extend(dictionary_entries(&ctx.name).iter().map(|(locale, name)| {
            Candidate::new(
                TranslationProposal { name: (*name).to_string(), locale: (*locale).to_string() },
                DICTIONARY_CONFIDENCE,
                CandidateSource::Heuristic,
            )
            .with_rationale("Common translation")
        }));

        if clean_locale(&ctx.locale) != FALLBACK_LOCALE {
            raw.push(
                Candidate::new(
                    TranslationProposal { name: ctx.name.clone(), locale: FALLBACK_LOCALE.to_string() },
                    FALLBACK_CONFIDENCE,
                    CandidateSource::Heuristic,
                )
                .with_rationale("Same spelling used in English"),
            );
        }

        raw.extend(external_candidates(self.external.as_ref(), ctx).await);
        Ok(raw)
    }

    fn dedupe_key(&self, p: &TranslationProposal) -> String {
        format!("{}|{}", p.name.to_lowercase(), p.locale.to_lowercase())
    }

    fn in_persisted(&self, persisted: &PersistedRelations, p: &TranslationProposal) -> bool {
        persisted
            .translations
            .iter()
            .any(|t| eq_fold(&t.name, &p.name) && eq_fold(&t.locale, &p.locale))
    }

    fn normalize(&self, mut c: TranslationCandidate) -> TranslationCandidate {
        c.payload.name = c.payload.name.trim().to_string();
        c.payload.locale = clean_locale(&c.payload.locale);
        c
    }
}
