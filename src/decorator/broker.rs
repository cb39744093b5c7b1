//! Fan-out of the three decorators over one name.

use std::sync::Arc;

use crate::config::LexiconConfig;
use crate::model::*;
use crate::{Error, Result};
use super::{
    ClusterDecorator, Decorator, DecoratorKind, DecoratorMeta, ExternalProposals, ExternalSlot,
    TranslationDecorator, VariantDecorator,
};

pub type DynVariantDecorator = Arc<dyn Decorator<Payload = VariantProposal>>;
pub type DynTranslationDecorator = Arc<dyn Decorator<Payload = TranslationProposal>>;
pub type DynClusterDecorator = Arc<dyn Decorator<Payload = ClusterProposal>>;

/// Optional external source per subject, wired by `DecoratorBroker::with_external`.
#[derive(Clone, Default)]
pub struct ExternalSources {
    pub variants: Option<Arc<dyn ExternalProposals<VariantProposal>>>,
    pub translations: Option<Arc<dyn ExternalProposals<TranslationProposal>>>,
    pub clusters: Option<Arc<dyn ExternalProposals<ClusterProposal>>>,
}

/// Runs the variant, translation and cluster decorators concurrently and
/// merges their output.
///
/// All or nothing: the first decorator error fails the whole merge. The
/// broker never touches the store; the persisted snapshot is passed in.
#[derive(Clone)]
pub struct DecoratorBroker {
    variants: DynVariantDecorator,
    translations: DynTranslationDecorator,
    clusters: DynClusterDecorator,
}

impl Default for DecoratorBroker {
    fn default() -> Self {
        Self::new(&LexiconConfig::default())
    }
}

impl DecoratorBroker {
    pub fn new(config: &LexiconConfig) -> Self {
        Self::with_external(config, ExternalSources::default())
    }

    /// The built-in decorators, each backed by its external source when one
    /// is given. Every lookup runs under `config.external_timeout()`.
    pub fn with_external(config: &LexiconConfig, sources: ExternalSources) -> Self {
        let mut variants = VariantDecorator::new(config.decorator(DecoratorKind::Variant).clone());
        if let Some(source) = sources.variants {
            variants = variants.with_external(ExternalSlot::from_config(source, config));
        }
        let mut translations = TranslationDecorator::new(config.decorator(DecoratorKind::Translation).clone());
        if let Some(source) = sources.translations {
            translations = translations.with_external(ExternalSlot::from_config(source, config));
        }
        let mut clusters = ClusterDecorator::new(config.decorator(DecoratorKind::Cluster).clone());
        if let Some(source) = sources.clusters {
            clusters = clusters.with_external(ExternalSlot::from_config(source, config));
        }
        Self::with_decorators(Arc::new(variants), Arc::new(translations), Arc::new(clusters))
    }

    pub fn with_decorators(
        variants: DynVariantDecorator,
        translations: DynTranslationDecorator,
        clusters: DynClusterDecorator,
    ) -> Self {
        Self { variants, translations, clusters }
    }

    /// Identities of the wired decorators, by priority.
    pub fn decorators(&self) -> Vec<DecoratorMeta> {
        let mut metas = vec![
            self.variants.meta().clone(),
            self.translations.meta().clone(),
            self.clusters.meta().clone(),
        ];
        metas.sort_by_key(|m| m.priority);
        metas
    }

    pub async fn decorate_all(&self, ctx: &NameContext, persisted: &PersistedRelations) -> Result<DecoratedResult> {
        let (variants, translations, clusters) = tokio::try_join!(
            run(self.variants.as_ref(), ctx, persisted),
            run(self.translations.as_ref(), ctx, persisted),
            run(self.clusters.as_ref(), ctx, persisted),
        )?;

        tracing::debug!(
            name = %ctx.name,
            variants = variants.len(),
            translations = translations.len(),
            clusters = clusters.len(),
            "decorated name"
        );

        Ok(DecoratedResult {
            name: ctx.name.clone(),
            locale: ctx.locale.clone(),
            gender: ctx.gender,
            variants,
            translations,
            clusters,
        })
    }
}

/// Run one decorator, tagging any failure with its id.
async fn run<P: Send + Sync + 'static>(
    decorator: &dyn Decorator<Payload = P>,
    ctx: &NameContext,
    persisted: &PersistedRelations,
) -> Result<Vec<Candidate<P>>> {
    decorator.propose(ctx, persisted).await.map_err(|err| {
        tracing::error!(decorator = decorator.meta().id, name = %ctx.name, error = %err, "decorator failed");
        match err {
            err @ Error::Decorator { .. } => err,
            other => Error::Decorator { decorator: decorator.meta().id.to_string(), message: other.to_string() },
        }
    })
}
