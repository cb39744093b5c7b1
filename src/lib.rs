//! # namegraph — Lexical graph of given names
//!
//! Names connected by symmetric variant edges, directed translation edges
//! and cluster memberships, plus a decoration pipeline that proposes new
//! relations for a name as bounded, deduplicated, scored candidates.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `NameStore` is the contract between the services and storage
//! 2. **Clean DTOs**: `Name`, `Candidate`, `DecoratedResult` cross all boundaries
//! 3. **Decoration is pure**: a decorator never writes; `Lexicon::accept` does
//! 4. **One writer path per call**: multi-entity writes go through one transaction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use namegraph::{Gender, Lexicon, NameContext};
//!
//! # async fn example() -> namegraph::Result<()> {
//! let lexicon = Lexicon::open_memory().await?;
//!
//! let ctx = NameContext::new("John", "en", Gender::Male)
//!     .with_translation_hint("Juan", "es");
//! let decorated = lexicon.decorate(&ctx).await?;
//!
//! for t in &decorated.translations {
//!     println!("{} ({}) {:.2}", t.payload.name, t.payload.locale, t.confidence);
//! }
//!
//! let id = lexicon.accept(&decorated, Some("https://example.org/john")).await?;
//! println!("stored as {id}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | Memory | In-process store with undo-log rollback, for embedding and tests |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod tx;
pub mod storage;
pub mod graph;
pub mod decorator;
pub mod insert;
pub mod config;
pub mod text;

use std::sync::Arc;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Candidate, CandidateSource, Cluster, ClusterId, DecoratedResult, Gender, ManualHints, Name,
    NameContext, NameId, NameInput, NameRecord, NameUpdate, PersistedRelations, TranslationHint,
};

// ============================================================================
// Re-exports: Storage, services, decoration
// ============================================================================

pub use storage::{MemoryStore, NameStore};
pub use tx::{Transaction, TxId, TxMode};
pub use graph::{ClusterService, TranslationService, VariantService};
pub use decorator::{
    Decorator, DecoratorBroker, DecoratorKind, DecoratorMeta, ExternalProposals, ExternalSlot, ExternalSources,
};
pub use insert::{insert_name_atomic, BatchMeta, FullNameInsert};
pub use config::{DecoratorConfig, LexiconConfig};

use model::{PersistedCluster, PersistedTranslation, PersistedVariant};

// ============================================================================
// Top-level Lexicon handle
// ============================================================================

/// The primary entry point. A `Lexicon` owns the store handle, the three
/// graph services and the decorator broker.
pub struct Lexicon<S: NameStore> {
    store: Arc<S>,
    config: LexiconConfig,
    variants: VariantService<S>,
    translations: TranslationService<S>,
    clusters: ClusterService<S>,
    broker: DecoratorBroker,
}

impl<S: NameStore> Lexicon<S> {
    /// Create a Lexicon over the given store. The configuration is
    /// validated up front.
    pub fn with_store(store: S, config: LexiconConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(store);
        Ok(Self {
            variants: VariantService::new(Arc::clone(&store)),
            translations: TranslationService::new(Arc::clone(&store)),
            clusters: ClusterService::new(Arc::clone(&store)),
            broker: DecoratorBroker::new(&config),
            store,
            config,
        })
    }

    /// Replace the decorator set (custom heuristics, external sources).
    pub fn with_broker(mut self, broker: DecoratorBroker) -> Self {
        self.broker = broker;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LexiconConfig {
        &self.config
    }

    pub fn variants(&self) -> &VariantService<S> {
        &self.variants
    }

    pub fn translations(&self) -> &TranslationService<S> {
        &self.translations
    }

    pub fn clusters(&self) -> &ClusterService<S> {
        &self.clusters
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a single name, or resolve the id it already has.
    pub async fn insert_name(&self, text: &str, locale: &str, gender: Gender) -> Result<NameId> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let id = match self.store.insert_name(&mut tx, text, locale, gender).await {
            Ok(id) => id,
            Err(err) => {
                self.store.rollback_tx(tx).await?;
                return Err(err);
            }
        };
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %id, name = text, locale, "inserted name");
        Ok(id)
    }

    /// Insert a name with its relations as one all-or-nothing unit.
    pub async fn insert_full_name(&self, payload: &FullNameInsert) -> Result<NameId> {
        insert_name_atomic(self.store.as_ref(), payload).await
    }

    /// Insert many names in one transaction, each tagged with the batch
    /// source. A dry run resolves ids and then rolls back.
    pub async fn insert_batch(&self, names: &[NameInput], meta: &BatchMeta, dry_run: bool) -> Result<Vec<NameId>> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let ids = match self.write_batch(&mut tx, names, meta).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "batch insert failed, rolling back");
                self.store.rollback_tx(tx).await?;
                return Err(err);
            }
        };

        if dry_run {
            self.store.rollback_tx(tx).await?;
        } else {
            self.store.commit_tx(tx).await?;
        }
        tracing::info!(count = ids.len(), dry_run, "inserted name batch");
        Ok(ids)
    }

    async fn write_batch(&self, tx: &mut S::Tx, names: &[NameInput], meta: &BatchMeta) -> Result<Vec<NameId>> {
        let mut ids = Vec::with_capacity(names.len());
        for input in names {
            let id = self.store.insert_name(tx, &input.name, &input.locale, input.gender).await?;
            if let Some(url) = meta.source_url.as_deref() {
                self.store.add_name_source(tx, id, url).await?;
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Apply a partial update. A locale or gender change re-derives the
    /// name's clusters from its neighbours (additively) in the same
    /// transaction, so a failed recompute leaves the name unchanged.
    pub async fn update_name(&self, id: NameId, update: &NameUpdate) -> Result<Name> {
        if update.is_empty() {
            return Err(Error::Validation("update has no fields".into()));
        }
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let (name, added) = match self.apply_update(&mut tx, id, update).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(name_id = %id, error = %err, "update failed, rolling back");
                self.store.rollback_tx(tx).await?;
                return Err(err);
            }
        };
        self.store.commit_tx(tx).await?;
        tracing::info!(name_id = %id, inherited_clusters = added, "updated name");
        Ok(name)
    }

    async fn apply_update(&self, tx: &mut S::Tx, id: NameId, update: &NameUpdate) -> Result<(Name, usize)> {
        let name = self.store.update_name(tx, id, update).await?;
        let added = if update.touches_classification() {
            self.clusters.propagate(tx, id).await?.len()
        } else {
            0
        };
        Ok((name, added))
    }

    /// Delete a name and every edge, membership and source touching it.
    pub async fn delete_name(&self, id: NameId) -> Result<bool> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let existed = match self.store.detach_delete_name(&mut tx, id).await {
            Ok(existed) => existed,
            Err(err) => {
                self.store.rollback_tx(tx).await?;
                return Err(err);
            }
        };
        self.store.commit_tx(tx).await?;
        tracing::info!(name_id = %id, existed, "deleted name");
        Ok(existed)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// A name with its variants, outgoing translations, clusters and sources.
    pub async fn name_record(&self, id: NameId) -> Result<Option<NameRecord>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let name = self.store.get_name(&tx, id).await?;
        let sources = match name {
            Some(_) => self.store.name_sources(&tx, id).await?,
            None => Vec::new(),
        };
        self.store.commit_tx(tx).await?;

        let Some(name) = name else { return Ok(None) };
        Ok(Some(NameRecord {
            name,
            variants: self.variants.variants(id).await?,
            translations: self.translations.translations(id).await?,
            clusters: self.clusters.clusters_for(id).await?,
            sources,
        }))
    }

    /// Fresh snapshot of what is stored for the context's name. Uses
    /// `ctx.id` when set, otherwise looks the name up by its triple; an
    /// unknown name has an empty snapshot.
    pub async fn persisted_relations(&self, ctx: &NameContext) -> Result<PersistedRelations> {
        let Some(id) = ctx.id else {
            return Ok(PersistedRelations {
                variants: self.variants.persisted_variants(&ctx.name, &ctx.locale, ctx.gender).await?,
                translations: self.translations.persisted_translations(&ctx.name, &ctx.locale, ctx.gender).await?,
                clusters: self.clusters.persisted_clusters(&ctx.name, &ctx.locale, ctx.gender).await?,
            });
        };

        let variants = self.variants.variants(id).await?;
        let translations = self.translations.linked_translations(id).await?;
        let clusters = self.clusters.clusters_for(id).await?;
        Ok(PersistedRelations {
            variants: variants
                .into_iter()
                .map(|n| PersistedVariant { id: Some(n.id), name: n.text, locale: Some(n.locale) })
                .collect(),
            translations: translations
                .into_iter()
                .map(|l| PersistedTranslation { id: Some(l.id), name: l.name, locale: l.locale })
                .collect(),
            clusters: clusters
                .into_iter()
                .map(|c| PersistedCluster { id: Some(c.id), label: c.label })
                .collect(),
        })
    }

    /// Run every decorator over `ctx`.
    ///
    /// If the stored relations cannot be read, decoration proceeds against
    /// an empty snapshot; a decorator failure fails the whole call.
    pub async fn decorate(&self, ctx: &NameContext) -> Result<DecoratedResult> {
        let persisted = match self.persisted_relations(ctx).await {
            Ok(persisted) => persisted,
            Err(err) => {
                tracing::error!(name = %ctx.name, error = %err, "failed to load stored relations, decorating without them");
                PersistedRelations::default()
            }
        };
        self.broker.decorate_all(ctx, &persisted).await
    }

    /// Candidates drawn from the stored graph, fed by `ctx.hints`.
    ///
    /// Variants and translations are manual hints (0.5) then stored
    /// relations (0.9). Clusters are manual hints, the name's own clusters
    /// (0.9), then clusters of the confirmed variants and translations
    /// (0.7). Lookups that fail are logged and skipped. Nothing is
    /// deduplicated.
    pub async fn enrich(&self, ctx: &NameContext) -> DecoratedResult {
        let variants = self
            .variants
            .find_variants(&ctx.name, &ctx.locale, ctx.gender, &ctx.hints.variants)
            .await;
        let translations = self
            .translations
            .find_translations(&ctx.name, &ctx.locale, ctx.gender, &ctx.hints.translations)
            .await;
        let clusters = self
            .clusters
            .find_clusters(&ctx.name, &ctx.locale, ctx.gender, &ctx.hints.clusters, &variants, &translations)
            .await;

        tracing::debug!(
            name = %ctx.name,
            variants = variants.len(),
            translations = translations.len(),
            clusters = clusters.len(),
            "enriched name from store"
        );

        DecoratedResult {
            name: ctx.name.clone(),
            locale: ctx.locale.clone(),
            gender: ctx.gender,
            variants,
            translations,
            clusters,
        }
    }

    /// Persist a (caller-filtered) decoration result atomically.
    ///
    /// Related names take the base name's gender; variants without a
    /// locale take the base locale. Cluster labels are resolved to
    /// existing clusters, unknown labels are skipped.
    pub async fn accept(&self, decorated: &DecoratedResult, source_url: Option<&str>) -> Result<NameId> {
        let mut payload = FullNameInsert::new(&decorated.name, &decorated.locale, decorated.gender);
        payload.source_url = source_url.map(str::to_string);
        payload.variants = decorated
            .variants
            .iter()
            .map(|c| {
                let locale = c.payload.locale.clone().unwrap_or_else(|| decorated.locale.clone());
                NameInput::new(&c.payload.name, locale, decorated.gender)
            })
            .collect();
        payload.translations = decorated
            .translations
            .iter()
            .map(|c| NameInput::new(&c.payload.name, &c.payload.locale, decorated.gender))
            .collect();

        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        for candidate in &decorated.clusters {
            match self.store.cluster_by_label(&tx, &candidate.payload.label).await? {
                Some(cluster) => payload.clusters.push(cluster.id),
                None => tracing::warn!(label = %candidate.payload.label, "unknown cluster label, skipping"),
            }
        }
        self.store.commit_tx(tx).await?;

        self.insert_full_name(&payload).await
    }
}

/// In-memory lexicon for testing and embedding.
impl Lexicon<MemoryStore> {
    pub async fn open_memory() -> Result<Self> {
        Self::with_store(MemoryStore::new(), LexiconConfig::default())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Referential error: {0}")]
    Referential(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Failed atomic insertion for name={name}: {source}")]
    AtomicInsert { name: String, source: Box<Error> },

    #[error("Decorator {decorator} failed: {message}")]
    Decorator { decorator: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
