//! # Name Store Trait
//!
//! This is THE contract between the graph services and any persistence
//! substrate. Everything the core needs from a store is defined here:
//! point lookups, insert-or-resolve, symmetric and directed edges, cluster
//! memberships, and transactional grouping.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory with undo-log rollback |

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// NameStore Trait
// ============================================================================

/// The persistence contract for the name graph.
///
/// Reads take `&Self::Tx`, writes take `&mut Self::Tx`. A store is expected
/// to serialize writers itself; the core takes no external locks.
#[async_trait]
pub trait NameStore: Send + Sync + 'static {
    /// The transaction type for this store.
    type Tx: Transaction;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the store. Every later call fails with `StorageError`.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Transactions
    // ========================================================================

    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back every write made through `tx`.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Names
    // ========================================================================

    /// Insert a name, or resolve the existing id for the same
    /// `(text, locale, gender)`. Text is trimmed, locale trimmed and
    /// lowercased; either being empty is a validation error.
    async fn insert_name(
        &self,
        tx: &mut Self::Tx,
        text: &str,
        locale: &str,
        gender: Gender,
    ) -> Result<NameId>;

    async fn get_name(&self, tx: &Self::Tx, id: NameId) -> Result<Option<Name>>;

    /// Look a name up by its uniqueness triple (cleaned the same way as
    /// `insert_name`).
    async fn find_name(
        &self,
        tx: &Self::Tx,
        text: &str,
        locale: &str,
        gender: Gender,
    ) -> Result<Option<Name>>;

    /// Apply a partial update. Fails if the resulting triple belongs to
    /// another name.
    async fn update_name(&self, tx: &mut Self::Tx, id: NameId, update: &NameUpdate) -> Result<Name>;

    /// Delete a name. Returns true if it existed.
    /// Fails while the name still has variants, translations or memberships.
    async fn delete_name(&self, tx: &mut Self::Tx, id: NameId) -> Result<bool>;

    /// Delete a name together with everything attached to it.
    ///
    /// Default: remove each relation through the edge API, then the name.
    async fn detach_delete_name(&self, tx: &mut Self::Tx, id: NameId) -> Result<bool> {
        for other in self.variant_ids(tx, id).await? {
            self.delete_variant_edge(tx, id, other).await?;
        }
        for edge in self.translations_from(tx, id).await? {
            self.delete_translation_edge(tx, edge.src, edge.dst).await?;
        }
        for edge in self.translations_to(tx, id).await? {
            self.delete_translation_edge(tx, edge.src, edge.dst).await?;
        }
        for cluster in self.cluster_ids(tx, id).await? {
            self.delete_cluster_member(tx, id, cluster).await?;
        }
        self.delete_name(tx, id).await
    }

    async fn name_count(&self, tx: &Self::Tx) -> Result<u64>;

    async fn all_names(&self, tx: &Self::Tx) -> Result<Vec<Name>>;

    // ========================================================================
    // Sources
    // ========================================================================

    /// Attach a provenance record. Re-adding the same source is a no-op.
    async fn add_name_source(&self, tx: &mut Self::Tx, id: NameId, source: &str) -> Result<()>;

    async fn name_sources(&self, tx: &Self::Tx, id: NameId) -> Result<Vec<NameSource>>;

    // ========================================================================
    // Variants (symmetric)
    // ========================================================================

    /// Store `a ↔ b`. Self-loops are ignored. Idempotent.
    async fn insert_variant_edge(&self, tx: &mut Self::Tx, a: NameId, b: NameId) -> Result<()>;

    /// Remove `a ↔ b`. Returns true if the edge existed.
    async fn delete_variant_edge(&self, tx: &mut Self::Tx, a: NameId, b: NameId) -> Result<bool>;

    /// Direct variant neighbours of `id`.
    async fn variant_ids(&self, tx: &Self::Tx, id: NameId) -> Result<Vec<NameId>>;

    // ========================================================================
    // Translations (directed)
    // ========================================================================

    /// Store `src → dst` tagged with `locale`. Idempotent per `(src, dst)`.
    async fn insert_translation_edge(
        &self,
        tx: &mut Self::Tx,
        src: NameId,
        dst: NameId,
        locale: &str,
    ) -> Result<()>;

    async fn delete_translation_edge(&self, tx: &mut Self::Tx, src: NameId, dst: NameId) -> Result<bool>;

    /// Outgoing edges `id → *`.
    async fn translations_from(&self, tx: &Self::Tx, id: NameId) -> Result<Vec<TranslationEdge>>;

    /// Incoming edges `* → id`.
    async fn translations_to(&self, tx: &Self::Tx, id: NameId) -> Result<Vec<TranslationEdge>>;

    // ========================================================================
    // Clusters
    // ========================================================================

    /// Create a cluster, or resolve the existing one with the same label
    /// (case-insensitive).
    async fn create_cluster(&self, tx: &mut Self::Tx, label: &str) -> Result<ClusterId>;

    async fn get_cluster(&self, tx: &Self::Tx, id: ClusterId) -> Result<Option<Cluster>>;

    async fn cluster_by_label(&self, tx: &Self::Tx, label: &str) -> Result<Option<Cluster>>;

    async fn all_clusters(&self, tx: &Self::Tx) -> Result<Vec<Cluster>>;

    async fn cluster_exists(&self, tx: &Self::Tx, id: ClusterId) -> Result<bool> {
        Ok(self.get_cluster(tx, id).await?.is_some())
    }

    /// Add `name` to `cluster`. Fails with `Referential` if the cluster does
    /// not exist. Idempotent.
    async fn insert_cluster_member(&self, tx: &mut Self::Tx, name: NameId, cluster: ClusterId) -> Result<()>;

    async fn delete_cluster_member(&self, tx: &mut Self::Tx, name: NameId, cluster: ClusterId) -> Result<bool>;

    async fn cluster_ids(&self, tx: &Self::Tx, name: NameId) -> Result<Vec<ClusterId>>;
}
