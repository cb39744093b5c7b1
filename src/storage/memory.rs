//! In-memory name store.
//!
//! This is the reference implementation of `NameStore`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Transactions
//!
//! Writes are applied immediately. Every `ReadWrite` transaction carries
//! an undo log; `rollback_tx()` replays it in reverse, so a rolled-back
//! transaction leaves no trace. `commit_tx()` just discards the log.
//!
//! ## Limitations
//!
//! - **Single-writer only**: two concurrent write transactions can observe
//!   each other's uncommitted writes, and rolling one back may clobber the
//!   other. Serialize writers, or use a store with real isolation.
//! - **No label index for clusters**: `cluster_by_label()` scans.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::*;
use crate::text::{clean_locale, clean_text, eq_fold};
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::NameStore;

type Neighbours<T> = SmallVec<[T; 4]>;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory name graph storage.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    names: RwLock<HashMap<NameId, Name>>,
    /// (text, locale, gender) → id
    name_index: RwLock<HashMap<NameKey, NameId>>,
    sources: RwLock<HashMap<NameId, Vec<NameSource>>>,
    /// Both directions are stored: `a → [b]` and `b → [a]`.
    variants: RwLock<HashMap<NameId, Neighbours<NameId>>>,
    outgoing: RwLock<HashMap<NameId, Vec<TranslationEdge>>>,
    incoming: RwLock<HashMap<NameId, Vec<TranslationEdge>>>,
    clusters: RwLock<HashMap<ClusterId, Cluster>>,
    members: RwLock<HashMap<NameId, Neighbours<ClusterId>>>,
    next_name_id: AtomicU64,
    next_cluster_id: AtomicU64,
    next_tx_id: AtomicU64,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                names: RwLock::new(HashMap::new()),
                name_index: RwLock::new(HashMap::new()),
                sources: RwLock::new(HashMap::new()),
                variants: RwLock::new(HashMap::new()),
                outgoing: RwLock::new(HashMap::new()),
                incoming: RwLock::new(HashMap::new()),
                clusters: RwLock::new(HashMap::new()),
                members: RwLock::new(HashMap::new()),
                next_name_id: AtomicU64::new(1),
                next_cluster_id: AtomicU64::new(1),
                next_tx_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// Inverse of one applied write.
#[derive(Debug, Clone)]
enum Undo {
    InsertedName(NameId),
    UpdatedName(Name),
    DeletedName(Name, Vec<NameSource>),
    AddedSource(NameId, String),
    AddedVariant(NameId, NameId),
    RemovedVariant(NameId, NameId),
    AddedTranslation(NameId, NameId),
    RemovedTranslation(TranslationEdge),
    CreatedCluster(ClusterId),
    AddedMember(NameId, ClusterId),
    RemovedMember(NameId, ClusterId),
}

/// In-memory transaction: a mode plus the undo log of its writes.
#[derive(Debug)]
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    undo: Vec<Undo>,
}

impl MemoryTx {
    fn writable(&self) -> Result<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(Error::TxError(format!("{} is read-only", self.id)))
        }
    }

    /// Number of writes that a rollback would revert.
    pub fn pending_writes(&self) -> usize {
        self.undo.len()
    }
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// Raw table operations (shared by forward writes and rollback)
// ============================================================================

impl MemoryStore {
    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            Err(Error::StorageError("name store is shut down".into()))
        } else {
            Ok(())
        }
    }

    fn name_exists(&self, id: NameId) -> bool {
        self.inner.names.read().contains_key(&id)
    }

    fn require_name(&self, id: NameId) -> Result<()> {
        if self.name_exists(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Name {id}")))
        }
    }

    /// Insert or overwrite a name row and keep the index in step.
    fn raw_put_name(&self, name: Name) {
        let mut idx = self.inner.name_index.write();
        let mut names = self.inner.names.write();
        if let Some(previous) = names.get(&name.id) {
            idx.remove(&previous.key());
        }
        idx.insert(name.key(), name.id);
        names.insert(name.id, name);
    }

    fn raw_remove_name(&self, id: NameId) -> Option<(Name, Vec<NameSource>)> {
        let removed = {
            let mut idx = self.inner.name_index.write();
            let mut names = self.inner.names.write();
            let removed = names.remove(&id);
            if let Some(name) = &removed {
                idx.remove(&name.key());
            }
            removed
        };
        let sources = self.inner.sources.write().remove(&id).unwrap_or_default();
        self.inner.variants.write().remove(&id);
        self.inner.outgoing.write().remove(&id);
        self.inner.incoming.write().remove(&id);
        self.inner.members.write().remove(&id);
        removed.map(|name| (name, sources))
    }

    fn raw_link_variant(&self, a: NameId, b: NameId) -> bool {
        let mut adj = self.inner.variants.write();
        let forward = adj.entry(a).or_default();
        if forward.contains(&b) {
            return false;
        }
        forward.push(b);
        let backward = adj.entry(b).or_default();
        if !backward.contains(&a) {
            backward.push(a);
        }
        true
    }

    fn raw_unlink_variant(&self, a: NameId, b: NameId) -> bool {
        let mut adj = self.inner.variants.write();
        let mut existed = false;
        if let Some(list) = adj.get_mut(&a) {
            let before = list.len();
            list.retain(|n| *n != b);
            existed |= list.len() != before;
        }
        if let Some(list) = adj.get_mut(&b) {
            let before = list.len();
            list.retain(|n| *n != a);
            existed |= list.len() != before;
        }
        existed
    }

    fn raw_link_translation(&self, edge: TranslationEdge) -> bool {
        let mut out = self.inner.outgoing.write();
        let list = out.entry(edge.src).or_default();
        if list.iter().any(|e| e.dst == edge.dst) {
            return false;
        }
        list.push(edge.clone());
        drop(out);
        self.inner.incoming.write().entry(edge.dst).or_default().push(edge);
        true
    }

    fn raw_unlink_translation(&self, src: NameId, dst: NameId) -> Option<TranslationEdge> {
        let removed = {
            let mut out = self.inner.outgoing.write();
            let list = out.get_mut(&src)?;
            let pos = list.iter().position(|e| e.dst == dst)?;
            list.remove(pos)
        };
        if let Some(list) = self.inner.incoming.write().get_mut(&dst) {
            list.retain(|e| e.src != src);
        }
        Some(removed)
    }

    fn raw_add_member(&self, name: NameId, cluster: ClusterId) -> bool {
        let mut members = self.inner.members.write();
        let list = members.entry(name).or_default();
        if list.contains(&cluster) {
            return false;
        }
        list.push(cluster);
        true
    }

    fn raw_remove_member(&self, name: NameId, cluster: ClusterId) -> bool {
        let mut members = self.inner.members.write();
        match members.get_mut(&name) {
            Some(list) => {
                let before = list.len();
                list.retain(|c| *c != cluster);
                list.len() != before
            }
            None => false,
        }
    }

    fn apply_undo(&self, op: Undo) {
        match op {
            Undo::InsertedName(id) => {
                self.raw_remove_name(id);
            }
            Undo::UpdatedName(previous) => self.raw_put_name(previous),
            Undo::DeletedName(name, sources) => {
                let id = name.id;
                self.raw_put_name(name);
                if !sources.is_empty() {
                    self.inner.sources.write().insert(id, sources);
                }
            }
            Undo::AddedSource(id, source) => {
                if let Some(list) = self.inner.sources.write().get_mut(&id) {
                    list.retain(|s| s.source != source);
                }
            }
            Undo::AddedVariant(a, b) => {
                self.raw_unlink_variant(a, b);
            }
            Undo::RemovedVariant(a, b) => {
                self.raw_link_variant(a, b);
            }
            Undo::AddedTranslation(src, dst) => {
                self.raw_unlink_translation(src, dst);
            }
            Undo::RemovedTranslation(edge) => {
                self.raw_link_translation(edge);
            }
            Undo::CreatedCluster(id) => {
                self.inner.clusters.write().remove(&id);
            }
            Undo::AddedMember(name, cluster) => {
                self.raw_remove_member(name, cluster);
            }
            Undo::RemovedMember(name, cluster) => {
                self.raw_add_member(name, cluster);
            }
        }
    }

    fn has_relations(&self, id: NameId) -> bool {
        let has = |len: Option<usize>| len.unwrap_or(0) > 0;
        has(self.inner.variants.read().get(&id).map(|l| l.len()))
            || has(self.inner.outgoing.read().get(&id).map(|l| l.len()))
            || has(self.inner.incoming.read().get(&id).map(|l| l.len()))
            || has(self.inner.members.read().get(&id).map(|l| l.len()))
    }
}

fn validated_key(text: &str, locale: &str, gender: Gender) -> Result<NameKey> {
    let text = clean_text(text);
    let locale = clean_locale(locale);
    if text.is_empty() || locale.is_empty() {
        return Err(Error::Validation(
            "name text and locale must not be empty".into(),
        ));
    }
    Ok(NameKey { text, locale, gender })
}

// ============================================================================
// NameStore impl
// ============================================================================

#[async_trait]
impl NameStore for MemoryStore {
    type Tx = MemoryTx;

    async fn shutdown(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        self.ensure_open()?;
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(tx = %id, mode = %mode, "begin");
        Ok(MemoryTx { id, mode, undo: Vec::new() })
    }

    async fn commit_tx(&self, tx: MemoryTx) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!(tx = %tx.id, writes = tx.undo.len(), "commit");
        Ok(())
    }

    async fn rollback_tx(&self, tx: MemoryTx) -> Result<()> {
        self.ensure_open()?;
        tracing::debug!(tx = %tx.id, writes = tx.undo.len(), "rollback");
        for op in tx.undo.into_iter().rev() {
            self.apply_undo(op);
        }
        Ok(())
    }

    // ========================================================================
    // Names
    // ========================================================================

    async fn insert_name(
        &self,
        tx: &mut MemoryTx,
        text: &str,
        locale: &str,
        gender: Gender,
    ) -> Result<NameId> {
        self.ensure_open()?;
        tx.writable()?;
        let key = validated_key(text, locale, gender)?;

        let mut idx = self.inner.name_index.write();
        if let Some(id) = idx.get(&key) {
            return Ok(*id);
        }
        let id = NameId(self.inner.next_name_id.fetch_add(1, Ordering::Relaxed));
        let name = Name { id, text: key.text.clone(), locale: key.locale.clone(), gender };
        idx.insert(key, id);
        self.inner.names.write().insert(id, name);
        drop(idx);

        tx.undo.push(Undo::InsertedName(id));
        Ok(id)
    }

    async fn get_name(&self, _tx: &MemoryTx, id: NameId) -> Result<Option<Name>> {
        self.ensure_open()?;
        Ok(self.inner.names.read().get(&id).cloned())
    }

    async fn find_name(
        &self,
        _tx: &MemoryTx,
        text: &str,
        locale: &str,
        gender: Gender,
    ) -> Result<Option<Name>> {
        self.ensure_open()?;
        let key = NameKey { text: clean_text(text), locale: clean_locale(locale), gender };
        let id = self.inner.name_index.read().get(&key).copied();
        Ok(id.and_then(|id| self.inner.names.read().get(&id).cloned()))
    }

    async fn update_name(&self, tx: &mut MemoryTx, id: NameId, update: &NameUpdate) -> Result<Name> {
        self.ensure_open()?;
        tx.writable()?;
        let previous = self.inner.names.read().get(&id).cloned()
            .ok_or_else(|| Error::NotFound(format!("Name {id}")))?;

        let key = validated_key(
            update.text.as_deref().unwrap_or(&previous.text),
            update.locale.as_deref().unwrap_or(&previous.locale),
            update.gender.unwrap_or(previous.gender),
        )?;
        if let Some(other) = self.inner.name_index.read().get(&key) {
            if *other != id {
                return Err(Error::ConstraintViolation(format!(
                    "name '{}' ({}, {}) already exists as {other}",
                    key.text, key.locale, key.gender
                )));
            }
        }

        let updated = Name { id, text: key.text, locale: key.locale, gender: key.gender };
        self.raw_put_name(updated.clone());
        tx.undo.push(Undo::UpdatedName(previous));
        Ok(updated)
    }

    async fn delete_name(&self, tx: &mut MemoryTx, id: NameId) -> Result<bool> {
        self.ensure_open()?;
        tx.writable()?;
        if self.has_relations(id) {
            return Err(Error::ConstraintViolation(format!(
                "Cannot delete name {id} while it has relations. Detach it first."
            )));
        }
        match self.raw_remove_name(id) {
            Some((name, sources)) => {
                tx.undo.push(Undo::DeletedName(name, sources));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn name_count(&self, _tx: &MemoryTx) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.inner.names.read().len() as u64)
    }

    async fn all_names(&self, _tx: &MemoryTx) -> Result<Vec<Name>> {
        self.ensure_open()?;
        let mut names: Vec<Name> = self.inner.names.read().values().cloned().collect();
        names.sort_by_key(|n| n.id);
        Ok(names)
    }

    // ========================================================================
    // Sources
    // ========================================================================

    async fn add_name_source(&self, tx: &mut MemoryTx, id: NameId, source: &str) -> Result<()> {
        self.ensure_open()?;
        tx.writable()?;
        self.require_name(id)?;
        let source = source.trim();
        if source.is_empty() {
            return Err(Error::Validation("source must not be empty".into()));
        }

        let mut sources = self.inner.sources.write();
        let list = sources.entry(id).or_default();
        if list.iter().any(|s| s.source == source) {
            return Ok(());
        }
        list.push(NameSource { name_id: id, source: source.to_string(), added_at: Utc::now() });
        tx.undo.push(Undo::AddedSource(id, source.to_string()));
        Ok(())
    }

    async fn name_sources(&self, _tx: &MemoryTx, id: NameId) -> Result<Vec<NameSource>> {
        self.ensure_open()?;
        Ok(self.inner.sources.read().get(&id).cloned().unwrap_or_default())
    }

    // ========================================================================
    // Variants
    // ========================================================================

    async fn insert_variant_edge(&self, tx: &mut MemoryTx, a: NameId, b: NameId) -> Result<()> {
        self.ensure_open()?;
        tx.writable()?;
        if a == b {
            return Ok(());
        }
        self.require_name(a)?;
        self.require_name(b)?;
        if self.raw_link_variant(a, b) {
            tx.undo.push(Undo::AddedVariant(a, b));
        }
        Ok(())
    }

    async fn delete_variant_edge(&self, tx: &mut MemoryTx, a: NameId, b: NameId) -> Result<bool> {
        self.ensure_open()?;
        tx.writable()?;
        let existed = self.raw_unlink_variant(a, b);
        if existed {
            tx.undo.push(Undo::RemovedVariant(a, b));
        }
        Ok(existed)
    }

    async fn variant_ids(&self, _tx: &MemoryTx, id: NameId) -> Result<Vec<NameId>> {
        self.ensure_open()?;
        Ok(self.inner.variants.read().get(&id).map(|l| l.to_vec()).unwrap_or_default())
    }

    // ========================================================================
    // Translations
    // ========================================================================

    async fn insert_translation_edge(
        &self,
        tx: &mut MemoryTx,
        src: NameId,
        dst: NameId,
        locale: &str,
    ) -> Result<()> {
        self.ensure_open()?;
        tx.writable()?;
        self.require_name(src)?;
        self.require_name(dst)?;
        let locale = clean_locale(locale);
        if locale.is_empty() {
            return Err(Error::Validation("translation locale must not be empty".into()));
        }
        if self.raw_link_translation(TranslationEdge { src, dst, locale }) {
            tx.undo.push(Undo::AddedTranslation(src, dst));
        }
        Ok(())
    }

    async fn delete_translation_edge(&self, tx: &mut MemoryTx, src: NameId, dst: NameId) -> Result<bool> {
        self.ensure_open()?;
        tx.writable()?;
        match self.raw_unlink_translation(src, dst) {
            Some(edge) => {
                tx.undo.push(Undo::RemovedTranslation(edge));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn translations_from(&self, _tx: &MemoryTx, id: NameId) -> Result<Vec<TranslationEdge>> {
        self.ensure_open()?;
        Ok(self.inner.outgoing.read().get(&id).cloned().unwrap_or_default())
    }

    async fn translations_to(&self, _tx: &MemoryTx, id: NameId) -> Result<Vec<TranslationEdge>> {
        self.ensure_open()?;
        Ok(self.inner.incoming.read().get(&id).cloned().unwrap_or_default())
    }

    // ========================================================================
    // Clusters
    // ========================================================================

    async fn create_cluster(&self, tx: &mut MemoryTx, label: &str) -> Result<ClusterId> {
        self.ensure_open()?;
        tx.writable()?;
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::Validation("cluster label must not be empty".into()));
        }

        let mut clusters = self.inner.clusters.write();
        if let Some(existing) = clusters.values().find(|c| eq_fold(&c.label, label)) {
            return Ok(existing.id);
        }
        let id = ClusterId(self.inner.next_cluster_id.fetch_add(1, Ordering::Relaxed));
        clusters.insert(id, Cluster { id, label: label.to_string() });
        tx.undo.push(Undo::CreatedCluster(id));
        Ok(id)
    }

    async fn get_cluster(&self, _tx: &MemoryTx, id: ClusterId) -> Result<Option<Cluster>> {
        self.ensure_open()?;
        Ok(self.inner.clusters.read().get(&id).cloned())
    }

    async fn cluster_by_label(&self, _tx: &MemoryTx, label: &str) -> Result<Option<Cluster>> {
        self.ensure_open()?;
        let label = label.trim();
        Ok(self.inner.clusters.read().values().find(|c| eq_fold(&c.label, label)).cloned())
    }

    async fn all_clusters(&self, _tx: &MemoryTx) -> Result<Vec<Cluster>> {
        self.ensure_open()?;
        let mut clusters: Vec<Cluster> = self.inner.clusters.read().values().cloned().collect();
        clusters.sort_by_key(|c| c.id);
        Ok(clusters)
    }

    async fn insert_cluster_member(&self, tx: &mut MemoryTx, name: NameId, cluster: ClusterId) -> Result<()> {
        self.ensure_open()?;
        tx.writable()?;
        if !self.inner.clusters.read().contains_key(&cluster) {
            return Err(Error::Referential(format!("Cluster with id {cluster} does not exist")));
        }
        self.require_name(name)?;
        if self.raw_add_member(name, cluster) {
            tx.undo.push(Undo::AddedMember(name, cluster));
        }
        Ok(())
    }

    async fn delete_cluster_member(&self, tx: &mut MemoryTx, name: NameId, cluster: ClusterId) -> Result<bool> {
        self.ensure_open()?;
        tx.writable()?;
        let existed = self.raw_remove_member(name, cluster);
        if existed {
            tx.undo.push(Undo::RemovedMember(name, cluster));
        }
        Ok(existed)
    }

    async fn cluster_ids(&self, _tx: &MemoryTx, name: NameId) -> Result<Vec<ClusterId>> {
        self.ensure_open()?;
        Ok(self.inner.members.read().get(&name).map(|l| l.to_vec()).unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_name_is_idempotent() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "John", "en", Gender::Male).await.unwrap();
        let b = db.insert_name(&mut tx, "  John ", "EN", Gender::Male).await.unwrap();
        let c = db.insert_name(&mut tx, "John", "en", Gender::Neutral).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(db.name_count(&tx).await.unwrap(), 2);

        let stored = db.get_name(&tx, a).await.unwrap().unwrap();
        assert_eq!(stored.locale, "en");
    }

    #[tokio::test]
    async fn test_insert_name_rejects_empty_fields() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let err = db.insert_name(&mut tx, "   ", "en", Gender::Male).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = db.insert_name(&mut tx, "John", "", Gender::Male).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_only_tx_rejects_writes() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadOnly).await.unwrap();

        let err = db.insert_name(&mut tx, "John", "en", Gender::Male).await.unwrap_err();
        assert!(matches!(err, Error::TxError(_)));
    }

    #[tokio::test]
    async fn test_variant_edge_is_symmetric() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "Jon", "en", Gender::Male).await.unwrap();
        let b = db.insert_name(&mut tx, "John", "en", Gender::Male).await.unwrap();
        db.insert_variant_edge(&mut tx, a, b).await.unwrap();
        db.insert_variant_edge(&mut tx, b, a).await.unwrap();

        assert_eq!(db.variant_ids(&tx, a).await.unwrap(), vec![b]);
        assert_eq!(db.variant_ids(&tx, b).await.unwrap(), vec![a]);

        assert!(db.delete_variant_edge(&mut tx, b, a).await.unwrap());
        assert!(db.variant_ids(&tx, a).await.unwrap().is_empty());
        assert!(db.variant_ids(&tx, b).await.unwrap().is_empty());
        assert!(!db.delete_variant_edge(&mut tx, a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_variant_edge_requires_names() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "Jon", "en", Gender::Male).await.unwrap();
        let err = db.insert_variant_edge(&mut tx, a, NameId(404)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_membership_requires_cluster() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "Maria", "es", Gender::Female).await.unwrap();
        let err = db.insert_cluster_member(&mut tx, a, ClusterId(9999)).await.unwrap_err();
        assert!(matches!(err, Error::Referential(_)));

        let biblical = db.create_cluster(&mut tx, "Biblical").await.unwrap();
        assert_eq!(db.create_cluster(&mut tx, "biblical").await.unwrap(), biblical);
        db.insert_cluster_member(&mut tx, a, biblical).await.unwrap();
        db.insert_cluster_member(&mut tx, a, biblical).await.unwrap();
        assert_eq!(db.cluster_ids(&tx, a).await.unwrap(), vec![biblical]);
    }

    #[tokio::test]
    async fn test_rollback_reverts_every_write() {
        let db = MemoryStore::new();

        let mut setup = db.begin_tx(TxMode::ReadWrite).await.unwrap();
        let kept = db.insert_name(&mut setup, "Mary", "en", Gender::Female).await.unwrap();
        let cluster = db.create_cluster(&mut setup, "Virtues").await.unwrap();
        db.commit_tx(setup).await.unwrap();

        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();
        let a = db.insert_name(&mut tx, "Marie", "fr", Gender::Female).await.unwrap();
        db.add_name_source(&mut tx, a, "https://example.org/marie").await.unwrap();
        db.insert_variant_edge(&mut tx, a, kept).await.unwrap();
        db.insert_translation_edge(&mut tx, kept, a, "fr").await.unwrap();
        db.insert_cluster_member(&mut tx, a, cluster).await.unwrap();
        db.insert_cluster_member(&mut tx, kept, cluster).await.unwrap();
        db.update_name(&mut tx, kept, &NameUpdate { text: Some("Maryam".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(tx.pending_writes(), 7);
        db.rollback_tx(tx).await.unwrap();

        let tx = db.begin_tx(TxMode::ReadOnly).await.unwrap();
        assert_eq!(db.name_count(&tx).await.unwrap(), 1);
        assert!(db.get_name(&tx, a).await.unwrap().is_none());
        assert!(db.find_name(&tx, "Marie", "fr", Gender::Female).await.unwrap().is_none());
        assert!(db.variant_ids(&tx, kept).await.unwrap().is_empty());
        assert!(db.translations_from(&tx, kept).await.unwrap().is_empty());
        assert!(db.cluster_ids(&tx, kept).await.unwrap().is_empty());
        let mary = db.find_name(&tx, "Mary", "en", Gender::Female).await.unwrap().unwrap();
        assert_eq!(mary.id, kept);
    }

    #[tokio::test]
    async fn test_update_name_collision() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "Jon", "en", Gender::Male).await.unwrap();
        db.insert_name(&mut tx, "John", "en", Gender::Male).await.unwrap();

        let err = db
            .update_name(&mut tx, a, &NameUpdate { text: Some("John".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        let renamed = db
            .update_name(&mut tx, a, &NameUpdate { locale: Some("EN-GB".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.locale, "en-gb");
        assert!(db.find_name(&tx, "Jon", "en", Gender::Male).await.unwrap().is_none());
        assert_eq!(db.find_name(&tx, "Jon", "en-gb", Gender::Male).await.unwrap().unwrap().id, a);
    }

    #[tokio::test]
    async fn test_detach_delete_name() {
        let db = MemoryStore::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.insert_name(&mut tx, "Juan", "es", Gender::Male).await.unwrap();
        let b = db.insert_name(&mut tx, "John", "en", Gender::Male).await.unwrap();
        let c = db.insert_name(&mut tx, "Jean", "fr", Gender::Male).await.unwrap();
        let cluster = db.create_cluster(&mut tx, "biblical").await.unwrap();
        db.insert_translation_edge(&mut tx, b, a, "es").await.unwrap();
        db.insert_translation_edge(&mut tx, a, c, "fr").await.unwrap();
        db.insert_variant_edge(&mut tx, a, c).await.unwrap();
        db.insert_cluster_member(&mut tx, a, cluster).await.unwrap();

        // Plain delete refuses while relations remain
        assert!(db.delete_name(&mut tx, a).await.is_err());

        assert!(db.detach_delete_name(&mut tx, a).await.unwrap());
        assert!(db.get_name(&tx, a).await.unwrap().is_none());
        assert!(db.translations_from(&tx, b).await.unwrap().is_empty());
        assert!(db.translations_to(&tx, c).await.unwrap().is_empty());
        assert!(db.variant_ids(&tx, c).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_fails_every_call() {
        let db = MemoryStore::new();
        db.shutdown().await.unwrap();

        let err = db.begin_tx(TxMode::ReadOnly).await.unwrap_err();
        assert!(matches!(err, Error::StorageError(_)));
    }
}
