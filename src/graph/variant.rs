//! Variant relations: symmetric `A ↔ B` edges between spellings of one name.

use std::sync::Arc;

use crate::model::*;
use crate::storage::NameStore;
use crate::tx::TxMode;
use crate::Result;
use super::ComponentWalk;

pub struct VariantService<S: NameStore> {
    store: Arc<S>,
}

impl<S: NameStore> Clone for VariantService<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: NameStore> VariantService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Link `a ↔ b`. A self-loop is a silent no-op; repeating is safe.
    pub async fn add_variant(&self, a: NameId, b: NameId) -> Result<()> {
        if a == b {
            tracing::debug!(name_id = %a, "ignoring self-variant");
            return Ok(());
        }
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        self.store.insert_variant_edge(&mut tx, a, b).await?;
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %a, variant_id = %b, "added variant relation");
        Ok(())
    }

    /// Unlink `a ↔ b`. Removing a missing edge is not an error.
    pub async fn remove_variant(&self, a: NameId, b: NameId) -> Result<()> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let existed = self.store.delete_variant_edge(&mut tx, a, b).await?;
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %a, variant_id = %b, existed, "removed variant relation");
        Ok(())
    }

    /// Direct neighbours only.
    pub async fn variant_ids(&self, id: NameId) -> Result<Vec<NameId>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let ids = self.store.variant_ids(&tx, id).await?;
        self.store.commit_tx(tx).await?;
        Ok(ids)
    }

    /// Direct neighbours resolved to stored names.
    pub async fn variants(&self, id: NameId) -> Result<Vec<Name>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let names = self.resolve_neighbours(&tx, id).await?;
        self.store.commit_tx(tx).await?;
        Ok(names)
    }

    /// Full connected component of `id` over variant edges, `id` first.
    ///
    /// Not isolated from concurrent edge mutations on the same component.
    pub async fn variant_group(&self, id: NameId) -> Result<Vec<NameId>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut walk = ComponentWalk::new(id);
        while let Some(current) = walk.next_unvisited() {
            let neighbours = self.store.variant_ids(&tx, current).await?;
            walk.extend(neighbours);
        }
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %id, size = walk.visited_count(), "computed variant group");
        Ok(walk.into_ids())
    }

    /// Variants stored for the name `(text, locale, gender)`; empty when
    /// the name itself is unknown.
    pub async fn stored_variants(&self, text: &str, locale: &str, gender: Gender) -> Result<Vec<Name>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let names = match self.store.find_name(&tx, text, locale, gender).await? {
            Some(base) => self.resolve_neighbours(&tx, base.id).await?,
            None => Vec::new(),
        };
        self.store.commit_tx(tx).await?;
        Ok(names)
    }

    /// Stored variants shaped for the decorators' dedupe oracle.
    pub async fn persisted_variants(&self, text: &str, locale: &str, gender: Gender) -> Result<Vec<PersistedVariant>> {
        Ok(self
            .stored_variants(text, locale, gender)
            .await?
            .into_iter()
            .map(|n| PersistedVariant { id: Some(n.id), name: n.text, locale: Some(n.locale) })
            .collect())
    }

    /// Candidate variants: manual hints first, then variants confirmed in
    /// the store.
    ///
    /// A store failure is logged and only the manual candidates are
    /// returned.
    pub async fn find_variants(
        &self,
        text: &str,
        locale: &str,
        gender: Gender,
        manual: &[String],
    ) -> Vec<VariantCandidate> {
        let mut candidates: Vec<VariantCandidate> = manual
            .iter()
            .map(|hint| {
                tracing::debug!(hint = %hint, "manual variant candidate");
                Candidate::manual(VariantProposal { name: hint.clone(), locale: None })
                    .with_rationale("Manually provided variant")
            })
            .collect();

        match self.stored_variants(text, locale, gender).await {
            Ok(stored) => {
                tracing::debug!(name = %text, count = stored.len(), "found stored variants");
                candidates.extend(stored.into_iter().map(|n| {
                    Candidate::new(
                        VariantProposal { name: n.text, locale: Some(n.locale) },
                        PERSISTED_CONFIDENCE,
                        CandidateSource::Heuristic,
                    )
                    .with_rationale("Confirmed variant in name store")
                    .with_meta("persisted", true)
                    .with_meta("nameId", n.id.0)
                }));
            }
            Err(err) => {
                tracing::error!(name = %text, error = %err, "failed to fetch stored variants");
            }
        }

        candidates
    }

    /// Every variant pair once (`a < b`), up to `limit`.
    pub async fn list_all(&self, limit: usize) -> Result<Vec<(Name, Name)>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut pairs = Vec::new();
        'names: for name in self.store.all_names(&tx).await? {
            for other in self.store.variant_ids(&tx, name.id).await? {
                if other <= name.id {
                    continue;
                }
                if pairs.len() >= limit {
                    break 'names;
                }
                if let Some(variant) = self.store.get_name(&tx, other).await? {
                    pairs.push((name.clone(), variant));
                }
            }
        }
        self.store.commit_tx(tx).await?;
        Ok(pairs)
    }

    async fn resolve_neighbours(&self, tx: &S::Tx, id: NameId) -> Result<Vec<Name>> {
        let mut names = Vec::new();
        for other in self.store.variant_ids(tx, id).await? {
            if let Some(name) = self.store.get_name(tx, other).await? {
                names.push(name);
            }
        }
        Ok(names)
    }
}
