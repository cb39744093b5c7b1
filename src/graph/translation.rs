//! Translation relations: directed `A → B` edges tagged with B's locale.
//!
//! Edges are stored one way only. `linked_translations` and
//! `translation_group` read them as undirected; that is a view, not a
//! stored invariant.

use std::sync::Arc;

use hashbrown::HashSet;

use crate::model::*;
use crate::storage::NameStore;
use crate::tx::TxMode;
use crate::Result;
use super::ComponentWalk;

pub struct TranslationService<S: NameStore> {
    store: Arc<S>,
}

impl<S: NameStore> Clone for TranslationService<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: NameStore> TranslationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record `src → dst` in `locale`. A self-loop is a silent no-op.
    pub async fn add_translation(&self, src: NameId, dst: NameId, locale: &str) -> Result<()> {
        if src == dst {
            tracing::debug!(name_id = %src, "ignoring self-translation");
            return Ok(());
        }
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        if let Err(err) = self.store.insert_translation_edge(&mut tx, src, dst, locale).await {
            tracing::error!(name_id = %src, translated_id = %dst, error = %err, "failed to add translation");
            self.store.rollback_tx(tx).await?;
            return Err(err);
        }
        self.store.commit_tx(tx).await?;
        tracing::info!(name_id = %src, translated_id = %dst, locale, "added translation");
        Ok(())
    }

    /// Remove `src → dst`. The reverse edge, if any, is kept.
    pub async fn remove_translation(&self, src: NameId, dst: NameId) -> Result<()> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let existed = self.store.delete_translation_edge(&mut tx, src, dst).await?;
        self.store.commit_tx(tx).await?;
        tracing::info!(name_id = %src, translated_id = %dst, existed, "removed translation");
        Ok(())
    }

    /// Targets of outgoing edges.
    pub async fn translation_ids(&self, id: NameId) -> Result<Vec<NameId>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let edges = self.store.translations_from(&tx, id).await?;
        self.store.commit_tx(tx).await?;
        Ok(edges.into_iter().map(|e| e.dst).collect())
    }

    /// Outgoing edges resolved to stored names.
    pub async fn translations(&self, id: NameId) -> Result<Vec<TranslationLink>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let edges = self.store.translations_from(&tx, id).await?;
        let links = self.resolve(&tx, id, edges).await?;
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %id, count = links.len(), "retrieved translations");
        Ok(links)
    }

    /// Union of both directions, each partner once.
    pub async fn linked_translations(&self, id: NameId) -> Result<Vec<TranslationLink>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let links = self.linked(&tx, id).await?;
        self.store.commit_tx(tx).await?;
        Ok(links)
    }

    /// Names reachable from `id` following translation edges in either
    /// direction, `id` first.
    pub async fn translation_group(&self, id: NameId) -> Result<Vec<NameId>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut walk = ComponentWalk::new(id);
        while let Some(current) = walk.next_unvisited() {
            let outgoing = self.store.translations_from(&tx, current).await?;
            let incoming = self.store.translations_to(&tx, current).await?;
            walk.extend(outgoing.into_iter().map(|e| e.dst));
            walk.extend(incoming.into_iter().map(|e| e.src));
        }
        self.store.commit_tx(tx).await?;
        tracing::debug!(name_id = %id, size = walk.visited_count(), "computed translation group");
        Ok(walk.into_ids())
    }

    /// Translations stored for `(text, locale, gender)` in both directions;
    /// empty when the name itself is unknown.
    pub async fn stored_translations(&self, text: &str, locale: &str, gender: Gender) -> Result<Vec<TranslationLink>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let links = match self.store.find_name(&tx, text, locale, gender).await? {
            Some(base) => self.linked(&tx, base.id).await?,
            None => Vec::new(),
        };
        self.store.commit_tx(tx).await?;
        Ok(links)
    }

    pub async fn persisted_translations(
        &self,
        text: &str,
        locale: &str,
        gender: Gender,
    ) -> Result<Vec<PersistedTranslation>> {
        Ok(self
            .stored_translations(text, locale, gender)
            .await?
            .into_iter()
            .map(|l| PersistedTranslation { id: Some(l.id), name: l.name, locale: l.locale })
            .collect())
    }

    /// Candidate translations: manual hints first, then translations
    /// confirmed in the store.
    ///
    /// A store failure is logged and only the manual candidates are
    /// returned.
    pub async fn find_translations(
        &self,
        text: &str,
        locale: &str,
        gender: Gender,
        manual: &[TranslationHint],
    ) -> Vec<TranslationCandidate> {
        let mut candidates: Vec<TranslationCandidate> = manual
            .iter()
            .map(|hint| {
                tracing::debug!(hint = %hint.name, locale = %hint.locale, "manual translation candidate");
                Candidate::manual(TranslationProposal { name: hint.name.clone(), locale: hint.locale.clone() })
                    .with_rationale("Manually provided translation")
            })
            .collect();

        match self.stored_translations(text, locale, gender).await {
            Ok(stored) => {
                tracing::debug!(name = %text, count = stored.len(), "found stored translations");
                candidates.extend(stored.into_iter().map(|l| {
                    Candidate::new(
                        TranslationProposal { name: l.name, locale: l.locale },
                        PERSISTED_CONFIDENCE,
                        CandidateSource::Heuristic,
                    )
                    .with_rationale("Confirmed translation in name store")
                    .with_meta("persisted", true)
                    .with_meta("nameId", l.id.0)
                }));
            }
            Err(err) => {
                tracing::error!(name = %text, error = %err, "failed to fetch stored translations");
            }
        }

        candidates
    }

    /// Every stored edge, up to `limit`.
    pub async fn list_all(&self, limit: usize) -> Result<Vec<TranslationEdge>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut edges = Vec::new();
        for name in self.store.all_names(&tx).await? {
            if edges.len() >= limit {
                break;
            }
            edges.extend(self.store.translations_from(&tx, name.id).await?);
        }
        self.store.commit_tx(tx).await?;
        edges.truncate(limit);
        Ok(edges)
    }

    async fn linked(&self, tx: &S::Tx, id: NameId) -> Result<Vec<TranslationLink>> {
        let mut edges = self.store.translations_from(tx, id).await?;
        edges.extend(self.store.translations_to(tx, id).await?);
        let mut seen = HashSet::new();
        edges.retain(|e| e.other_name(id).is_some_and(|other| seen.insert(other)));
        self.resolve(tx, id, edges).await
    }

    async fn resolve(&self, tx: &S::Tx, from: NameId, edges: Vec<TranslationEdge>) -> Result<Vec<TranslationLink>> {
        let mut links = Vec::with_capacity(edges.len());
        for edge in edges {
            let Some(other) = edge.other_name(from) else { continue };
            if let Some(name) = self.store.get_name(tx, other).await? {
                links.push(TranslationLink {
                    id: name.id,
                    name: name.text,
                    locale: name.locale,
                    gender: name.gender,
                    edge_locale: edge.locale,
                });
            }
        }
        Ok(links)
    }
}
