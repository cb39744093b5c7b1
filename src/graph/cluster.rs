//! Cluster memberships and their propagation along variants/translations.

use std::sync::Arc;

use hashbrown::HashSet;

use crate::model::*;
use crate::storage::NameStore;
use crate::tx::TxMode;
use crate::Result;

pub struct ClusterService<S: NameStore> {
    store: Arc<S>,
}

impl<S: NameStore> Clone for ClusterService<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: NameStore> ClusterService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a cluster, or return the one that already has this label.
    pub async fn create_cluster(&self, label: &str) -> Result<ClusterId> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let id = self.store.create_cluster(&mut tx, label).await?;
        self.store.commit_tx(tx).await?;
        tracing::info!(cluster_id = %id, label, "cluster ready");
        Ok(id)
    }

    pub async fn clusters(&self) -> Result<Vec<Cluster>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let clusters = self.store.all_clusters(&tx).await?;
        self.store.commit_tx(tx).await?;
        Ok(clusters)
    }

    /// Add `name` to `cluster`. Fails with `Error::Referential` when the
    /// cluster does not exist.
    pub async fn add_cluster_member(&self, name: NameId, cluster: ClusterId) -> Result<()> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        if let Err(err) = self.store.insert_cluster_member(&mut tx, name, cluster).await {
            self.store.rollback_tx(tx).await?;
            return Err(err);
        }
        self.store.commit_tx(tx).await?;
        tracing::info!(cluster_id = %cluster, name_id = %name, "added cluster member");
        Ok(())
    }

    pub async fn remove_cluster_member(&self, name: NameId, cluster: ClusterId) -> Result<()> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let existed = self.store.delete_cluster_member(&mut tx, name, cluster).await?;
        self.store.commit_tx(tx).await?;
        tracing::info!(cluster_id = %cluster, name_id = %name, existed, "removed cluster member");
        Ok(())
    }

    pub async fn cluster_ids(&self, name: NameId) -> Result<Vec<ClusterId>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let ids = self.store.cluster_ids(&tx, name).await?;
        self.store.commit_tx(tx).await?;
        Ok(ids)
    }

    /// Memberships of `name` resolved to clusters.
    pub async fn clusters_for(&self, name: NameId) -> Result<Vec<Cluster>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let clusters = self.resolve(&tx, name).await?;
        self.store.commit_tx(tx).await?;
        Ok(clusters)
    }

    /// Give `name` every cluster held by its direct variants and direct
    /// (outgoing) translations. Returns the memberships that were added.
    ///
    /// Additive only: memberships `name` already has are never removed,
    /// even when they no longer follow from its neighbours.
    pub async fn recompute_clusters_for_name(&self, name: NameId) -> Result<Vec<ClusterId>> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        match self.propagate(&mut tx, name).await {
            Ok(added) => {
                self.store.commit_tx(tx).await?;
                tracing::info!(name_id = %name, added = added.len(), "recomputed clusters");
                Ok(added)
            }
            Err(err) => {
                tracing::error!(name_id = %name, error = %err, "failed to recompute clusters");
                self.store.rollback_tx(tx).await?;
                Err(err)
            }
        }
    }

    /// Recompute inside the caller's transaction.
    pub(crate) async fn propagate(&self, tx: &mut S::Tx, name: NameId) -> Result<Vec<ClusterId>> {
        let mut neighbours = self.store.variant_ids(tx, name).await?;
        neighbours.extend(self.store.translations_from(tx, name).await?.into_iter().map(|e| e.dst));

        let existing: HashSet<ClusterId> = self.store.cluster_ids(tx, name).await?.into_iter().collect();
        let mut inherited = Vec::new();
        let mut seen = HashSet::new();
        for neighbour in neighbours {
            for cluster in self.store.cluster_ids(tx, neighbour).await? {
                if !existing.contains(&cluster) && seen.insert(cluster) {
                    inherited.push(cluster);
                }
            }
        }

        for cluster in &inherited {
            self.store.insert_cluster_member(tx, name, *cluster).await?;
        }
        Ok(inherited)
    }

    /// Clusters stored for `(text, locale, gender)`; empty when the name is
    /// unknown.
    pub async fn stored_clusters(&self, text: &str, locale: &str, gender: Gender) -> Result<Vec<Cluster>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let clusters = match self.store.find_name(&tx, text, locale, gender).await? {
            Some(base) => self.resolve(&tx, base.id).await?,
            None => Vec::new(),
        };
        self.store.commit_tx(tx).await?;
        Ok(clusters)
    }

    pub async fn persisted_clusters(&self, text: &str, locale: &str, gender: Gender) -> Result<Vec<PersistedCluster>> {
        Ok(self
            .stored_clusters(text, locale, gender)
            .await?
            .into_iter()
            .map(|c| PersistedCluster { id: Some(c.id), label: c.label })
            .collect())
    }

    /// Candidate clusters, in order:
    ///
    /// 1. manual hints (0.5)
    /// 2. the name's own stored clusters (0.9)
    /// 3. clusters of confirmed variants, i.e. candidates with confidence
    ///    ≥ 0.9, looked up in the base locale (0.7)
    /// 4. clusters of confirmed translations, looked up in their own
    ///    locale (0.7)
    ///
    /// Each failed store lookup is logged and skipped.
    pub async fn find_clusters(
        &self,
        text: &str,
        locale: &str,
        gender: Gender,
        manual: &[String],
        variants: &[VariantCandidate],
        translations: &[TranslationCandidate],
    ) -> Vec<ClusterCandidate> {
        let mut candidates: Vec<ClusterCandidate> = manual
            .iter()
            .map(|hint| {
                tracing::debug!(hint = %hint, "manual cluster candidate");
                Candidate::manual(ClusterProposal { label: hint.clone() })
                    .with_rationale("Manually provided cluster")
            })
            .collect();

        match self.stored_clusters(text, locale, gender).await {
            Ok(stored) => {
                tracing::debug!(name = %text, count = stored.len(), "found stored clusters");
                candidates.extend(stored.into_iter().map(|c| {
                    stored_candidate(c, PERSISTED_CONFIDENCE, "Confirmed cluster in name store")
                }));
            }
            Err(err) => {
                tracing::error!(name = %text, error = %err, "failed to fetch stored clusters");
            }
        }

        for variant in variants.iter().filter(|v| v.confidence >= PERSISTED_CONFIDENCE) {
            match self.stored_clusters(&variant.payload.name, locale, gender).await {
                Ok(stored) => candidates.extend(stored.into_iter().map(|c| {
                    stored_candidate(c, INHERITED_CONFIDENCE, "Cluster of a confirmed variant")
                })),
                Err(err) => {
                    tracing::error!(variant = %variant.payload.name, error = %err, "failed to fetch variant clusters");
                }
            }
        }

        for translation in translations.iter().filter(|t| t.confidence >= PERSISTED_CONFIDENCE) {
            let payload = &translation.payload;
            match self.stored_clusters(&payload.name, &payload.locale, gender).await {
                Ok(stored) => candidates.extend(stored.into_iter().map(|c| {
                    stored_candidate(c, INHERITED_CONFIDENCE, "Cluster of a confirmed translation")
                })),
                Err(err) => {
                    tracing::error!(translation = %payload.name, error = %err, "failed to fetch translation clusters");
                }
            }
        }

        candidates
    }

    async fn resolve(&self, tx: &S::Tx, name: NameId) -> Result<Vec<Cluster>> {
        let mut clusters = Vec::new();
        for id in self.store.cluster_ids(tx, name).await? {
            if let Some(cluster) = self.store.get_cluster(tx, id).await? {
                clusters.push(cluster);
            }
        }
        Ok(clusters)
    }
}

fn stored_candidate(cluster: Cluster, confidence: f64, rationale: &str) -> ClusterCandidate {
    Candidate::new(ClusterProposal { label: cluster.label }, confidence, CandidateSource::Heuristic)
        .with_rationale(rationale)
        .with_meta("persisted", true)
        .with_meta("clusterId", cluster.id.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::graph::{TranslationService, VariantService};
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: Arc<MemoryStore>,
        clusters: ClusterService<MemoryStore>,
        variants: VariantService<MemoryStore>,
        translations: TranslationService<MemoryStore>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            clusters: ClusterService::new(Arc::clone(&store)),
            variants: VariantService::new(Arc::clone(&store)),
            translations: TranslationService::new(Arc::clone(&store)),
            store,
        }
    }

    async fn name(store: &MemoryStore, text: &str, locale: &str) -> NameId {
        let mut tx = store.begin_tx(TxMode::ReadWrite).await.unwrap();
        let id = store.insert_name(&mut tx, text, locale, Gender::Female).await.unwrap();
        store.commit_tx(tx).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_membership_requires_existing_cluster() {
        let f = fixture().await;
        let maria = name(&f.store, "Maria", "es").await;

        let err = f.clusters.add_cluster_member(maria, ClusterId(9999)).await.unwrap_err();
        assert!(matches!(err, Error::Referential(_)));
        assert!(f.clusters.cluster_ids(maria).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_remove_member() {
        let f = fixture().await;
        let maria = name(&f.store, "Maria", "es").await;
        let biblical = f.clusters.create_cluster("biblical").await.unwrap();

        f.clusters.add_cluster_member(maria, biblical).await.unwrap();
        let clusters = f.clusters.clusters_for(maria).await.unwrap();
        assert_eq!(clusters, vec![Cluster { id: biblical, label: "biblical".into() }]);

        f.clusters.remove_cluster_member(maria, biblical).await.unwrap();
        f.clusters.remove_cluster_member(maria, biblical).await.unwrap();
        assert!(f.clusters.cluster_ids(maria).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recompute_inherits_from_neighbours() {
        let f = fixture().await;
        let mary = name(&f.store, "Mary", "en").await;
        let maria = name(&f.store, "Maria", "es").await;
        let marie = name(&f.store, "Marie", "fr").await;
        let mari = name(&f.store, "Mari", "en").await;
        let biblical = f.clusters.create_cluster("biblical").await.unwrap();
        let spanish = f.clusters.create_cluster("spanish").await.unwrap();
        let french = f.clusters.create_cluster("french").await.unwrap();
        let virtues = f.clusters.create_cluster("virtues").await.unwrap();

        f.clusters.add_cluster_member(maria, biblical).await.unwrap();
        f.clusters.add_cluster_member(maria, spanish).await.unwrap();
        f.clusters.add_cluster_member(marie, french).await.unwrap();
        f.clusters.add_cluster_member(marie, biblical).await.unwrap();
        f.clusters.add_cluster_member(mary, virtues).await.unwrap();

        f.translations.add_translation(mary, maria, "es").await.unwrap();
        f.variants.add_variant(mary, marie).await.unwrap();
        // Only direct neighbours count
        f.variants.add_variant(marie, mari).await.unwrap();

        let added = f.clusters.recompute_clusters_for_name(mary).await.unwrap();
        let mut added_sorted = added.clone();
        added_sorted.sort();
        assert_eq!(added_sorted, vec![biblical, spanish, french]);

        let mut all = f.clusters.cluster_ids(mary).await.unwrap();
        all.sort();
        assert_eq!(all, vec![biblical, spanish, french, virtues]);

        // Running again adds nothing
        assert!(f.clusters.recompute_clusters_for_name(mary).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recompute_is_additive_only() {
        let f = fixture().await;
        let mary = name(&f.store, "Mary", "en").await;
        let maria = name(&f.store, "Maria", "es").await;
        let spanish = f.clusters.create_cluster("spanish").await.unwrap();
        f.clusters.add_cluster_member(maria, spanish).await.unwrap();
        f.translations.add_translation(mary, maria, "es").await.unwrap();
        f.clusters.recompute_clusters_for_name(mary).await.unwrap();

        // Dropping the translation does not revoke the inherited membership
        f.translations.remove_translation(mary, maria).await.unwrap();
        f.clusters.recompute_clusters_for_name(mary).await.unwrap();
        assert_eq!(f.clusters.cluster_ids(mary).await.unwrap(), vec![spanish]);
    }

    #[tokio::test]
    async fn test_find_clusters_orders_sources() {
        let f = fixture().await;
        let maria = name(&f.store, "Maria", "es").await;
        let marie = name(&f.store, "Marie", "fr").await;
        let biblical = f.clusters.create_cluster("biblical").await.unwrap();
        let french = f.clusters.create_cluster("french").await.unwrap();
        f.clusters.add_cluster_member(maria, biblical).await.unwrap();
        f.clusters.add_cluster_member(marie, french).await.unwrap();

        let confirmed = Candidate::new(
            TranslationProposal { name: "Marie".into(), locale: "fr".into() },
            PERSISTED_CONFIDENCE,
            CandidateSource::Heuristic,
        );
        let weak = Candidate::manual(TranslationProposal { name: "Marie".into(), locale: "fr".into() });

        let found = f
            .clusters
            .find_clusters("Maria", "es", Gender::Female, &["virtues".to_string()], &[], &[confirmed, weak])
            .await;
        let labels: Vec<(&str, f64)> = found.iter().map(|c| (c.payload.label.as_str(), c.confidence)).collect();
        assert_eq!(labels, vec![("virtues", 0.5), ("biblical", 0.9), ("french", 0.7)]);
    }
}
