//! Multi-entity writes that commit or roll back as one unit.

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::storage::NameStore;
use crate::tx::TxMode;
use crate::{Error, Result};

/// A base name together with everything to attach to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullNameInsert {
    pub name: String,
    pub locale: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub variants: Vec<NameInput>,
    #[serde(default)]
    pub translations: Vec<NameInput>,
    #[serde(default)]
    pub clusters: Vec<ClusterId>,
}

impl FullNameInsert {
    pub fn new(name: impl Into<String>, locale: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
            gender,
            source_url: None,
            variants: Vec::new(),
            translations: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_variant(mut self, variant: NameInput) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_translation(mut self, translation: NameInput) -> Self {
        self.translations.push(translation);
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterId) -> Self {
        self.clusters.push(cluster);
        self
    }
}

/// Provenance shared by every name of a batch import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchMeta {
    pub source_url: Option<String>,
}

/// Insert `payload` in a single read-write transaction.
///
/// 1. insert or resolve the base name
/// 2. attach the source record, if any
/// 3. each variant: insert or resolve, then link `base ↔ variant`
/// 4. each translation: insert or resolve, then link `base → target`
///    tagged with the target's locale
/// 5. each cluster: add the base name as member
///
/// Any failure rolls every step back and is returned as
/// [`Error::AtomicInsert`] carrying the base name and the cause.
pub async fn insert_name_atomic<S: NameStore>(store: &S, payload: &FullNameInsert) -> Result<NameId> {
    let mut tx = store.begin_tx(TxMode::ReadWrite).await?;

    match write_all(store, &mut tx, payload).await {
        Ok(id) => {
            store.commit_tx(tx).await.map_err(|err| wrap(payload, err))?;
            tracing::info!(
                name_id = %id,
                name = %payload.name,
                variants = payload.variants.len(),
                translations = payload.translations.len(),
                clusters = payload.clusters.len(),
                "inserted name atomically"
            );
            Ok(id)
        }
        Err(err) => {
            tracing::error!(name = %payload.name, error = %err, "atomic insert failed, rolling back");
            if let Err(rollback_err) = store.rollback_tx(tx).await {
                tracing::error!(name = %payload.name, error = %rollback_err, "rollback failed");
            }
            Err(wrap(payload, err))
        }
    }
}

async fn write_all<S: NameStore>(store: &S, tx: &mut S::Tx, payload: &FullNameInsert) -> Result<NameId> {
    let base = store.insert_name(tx, &payload.name, &payload.locale, payload.gender).await?;

    if let Some(url) = payload.source_url.as_deref().filter(|u| !u.trim().is_empty()) {
        store.add_name_source(tx, base, url).await?;
    }

    for variant in &payload.variants {
        let id = store.insert_name(tx, &variant.name, &variant.locale, variant.gender).await?;
        if id != base {
            store.insert_variant_edge(tx, base, id).await?;
        }
    }

    for translation in &payload.translations {
        let id = store.insert_name(tx, &translation.name, &translation.locale, translation.gender).await?;
        if id != base {
            store.insert_translation_edge(tx, base, id, &translation.locale).await?;
        }
    }

    for cluster in &payload.clusters {
        store.insert_cluster_member(tx, base, *cluster).await?;
    }

    Ok(base)
}

fn wrap(payload: &FullNameInsert, err: Error) -> Error {
    Error::AtomicInsert { name: payload.name.clone(), source: Box::new(err) }
}
