//! End-to-end tests for the three graph services.
//!
//! Each test runs against a fresh in-memory `Lexicon` and goes through the
//! public service handles only.

use namegraph::{ClusterId, Error, Gender, Lexicon, MemoryStore, NameId};
use pretty_assertions::assert_eq;

async fn names(lexicon: &Lexicon<MemoryStore>, entries: &[(&str, &str)]) -> Vec<NameId> {
    let mut ids = Vec::new();
    for (text, locale) in entries {
        ids.push(lexicon.insert_name(text, locale, Gender::Female).await.unwrap());
    }
    ids
}

// ============================================================================
// 1. Variants
// ============================================================================

#[tokio::test]
async fn test_variant_edges_read_symmetric() {
    let lexicon = Lexicon::open_memory().await.unwrap();
    let ids = names(&lexicon, &[("Mary", "en"), ("Marie", "en"), ("Maria", "en")]).await;

    lexicon.variants().add_variant(ids[0], ids[1]).await.unwrap();
    lexicon.variants().add_variant(ids[1], ids[0]).await.unwrap();

    assert_eq!(lexicon.variants().variant_ids(ids[0]).await.unwrap(), vec![ids[1]]);
    assert_eq!(lexicon.variants().variant_ids(ids[1]).await.unwrap(), vec![ids[0]]);

    lexicon.variants().remove_variant(ids[1], ids[0]).await.unwrap();
    assert!(lexicon.variants().variant_ids(ids[0]).await.unwrap().is_empty());
    assert!(lexicon.variants().variant_ids(ids[1]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_variant_group_is_the_component() {
    let lexicon = Lexicon::open_memory().await.unwrap();
    let ids = names(
        &lexicon,
        &[("Mary", "en"), ("Marie", "en"), ("Maria", "en"), ("Mia", "en"), ("Ada", "en")],
    )
    .await;
    let v = lexicon.variants();
    v.add_variant(ids[0], ids[1]).await.unwrap();
    v.add_variant(ids[1], ids[2]).await.unwrap();
    v.add_variant(ids[2], ids[3]).await.unwrap();
    v.add_variant(ids[3], ids[0]).await.unwrap();

    let mut group = v.variant_group(ids[2]).await.unwrap();
    assert_eq!(group[0], ids[2]);
    assert_eq!(group.len(), 4);
    group.sort();
    assert_eq!(group, ids[..4].to_vec());

    assert_eq!(v.variant_group(ids[4]).await.unwrap(), vec![ids[4]]);
}

// ============================================================================
// 2. Translations
// ============================================================================

#[tokio::test]
async fn test_translation_group_walks_both_directions() {
    let lexicon = Lexicon::open_memory().await.unwrap();
    let ids = names(&lexicon, &[("Mary", "en"), ("María", "es"), ("Marie", "fr"), ("Maria", "it")]).await;
    let t = lexicon.translations();
    t.add_translation(ids[0], ids[1], "es").await.unwrap();
    t.add_translation(ids[2], ids[0], "en").await.unwrap();

    let mut group = t.translation_group(ids[1]).await.unwrap();
    group.sort();
    assert_eq!(group, vec![ids[0], ids[1], ids[2]]);

    // Stored edges stay directed
    assert_eq!(t.translation_ids(ids[0]).await.unwrap(), vec![ids[1]]);
    assert!(t.translation_ids(ids[1]).await.unwrap().is_empty());

    let all = t.list_all(10).await.unwrap();
    assert_eq!(all.len(), 2);
}

// ============================================================================
// 3. Clusters
// ============================================================================

#[tokio::test]
async fn test_membership_requires_existing_cluster() {
    let lexicon = Lexicon::open_memory().await.unwrap();
    let ids = names(&lexicon, &[("Mary", "en")]).await;

    let err = lexicon.clusters().add_cluster_member(ids[0], ClusterId(42)).await.unwrap_err();
    assert!(matches!(err, Error::Referential(_)));
    assert!(lexicon.clusters().cluster_ids(ids[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recompute_is_additive() {
    let lexicon = Lexicon::open_memory().await.unwrap();
    let ids = names(&lexicon, &[("Mary", "en"), ("Maria", "en"), ("Marie", "fr")]).await;
    let (mary, maria, marie) = (ids[0], ids[1], ids[2]);

    let c = lexicon.clusters();
    let biblical = c.create_cluster("biblical").await.unwrap();
    let french = c.create_cluster("french").await.unwrap();
    c.add_cluster_member(maria, biblical).await.unwrap();
    c.add_cluster_member(marie, french).await.unwrap();

    lexicon.variants().add_variant(mary, maria).await.unwrap();
    lexicon.translations().add_translation(mary, marie, "fr").await.unwrap();

    let added = c.recompute_clusters_for_name(mary).await.unwrap();
    assert_eq!(added, vec![biblical, french]);

    // Dropping the neighbours does not take the memberships away
    lexicon.variants().remove_variant(mary, maria).await.unwrap();
    lexicon.translations().remove_translation(mary, marie).await.unwrap();
    assert!(c.recompute_clusters_for_name(mary).await.unwrap().is_empty());

    let mut held = c.cluster_ids(mary).await.unwrap();
    held.sort();
    assert_eq!(held, vec![biblical, french]);
}
