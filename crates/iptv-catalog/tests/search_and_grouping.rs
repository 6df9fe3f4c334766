//! Search consistency, grouping and projection behavior over an in-memory
//! catalog

use tempfile::NamedTempFile;

use iptv_catalog::config::Config;
use iptv_catalog::database::Database;
use iptv_catalog::models::{ContentKind, SourceCreateRequest, SourceDescriptor, SourceKind};
use iptv_catalog::services::CatalogEngine;

async fn engine() -> CatalogEngine {
    let database = Database::new_in_memory().await.unwrap();
    database.migrate().await.unwrap();
    CatalogEngine::with_database(Config::default(), database)
}

async fn add_manifest_source(
    engine: &CatalogEngine,
    name: &str,
    content: &str,
    priority: i32,
) -> (SourceDescriptor, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), content).unwrap();

    let source = engine
        .add_source(SourceCreateRequest {
            name: name.to_string(),
            kind: SourceKind::Manifest,
            url: file.path().to_string_lossy().into_owned(),
            username: None,
            password: None,
            priority,
        })
        .await
        .unwrap();

    (source, file)
}

#[tokio::test]
async fn search_index_follows_inserts_and_deletes() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"VOD\",Inception\nhttp://host/inception.mp4\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;

    engine.ingest(source.id).await.unwrap();
    let hits = engine.search("incep", None, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Inception");
    assert_eq!(hits[0].kind, ContentKind::Movie);

    engine.remove_source(source.id).await.unwrap();
    assert!(engine.search("incep", None, None).is_empty());
}

#[tokio::test]
async fn fuzzy_search_tolerates_typos() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"VOD\",Jurassic Park\nhttp://host/jp.mp4\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let hits = engine.search("jurasic", None, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Jurassic Park");
}

#[tokio::test]
async fn search_kind_filter_restricts_results() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"VOD\",Matrix Movie Night\n\
                    http://host/m.mp4\n\
                    #EXTINF:-1 group-title=\"News\",Matrix News\n\
                    http://host/n\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let movies = engine.search("matrix", Some(ContentKind::Movie), None);
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].kind, ContentKind::Movie);
}

#[tokio::test]
async fn cross_source_grouping_picks_the_best_variant() {
    // Scenario: two sources both list "The Matrix", one 1080p and one 4K
    let engine = engine().await;
    let (one, _f1) = add_manifest_source(
        &engine,
        "one",
        "#EXTINF:-1 group-title=\"VOD\",The Matrix 1080p\nhttp://one/matrix.mp4\n",
        0,
    )
    .await;
    let (two, _f2) = add_manifest_source(
        &engine,
        "two",
        "#EXTINF:-1 group-title=\"VOD\",The Matrix 4K\nhttp://two/matrix.mp4\n",
        1,
    )
    .await;

    engine.ingest(one.id).await.unwrap();
    engine.ingest(two.id).await.unwrap();

    let items = engine.grouped_catalog(ContentKind::Movie).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].primary.quality, 5);
    assert_eq!(items[0].primary.record.source_id, two.id);
    assert_eq!(items[0].alternatives.len(), 1);
    assert_eq!(items[0].alternatives[0].record.source_id, one.id);
}

#[tokio::test]
async fn quality_ordering_always_selects_4k_as_primary() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"VOD\",Dune SD\n\
                    http://host/dune-sd.mp4\n\
                    #EXTINF:-1 group-title=\"VOD\",Dune 720p\n\
                    http://host/dune-720.mp4\n\
                    #EXTINF:-1 group-title=\"VOD\",Dune 4K\n\
                    http://host/dune-4k.mp4\n\
                    #EXTINF:-1 group-title=\"VOD\",Dune 1080p\n\
                    http://host/dune-1080.mp4\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let items = engine.grouped_catalog(ContentKind::Movie).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].primary.quality, 5);
    assert_eq!(items[0].primary.record.title, "Dune 4K");
    let qualities: Vec<u8> = items[0].alternatives.iter().map(|v| v.quality).collect();
    assert_eq!(qualities, vec![4, 3, 2]);
}

#[tokio::test]
async fn grouped_catalog_is_deterministic_across_calls() {
    let engine = engine().await;
    let (one, _f1) = add_manifest_source(
        &engine,
        "one",
        "#EXTINF:-1 group-title=\"News\",News 24\nhttp://one/n\n",
        0,
    )
    .await;
    let (two, _f2) = add_manifest_source(
        &engine,
        "two",
        "#EXTINF:-1 group-title=\"News\",News 24\nhttp://two/n\n",
        1,
    )
    .await;
    engine.ingest(one.id).await.unwrap();
    engine.ingest(two.id).await.unwrap();

    let first = engine.grouped_catalog(ContentKind::Channel).await.unwrap();
    let second = engine.grouped_catalog(ContentKind::Channel).await.unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.primary.record.id, b.primary.record.id);
        let alt_a: Vec<_> = a.alternatives.iter().map(|v| v.record.id).collect();
        let alt_b: Vec<_> = b.alternatives.iter().map(|v| v.record.id).collect();
        assert_eq!(alt_a, alt_b);
    }
    // Lower priority rank wins the tie
    assert_eq!(first[0].primary.record.source_id, one.id);
}

#[tokio::test]
async fn full_reindex_is_idempotent_and_matches_the_catalog() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"VOD\",Inception\nhttp://host/i.mp4\n\
                    #EXTINF:-1 group-title=\"News\",BBC One\nhttp://host/bbc\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let first = engine.rebuild_index().await.unwrap();
    let second = engine.rebuild_index().await.unwrap();
    assert_eq!(first, 2);
    assert_eq!(second, 2);
    assert_eq!(engine.search("incep", None, None).len(), 1);
}

#[tokio::test]
async fn episode_mutations_keep_series_rollups_current() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"Series\",Breaking Bad S01E01\n\
                    http://host/bb101.mkv\n\
                    #EXTINF:-1 group-title=\"Series\",Breaking Bad S01E02\n\
                    http://host/bb102.mkv\n\
                    #EXTINF:-1 group-title=\"Series\",Breaking Bad S02E01\n\
                    http://host/bb201.mkv\n";
    let (source, file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let rollup = engine
        .series_rollup(source.id, "breaking bad")
        .await
        .unwrap()
        .expect("rollup should exist after episode inserts");
    assert_eq!(rollup.episode_count, 3);
    assert_eq!(rollup.season_count, 2);
    assert_eq!(rollup.title, "Breaking Bad");

    // Shrinking the feed shrinks the rollup through the staleness sweep
    std::fs::write(
        file.path(),
        "#EXTINF:-1 group-title=\"Series\",Breaking Bad S01E01\nhttp://host/bb101.mkv\n",
    )
    .unwrap();
    engine.ingest(source.id).await.unwrap();

    let rollup = engine
        .series_rollup(source.id, "breaking bad")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rollup.episode_count, 1);
    assert_eq!(rollup.season_count, 1);
}

#[tokio::test]
async fn projection_rebuild_matches_incremental_state() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1 group-title=\"Series\",The Wire S01E01\n\
                    http://host/w101.mkv\n\
                    #EXTINF:-1 group-title=\"Series\",The Wire S01E02\n\
                    http://host/w102.mkv\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;
    engine.ingest(source.id).await.unwrap();

    let incremental = engine
        .series_rollup(source.id, "the wire")
        .await
        .unwrap()
        .unwrap();

    let rebuilt_series = engine.rebuild_projections().await.unwrap();
    assert_eq!(rebuilt_series, 1);

    let rebuilt = engine
        .series_rollup(source.id, "the wire")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rebuilt.episode_count, incremental.episode_count);
    assert_eq!(rebuilt.season_count, incremental.season_count);
}
