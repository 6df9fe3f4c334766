//! End-to-end ingestion behavior over an in-memory catalog

use tempfile::NamedTempFile;

use iptv_catalog::config::Config;
use iptv_catalog::database::Database;
use iptv_catalog::errors::{AppError, IngestError};
use iptv_catalog::models::{SourceCreateRequest, SourceDescriptor, SourceKind};
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

fn two_channel_manifest() -> &'static str {
    "#EXTM3U\n\
     #EXTINF:-1 group-title=\"News\",BBC One\n\
     http://host/bbc\n\
     #EXTINF:-1 group-title=\"News\",ITV\n\
     http://host/itv\n"
}

#[tokio::test]
async fn ingestion_is_idempotent_on_unchanged_feed() {
    let engine = engine().await;
    let (source, _file) = add_manifest_source(&engine, "a", two_channel_manifest(), 0).await;

    let first = engine.ingest(source.id).await.unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.updated, 0);

    let second = engine.ingest(source.id).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped_duplicates, 2);

    let records = engine.records().find_by_source(&source.id).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn duplicate_titles_within_a_run_collapse_to_one_record() {
    let engine = engine().await;
    let manifest = "#EXTINF:-1,BBC One\n\
                    http://host/a\n\
                    #EXTINF:-1,BBC One\n\
                    http://host/b\n\
                    #EXTINF:-1,BBC One\n\
                    http://host/c\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;

    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, 2);

    let records = engine.records().find_by_source(&source.id).await.unwrap();
    assert_eq!(records.len(), 1);
    // First occurrence wins
    assert_eq!(records[0].stream_url, "http://host/a");
}

#[tokio::test]
async fn duplicate_title_with_different_url_is_skipped() {
    // Scenario: one channel entry followed by a duplicate title with a
    // different URL
    let engine = engine().await;
    let manifest = "#EXTINF:-1,News 24\n\
                    http://host/first\n\
                    #EXTINF:-1,News 24\n\
                    http://host/second\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;

    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, 1);
}

#[tokio::test]
async fn malformed_entries_are_counted_not_fatal() {
    // Five entries where the second lacks a URL: four committed, one skip
    let engine = engine().await;
    let manifest = "#EXTINF:-1,One\n\
                    http://host/1\n\
                    #EXTINF:-1,Two Without Url\n\
                    #EXTINF:-1,Three\n\
                    http://host/3\n\
                    #EXTINF:-1,Four\n\
                    http://host/4\n\
                    #EXTINF:-1,Five\n\
                    http://host/5\n";
    let (source, _file) = add_manifest_source(&engine, "a", manifest, 0).await;

    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.inserted, 4);
    assert_eq!(report.failed_records, 1);
    assert!(!report.messages.is_empty());

    let records = engine.records().find_by_source(&source.id).await.unwrap();
    assert_eq!(records.len(), 4);
}

#[tokio::test]
async fn whitespace_only_feed_is_an_empty_feed_error() {
    let engine = engine().await;
    let (source, _file) = add_manifest_source(&engine, "a", "   \n\n  \n", 0).await;

    let err = engine.ingest(source.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Ingest(IngestError::EmptyFeed { .. })
    ));

    // Never a silent zero-record success: the failure lands on the source
    let sources = engine.list_sources().await.unwrap();
    assert!(sources[0].last_error.is_some());
}

#[tokio::test]
async fn deleting_one_source_never_touches_another() {
    let engine = engine().await;
    let (source_a, _fa) = add_manifest_source(&engine, "a", two_channel_manifest(), 0).await;
    let manifest_b = "#EXTINF:-1,Canal B\nhttp://other/b\n";
    let (source_b, _fb) = add_manifest_source(&engine, "b", manifest_b, 1).await;

    engine.ingest(source_a.id).await.unwrap();
    engine.ingest(source_b.id).await.unwrap();

    engine.remove_source(source_a.id).await.unwrap();

    let remaining_a = engine.records().find_by_source(&source_a.id).await.unwrap();
    let remaining_b = engine.records().find_by_source(&source_b.id).await.unwrap();
    assert!(remaining_a.is_empty());
    assert_eq!(remaining_b.len(), 1);
    assert_eq!(remaining_b[0].title, "Canal B");
}

#[tokio::test]
async fn reingestion_updates_changed_records_in_place() {
    let engine = engine().await;
    let (source, file) = add_manifest_source(
        &engine,
        "a",
        "#EXTINF:-1,BBC One\nhttp://host/old\n",
        0,
    )
    .await;
    engine.ingest(source.id).await.unwrap();

    std::fs::write(file.path(), "#EXTINF:-1,BBC One\nhttp://host/new\n").unwrap();
    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 1);

    let records = engine.records().find_by_source(&source.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stream_url, "http://host/new");
}

#[tokio::test]
async fn staleness_sweep_removes_records_absent_from_the_latest_pass() {
    let engine = engine().await;
    let (source, file) = add_manifest_source(&engine, "a", two_channel_manifest(), 0).await;
    engine.ingest(source.id).await.unwrap();

    std::fs::write(
        file.path(),
        "#EXTINF:-1 group-title=\"News\",BBC One\nhttp://host/bbc\n",
    )
    .unwrap();
    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.removed_stale, 1);

    let records = engine.records().find_by_source(&source.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "BBC One");
}

#[tokio::test]
async fn api_source_without_credentials_fails_before_any_io() {
    let engine = engine().await;
    let source = engine
        .add_source(SourceCreateRequest {
            name: "api".to_string(),
            kind: SourceKind::Api,
            url: "http://host:8080".to_string(),
            username: None,
            password: None,
            priority: 0,
        })
        .await
        .unwrap();

    let err = engine.ingest(source.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Ingest(IngestError::InvalidConfig { .. })
    ));
    assert!(engine
        .records()
        .find_by_source(&source.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn report_summary_reads_like_an_import_line() {
    let engine = engine().await;
    let (source, _file) = add_manifest_source(&engine, "a", two_channel_manifest(), 0).await;
    let report = engine.ingest(source.id).await.unwrap();
    assert_eq!(report.summary(), "Imported 2 of 2, 0 skipped (duplicates), 0 failed");
}
