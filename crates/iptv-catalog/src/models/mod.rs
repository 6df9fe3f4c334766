use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A configured provider of playlist/catalog data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Grouping tie-break rank; lower wins
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_ingested_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    /// Line-oriented text manifest (EXTINF-style playlist)
    Manifest,
    /// JSON category API (player_api.php-style)
    Api,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentKind {
    Channel,
    Movie,
    Episode,
}

/// Transient parse output, produced by the format parsers and consumed by the
/// ingestion coordinator. Never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub source_id: Uuid,
    pub title: String,
    pub kind: ContentKind,
    pub stream_url: String,
    pub logo_url: Option<String>,
    pub group_name: Option<String>,
    pub series_title: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

/// Durable, source-attributed content record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: Uuid,
    pub source_id: Uuid,
    /// Source-scoped duplicate-detection key
    pub identity_key: String,
    /// Content hash; distinguishes unchanged re-ingestion from a real update
    pub fingerprint: String,
    pub title: String,
    pub normalized_title: String,
    pub kind: ContentKind,
    pub stream_url: String,
    pub logo_url: Option<String>,
    pub group_name: Option<String>,
    pub series_title: Option<String>,
    /// Normalized series grouping key for episodic content
    pub series_key: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One record within a [`UnifiedItem`], tagged with its quality score
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub record: CanonicalRecord,
    /// Resolution heuristic: 4K=5, 1080p=4, 720p=3, SD=2, unknown=1
    pub quality: u8,
}

/// Read-time grouping of records across sources believed to represent the
/// same content. Never persisted; recomputed on each grouping call.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedItem {
    pub normalized_title: String,
    pub kind: ContentKind,
    pub primary: Variant,
    pub alternatives: Vec<Variant>,
}

impl UnifiedItem {
    /// Display title of the highest-ranked variant
    pub fn title(&self) -> &str {
        &self.primary.record.title
    }
}

/// Structured per-attempt result of a source ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub source_id: Uuid,
    pub source_name: String,
    pub inserted: usize,
    pub updated: usize,
    pub skipped_duplicates: usize,
    pub failed_records: usize,
    pub removed_stale: usize,
    /// First N record/category messages; never a raw low-level error dump
    pub messages: Vec<String>,
    /// Set when the run was aborted at source level
    pub error: Option<String>,
}

impl IngestionReport {
    pub fn new(source: &SourceDescriptor) -> Self {
        Self {
            source_id: source.id,
            source_name: source.name.clone(),
            ..Default::default()
        }
    }

    /// Human-readable one-line summary, e.g.
    /// "Imported 480 of 500, 20 skipped (duplicates), 0 failed"
    pub fn summary(&self) -> String {
        let total =
            self.inserted + self.updated + self.skipped_duplicates + self.failed_records;
        format!(
            "Imported {} of {}, {} skipped (duplicates), {} failed",
            self.inserted + self.updated,
            total,
            self.skipped_duplicates,
            self.failed_records
        )
    }
}

/// One search result row
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record_id: Uuid,
    pub title: String,
    pub summary: String,
    pub kind: ContentKind,
    pub rank: f64,
}

/// Precomputed aggregates for one series within one source
#[derive(Debug, Clone, Serialize)]
pub struct SeriesRollup {
    pub source_id: Uuid,
    pub series_key: String,
    pub title: String,
    pub episode_count: i64,
    pub season_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Request for source creation
#[derive(Debug, Clone)]
pub struct SourceCreateRequest {
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub priority: i32,
}
