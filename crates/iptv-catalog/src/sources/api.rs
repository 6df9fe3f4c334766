//! API source handler implementation
//!
//! Handles Xtream-style JSON category APIs (`player_api.php`). One logical
//! request per category (live/vod/series); payload decoding is pure and
//! independently testable, and a malformed payload fails only its own
//! category, never its siblings.

use async_stream::stream;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::traits::*;
use crate::config::IngestionConfig;
use crate::errors::{AppResult, IngestError};
use crate::models::{ContentKind, RecordDraft, SourceDescriptor, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCategory {
    Live,
    Vod,
    Series,
}

impl ApiCategory {
    pub const ALL: [ApiCategory; 3] = [Self::Live, Self::Vod, Self::Series];

    fn action(&self) -> &'static str {
        match self {
            Self::Live => "get_live_streams",
            Self::Vod => "get_vod_streams",
            Self::Series => "get_series",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Vod => "vod",
            Self::Series => "series",
        }
    }
}

// Response shapes. Optional fields default to empty rather than failing the
// record; only a payload that cannot be decoded at all fails its category.

#[derive(Debug, Deserialize)]
struct ApiLiveStream {
    #[serde(default)]
    name: String,
    #[serde(default)]
    stream_id: i64,
    #[serde(default)]
    stream_icon: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiVodStream {
    #[serde(default)]
    name: String,
    #[serde(default)]
    stream_id: i64,
    #[serde(default)]
    stream_icon: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
    #[serde(default)]
    container_extension: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSeries {
    #[serde(default)]
    name: String,
    #[serde(default)]
    cover: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
    /// Season number → episodes, as returned by series detail payloads
    #[serde(default)]
    episodes: HashMap<String, Vec<ApiEpisode>>,
}

#[derive(Debug, Deserialize)]
struct ApiEpisode {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    episode_num: i64,
    #[serde(default)]
    season: Option<i64>,
    #[serde(default)]
    container_extension: Option<String>,
}

/// Decode one category payload into draft events
pub fn parse_category_payload(
    source: &SourceDescriptor,
    category: ApiCategory,
    body: &str,
) -> Result<Vec<DraftEvent>, IngestError> {
    match category {
        ApiCategory::Live => parse_live_payload(source, body),
        ApiCategory::Vod => parse_vod_payload(source, body),
        ApiCategory::Series => parse_series_payload(source, body),
    }
}

fn payload_error(category: ApiCategory, e: serde_json::Error) -> IngestError {
    IngestError::Payload {
        category: category.name().to_string(),
        message: e.to_string(),
    }
}

fn parse_live_payload(
    source: &SourceDescriptor,
    body: &str,
) -> Result<Vec<DraftEvent>, IngestError> {
    let streams: Vec<ApiLiveStream> =
        serde_json::from_str(body).map_err(|e| payload_error(ApiCategory::Live, e))?;

    let mut events = Vec::with_capacity(streams.len());
    for (idx, stream) in streams.into_iter().enumerate() {
        if stream.name.trim().is_empty() {
            events.push(DraftEvent::Skipped {
                entry: idx + 1,
                reason: "live stream has no name".to_string(),
            });
            continue;
        }
        events.push(DraftEvent::Draft(RecordDraft {
            source_id: source.id,
            title: stream.name,
            kind: ContentKind::Channel,
            stream_url: content_url(source, "live", stream.stream_id, "ts"),
            logo_url: stream.stream_icon,
            group_name: stream.category_name,
            series_title: None,
            season: None,
            episode: None,
        }));
    }
    Ok(events)
}

fn parse_vod_payload(
    source: &SourceDescriptor,
    body: &str,
) -> Result<Vec<DraftEvent>, IngestError> {
    let streams: Vec<ApiVodStream> =
        serde_json::from_str(body).map_err(|e| payload_error(ApiCategory::Vod, e))?;

    let mut events = Vec::with_capacity(streams.len());
    for (idx, stream) in streams.into_iter().enumerate() {
        if stream.name.trim().is_empty() {
            events.push(DraftEvent::Skipped {
                entry: idx + 1,
                reason: "vod stream has no name".to_string(),
            });
            continue;
        }
        let extension = stream
            .container_extension
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "mp4".to_string());
        events.push(DraftEvent::Draft(RecordDraft {
            source_id: source.id,
            title: stream.name,
            kind: ContentKind::Movie,
            stream_url: content_url(source, "movie", stream.stream_id, &extension),
            logo_url: stream.stream_icon,
            group_name: stream.category_name,
            series_title: None,
            season: None,
            episode: None,
        }));
    }
    Ok(events)
}

fn parse_series_payload(
    source: &SourceDescriptor,
    body: &str,
) -> Result<Vec<DraftEvent>, IngestError> {
    let series_list: Vec<ApiSeries> =
        serde_json::from_str(body).map_err(|e| payload_error(ApiCategory::Series, e))?;

    let mut events = Vec::new();
    for series in series_list {
        if series.name.trim().is_empty() {
            events.push(DraftEvent::Skipped {
                entry: events.len() + 1,
                reason: "series has no name".to_string(),
            });
            continue;
        }

        for (season_key, episodes) in &series.episodes {
            for episode in episodes {
                let season = episode
                    .season
                    .or_else(|| season_key.parse().ok())
                    .unwrap_or(0) as i32;
                let episode_num = episode.episode_num as i32;
                let title = if episode.title.trim().is_empty() {
                    format!("{} S{:02}E{:02}", series.name, season, episode_num)
                } else {
                    episode.title.clone()
                };
                let extension = episode
                    .container_extension
                    .clone()
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "mp4".to_string());

                events.push(DraftEvent::Draft(RecordDraft {
                    source_id: source.id,
                    title,
                    kind: ContentKind::Episode,
                    stream_url: content_url(source, "series", episode.id, &extension),
                    logo_url: series.cover.clone(),
                    group_name: series.category_name.clone(),
                    series_title: Some(series.name.clone()),
                    season: Some(season),
                    episode: Some(episode_num),
                }));
            }
        }
    }
    Ok(events)
}

/// Build an authenticated content URL for one stream id
fn content_url(source: &SourceDescriptor, prefix: &str, id: i64, extension: &str) -> String {
    let base = source.url.trim_end_matches('/');
    let empty = String::new();
    let username = source.username.as_ref().unwrap_or(&empty);
    let password = source.password.as_ref().unwrap_or(&empty);
    format!("{base}/{prefix}/{username}/{password}/{id}.{extension}")
}

/// Build the player_api.php request URL for one category
fn player_api_url(source: &SourceDescriptor, category: ApiCategory) -> AppResult<Url> {
    let base = source.url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/player_api.php")).map_err(|e| {
        IngestError::InvalidConfig {
            field: "url".to_string(),
            message: format!("invalid API URL '{}': {e}", source.url),
        }
    })?;

    let empty = String::new();
    url.query_pairs_mut()
        .append_pair("username", source.username.as_ref().unwrap_or(&empty))
        .append_pair("password", source.password.as_ref().unwrap_or(&empty))
        .append_pair("action", category.action());

    Ok(url)
}

/// API source handler: per-category fetch + pure payload decoding
pub struct ApiSourceHandler {
    client: Client,
}

impl ApiSourceHandler {
    pub fn new(ingestion: &IngestionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(ingestion.fetch_timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    async fn fetch_category(
        client: &Client,
        source: &SourceDescriptor,
        category: ApiCategory,
    ) -> AppResult<String> {
        let url = player_api_url(source, category)?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::open_failed(format!("{}: {e}", source.url)))?;

        if !response.status().is_success() {
            return Err(IngestError::open_failed(format!(
                "{}: HTTP {} for category '{}'",
                source.url,
                response.status(),
                category.name()
            ))
            .into());
        }

        response
            .text()
            .await
            .map_err(|e| IngestError::read_failed(e.to_string()).into())
    }
}

#[async_trait::async_trait]
impl SourceHandler for ApiSourceHandler {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn validate_source(&self, source: &SourceDescriptor) -> AppResult<()> {
        if source.url.trim().is_empty() {
            return Err(IngestError::InvalidConfig {
                field: "url".to_string(),
                message: "API source requires a URL".to_string(),
            }
            .into());
        }
        if source.username.as_deref().unwrap_or("").is_empty() {
            return Err(IngestError::InvalidConfig {
                field: "username".to_string(),
                message: "API source requires a username".to_string(),
            }
            .into());
        }
        if source.password.as_deref().unwrap_or("").is_empty() {
            return Err(IngestError::InvalidConfig {
                field: "password".to_string(),
                message: "API source requires a password".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn draft_stream(&self, source: &SourceDescriptor) -> AppResult<DraftStream> {
        let client = self.client.clone();
        let source = source.clone();

        Ok(Box::pin(stream! {
            for category in ApiCategory::ALL {
                match Self::fetch_category(&client, &source, category).await {
                    Ok(body) => match parse_category_payload(&source, category, &body) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            yield Ok(DraftEvent::SectionError {
                                category: category.name().to_string(),
                                message: e.to_string(),
                            });
                        }
                    },
                    Err(e) => {
                        // Transport failure is source-level, not category-level
                        yield Err(e);
                        break;
                    }
                }
            }
        }))
    }
}
