//! Manifest source handler implementation
//!
//! Handles line-oriented EXTINF-style playlist manifests. Parsing is a pure
//! incremental state machine over raw lines; the handler adds transport
//! (HTTP or local file) and wires the parser to the chunked feed reader.

use async_stream::stream;
use futures_util::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::classify::{KeywordClassifier, parse_episode_marker};
use super::traits::*;
use crate::config::IngestionConfig;
use crate::errors::{AppResult, IngestError};
use crate::feed::{ByteFeed, LineReader};
use crate::models::{ContentKind, RecordDraft, SourceDescriptor, SourceKind};

/// Incremental manifest parser
///
/// Pairs a `#EXTINF` directive line with its following URL line and turns
/// the pair into a record draft. Pure: no I/O, no store side effects.
pub struct ManifestParser {
    source_id: uuid::Uuid,
    classifier: Arc<KeywordClassifier>,
    pending: Option<Directive>,
    entries_seen: usize,
}

struct Directive {
    entry: usize,
    title: String,
    attributes: HashMap<String, String>,
}

impl ManifestParser {
    pub fn new(source_id: uuid::Uuid, classifier: Arc<KeywordClassifier>) -> Self {
        Self {
            source_id,
            classifier,
            pending: None,
            entries_seen: 0,
        }
    }

    /// Feed one raw line; at most one event per line
    pub fn feed_line(&mut self, line: &str) -> Option<DraftEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with("#EXTINF") {
            self.entries_seen += 1;
            let replaced = self.pending.take();
            self.pending = self.parse_directive(line);
            // A directive followed by another directive never got its URL
            return replaced.map(|d| DraftEvent::Skipped {
                entry: d.entry,
                reason: "directive has no stream URL".to_string(),
            });
        }

        if line.starts_with('#') {
            return None;
        }

        // A bare URL line
        match self.pending.take() {
            Some(directive) => Some(self.complete(directive, line)),
            None => {
                debug!("Stream URL without a preceding directive: {}", line);
                self.entries_seen += 1;
                Some(DraftEvent::Skipped {
                    entry: self.entries_seen,
                    reason: "stream URL without a directive line".to_string(),
                })
            }
        }
    }

    /// Flush parser state at end of feed
    pub fn finish(&mut self) -> Option<DraftEvent> {
        self.pending.take().map(|d| DraftEvent::Skipped {
            entry: d.entry,
            reason: "directive has no stream URL".to_string(),
        })
    }

    fn parse_directive(&self, line: &str) -> Option<Directive> {
        // Format: #EXTINF:duration attr="value" ...,Title
        let content = line.strip_prefix("#EXTINF:").unwrap_or(line);
        let comma_pos = content.rfind(',');

        let (attrs_part, title) = match comma_pos {
            Some(pos) => (&content[..pos], content[pos + 1..].trim()),
            None => (content, ""),
        };

        Some(Directive {
            entry: self.entries_seen,
            title: title.trim_matches('"').trim().to_string(),
            attributes: parse_directive_attributes(attrs_part),
        })
    }

    fn complete(&self, directive: Directive, url: &str) -> DraftEvent {
        if directive.title.is_empty() {
            return DraftEvent::Skipped {
                entry: directive.entry,
                reason: "directive has no title".to_string(),
            };
        }

        let group_name = directive.attributes.get("group-title").cloned();
        let logo_url = directive.attributes.get("tvg-logo").cloned();

        let (kind, series_title, season, episode) =
            match parse_episode_marker(&directive.title) {
                Some(marker) if !marker.series_title.is_empty() => (
                    ContentKind::Episode,
                    Some(marker.series_title),
                    Some(marker.season),
                    Some(marker.episode),
                ),
                _ => (
                    self.classifier.classify(group_name.as_deref()),
                    None,
                    None,
                    None,
                ),
            };

        DraftEvent::Draft(RecordDraft {
            source_id: self.source_id,
            title: directive.title,
            kind,
            stream_url: url.to_string(),
            logo_url,
            group_name,
            series_title,
            season,
            episode,
        })
    }
}

/// Parse `key="value"` pairs from a directive line, honoring quotes
fn parse_directive_attributes(attrs_part: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    let mut chars = attrs_part.chars().peekable();
    let mut current_key = String::new();
    let mut current_value = String::new();
    let mut in_quotes = false;
    let mut in_key = false;
    let mut in_value = false;

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' if !in_quotes => {
                if in_value {
                    // End of unquoted value
                    if !current_key.is_empty() && !current_value.is_empty() {
                        attributes.insert(current_key.clone(), current_value.clone());
                    }
                    current_key.clear();
                    current_value.clear();
                    in_value = false;
                }
                in_key = true;
            }
            '=' if !in_quotes => {
                in_key = false;
                in_value = true;
                if chars.peek() == Some(&'"') {
                    chars.next();
                    in_quotes = true;
                }
            }
            '"' if in_value => {
                in_quotes = false;
                if !current_key.is_empty() {
                    attributes.insert(current_key.clone(), current_value.clone());
                }
                current_key.clear();
                current_value.clear();
                in_value = false;
            }
            _ => {
                // The duration prefix before the first separator is dropped:
                // key collection only starts once in_key is set.
                if in_key {
                    current_key.push(ch);
                } else if in_value {
                    current_value.push(ch);
                }
            }
        }
    }

    if in_value && !current_key.is_empty() && !current_value.is_empty() {
        attributes.insert(current_key, current_value);
    }

    attributes
}

/// Manifest source handler: transport + parser wiring
pub struct ManifestSourceHandler {
    client: Client,
    classifier: Arc<KeywordClassifier>,
    ingestion: IngestionConfig,
}

impl ManifestSourceHandler {
    pub fn new(classifier: Arc<KeywordClassifier>, ingestion: IngestionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(ingestion.fetch_timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            classifier,
            ingestion,
        }
    }

    /// Open the source as a byte feed. HTTP bodies below the configured
    /// threshold are buffered; larger (or unsized) bodies stream.
    async fn open_feed(&self, source: &SourceDescriptor) -> AppResult<ByteFeed> {
        if source.url.starts_with("http://") || source.url.starts_with("https://") {
            let response = self
                .client
                .get(&source.url)
                .send()
                .await
                .map_err(|e| IngestError::open_failed(format!("{}: {e}", source.url)))?;

            if !response.status().is_success() {
                return Err(IngestError::open_failed(format!(
                    "{}: HTTP {}",
                    source.url,
                    response.status()
                ))
                .into());
            }

            let threshold = (self.ingestion.chunked_buffer_threshold_mb * 1024 * 1024) as u64;
            match response.content_length() {
                Some(len) if len <= threshold => {
                    let body = response
                        .bytes()
                        .await
                        .map_err(|e| IngestError::read_failed(e.to_string()))?;
                    Ok(ByteFeed::from_buffer(body))
                }
                _ => {
                    let stream = response
                        .bytes_stream()
                        .map_err(|e| std::io::Error::other(e.to_string()));
                    Ok(ByteFeed::from_stream(StreamReader::new(Box::pin(stream))))
                }
            }
        } else {
            let path = source.url.trim_start_matches("file://");
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| IngestError::open_failed(format!("{path}: {e}")))?;
            Ok(ByteFeed::from_stream(file))
        }
    }
}

#[async_trait::async_trait]
impl SourceHandler for ManifestSourceHandler {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Manifest
    }

    fn validate_source(&self, source: &SourceDescriptor) -> AppResult<()> {
        if source.url.trim().is_empty() {
            return Err(IngestError::InvalidConfig {
                field: "url".to_string(),
                message: "manifest source requires a URL or file path".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn draft_stream(&self, source: &SourceDescriptor) -> AppResult<DraftStream> {
        let feed = self.open_feed(source).await?;
        let mut reader = LineReader::new(
            feed,
            self.ingestion.chunk_size_bytes,
            Duration::from_secs(self.ingestion.fetch_timeout_seconds),
        );
        let mut parser = ManifestParser::new(source.id, self.classifier.clone());

        Ok(Box::pin(stream! {
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parser.feed_line(&line) {
                            yield Ok(event);
                        }
                    }
                    Ok(None) => {
                        if let Some(event) = parser.finish() {
                            yield Ok(event);
                        }
                        break;
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_movie_keywords;
    use uuid::Uuid;

    fn parse_all(content: &str) -> (Vec<RecordDraft>, Vec<String>) {
        let classifier = Arc::new(KeywordClassifier::new(&default_movie_keywords()));
        let mut parser = ManifestParser::new(Uuid::new_v4(), classifier);
        let mut drafts = Vec::new();
        let mut skips = Vec::new();

        for line in content.lines() {
            match parser.feed_line(line) {
                Some(DraftEvent::Draft(d)) => drafts.push(d),
                Some(DraftEvent::Skipped { reason, .. }) => skips.push(reason),
                _ => {}
            }
        }
        if let Some(DraftEvent::Skipped { reason, .. }) = parser.finish() {
            skips.push(reason);
        }

        (drafts, skips)
    }

    #[test]
    fn pairs_directives_with_urls() {
        let (drafts, skips) = parse_all(
            "#EXTM3U\n\
             #EXTINF:-1 tvg-logo=\"http://logo/bbc.png\" group-title=\"News\",BBC One\n\
             http://host/bbc\n",
        );
        assert!(skips.is_empty());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "BBC One");
        assert_eq!(drafts[0].stream_url, "http://host/bbc");
        assert_eq!(drafts[0].logo_url.as_deref(), Some("http://logo/bbc.png"));
        assert_eq!(drafts[0].group_name.as_deref(), Some("News"));
        assert_eq!(drafts[0].kind, ContentKind::Channel);
    }

    #[test]
    fn movie_groups_classify_as_movies() {
        let (drafts, _) = parse_all(
            "#EXTINF:-1 group-title=\"VOD | Action\",Inception\n\
             http://host/inception.mp4\n",
        );
        assert_eq!(drafts[0].kind, ContentKind::Movie);
    }

    #[test]
    fn episode_markers_win_over_group_classification() {
        let (drafts, _) = parse_all(
            "#EXTINF:-1 group-title=\"Series\",Breaking Bad S01E02\n\
             http://host/bb.mkv\n",
        );
        assert_eq!(drafts[0].kind, ContentKind::Episode);
        assert_eq!(drafts[0].series_title.as_deref(), Some("Breaking Bad"));
        assert_eq!(drafts[0].season, Some(1));
        assert_eq!(drafts[0].episode, Some(2));
    }

    #[test]
    fn directive_without_url_is_skipped_and_counted() {
        let (drafts, skips) = parse_all(
            "#EXTINF:-1,First\n\
             http://host/1\n\
             #EXTINF:-1,No URL Here\n\
             #EXTINF:-1,Third\n\
             http://host/3\n",
        );
        assert_eq!(drafts.len(), 2);
        assert_eq!(skips.len(), 1);
        assert!(skips[0].contains("no stream URL"));
    }

    #[test]
    fn trailing_directive_is_flushed_as_skip() {
        let (drafts, skips) = parse_all("#EXTINF:-1,Dangling\n");
        assert!(drafts.is_empty());
        assert_eq!(skips.len(), 1);
    }

    #[test]
    fn untitled_directives_are_skipped() {
        let (drafts, skips) = parse_all("#EXTINF:-1,\nhttp://host/x\n");
        assert!(drafts.is_empty());
        assert_eq!(skips.len(), 1);
        assert!(skips[0].contains("no title"));
    }

    #[test]
    fn attribute_parser_honors_quotes() {
        let attrs =
            parse_directive_attributes("-1 tvg-id=\"a b\" group-title=\"Film & TV\" tvg-shift=2");
        assert_eq!(attrs.get("tvg-id").map(String::as_str), Some("a b"));
        assert_eq!(
            attrs.get("group-title").map(String::as_str),
            Some("Film & TV")
        );
        assert_eq!(attrs.get("tvg-shift").map(String::as_str), Some("2"));
    }
}
