//! Content classification heuristics
//!
//! Channel-vs-movie classification is keyword substring matching over the
//! category text and is inherently fuzzy. It lives here as a pure function
//! over an explicit keyword table (supplied by configuration) so it can be
//! tested and tuned independently of the parsers.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::ContentKind;

/// Keyword table for classifying manifest entries
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    movie_keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(movie_keywords: &[String]) -> Self {
        Self {
            movie_keywords: movie_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Classify an entry by its category/group text. Entries with no
    /// category, or no matching keyword, are channels.
    pub fn classify(&self, category: Option<&str>) -> ContentKind {
        let Some(category) = category else {
            return ContentKind::Channel;
        };
        let lowered = category.to_lowercase();
        if self.movie_keywords.iter().any(|k| lowered.contains(k)) {
            ContentKind::Movie
        } else {
            ContentKind::Channel
        }
    }
}

/// Episode numbering parsed out of a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeMarker {
    /// Title text preceding the marker, trimmed of separators
    pub series_title: String,
    pub season: i32,
    pub episode: i32,
}

fn sxxeyy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bS(\d{1,2})\s*E(\d{1,3})\b").unwrap())
}

fn nxnn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})x(\d{2,3})\b").unwrap())
}

/// Extract "S01E02" / "1x02" style numbering hints from a title
pub fn parse_episode_marker(title: &str) -> Option<EpisodeMarker> {
    let captures = sxxeyy_pattern()
        .captures(title)
        .or_else(|| nxnn_pattern().captures(title))?;

    let full = captures.get(0)?;
    let season: i32 = captures.get(1)?.as_str().parse().ok()?;
    let episode: i32 = captures.get(2)?.as_str().parse().ok()?;

    let series_title = title[..full.start()]
        .trim_end_matches(|c: char| c.is_whitespace() || "-_:|.".contains(c))
        .trim()
        .to_string();

    Some(EpisodeMarker {
        series_title,
        season,
        episode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_movie_keywords;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(&default_movie_keywords())
    }

    #[test]
    fn category_with_movie_keyword_is_movie() {
        assert_eq!(
            classifier().classify(Some("VOD | Action")),
            ContentKind::Movie
        );
        assert_eq!(
            classifier().classify(Some("Peliculas Estreno")),
            ContentKind::Movie
        );
    }

    #[test]
    fn category_without_keyword_is_channel() {
        assert_eq!(classifier().classify(Some("News UK")), ContentKind::Channel);
        assert_eq!(classifier().classify(None), ContentKind::Channel);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classifier().classify(Some("MOVIES HD")), ContentKind::Movie);
    }

    #[test]
    fn parses_sxxeyy_markers() {
        let marker = parse_episode_marker("Breaking Bad S01E02").unwrap();
        assert_eq!(marker.series_title, "Breaking Bad");
        assert_eq!(marker.season, 1);
        assert_eq!(marker.episode, 2);
    }

    #[test]
    fn parses_nxnn_markers() {
        let marker = parse_episode_marker("The Wire - 3x07").unwrap();
        assert_eq!(marker.series_title, "The Wire");
        assert_eq!(marker.season, 3);
        assert_eq!(marker.episode, 7);
    }

    #[test]
    fn titles_without_markers_yield_none() {
        assert!(parse_episode_marker("Inception").is_none());
        assert!(parse_episode_marker("Formula 1 2024").is_none());
    }
}
