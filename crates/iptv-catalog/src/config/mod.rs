use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

/// Ingestion tuning knobs shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Records per bulk write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sources ingesting at the same time
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
    /// Upper bound for any single fetch backing the feed reader
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    /// Feed reader chunk size
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,
    /// In-memory buffers above this size use the chunked reader
    #[serde(default = "default_chunked_buffer_threshold_mb")]
    pub chunked_buffer_threshold_mb: usize,
    /// Messages kept on an ingestion report
    #[serde(default = "default_report_message_limit")]
    pub report_message_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Keyword table for channel-vs-movie classification of manifest entries
    #[serde(default = "default_movie_keywords")]
    pub movie_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Edition-marker words stripped from titles before bucketing
    #[serde(default = "default_edition_markers")]
    pub edition_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_max_concurrent_sources() -> usize {
    DEFAULT_MAX_CONCURRENT_SOURCES
}
fn default_fetch_timeout_seconds() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECONDS
}
fn default_chunk_size_bytes() -> usize {
    DEFAULT_CHUNK_SIZE_BYTES
}
fn default_chunked_buffer_threshold_mb() -> usize {
    DEFAULT_CHUNKED_BUFFER_THRESHOLD_MB
}
fn default_report_message_limit() -> usize {
    DEFAULT_REPORT_MESSAGE_LIMIT
}
fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_sources: default_max_concurrent_sources(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            chunk_size_bytes: default_chunk_size_bytes(),
            chunked_buffer_threshold_mb: default_chunked_buffer_threshold_mb(),
            report_message_limit: default_report_message_limit(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            movie_keywords: default_movie_keywords(),
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            edition_markers: default_edition_markers(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.ingestion.batch_size, 500);
        assert_eq!(config.ingestion.max_concurrent_sources, 3);
        assert!(config.classification.movie_keywords.contains(&"vod".to_string()));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ingestion]
            batch_size = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.ingestion.batch_size, 100);
        assert_eq!(config.ingestion.max_concurrent_sources, 3);
        assert_eq!(config.search.default_limit, 20);
    }
}
