/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./iptv-catalog.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Ingestion defaults
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 3;
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 64 * 1024;
/// Buffers above this size go through the chunked reader
pub const DEFAULT_CHUNKED_BUFFER_THRESHOLD_MB: usize = 10;
pub const DEFAULT_REPORT_MESSAGE_LIMIT: usize = 10;

// Search defaults
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Category keywords marking a manifest entry as VOD/movie content.
/// Matched case-insensitively as substrings of the group/category text.
pub fn default_movie_keywords() -> Vec<String> {
    ["movie", "movies", "vod", "film", "cinema", "peliculas", "filmes"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Edition-marker words stripped during grouping normalization. Hand-tuned;
/// extend via configuration rather than code.
pub fn default_edition_markers() -> Vec<String> {
    [
        "remastered",
        "extended",
        "unrated",
        "uncut",
        "directors cut",
        "director's cut",
        "special edition",
        "imax",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
