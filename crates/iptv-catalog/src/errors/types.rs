//! Error type definitions for the catalog engine
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;
use uuid::Uuid;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the engine.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Ingestion errors (source-level)
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// Search index errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Operation already in progress errors
    #[error("Operation already in progress: {operation_type} on {resource}")]
    OperationInProgress {
        operation_type: String,
        resource: String,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Ingestion errors
///
/// Source-level variants (`EmptyFeed`, fatal `Io`, `InvalidConfig`) abort the
/// run for that source only. Record-level `Format` errors are counted by the
/// coordinator and never propagate out of a run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O failure opening or reading a feed. `retryable` distinguishes
    /// transient read errors from a source that could not be opened at all.
    #[error("I/O error: {message}")]
    Io { message: String, retryable: bool },

    /// A single fetch exceeded the caller-supplied timeout
    #[error("Fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Record-level parse failure; skip just that record
    #[error("Format error at entry {entry}: {message}")]
    Format { entry: usize, message: String },

    /// The feed produced zero parseable entries after trimming
    #[error("Feed for source '{source_name}' contained no parseable entries")]
    EmptyFeed { source_name: String },

    /// One API category returned a malformed payload; siblings are unaffected
    #[error("Malformed payload for category '{category}': {message}")]
    Payload { category: String, message: String },

    /// Missing required source fields; fails before any I/O
    #[error("Invalid source configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Bulk write failure for a whole batch
    #[error("Batch write failed ({batch_size} records): {message}")]
    BatchWrite { batch_size: usize, message: String },

    /// Record not found
    #[error("Record not found: {table} with id {id}")]
    RecordNotFound { table: String, id: String },
}

/// Search index specific errors
///
/// These are logged and retried at the next full rebuild; they never block
/// the catalog write that triggered them.
#[derive(Error, Debug)]
pub enum IndexError {
    /// An incremental index mutation failed for one document
    #[error("Index mutation failed for record {record_id}: {message}")]
    Mutation { record_id: Uuid, message: String },

    /// A full rebuild failed; the previous index stays authoritative
    #[error("Index rebuild failed: {message}")]
    RebuildFailed { message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an operation in progress error
    pub fn operation_in_progress<O: Into<String>, R: Into<String>>(
        operation_type: O,
        resource: R,
    ) -> Self {
        Self::OperationInProgress {
            operation_type: operation_type.into(),
            resource: resource.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IngestError {
    /// Fatal open failure for a source
    pub fn open_failed<M: Into<String>>(message: M) -> Self {
        Self::Io {
            message: message.into(),
            retryable: false,
        }
    }

    /// Transient read failure; the caller may retry the attempt
    pub fn read_failed<M: Into<String>>(message: M) -> Self {
        Self::Io {
            message: message.into(),
            retryable: true,
        }
    }

    /// Whether a new attempt on the same source may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io {
                retryable: true,
                ..
            } | Self::Timeout { .. }
        )
    }
}
