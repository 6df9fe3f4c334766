//! Error types for the catalog engine
//!
//! Exposes the hierarchical error system used throughout the crate. Most code
//! returns [`AppResult`]; the taxonomy lives in [`types`].

pub mod types;

pub use types::{AppError, IndexError, IngestError, RepositoryError};

/// Convenience result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;
