//! Source handler traits
//!
//! The ingestion coordinator is format-agnostic: every handler yields the
//! same event stream, so dedup and batching never care where a draft came
//! from.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::errors::AppResult;
use crate::models::{RecordDraft, SourceDescriptor, SourceKind};

/// One element of a handler's draft stream
#[derive(Debug, Clone)]
pub enum DraftEvent {
    /// A parseable entry
    Draft(RecordDraft),
    /// A record-level failure; counted, never fatal
    Skipped { entry: usize, reason: String },
    /// One API category failed without affecting its siblings
    SectionError { category: String, message: String },
}

/// Lazy sequence of draft events. A stream-level `Err` aborts the run for
/// this source.
pub type DraftStream = Pin<Box<dyn Stream<Item = AppResult<DraftEvent>> + Send>>;

#[async_trait]
pub trait SourceHandler: Send + Sync {
    fn source_kind(&self) -> SourceKind;

    /// Check required source fields before any I/O happens
    fn validate_source(&self, source: &SourceDescriptor) -> AppResult<()>;

    /// Open the source and return its lazy draft stream
    async fn draft_stream(&self, source: &SourceDescriptor) -> AppResult<DraftStream>;
}
