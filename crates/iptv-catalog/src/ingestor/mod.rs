//! Ingestion coordinator
//!
//! Orchestrates one source's parse→stage→flush pipeline: per-source dedup
//! through a private [`dedup::RunLedger`], bounded batch writes through the
//! catalog commit paths, and the staleness sweep after a fully successful
//! pass. Independent sources ingest concurrently under a semaphore; within
//! one source everything is sequential, so dedup bookkeeping needs no
//! cross-thread coordination.

use futures::StreamExt;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod dedup;
pub mod flight;

use crate::catalog::CatalogService;
use crate::config::IngestionConfig;
use crate::database::repositories::{CatalogRecordSeaOrmRepository, SourceSeaOrmRepository};
use crate::errors::{AppError, AppResult, IngestError};
use crate::models::{CanonicalRecord, IngestionReport, RecordDraft, SourceDescriptor};
use crate::sources::{DraftEvent, DraftStream, SourceHandlerFactory};
use crate::utils::generate_record_uuid;
use dedup::{Admission, RunLedger};
use flight::FlightTracker;

#[derive(Clone, Copy)]
enum CommitKind {
    Insert,
    Update,
}

/// Coordinates ingestion runs across all configured sources
pub struct IngestionCoordinator {
    catalog: Arc<CatalogService>,
    records: CatalogRecordSeaOrmRepository,
    sources: SourceSeaOrmRepository,
    factory: SourceHandlerFactory,
    flights: Arc<FlightTracker>,
    semaphore: Arc<Semaphore>,
    config: IngestionConfig,
}

impl IngestionCoordinator {
    pub fn new(
        catalog: Arc<CatalogService>,
        records: CatalogRecordSeaOrmRepository,
        sources: SourceSeaOrmRepository,
        factory: SourceHandlerFactory,
        config: IngestionConfig,
    ) -> Self {
        Self {
            catalog,
            records,
            sources,
            factory,
            flights: FlightTracker::new(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_sources.max(1))),
            config,
        }
    }

    /// Cancel a source's in-flight ingestion, if any. The catalog is left at
    /// the last fully committed batch.
    pub fn cancel(&self, source_id: Uuid) -> bool {
        self.flights.cancel(source_id)
    }

    /// Run one ingestion attempt for a source
    ///
    /// Source-level failures (empty feed, fatal I/O, bad configuration)
    /// return `Err`; record-level problems are counted on the report.
    pub async fn ingest(&self, source: &SourceDescriptor) -> AppResult<IngestionReport> {
        let handler = self.factory.create_handler(source.kind);
        // Configuration problems fail before any I/O
        handler.validate_source(source)?;

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::internal("ingestion semaphore closed"))?;

        let guard = self
            .flights
            .try_begin(source.id)
            .ok_or_else(|| AppError::operation_in_progress("ingestion", source.name.clone()))?;

        info!("Starting ingestion for source '{}' ({})", source.name, source.id);
        let started = Instant::now();

        let result = async {
            let stream = handler.draft_stream(source).await?;
            self.run_stream(source, stream, guard.token()).await
        }
        .await;

        let last_error = match &result {
            Ok(report) => report.error.clone(),
            Err(e) => Some(e.to_string()),
        };
        if let Err(e) = self.sources.update_ingest_status(&source.id, last_error).await {
            warn!(
                "Failed to update ingest status for source '{}': {}",
                source.name, e
            );
        }

        match &result {
            Ok(report) => info!(
                "Ingestion for source '{}' completed in {:.2}s: {}",
                source.name,
                started.elapsed().as_secs_f64(),
                report.summary()
            ),
            Err(e) => warn!("Ingestion for source '{}' failed: {}", source.name, e),
        }

        result
    }

    /// Ingest every given source under bounded parallelism, converting
    /// source-level failures into per-source reports so siblings are
    /// unaffected.
    pub async fn ingest_all(&self, sources: &[SourceDescriptor]) -> Vec<IngestionReport> {
        let futures = sources.iter().map(|source| async move {
            match self.ingest(source).await {
                Ok(report) => report,
                Err(e) => {
                    let mut report = IngestionReport::new(source);
                    report.error = Some(e.to_string());
                    report
                }
            }
        });
        futures::future::join_all(futures).await
    }

    /// Run an ingestion attempt over an already-open draft stream. Useful
    /// when the caller holds raw feed bytes; `ingest` goes through here too.
    pub async fn ingest_stream(
        &self,
        source: &SourceDescriptor,
        stream: DraftStream,
    ) -> AppResult<IngestionReport> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::internal("ingestion semaphore closed"))?;
        let guard = self
            .flights
            .try_begin(source.id)
            .ok_or_else(|| AppError::operation_in_progress("ingestion", source.name.clone()))?;
        self.run_stream(source, stream, guard.token()).await
    }

    async fn run_stream(
        &self,
        source: &SourceDescriptor,
        mut stream: DraftStream,
        token: CancellationToken,
    ) -> AppResult<IngestionReport> {
        let mut report = IngestionReport::new(source);

        // Private per-run ledger; bounded by this source's existing count
        let existing = self.records.existing_keys(&source.id).await?;
        let mut ledger = RunLedger::new(existing);

        let mut staged_inserts: Vec<CanonicalRecord> = Vec::new();
        let mut staged_updates: Vec<CanonicalRecord> = Vec::new();
        let mut drafts_seen = 0usize;
        let mut cancelled = false;

        while let Some(item) = stream.next().await {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }

            match item {
                Ok(DraftEvent::Draft(draft)) => {
                    drafts_seen += 1;
                    let (key, admission) = ledger.admit(&draft);
                    match admission {
                        Admission::Insert => {
                            staged_inserts.push(build_record(&draft, key, None));
                            if staged_inserts.len() >= self.config.batch_size {
                                self.flush_batch(CommitKind::Insert, &mut staged_inserts, &mut report)
                                    .await;
                            }
                        }
                        Admission::Update { record_id } => {
                            staged_updates.push(build_record(&draft, key, Some(record_id)));
                            if staged_updates.len() >= self.config.batch_size {
                                self.flush_batch(CommitKind::Update, &mut staged_updates, &mut report)
                                    .await;
                            }
                        }
                        Admission::DuplicateInRun | Admission::UnchangedExisting => {
                            report.skipped_duplicates += 1;
                        }
                    }
                }
                Ok(DraftEvent::Skipped { entry, reason }) => {
                    report.failed_records += 1;
                    self.push_message(&mut report, format!("entry {entry}: {reason}"));
                }
                Ok(DraftEvent::SectionError { category, message }) => {
                    warn!(
                        "Category '{}' failed for source '{}': {}",
                        category, source.name, message
                    );
                    self.push_message(&mut report, format!("category '{category}': {message}"));
                }
                Err(e) => {
                    // Source-level abort; everything committed so far stays
                    return Err(e);
                }
            }
        }

        if cancelled {
            debug!("Ingestion for source '{}' cancelled", source.name);
            report.error = Some("ingestion cancelled".to_string());
            return Ok(report);
        }

        if drafts_seen == 0 {
            return Err(IngestError::EmptyFeed {
                source_name: source.name.clone(),
            }
            .into());
        }

        self.flush_batch(CommitKind::Insert, &mut staged_inserts, &mut report)
            .await;
        self.flush_batch(CommitKind::Update, &mut staged_updates, &mut report)
            .await;

        // Staleness sweep: only after a fully successful, uncancelled pass
        let stale_ids = ledger.stale_record_ids();
        if !stale_ids.is_empty() {
            let stale = self.records.find_by_ids(&stale_ids).await?;
            let removed = self.catalog.commit_deletes(stale).await?;
            report.removed_stale = removed;
            info!(
                "Removed {} stale records for source '{}'",
                removed, source.name
            );
        }

        Ok(report)
    }

    /// Commit one staged batch. On failure: retry once at half size, then
    /// isolate and skip only the offending records, committing the rest.
    async fn flush_batch(
        &self,
        kind: CommitKind,
        staged: &mut Vec<CanonicalRecord>,
        report: &mut IngestionReport,
    ) {
        if staged.is_empty() {
            return;
        }
        let batch = std::mem::take(staged);

        match self.commit(kind, batch.clone()).await {
            Ok(count) => credit(kind, count, report),
            Err(e) => {
                warn!(
                    "Batch write of {} records failed, retrying at half size: {}",
                    batch.len(),
                    e
                );
                let jitter: u64 = rand::rng().random_range(0..50);
                tokio::time::sleep(Duration::from_millis(100 + jitter)).await;

                let mid = batch.len().div_ceil(2);
                for half in [&batch[..mid], &batch[mid..]] {
                    if half.is_empty() {
                        continue;
                    }
                    match self.commit(kind, half.to_vec()).await {
                        Ok(count) => credit(kind, count, report),
                        Err(_) => {
                            for record in half {
                                match self.commit(kind, vec![record.clone()]).await {
                                    Ok(count) => credit(kind, count, report),
                                    Err(e) => {
                                        report.failed_records += 1;
                                        self.push_message(
                                            report,
                                            format!("'{}': {e}", record.title),
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    async fn commit(&self, kind: CommitKind, records: Vec<CanonicalRecord>) -> AppResult<usize> {
        match kind {
            CommitKind::Insert => self.catalog.commit_inserts(records).await,
            CommitKind::Update => self.catalog.commit_updates(records).await,
        }
    }

    fn push_message(&self, report: &mut IngestionReport, message: String) {
        if report.messages.len() < self.config.report_message_limit {
            report.messages.push(message);
        }
    }
}

fn credit(kind: CommitKind, count: usize, report: &mut IngestionReport) {
    match kind {
        CommitKind::Insert => report.inserted += count,
        CommitKind::Update => report.updated += count,
    }
}

/// Materialize a draft into its canonical form
fn build_record(
    draft: &RecordDraft,
    identity_key: String,
    existing_id: Option<Uuid>,
) -> CanonicalRecord {
    let now = chrono::Utc::now();
    let id = existing_id.unwrap_or_else(|| generate_record_uuid(&draft.source_id, &identity_key));

    CanonicalRecord {
        id,
        source_id: draft.source_id,
        fingerprint: dedup::fingerprint(draft),
        normalized_title: dedup::normalize_identity(&draft.title),
        identity_key,
        title: draft.title.clone(),
        kind: draft.kind,
        stream_url: draft.stream_url.clone(),
        logo_url: draft.logo_url.clone(),
        group_name: draft.group_name.clone(),
        series_title: draft.series_title.clone(),
        series_key: draft
            .series_title
            .as_deref()
            .map(dedup::normalize_identity),
        season: draft.season,
        episode: draft.episode,
        created_at: now,
        updated_at: now,
    }
}
