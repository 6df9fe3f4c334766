//! Search index synchronizer
//!
//! Keeps the in-process full-text index consistent with catalog mutations.
//! The synchronizer is a catalog listener: every commit applies its index
//! mutation before the commit call returns, so a reader in this process
//! never observes a catalog write without its index counterpart. A failed
//! incremental update is logged and remembered, then repaired by the next
//! full rebuild; it never blocks the catalog write that triggered it.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod index;
pub mod tokenizer;

pub use index::InvertedIndex;

use crate::catalog::{CatalogCommit, CatalogListener};
use crate::config::SearchConfig;
use crate::database::repositories::CatalogRecordSeaOrmRepository;
use crate::errors::{AppResult, IndexError};
use crate::models::{ContentKind, SearchHit};
use tokenizer::query_terms;

pub struct SearchService {
    records: CatalogRecordSeaOrmRepository,
    index: RwLock<InvertedIndex>,
    /// Record ids whose incremental updates failed; repaired at rebuild
    failed: Mutex<HashSet<Uuid>>,
    default_limit: usize,
}

impl SearchService {
    pub fn new(records: CatalogRecordSeaOrmRepository, config: &SearchConfig) -> Self {
        Self {
            records,
            index: RwLock::new(InvertedIndex::default()),
            failed: Mutex::new(HashSet::new()),
            default_limit: config.default_limit,
        }
    }

    /// Query the index: prefix terms, fuzzy fallback, TF/IDF ranking
    pub fn search(
        &self,
        query: &str,
        kind: Option<ContentKind>,
        limit: Option<usize>,
    ) -> Vec<SearchHit> {
        let terms = query_terms(query);
        let limit = limit.unwrap_or(self.default_limit);
        match self.index.read() {
            Ok(index) => index.query(&terms, kind, limit),
            Err(poisoned) => poisoned.into_inner().query(&terms, kind, limit),
        }
    }

    /// Full reindex: build a shadow index from a live catalog traversal and
    /// swap it in atomically. On failure the previous index stays
    /// authoritative. Idempotent and safe to call anytime.
    pub async fn rebuild(&self) -> AppResult<usize> {
        info!("Starting full index rebuild");

        let records = self
            .records
            .find_all()
            .await
            .map_err(|e| IndexError::RebuildFailed {
                message: e.to_string(),
            })?;

        let mut shadow = InvertedIndex::default();
        for record in &records {
            shadow.insert(record);
        }
        let count = shadow.len();

        // Readers see either the old or the new index, never a half-built one
        match self.index.write() {
            Ok(mut index) => *index = shadow,
            Err(poisoned) => *poisoned.into_inner() = shadow,
        }

        let repaired = {
            let mut failed = self.failed.lock().unwrap();
            let repaired = failed.len();
            failed.clear();
            repaired
        };
        if repaired > 0 {
            info!("Index rebuild repaired {} failed incremental updates", repaired);
        }

        info!("Index rebuild completed: {} documents", count);
        Ok(count)
    }

    /// Count of failed incremental updates awaiting the next rebuild
    pub fn pending_repairs(&self) -> usize {
        self.failed.lock().unwrap().len()
    }

    pub fn document_count(&self) -> usize {
        match self.index.read() {
            Ok(index) => index.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn apply(&self, commit: &CatalogCommit) -> Result<(), IndexError> {
        let mut index = self.index.write().map_err(|_| IndexError::Mutation {
            record_id: commit.records().first().map(|r| r.id).unwrap_or_default(),
            message: "index lock poisoned".to_string(),
        })?;

        match commit {
            CatalogCommit::Inserted(records) | CatalogCommit::Updated(records) => {
                for record in records {
                    index.insert(record);
                }
            }
            CatalogCommit::Deleted(records) => {
                for record in records {
                    index.remove(&record.id);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogListener for SearchService {
    fn name(&self) -> &'static str {
        "search-index"
    }

    async fn on_commit(&self, commit: &CatalogCommit) {
        if let Err(e) = self.apply(commit) {
            // Never blocks the catalog write; repaired at next rebuild
            warn!("Incremental index update failed, queued for rebuild: {}", e);
            let mut failed = self.failed.lock().unwrap();
            failed.extend(commit.records().iter().map(|r| r.id));
        } else {
            debug!(
                "Applied index mutation for {} records",
                commit.records().len()
            );
        }
    }
}
