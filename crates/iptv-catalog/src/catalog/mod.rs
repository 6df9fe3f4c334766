//! Catalog commit paths and mutation listeners
//!
//! Every catalog mutation flows through [`CatalogService`], which notifies
//! its registered listeners synchronously after the database commit. In the
//! source system this was a database trigger; here it is an explicit hook so
//! the catalog→index and catalog→projection dependencies are visible and
//! testable without a database engine underneath. A reader in this process
//! never observes a catalog write without its listener counterparts.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::database::repositories::CatalogRecordSeaOrmRepository;
use crate::errors::AppResult;
use crate::models::CanonicalRecord;

/// One committed catalog mutation
#[derive(Debug, Clone)]
pub enum CatalogCommit {
    Inserted(Vec<CanonicalRecord>),
    Updated(Vec<CanonicalRecord>),
    Deleted(Vec<CanonicalRecord>),
}

impl CatalogCommit {
    pub fn records(&self) -> &[CanonicalRecord] {
        match self {
            Self::Inserted(r) | Self::Updated(r) | Self::Deleted(r) => r,
        }
    }
}

/// Hook invoked after every committed catalog mutation
///
/// Listener failures must never fail the commit that triggered them;
/// implementations handle (and remember) their own errors.
#[async_trait]
pub trait CatalogListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_commit(&self, commit: &CatalogCommit);
}

/// The single choke point for catalog mutations
pub struct CatalogService {
    records: CatalogRecordSeaOrmRepository,
    listeners: RwLock<Vec<Arc<dyn CatalogListener>>>,
}

impl CatalogService {
    pub fn new(records: CatalogRecordSeaOrmRepository) -> Self {
        Self {
            records,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn CatalogListener>) {
        debug!("Registering catalog listener '{}'", listener.name());
        self.listeners.write().unwrap().push(listener);
    }

    /// Bulk-insert records and notify listeners
    pub async fn commit_inserts(&self, records: Vec<CanonicalRecord>) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = self.records.insert_batch(&records).await?;
        self.notify(CatalogCommit::Inserted(records)).await;
        Ok(count)
    }

    /// Apply in-place updates and notify listeners
    pub async fn commit_updates(&self, records: Vec<CanonicalRecord>) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = self.records.update_batch(&records).await?;
        self.notify(CatalogCommit::Updated(records)).await;
        Ok(count)
    }

    /// Delete records and notify listeners
    pub async fn commit_deletes(&self, records: Vec<CanonicalRecord>) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let count = self.records.delete_by_ids(&ids).await?;
        self.notify(CatalogCommit::Deleted(records)).await;
        Ok(count as usize)
    }

    async fn notify(&self, commit: CatalogCommit) {
        let listeners: Vec<Arc<dyn CatalogListener>> =
            self.listeners.read().unwrap().clone();
        for listener in listeners {
            listener.on_commit(&commit).await;
        }
    }
}
