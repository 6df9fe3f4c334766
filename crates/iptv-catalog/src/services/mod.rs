//! Engine façade
//!
//! Wires the database, repositories, commit listeners, grouping engine and
//! ingestion coordinator together and exposes the public surface: ingest,
//! search, grouped catalog, and the idempotent maintenance entry points.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::{
    CatalogRecordSeaOrmRepository, SeriesRollupSeaOrmRepository, SourceSeaOrmRepository,
};
use crate::errors::{AppError, AppResult};
use crate::grouping::GroupingEngine;
use crate::ingestor::IngestionCoordinator;
use crate::models::{
    ContentKind, IngestionReport, SearchHit, SeriesRollup, SourceCreateRequest, SourceDescriptor,
    UnifiedItem,
};
use crate::projections::ReadModelProjector;
use crate::search::SearchService;
use crate::sources::SourceHandlerFactory;

pub struct CatalogEngine {
    #[allow(dead_code)]
    database: Database,
    sources: SourceSeaOrmRepository,
    records: CatalogRecordSeaOrmRepository,
    catalog: Arc<CatalogService>,
    search: Arc<SearchService>,
    projector: Arc<ReadModelProjector>,
    grouping: GroupingEngine,
    coordinator: IngestionCoordinator,
}

impl CatalogEngine {
    /// Connect to the configured database, run migrations, and wire up the
    /// engine.
    pub async fn connect(config: Config) -> Result<Self> {
        let database = Database::new(&config.database).await?;
        database.migrate().await?;
        let engine = Self::with_database(config, database);
        // The index lives in-process; repopulate it from the persisted
        // catalog so searches are consistent from the first query.
        engine.search.rebuild().await?;
        Ok(engine)
    }

    /// Wire the engine over an existing connection (used by tests)
    pub fn with_database(config: Config, database: Database) -> Self {
        let connection = database.connection();
        let sources = SourceSeaOrmRepository::new(connection.clone());
        let records = CatalogRecordSeaOrmRepository::new(connection.clone());
        let rollups = SeriesRollupSeaOrmRepository::new(connection);

        let catalog = Arc::new(CatalogService::new(records.clone()));
        let search = Arc::new(SearchService::new(records.clone(), &config.search));
        let projector = Arc::new(ReadModelProjector::new(records.clone(), rollups));

        // Every commit path notifies the index and the projections
        catalog.register_listener(search.clone());
        catalog.register_listener(projector.clone());

        let factory =
            SourceHandlerFactory::new(&config.classification, config.ingestion.clone());
        let coordinator = IngestionCoordinator::new(
            catalog.clone(),
            records.clone(),
            sources.clone(),
            factory,
            config.ingestion.clone(),
        );
        let grouping = GroupingEngine::new(&config.grouping);

        Self {
            database,
            sources,
            records,
            catalog,
            search,
            projector,
            grouping,
            coordinator,
        }
    }

    // -- Source management ---------------------------------------------------

    pub async fn add_source(&self, request: SourceCreateRequest) -> AppResult<SourceDescriptor> {
        Ok(self.sources.create(request).await?)
    }

    pub async fn list_sources(&self) -> AppResult<Vec<SourceDescriptor>> {
        Ok(self.sources.find_all().await?)
    }

    /// Remove a source and everything derived from it. Records are deleted
    /// through the commit path so index entries and rollups follow; records
    /// of other sources are never touched.
    pub async fn remove_source(&self, source_id: Uuid) -> AppResult<()> {
        let records = self.records.find_by_source(&source_id).await?;
        self.catalog.commit_deletes(records).await?;
        self.sources.delete(&source_id).await?;
        Ok(())
    }

    // -- Ingestion -----------------------------------------------------------

    pub async fn ingest(&self, source_id: Uuid) -> AppResult<IngestionReport> {
        let source = self
            .sources
            .find_by_id(&source_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource: "source".to_string(),
                id: source_id.to_string(),
            })?;
        self.coordinator.ingest(&source).await
    }

    /// Ingest every active source under bounded parallelism; a failing
    /// source never affects its siblings.
    pub async fn ingest_all(&self) -> AppResult<Vec<IngestionReport>> {
        let sources = self.sources.find_active().await?;
        Ok(self.coordinator.ingest_all(&sources).await)
    }

    pub fn cancel_ingestion(&self, source_id: Uuid) -> bool {
        self.coordinator.cancel(source_id)
    }

    // -- Queries -------------------------------------------------------------

    pub fn search(
        &self,
        query: &str,
        kind: Option<ContentKind>,
        limit: Option<usize>,
    ) -> Vec<SearchHit> {
        self.search.search(query, kind, limit)
    }

    pub async fn grouped_catalog(&self, kind: ContentKind) -> AppResult<Vec<UnifiedItem>> {
        let records = self.records.find_by_kind(kind).await?;
        let priorities: HashMap<Uuid, i32> = self
            .sources
            .find_all()
            .await?
            .into_iter()
            .map(|s| (s.id, s.priority))
            .collect();
        Ok(self.grouping.group(records, &priorities))
    }

    pub async fn series_rollup(
        &self,
        source_id: Uuid,
        series_key: &str,
    ) -> AppResult<Option<SeriesRollup>> {
        self.projector.rollup(&source_id, series_key).await
    }

    // -- Maintenance ---------------------------------------------------------

    /// Full reindex into a shadow index with an atomic swap. Idempotent.
    pub async fn rebuild_index(&self) -> AppResult<usize> {
        self.search.rebuild().await
    }

    /// Full projection rebuild from a live traversal. Idempotent.
    pub async fn rebuild_projections(&self) -> AppResult<usize> {
        self.projector.rebuild_all().await
    }

    /// Run the reindex as a background task that does not block ingestion.
    /// Abort the handle to cancel; the previous index stays authoritative.
    pub fn spawn_rebuild_index(&self) -> tokio::task::JoinHandle<AppResult<usize>> {
        let search = self.search.clone();
        tokio::spawn(async move { search.rebuild().await })
    }

    /// Run the projection rebuild as a background, cancellable task
    pub fn spawn_rebuild_projections(&self) -> tokio::task::JoinHandle<AppResult<usize>> {
        let projector = self.projector.clone();
        tokio::spawn(async move { projector.rebuild_all().await })
    }

    // -- Component access (tests, CLI plumbing) ------------------------------

    pub fn records(&self) -> &CatalogRecordSeaOrmRepository {
        &self.records
    }

    pub fn coordinator(&self) -> &IngestionCoordinator {
        &self.coordinator
    }

    pub fn search_service(&self) -> &Arc<SearchService> {
        &self.search
    }
}
