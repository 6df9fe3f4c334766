//! Read-model projector
//!
//! Maintains precomputed per-series aggregates so hot-path reads are O(1)
//! instead of traversing children. As a catalog listener it recomputes only
//! the parent chains a mutation touched (episode → series); the full
//! rebuild recomputes everything from a live traversal and is the
//! authoritative recovery path if incremental updates are ever suspected
//! stale.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogCommit, CatalogListener};
use crate::database::repositories::{
    CatalogRecordSeaOrmRepository, SeriesRollupSeaOrmRepository,
};
use crate::errors::AppResult;
use crate::models::{ContentKind, SeriesRollup};

pub struct ReadModelProjector {
    records: CatalogRecordSeaOrmRepository,
    rollups: SeriesRollupSeaOrmRepository,
}

impl ReadModelProjector {
    pub fn new(
        records: CatalogRecordSeaOrmRepository,
        rollups: SeriesRollupSeaOrmRepository,
    ) -> Self {
        Self { records, rollups }
    }

    /// Recompute the rollup for one (source, series) chain from its live
    /// episode records. Cost is proportional to that series' episode count.
    pub async fn recompute_series(&self, source_id: &Uuid, series_key: &str) -> AppResult<()> {
        let episodes = self
            .records
            .find_series_episodes(source_id, series_key)
            .await?;

        if episodes.is_empty() {
            self.rollups.delete(source_id, series_key).await?;
            debug!("Dropped empty rollup for series '{}'", series_key);
            return Ok(());
        }

        let episode_count = episodes.len() as i64;
        let season_count = episodes
            .iter()
            .map(|e| e.season.unwrap_or(0))
            .collect::<HashSet<_>>()
            .len() as i64;
        let title = episodes
            .iter()
            .find_map(|e| e.series_title.clone())
            .unwrap_or_else(|| series_key.to_string());

        self.rollups
            .upsert(&SeriesRollup {
                source_id: *source_id,
                series_key: series_key.to_string(),
                title,
                episode_count,
                season_count,
                updated_at: Utc::now(),
            })
            .await?;

        Ok(())
    }

    /// Recompute every projected field from scratch. After this, every
    /// rollup equals what a live traversal computes. Idempotent.
    pub async fn rebuild_all(&self) -> AppResult<usize> {
        info!("Starting full projection rebuild");
        self.rollups.clear_all().await?;

        let records = self.records.find_all().await?;
        let chains: HashSet<(Uuid, String)> = records
            .iter()
            .filter(|r| r.kind == ContentKind::Episode)
            .filter_map(|r| r.series_key.clone().map(|k| (r.source_id, k)))
            .collect();

        for (source_id, series_key) in &chains {
            self.recompute_series(source_id, series_key).await?;
        }

        info!("Projection rebuild completed: {} series", chains.len());
        Ok(chains.len())
    }

    pub async fn rollup(
        &self,
        source_id: &Uuid,
        series_key: &str,
    ) -> AppResult<Option<SeriesRollup>> {
        Ok(self.rollups.find(source_id, series_key).await?)
    }
}

#[async_trait]
impl CatalogListener for ReadModelProjector {
    fn name(&self) -> &'static str {
        "read-model-projector"
    }

    async fn on_commit(&self, commit: &CatalogCommit) {
        // Targeted recompute: only the parent chains this commit touched
        let chains: HashSet<(Uuid, String)> = commit
            .records()
            .iter()
            .filter(|r| r.kind == ContentKind::Episode)
            .filter_map(|r| r.series_key.clone().map(|k| (r.source_id, k)))
            .collect();

        for (source_id, series_key) in chains {
            if let Err(e) = self.recompute_series(&source_id, &series_key).await {
                // Content is never lost; the full rebuild repairs projections
                warn!(
                    "Projection recompute failed for series '{}': {}",
                    series_key, e
                );
            }
        }
    }
}
