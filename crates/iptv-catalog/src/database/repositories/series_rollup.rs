//! Series rollup repository implementation

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryResult;
use crate::entities::{prelude::SeriesRollups, series_rollups};
use crate::models::SeriesRollup;
use crate::utils::deterministic_uuid::generate_deterministic_uuid;

/// SeaORM-based repository for the series read model
#[derive(Clone)]
pub struct SeriesRollupSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SeriesRollupSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Insert or replace the rollup for one (source, series) pair
    pub async fn upsert(&self, rollup: &SeriesRollup) -> RepositoryResult<()> {
        let id = Self::rollup_id(&rollup.source_id, &rollup.series_key);
        let existing = SeriesRollups::find_by_id(id).one(&*self.connection).await?;

        match existing {
            Some(model) => {
                let mut active: series_rollups::ActiveModel = model.into();
                active.title = Set(rollup.title.clone());
                active.episode_count = Set(rollup.episode_count);
                active.season_count = Set(rollup.season_count);
                active.updated_at = Set(Utc::now());
                active.update(&*self.connection).await?;
            }
            None => {
                let active = series_rollups::ActiveModel {
                    id: Set(id),
                    source_id: Set(rollup.source_id),
                    series_key: Set(rollup.series_key.clone()),
                    title: Set(rollup.title.clone()),
                    episode_count: Set(rollup.episode_count),
                    season_count: Set(rollup.season_count),
                    updated_at: Set(Utc::now()),
                };
                active.insert(&*self.connection).await?;
            }
        }

        Ok(())
    }

    pub async fn find(
        &self,
        source_id: &Uuid,
        series_key: &str,
    ) -> RepositoryResult<Option<SeriesRollup>> {
        let id = Self::rollup_id(source_id, series_key);
        let model = SeriesRollups::find_by_id(id).one(&*self.connection).await?;
        Ok(model.map(Self::model_to_domain))
    }

    pub async fn find_all(&self) -> RepositoryResult<Vec<SeriesRollup>> {
        let models = SeriesRollups::find().all(&*self.connection).await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    pub async fn delete(&self, source_id: &Uuid, series_key: &str) -> RepositoryResult<()> {
        let id = Self::rollup_id(source_id, series_key);
        SeriesRollups::delete_by_id(id)
            .exec(&*self.connection)
            .await?;
        Ok(())
    }

    pub async fn delete_by_source(&self, source_id: &Uuid) -> RepositoryResult<u64> {
        let result = SeriesRollups::delete_many()
            .filter(series_rollups::Column::SourceId.eq(*source_id))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn clear_all(&self) -> RepositoryResult<u64> {
        let result = SeriesRollups::delete_many()
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    /// Rollups are keyed 1:1 to (source, series); derive a stable row id
    fn rollup_id(source_id: &Uuid, series_key: &str) -> Uuid {
        generate_deterministic_uuid(&["series_rollup", &source_id.to_string(), series_key])
    }

    fn model_to_domain(model: series_rollups::Model) -> SeriesRollup {
        SeriesRollup {
            source_id: model.source_id,
            series_key: model.series_key,
            title: model.title,
            episode_count: model.episode_count,
            season_count: model.season_count,
            updated_at: model.updated_at,
        }
    }
}
