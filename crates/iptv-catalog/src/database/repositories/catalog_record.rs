//! Catalog record repository implementation
//!
//! The write paths here are deliberately batch-shaped: ingestion commits go
//! through [`CatalogRecordSeaOrmRepository::insert_batch`] /
//! [`CatalogRecordSeaOrmRepository::update_batch`] inside one transaction
//! per batch. Single-record inserts exist only as the isolation fallback
//! after a batch has already failed.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryResult;
use crate::entities::{catalog_records, prelude::CatalogRecords};
use crate::errors::RepositoryError;
use crate::models::{CanonicalRecord, ContentKind};

/// Projection row used by the ingestion coordinator to seed its run ledger
#[derive(Debug, Clone)]
pub struct ExistingKey {
    pub identity_key: String,
    pub record_id: Uuid,
    pub fingerprint: String,
}

/// SeaORM-based repository for catalog records
#[derive(Clone)]
pub struct CatalogRecordSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl CatalogRecordSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<CanonicalRecord>> {
        let model = CatalogRecords::find_by_id(*id).one(&*self.connection).await?;
        Ok(model.map(Self::model_to_domain))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<CanonicalRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = CatalogRecords::find()
            .filter(catalog_records::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    pub async fn find_by_source(&self, source_id: &Uuid) -> RepositoryResult<Vec<CanonicalRecord>> {
        let models = CatalogRecords::find()
            .filter(catalog_records::Column::SourceId.eq(*source_id))
            .order_by_asc(catalog_records::Column::IdentityKey)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// All records of one kind across sources, in stable insertion order
    pub async fn find_by_kind(&self, kind: ContentKind) -> RepositoryResult<Vec<CanonicalRecord>> {
        let models = CatalogRecords::find()
            .filter(catalog_records::Column::Kind.eq(kind.to_string()))
            .order_by_asc(catalog_records::Column::CreatedAt)
            .order_by_asc(catalog_records::Column::Id)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    pub async fn find_all(&self) -> RepositoryResult<Vec<CanonicalRecord>> {
        let models = CatalogRecords::find().all(&*self.connection).await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// Episode records of one series within one source
    pub async fn find_series_episodes(
        &self,
        source_id: &Uuid,
        series_key: &str,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        let models = CatalogRecords::find()
            .filter(catalog_records::Column::SourceId.eq(*source_id))
            .filter(catalog_records::Column::SeriesKey.eq(series_key))
            .filter(catalog_records::Column::Kind.eq(ContentKind::Episode.to_string()))
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// Projection-only fetch of the identity keys already stored for a
    /// source; bounded by existing-count, not whole-catalog size.
    pub async fn existing_keys(&self, source_id: &Uuid) -> RepositoryResult<Vec<ExistingKey>> {
        let rows: Vec<(String, Uuid, String)> = CatalogRecords::find()
            .select_only()
            .column(catalog_records::Column::IdentityKey)
            .column(catalog_records::Column::Id)
            .column(catalog_records::Column::Fingerprint)
            .filter(catalog_records::Column::SourceId.eq(*source_id))
            .into_tuple()
            .all(&*self.connection)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(identity_key, record_id, fingerprint)| ExistingKey {
                identity_key,
                record_id,
                fingerprint,
            })
            .collect())
    }

    /// Bulk-insert a batch of records inside one transaction
    pub async fn insert_batch(&self, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let models: Vec<catalog_records::ActiveModel> =
            records.iter().map(Self::domain_to_active).collect();

        let txn = self.connection.begin().await?;
        CatalogRecords::insert_many(models)
            .exec(&txn)
            .await
            .map_err(|e| RepositoryError::BatchWrite {
                batch_size: records.len(),
                message: e.to_string(),
            })?;
        txn.commit().await?;

        Ok(records.len())
    }

    /// Apply a batch of in-place updates inside one transaction
    pub async fn update_batch(&self, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let txn = self.connection.begin().await?;
        for record in records {
            let mut active = Self::domain_to_active(record);
            // Updates keep the original insertion timestamp
            active.created_at = sea_orm::ActiveValue::NotSet;
            active
                .update(&txn)
                .await
                .map_err(|e| RepositoryError::BatchWrite {
                    batch_size: records.len(),
                    message: e.to_string(),
                })?;
        }
        txn.commit().await?;

        Ok(records.len())
    }

    pub async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = CatalogRecords::delete_many()
            .filter(catalog_records::Column::Id.is_in(ids.iter().copied()))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_by_source(&self, source_id: &Uuid) -> RepositoryResult<u64> {
        let result = CatalogRecords::delete_many()
            .filter(catalog_records::Column::SourceId.eq(*source_id))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn count_by_source(&self, source_id: &Uuid) -> RepositoryResult<u64> {
        let count = CatalogRecords::find()
            .filter(catalog_records::Column::SourceId.eq(*source_id))
            .count(&*self.connection)
            .await?;
        Ok(count)
    }

    /// Convert SeaORM model to domain model
    fn model_to_domain(model: catalog_records::Model) -> CanonicalRecord {
        CanonicalRecord {
            id: model.id,
            source_id: model.source_id,
            identity_key: model.identity_key,
            fingerprint: model.fingerprint,
            title: model.title,
            normalized_title: model.normalized_title,
            kind: model.kind.parse().unwrap_or(ContentKind::Channel),
            stream_url: model.stream_url,
            logo_url: model.logo_url,
            group_name: model.group_name,
            series_title: model.series_title,
            series_key: model.series_key,
            season: model.season,
            episode: model.episode,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    fn domain_to_active(record: &CanonicalRecord) -> catalog_records::ActiveModel {
        catalog_records::ActiveModel {
            id: Set(record.id),
            source_id: Set(record.source_id),
            identity_key: Set(record.identity_key.clone()),
            fingerprint: Set(record.fingerprint.clone()),
            title: Set(record.title.clone()),
            normalized_title: Set(record.normalized_title.clone()),
            kind: Set(record.kind.to_string()),
            stream_url: Set(record.stream_url.clone()),
            logo_url: Set(record.logo_url.clone()),
            group_name: Set(record.group_name.clone()),
            series_title: Set(record.series_title.clone()),
            series_key: Set(record.series_key.clone()),
            season: Set(record.season),
            episode: Set(record.episode),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
    }
}
