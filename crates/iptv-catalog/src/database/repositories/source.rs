//! Source repository implementation

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryResult;
use crate::entities::{prelude::Sources, sources};
use crate::errors::RepositoryError;
use crate::models::{SourceCreateRequest, SourceDescriptor, SourceKind};

/// SeaORM-based repository for source descriptors
#[derive(Clone)]
pub struct SourceSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SourceSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Create a new source
    pub async fn create(&self, request: SourceCreateRequest) -> RepositoryResult<SourceDescriptor> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let active_model = sources::ActiveModel {
            id: Set(id),
            name: Set(request.name.clone()),
            kind: Set(request.kind.to_string()),
            url: Set(request.url.clone()),
            username: Set(request.username.clone()),
            password: Set(request.password.clone()),
            priority: Set(request.priority),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_ingested_at: Set(None),
            last_error: Set(None),
        };

        let model = active_model.insert(&*self.connection).await?;
        Ok(Self::model_to_domain(model))
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<SourceDescriptor>> {
        let model = Sources::find_by_id(*id).one(&*self.connection).await?;
        Ok(model.map(Self::model_to_domain))
    }

    pub async fn find_all(&self) -> RepositoryResult<Vec<SourceDescriptor>> {
        let models = Sources::find()
            .order_by_asc(sources::Column::Priority)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// Active sources ordered by priority rank
    pub async fn find_active(&self) -> RepositoryResult<Vec<SourceDescriptor>> {
        let models = Sources::find()
            .filter(sources::Column::IsActive.eq(true))
            .order_by_asc(sources::Column::Priority)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    /// Record the outcome of an ingestion attempt on the source's metadata
    pub async fn update_ingest_status(
        &self,
        id: &Uuid,
        last_error: Option<String>,
    ) -> RepositoryResult<()> {
        let model = Sources::find_by_id(*id)
            .one(&*self.connection)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound {
                table: "sources".to_string(),
                id: id.to_string(),
            })?;

        let mut active: sources::ActiveModel = model.into();
        active.last_ingested_at = Set(Some(Utc::now()));
        active.last_error = Set(last_error);
        active.updated_at = Set(Utc::now());
        active.update(&*self.connection).await?;

        Ok(())
    }

    pub async fn delete(&self, id: &Uuid) -> RepositoryResult<()> {
        Sources::delete_by_id(*id).exec(&*self.connection).await?;
        Ok(())
    }

    fn model_to_domain(model: sources::Model) -> SourceDescriptor {
        SourceDescriptor {
            id: model.id,
            name: model.name,
            kind: model.kind.parse().unwrap_or(SourceKind::Manifest),
            url: model.url,
            username: model.username,
            password: model.password,
            priority: model.priority,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_ingested_at: model.last_ingested_at,
            last_error: model.last_error,
        }
    }
}
