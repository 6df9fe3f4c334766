use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tables in order of dependencies
        self.create_sources_table(manager).await?;
        self.create_catalog_records_table(manager).await?;
        self.create_series_rollups_table(manager).await?;

        // Create indexes
        self.create_indexes(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order
        manager
            .drop_table(Table::drop().table(SeriesRollups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sources::Table).to_owned())
            .await?;

        Ok(())
    }
}

impl Migration {
    async fn create_sources_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sources::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sources::Name).string().not_null())
                    .col(ColumnDef::new(Sources::Kind).string().not_null())
                    .col(ColumnDef::new(Sources::Url).string().not_null())
                    .col(ColumnDef::new(Sources::Username).string())
                    .col(ColumnDef::new(Sources::Password).string())
                    .col(
                        ColumnDef::new(Sources::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sources::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Sources::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Sources::UpdatedAt).string().not_null())
                    .col(ColumnDef::new(Sources::LastIngestedAt).string())
                    .col(ColumnDef::new(Sources::LastError).string())
                    .to_owned(),
            )
            .await
    }

    async fn create_catalog_records_table(
        &self,
        manager: &SchemaManager<'_>,
    ) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CatalogRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogRecords::SourceId).string().not_null())
                    .col(
                        ColumnDef::new(CatalogRecords::IdentityKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogRecords::Fingerprint)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogRecords::Title).string().not_null())
                    .col(
                        ColumnDef::new(CatalogRecords::NormalizedTitle)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogRecords::Kind).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::StreamUrl).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::LogoUrl).string())
                    .col(ColumnDef::new(CatalogRecords::GroupName).string())
                    .col(ColumnDef::new(CatalogRecords::SeriesTitle).string())
                    .col(ColumnDef::new(CatalogRecords::SeriesKey).string())
                    .col(ColumnDef::new(CatalogRecords::Season).integer())
                    .col(ColumnDef::new(CatalogRecords::Episode).integer())
                    .col(ColumnDef::new(CatalogRecords::CreatedAt).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::UpdatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalog_records_source")
                            .from(CatalogRecords::Table, CatalogRecords::SourceId)
                            .to(Sources::Table, Sources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_series_rollups_table(
        &self,
        manager: &SchemaManager<'_>,
    ) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeriesRollups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeriesRollups::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeriesRollups::SourceId).string().not_null())
                    .col(ColumnDef::new(SeriesRollups::SeriesKey).string().not_null())
                    .col(ColumnDef::new(SeriesRollups::Title).string().not_null())
                    .col(
                        ColumnDef::new(SeriesRollups::EpisodeCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SeriesRollups::SeasonCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SeriesRollups::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        // Identity keys are source-scoped; this is the write-time dedup boundary
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_catalog_records_source_identity")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::SourceId)
                    .col(CatalogRecords::IdentityKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_catalog_records_kind")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_catalog_records_series")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::SourceId)
                    .col(CatalogRecords::SeriesKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_series_rollups_source_series")
                    .table(SeriesRollups::Table)
                    .col(SeriesRollups::SourceId)
                    .col(SeriesRollups::SeriesKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sources {
    Table,
    Id,
    Name,
    Kind,
    Url,
    Username,
    Password,
    Priority,
    IsActive,
    CreatedAt,
    UpdatedAt,
    LastIngestedAt,
    LastError,
}

#[derive(DeriveIden)]
enum CatalogRecords {
    Table,
    Id,
    SourceId,
    IdentityKey,
    Fingerprint,
    Title,
    NormalizedTitle,
    Kind,
    StreamUrl,
    LogoUrl,
    GroupName,
    SeriesTitle,
    SeriesKey,
    Season,
    Episode,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SeriesRollups {
    Table,
    Id,
    SourceId,
    SeriesKey,
    Title,
    EpisodeCount,
    SeasonCount,
    UpdatedAt,
}
