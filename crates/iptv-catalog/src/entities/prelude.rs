pub use super::catalog_records::Entity as CatalogRecords;
pub use super::series_rollups::Entity as SeriesRollups;
pub use super::sources::Entity as Sources;
