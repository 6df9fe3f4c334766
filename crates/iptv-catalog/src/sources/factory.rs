//! Factory for creating source handlers

use std::sync::Arc;

use super::api::ApiSourceHandler;
use super::classify::KeywordClassifier;
use super::manifest::ManifestSourceHandler;
use super::traits::SourceHandler;
use crate::config::{ClassificationConfig, IngestionConfig};
use crate::models::SourceKind;

/// Creates the right handler for a source kind
pub struct SourceHandlerFactory {
    classifier: Arc<KeywordClassifier>,
    ingestion: IngestionConfig,
}

impl SourceHandlerFactory {
    pub fn new(classification: &ClassificationConfig, ingestion: IngestionConfig) -> Self {
        Self {
            classifier: Arc::new(KeywordClassifier::new(&classification.movie_keywords)),
            ingestion,
        }
    }

    pub fn create_handler(&self, kind: SourceKind) -> Arc<dyn SourceHandler> {
        match kind {
            SourceKind::Manifest => Arc::new(ManifestSourceHandler::new(
                self.classifier.clone(),
                self.ingestion.clone(),
            )),
            SourceKind::Api => Arc::new(ApiSourceHandler::new(&self.ingestion)),
        }
    }
}
