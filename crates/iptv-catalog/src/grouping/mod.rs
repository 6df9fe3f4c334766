//! Grouping engine
//!
//! Read-time clustering of records across sources into unified items. Purely
//! derived and read-only: it never mutates canonical records, and a
//! single-source bucket is an ordinary unified item with zero alternatives.

use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

pub mod normalize;

pub use normalize::{TitleNormalizer, quality_score};

use crate::config::GroupingConfig;
use crate::models::{CanonicalRecord, UnifiedItem, Variant};

pub struct GroupingEngine {
    normalizer: TitleNormalizer,
}

impl GroupingEngine {
    pub fn new(config: &GroupingConfig) -> Self {
        Self {
            normalizer: TitleNormalizer::new(&config.edition_markers),
        }
    }

    /// Cluster records of one kind into unified items
    ///
    /// `priorities` maps source id → configured rank (lower wins). Variant
    /// order is quality desc, then priority rank, then insertion order, so
    /// the output is deterministic for fixed inputs.
    pub fn group(
        &self,
        records: Vec<CanonicalRecord>,
        priorities: &HashMap<Uuid, i32>,
    ) -> Vec<UnifiedItem> {
        let mut buckets: BTreeMap<String, Vec<Variant>> = BTreeMap::new();

        for record in records {
            let mut key = self.normalizer.normalize(&record.title);
            if key.is_empty() {
                // A title made only of punctuation/markers still needs a bucket
                key = record.normalized_title.clone();
            }
            let quality = quality_score(&format!("{} {}", record.title, record.stream_url));
            buckets
                .entry(key)
                .or_default()
                .push(Variant { record, quality });
        }

        buckets
            .into_iter()
            .filter_map(|(normalized_title, mut variants)| {
                variants.sort_by(|a, b| {
                    b.quality
                        .cmp(&a.quality)
                        .then_with(|| {
                            let pa = priorities.get(&a.record.source_id).copied().unwrap_or(i32::MAX);
                            let pb = priorities.get(&b.record.source_id).copied().unwrap_or(i32::MAX);
                            pa.cmp(&pb)
                        })
                        .then_with(|| a.record.created_at.cmp(&b.record.created_at))
                        .then_with(|| a.record.id.cmp(&b.record.id))
                });

                let mut variants = variants.into_iter();
                let primary = variants.next()?;
                Some(UnifiedItem {
                    normalized_title,
                    kind: primary.record.kind,
                    primary,
                    alternatives: variants.collect(),
                })
            })
            .collect()
    }
}
