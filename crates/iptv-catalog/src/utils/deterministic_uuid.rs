//! Deterministic UUID Generation
//!
//! Catalog record ids must stay stable across re-ingestions of the same
//! source so that index entries and projections keyed by record id survive
//! an update in place. Ids are therefore derived from (source id, identity
//! key) rather than generated randomly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Generate a deterministic UUID from hashable inputs
///
/// The same inputs always produce the same UUID.
pub fn generate_deterministic_uuid(inputs: &[&str]) -> Uuid {
    let mut hasher = DefaultHasher::new();

    for input in inputs {
        input.hash(&mut hasher);
    }

    let hash = hasher.finish();

    // DefaultHasher produces u64; widen it to fill the full u128.
    let uuid_bits = ((hash as u128) << 64) | (hash as u128);
    Uuid::from_u128(uuid_bits)
}

/// Stable id for a catalog record scoped to one source
pub fn generate_record_uuid(source_id: &Uuid, identity_key: &str) -> Uuid {
    generate_deterministic_uuid(&[&source_id.to_string(), identity_key])
}
