pub mod deterministic_uuid;

pub use deterministic_uuid::generate_record_uuid;
