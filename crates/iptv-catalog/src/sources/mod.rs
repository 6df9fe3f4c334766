//! Source handlers
//!
//! Format-specific handlers that turn a configured source into a lazy stream
//! of record drafts. Parsing itself is pure; the handlers only add transport.

pub mod api;
pub mod classify;
pub mod factory;
pub mod manifest;
pub mod traits;

pub use classify::{KeywordClassifier, parse_episode_marker};
pub use factory::SourceHandlerFactory;
pub use traits::{DraftEvent, DraftStream, SourceHandler};
