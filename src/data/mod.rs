//! Data ingestion and storage
//!
//! Source adapters, normalization, merging, and the document store that
//! holds the canonical dataset between runs.

pub mod database;
pub mod dataset;
pub mod merge;
pub mod normalize;
pub mod scrapers;
pub mod store;
pub mod table;

pub use database::Database;
pub use merge::{merge, MergeOutcome, MergeStats};
pub use normalize::Normalizer;
pub use store::{Document, DocumentStore, VersionToken, WriteCondition, WriteOutcome};
pub use table::{RawPayload, RawTable};
