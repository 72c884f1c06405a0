//! Versioned document storage
//!
//! Output artifacts are stored as whole documents under a key. Writes are
//! conditional on the version read earlier, so a concurrent writer shows up
//! as a conflict instead of being overwritten.

use crate::Result;

/// Opaque version of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub version: VersionToken,
}

/// Precondition for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// The key must not exist yet
    Create,
    /// The stored version must still be this one
    Match(VersionToken),
}

impl WriteCondition {
    /// Condition matching what was read at the start of a run
    pub fn from_existing(existing: Option<&Document>) -> Self {
        existing.map_or(WriteCondition::Create, |d| WriteCondition::Match(d.version))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(VersionToken),
    /// Someone else wrote the key since it was read
    Conflict,
}

/// Key/value store with optimistic concurrency
pub trait DocumentStore {
    fn read(&self, key: &str) -> Result<Option<Document>>;

    fn write(&self, key: &str, content: &str, condition: WriteCondition) -> Result<WriteOutcome>;
}
