//! SQLite-backed document store

use super::store::{Document, DocumentStore, VersionToken, WriteCondition, WriteOutcome};
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// Summary of every stored document
    pub fn stats(&self) -> Result<Vec<DocumentInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, version, length(CAST(content AS BLOB)), updated_at FROM documents ORDER BY key",
        )?;

        let docs = stmt
            .query_map([], |row| {
                Ok(DocumentInfo {
                    key: row.get(0)?,
                    version: row.get(1)?,
                    bytes: row.get::<_, i64>(2)? as usize,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(docs)
    }
}

impl DocumentStore for Database {
    fn read(&self, key: &str) -> Result<Option<Document>> {
        let doc = self
            .conn
            .query_row(
                "SELECT content, version FROM documents WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Document {
                        content: row.get(0)?,
                        version: VersionToken(row.get(1)?),
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    fn write(&self, key: &str, content: &str, condition: WriteCondition) -> Result<WriteOutcome> {
        let (changed, version) = match condition {
            WriteCondition::Create => {
                let changed = self.conn.execute(
                    "INSERT INTO documents (key, content, version) VALUES (?1, ?2, 1)
                     ON CONFLICT(key) DO NOTHING",
                    params![key, content],
                )?;
                (changed, 1)
            }
            WriteCondition::Match(VersionToken(expected)) => {
                let changed = self.conn.execute(
                    "UPDATE documents SET content = ?2, version = version + 1, updated_at = datetime('now')
                     WHERE key = ?1 AND version = ?3",
                    params![key, content, expected],
                )?;
                (changed, expected + 1)
            }
        };

        if changed == 0 {
            log::warn!("Write conflict on {}", key);
            return Ok(WriteOutcome::Conflict);
        }
        Ok(WriteOutcome::Written(VersionToken(version)))
    }
}

/// One stored document, as listed by `status`
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub key: String,
    pub version: i64,
    pub bytes: usize,
    pub updated_at: String,
}
