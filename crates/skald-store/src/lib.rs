//! Skald Storage Layer
//!
//! Implements the [`SourceStore`] trait for the source ledger.
//!
//! # Architecture
//!
//! - [`SqliteStore`]: one row per source holding its histogram as a JSON
//!   array, the persistent backend of stateful deployments
//! - [`MemoryStore`]: a plain map, for tests and embedded use
//!
//! # Examples
//!
//! ```no_run
//! use skald_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for ledger operations
//! ```

#![warn(missing_docs)]

mod memory;

pub use memory::MemoryStore;

use rusqlite::{params, Connection, OptionalExtension};
use skald_domain::traits::SourceStore;
use skald_domain::{Histogram, SourceRecord};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored histogram could not be decoded
    #[error("Invalid histogram for source '{source_id}': {reason}")]
    InvalidData {
        /// Source whose record is corrupt
        source_id: String,
        /// Decoder message
        reason: String,
    },

    /// Histogram could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// SQLite-based implementation of SourceStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a SqliteStore behind a mutex
/// (the source ledger does this) or give each thread its own instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use skald_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("skald.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn decode(source_id: &str, raw: &str) -> Result<Histogram, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::InvalidData {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SourceStore for SqliteStore {
    type Error = StoreError;

    fn load(&self, source_id: &str) -> Result<Option<Histogram>, Self::Error> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT ratings FROM sources WHERE source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|r| Self::decode(source_id, &r)).transpose()
    }

    fn save_all(&mut self, records: &[SourceRecord]) -> Result<(), Self::Error> {
        let updated_at = now_secs();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sources (source_id, ratings, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(source_id) DO UPDATE SET
                 ratings = excluded.ratings, updated_at = excluded.updated_at",
            )?;
            for record in records {
                let ratings = serde_json::to_string(&record.ratings)?;
                stmt.execute(params![&record.source_id, ratings, updated_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<usize, Self::Error> {
        let removed = self.conn.execute("DELETE FROM sources", [])?;
        Ok(removed)
    }

    fn source_ids(&self) -> Result<Vec<String>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_id FROM sources ORDER BY source_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
