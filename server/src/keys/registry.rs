//! Durable key/value table backed by SQLite.

use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};

use crate::db::models::{ContentEntry, ContentKind};
use crate::db::DbPool;
use crate::error::{PasteError, Result};

/// Result of attempting to claim a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A unique constraint rejected the row: either the key or the
    /// (kind, value) pair was claimed by someone else in the meantime.
    Taken,
}

/// Storage seam for the derivation engine.
///
/// Implementations must enforce key uniqueness and value uniqueness in
/// the store itself, so that `insert` reports `Taken` even when the
/// competing writer lives in another process.
pub trait KeyRegistry: Send + Sync {
    /// Key of the entry holding `value`, if any.
    fn find_by_value(&self, kind: ContentKind, value: &str) -> Result<Option<String>>;

    fn find_by_key(&self, key: &str) -> Result<Option<ContentEntry>>;

    fn key_exists(&self, key: &str) -> Result<bool>;

    fn insert(&self, entry: &ContentEntry) -> Result<InsertOutcome>;
}

/// Registry over a shared rusqlite connection.
#[derive(Clone)]
pub struct SqliteRegistry {
    db: DbPool,
}

impl SqliteRegistry {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .db
            .lock()
            .map_err(|e| PasteError::Internal(format!("DB lock error: {}", e)))?;
        f(&conn)
    }

    pub fn count_entries(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
        })
    }
}

impl KeyRegistry for SqliteRegistry {
    fn find_by_value(&self, kind: ContentKind, value: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT key FROM entries WHERE kind = ?1 AND value = ?2",
                    params![kind.as_str(), value],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn find_by_key(&self, key: &str) -> Result<Option<ContentEntry>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT key, kind, value, created_at FROM entries WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        match row {
            Some((key, kind, value, created_at)) => {
                let kind = kind.parse::<ContentKind>().map_err(|e| {
                    PasteError::Internal(format!("key {} has {}", key, e))
                })?;
                Ok(Some(ContentEntry {
                    key,
                    kind,
                    value,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    fn key_exists(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(key) FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn insert(&self, entry: &ContentEntry) -> Result<InsertOutcome> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO entries (created_at, kind, key, value) VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.created_at,
                    entry.kind.as_str(),
                    entry.key,
                    entry.value
                ],
            );
            match inserted {
                Ok(_) => Ok(InsertOutcome::Inserted),
                Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Taken),
                Err(e) => Err(e.into()),
            }
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}
