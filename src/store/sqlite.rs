use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::{error, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{RecordStore, StoreError, CONVERSIONS};
use crate::record::ConversionRecord;

/// A key-value table in SQLite. Each record is one row keyed by
/// `(namespace, key)` with the record's JSON as the value.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and makes sure the table exists.
    pub fn open(path: &Path) -> Result<SqliteStore, StoreError> {
        let conn = Connection::open(path).map_err(|err| {
            error!("Could not open {}:\n{:#?}", path.to_string_lossy(), err);
            StoreError::Backend(err.to_string())
        })?;
        info!("Opened record store at {}", path.to_string_lossy());

        SqliteStore::with_connection(conn)
    }

    /// A store that lives only as long as this handle.
    pub fn in_memory() -> Result<SqliteStore, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        SqliteStore::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<SqliteStore, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key       TEXT NOT NULL,
                value     TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )
        .map_err(backend)?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Closes the connection, reporting anything SQLite couldn't finish.
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|err| StoreError::Backend(err.to_string()))?;

        conn.close().map_err(|(_, err)| backend(err))?;
        info!("Closed record store");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|err| StoreError::Backend(err.to_string()))
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn decode(value: &str) -> Result<ConversionRecord, StoreError> {
    serde_json::from_str(value).map_err(|err| StoreError::Corrupt(err.to_string()))
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn append(&self, record: &ConversionRecord) -> Result<(), StoreError> {
        let value =
            serde_json::to_string(record).map_err(|err| StoreError::Backend(err.to_string()))?;

        self.conn()?
            .execute(
                "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)",
                params![CONVERSIONS, record.timestamp, value],
            )
            .map_err(|err| match err {
                rusqlite::Error::SqliteFailure(ref failure, _)
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::DuplicateKey(record.timestamp.clone())
                }
                err => backend(err),
            })?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ConversionRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT value FROM kv WHERE namespace = ?1")
            .map_err(backend)?;

        let values = stmt
            .query_map(params![CONVERSIONS], |row| row.get::<_, String>(0))
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        values.iter().map(|value| decode(value)).collect()
    }

    async fn find(&self, timestamp: &str) -> Result<Option<ConversionRecord>, StoreError> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![CONVERSIONS, timestamp],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(backend)?;

        value.as_deref().map(decode).transpose()
    }
}
