pub mod memory;
pub mod sqlite;

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use chrono::DateTime;
use memory::MemoryStore;
use sqlite::SqliteStore;

use crate::record::ConversionRecord;

/// The namespace every conversion record is stored under.
pub const CONVERSIONS: &str = "conversions";

/// Represents an error from a record store.
#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// A record is already stored under this timestamp.
    DuplicateKey(String),
    Backend(String),
    /// A stored value could not be decoded back into a record.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateKey(key) => write!(f, "A record already exists for {}", key),
            StoreError::Backend(reason) => write!(f, "Record store failed\n{}", reason),
            StoreError::Corrupt(reason) => write!(f, "Stored record is unreadable\n{}", reason),
        }
    }
}

impl Error for StoreError {}

/// An append-only log of conversion records keyed by `(CONVERSIONS, timestamp)`.
#[async_trait]
pub trait RecordStore {
    /// Stores a record under its timestamp. Never overwrites an existing record.
    async fn append(&self, record: &ConversionRecord) -> Result<(), StoreError>;

    /// Every stored record, in whatever order the store keeps them.
    async fn list_all(&self) -> Result<Vec<ConversionRecord>, StoreError>;

    /// The record stored under `timestamp`, if any.
    async fn find(&self, timestamp: &str) -> Result<Option<ConversionRecord>, StoreError>;
}

/// Allows choosing between the SQLite store and the in-memory one at startup.
pub enum Stores {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl Stores {
    /// Releases the underlying store, flushing anything it holds open.
    pub fn close(self) -> Result<(), StoreError> {
        match self {
            Stores::Sqlite(store) => store.close(),
            Stores::Memory(_) => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for Stores {
    async fn append(&self, record: &ConversionRecord) -> Result<(), StoreError> {
        match self {
            Stores::Sqlite(store) => store.append(record).await,
            Stores::Memory(store) => store.append(record).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<ConversionRecord>, StoreError> {
        match self {
            Stores::Sqlite(store) => store.list_all().await,
            Stores::Memory(store) => store.list_all().await,
        }
    }

    async fn find(&self, timestamp: &str) -> Result<Option<ConversionRecord>, StoreError> {
        match self {
            Stores::Sqlite(store) => store.find(timestamp).await,
            Stores::Memory(store) => store.find(timestamp).await,
        }
    }
}

/// All the records in a store, most recent first.
#[derive(Serialize, Debug)]
pub struct Listing {
    pub records: Vec<ConversionRecord>,
    pub total: usize,
}

impl Listing {
    /// Reads every record out of `store` and sorts it for display.
    pub async fn load<S: RecordStore + ?Sized>(store: &S) -> Result<Listing, StoreError> {
        let mut records = store.list_all().await?;
        sort_newest_first(&mut records);

        Ok(Listing {
            total: records.len(),
            records,
        })
    }
}

/// Sorts records by timestamp, most recent first.
///
/// Timestamps are compared as points in time when they parse, falling back to
/// comparing the raw strings.
pub fn sort_newest_first(records: &mut [ConversionRecord]) {
    records.sort_by(|a, b| compare_timestamps(&b.timestamp, &a.timestamp));
}

fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
