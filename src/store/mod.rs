//! Backing store interface and implementations.
//!
//! The benchmark drives any store that can hold `partition_count` tables of
//! integer keys and answer single-key lookups. Connections are never shared:
//! each worker opens its own, so the only contention measured is the store's.

use std::ops::Range;
use std::sync::Arc;

use crate::config::{BenchConfig, StoreKind};
use crate::error::{BenchError, BenchResult, StoreError};

mod memory;
mod sqlite;
mod strata;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use strata::StrataStore;

/// A keyed store shared by all workers.
pub trait DataStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Create `partition_count` empty tables. Safe to call when they exist.
    fn configure_schema(&self, partition_count: usize, record_count: u64)
        -> Result<(), StoreError>;

    /// Open a connection owned by the caller.
    fn connect(&self) -> Result<Box<dyn Connection>, StoreError>;
}

/// One worker's private handle to a [`DataStore`].
pub trait Connection {
    /// Number of rows in `partition`.
    fn row_count(&mut self, partition: usize) -> Result<u64, StoreError>;

    /// Insert `keys` into `partition` in ascending order.
    fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError>;

    /// Set up reusable lookups for partitions `0..partition_count` so the
    /// timed phase pays no preparation cost.
    fn prepare_lookups(&mut self, partition_count: usize) -> Result<(), StoreError>;

    /// Look `key` up in `partition`. `Ok(None)` means not found.
    fn point_query(&mut self, partition: usize, key: u64) -> Result<Option<u64>, StoreError>;
}

/// Table name used by the SQL backends.
pub(crate) fn table_name(partition: usize) -> String {
    format!("t{}", partition)
}

/// Build the store selected by `config`.
pub fn open_store(config: &BenchConfig) -> BenchResult<Arc<dyn DataStore>> {
    let store: Arc<dyn DataStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Sqlite => match &config.sqlite_path {
            Some(path) => Arc::new(SqliteStore::open(path)),
            None => Arc::new(SqliteStore::temporary().map_err(BenchError::Startup)?),
        },
        StoreKind::Strata => Arc::new(StrataStore::temporary().map_err(BenchError::Startup)?),
    };
    Ok(store)
}
