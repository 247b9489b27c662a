//! In-process store: one hash set per partition behind its own `RwLock`.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Connection, DataStore};
use crate::config::StoreKind;
use crate::error::StoreError;

type Table = Arc<RwLock<HashSet<u64>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Vec<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Snapshot of the keys in `partition`, sorted. Test and bench helper.
    pub fn keys(&self, partition: usize) -> Option<Vec<u64>> {
        let tables = self.tables.read();
        let table = tables.get(partition)?;
        let mut keys: Vec<u64> = table.read().iter().copied().collect();
        keys.sort_unstable();
        Some(keys)
    }
}

impl DataStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn configure_schema(&self, partition_count: usize, record_count: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        while tables.len() < partition_count {
            let mut table = HashSet::new();
            reserve_rows(&mut table, record_count)?;
            tables.push(Arc::new(RwLock::new(table)));
        }
        Ok(())
    }

    fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
        Ok(Box::new(MemoryConnection {
            tables: self.tables.read().clone(),
        }))
    }
}

/// Grow `table` for `rows` more keys, failing instead of aborting when the
/// size cannot be allocated.
fn reserve_rows(table: &mut HashSet<u64>, rows: u64) -> Result<(), StoreError> {
    let additional = usize::try_from(rows).map_err(|_| StoreError::Capacity {
        rows,
        reason: "exceeds the address space".to_string(),
    })?;
    table
        .try_reserve(additional)
        .map_err(|e| StoreError::Capacity {
            rows,
            reason: e.to_string(),
        })
}

/// Holds the table handles that existed when it was opened.
struct MemoryConnection {
    tables: Vec<Table>,
}

impl MemoryConnection {
    fn table(&self, partition: usize) -> Result<&Table, StoreError> {
        self.tables
            .get(partition)
            .ok_or(StoreError::UnknownPartition(partition))
    }
}

impl Connection for MemoryConnection {
    fn row_count(&mut self, partition: usize) -> Result<u64, StoreError> {
        Ok(self.table(partition)?.read().len() as u64)
    }

    fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError> {
        let mut table = self.table(partition)?.write();
        reserve_rows(&mut table, keys.end.saturating_sub(keys.start))?;
        table.extend(keys);
        Ok(())
    }

    fn prepare_lookups(&mut self, partition_count: usize) -> Result<(), StoreError> {
        if partition_count > self.tables.len() {
            return Err(StoreError::UnknownPartition(self.tables.len()));
        }
        Ok(())
    }

    fn point_query(&mut self, partition: usize, key: u64) -> Result<Option<u64>, StoreError> {
        let table = self.table(partition)?.read();
        Ok(table.get(&key).copied())
    }
}
