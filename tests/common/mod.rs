//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oltp_benchmarks::store::MemoryStore;
use oltp_benchmarks::{AccessPolicy, BenchConfig, Connection, DataStore, StoreError, StoreKind};

// =============================================================================
// Configs
// =============================================================================

pub fn small_config(partitions: usize, records: u64, iterations: u64) -> BenchConfig {
    BenchConfig {
        partition_count: partitions,
        record_count: records,
        iteration_count: iterations,
        access_policy: AccessPolicy::Uniform,
        ..Default::default()
    }
}

// =============================================================================
// Console output parsing
// =============================================================================

pub struct ConsoleLines {
    /// (worker id, msec) per `Thread` line, in output order.
    pub workers: Vec<(usize, u128)>,
    pub aggregate: u128,
}

pub fn parse_console(text: &str) -> ConsoleLines {
    let mut workers = Vec::new();
    let mut aggregate = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Thread ") {
            let (id, rest) = rest.split_once(" query time: ").expect("malformed thread line");
            let ms = rest.strip_suffix(" msec").expect("missing msec suffix");
            workers.push((id.parse().unwrap(), ms.parse().unwrap()));
        } else if let Some(rest) = line.strip_prefix("Elapsed time query execution: ") {
            let ms = rest.strip_suffix(" msec").expect("missing msec suffix");
            aggregate = Some(ms.parse().unwrap());
        } else {
            panic!("unexpected output line: {}", line);
        }
    }
    ConsoleLines {
        workers,
        aggregate: aggregate.expect("no aggregate line"),
    }
}

// =============================================================================
// Fault-injecting store
// =============================================================================

/// Memory store whose connection for `failing_partition` breaks right after
/// that partition has been populated.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_partition: usize,
    pub connects: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failing_partition: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            failing_partition,
            connects: AtomicUsize::new(0),
        })
    }
}

impl DataStore for FlakyStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn configure_schema(&self, partition_count: usize, record_count: u64) -> Result<(), StoreError> {
        self.inner.configure_schema(partition_count, record_count)
    }

    fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FlakyConnection {
            inner: self.inner.connect()?,
            failing_partition: self.failing_partition,
            home: None,
            populated: false,
        }))
    }
}

struct FlakyConnection {
    inner: Box<dyn Connection>,
    failing_partition: usize,
    // The first partition a connection counts is its worker's own.
    home: Option<usize>,
    populated: bool,
}

impl FlakyConnection {
    fn broken(&self) -> bool {
        self.populated && self.home == Some(self.failing_partition)
    }
}

impl Connection for FlakyConnection {
    fn row_count(&mut self, partition: usize) -> Result<u64, StoreError> {
        self.home.get_or_insert(partition);
        self.inner.row_count(partition)
    }

    fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError> {
        self.inner.bulk_insert(partition, keys)?;
        self.populated = true;
        Ok(())
    }

    fn prepare_lookups(&mut self, partition_count: usize) -> Result<(), StoreError> {
        self.inner.prepare_lookups(partition_count)
    }

    fn point_query(&mut self, partition: usize, key: u64) -> Result<Option<u64>, StoreError> {
        if self.broken() {
            return Err(StoreError::Connect("connection reset by peer".into()));
        }
        self.inner.point_query(partition, key)
    }
}

/// Store that refuses every connection.
pub struct UnreachableStore;

impl DataStore for UnreachableStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn configure_schema(&self, _: usize, _: u64) -> Result<(), StoreError> {
        Err(StoreError::Connect("no route to host".into()))
    }

    fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
        Err(StoreError::Connect("no route to host".into()))
    }
}
