//! Run configuration.
//!
//! A [`BenchConfig`] is built once at startup and then only read: the
//! orchestrator and every worker borrow the same value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};
use crate::workload::AccessPolicy;

pub const DEFAULT_PARTITIONS: usize = 4;
pub const DEFAULT_RECORDS: u64 = 100_000;
pub const DEFAULT_ITERATIONS: u64 = 100_000;
pub const DEFAULT_SEED: u64 = 0x5DEECE66D;

/// Backing store selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process tables, one lock per partition.
    #[default]
    Memory,
    /// SQLite database file, one connection per worker.
    Sqlite,
    /// StrataDB key-value store.
    Strata,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Memory, StoreKind::Sqlite, StoreKind::Strata];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Strata => "strata",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StoreKind {
    type Err = BenchError;

    /// Case-insensitive; a selector matches if it starts with the kind's
    /// label, so `sqlite3` and `StrataDB` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.starts_with(kind.label()))
            .ok_or_else(|| BenchError::UnsupportedStore(s.to_string()))
    }
}

/// Immutable benchmark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of partitions, and therefore of workers.
    pub partition_count: usize,
    /// Rows per partition; keys are `0..record_count`.
    pub record_count: u64,
    /// Timed lookups per worker.
    pub iteration_count: u64,
    pub access_policy: AccessPolicy,
    /// Base seed; each worker derives its own generator from it.
    pub seed: u64,
    pub store: StoreKind,
    /// Database file for the sqlite store. A temporary file is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITIONS,
            record_count: DEFAULT_RECORDS,
            iteration_count: DEFAULT_ITERATIONS,
            access_policy: AccessPolicy::default(),
            seed: DEFAULT_SEED,
            store: StoreKind::default(),
            sqlite_path: None,
        }
    }
}

impl BenchConfig {
    /// Load a config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> BenchResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.partition_count == 0 {
            return Err(BenchError::InvalidConfig(
                "partition_count must be at least 1".into(),
            ));
        }
        if self.record_count == 0 {
            return Err(BenchError::InvalidConfig(
                "record_count must be at least 1".into(),
            ));
        }
        if self.iteration_count == 0 {
            return Err(BenchError::InvalidConfig(
                "iteration_count must be at least 1".into(),
            ));
        }
        if self.record_count > i64::MAX as u64 {
            return Err(BenchError::InvalidConfig(format!(
                "record_count {} does not fit a signed 64-bit key",
                self.record_count
            )));
        }
        Ok(())
    }
}
