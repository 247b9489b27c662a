//! Error types for the benchmark driver.
//!
//! Three layers: [`StoreError`] for anything the backing store reports,
//! [`WorkerFailure`] for a worker that could not finish its timed phase, and
//! [`BenchError`] for failures that abort the whole run.

use std::io;

use thiserror::Error;

/// Failure reported by a [`DataStore`](crate::store::DataStore) or one of
/// its connections.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("partition {0} does not exist")]
    UnknownPartition(usize),

    #[error("cannot hold {rows} rows: {reason}")]
    Capacity { rows: u64, reason: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("strata error: {0}")]
    Strata(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Backend(String),
}

/// Why a worker stopped before producing a timing.
///
/// Worker failures are isolated: the orchestrator records them and keeps
/// going, they never abort the run.
#[derive(Debug, Error)]
pub enum WorkerFailure {
    #[error("worker {worker} could not connect: {source}")]
    Connect { worker: usize, source: StoreError },

    #[error("worker {worker} could not populate its partition: {source}")]
    Populate { worker: usize, source: StoreError },

    #[error("worker {worker} could not prepare lookups: {source}")]
    Prepare { worker: usize, source: StoreError },

    #[error("worker {worker} lookup failed at iteration {iteration}: {source}")]
    Query {
        worker: usize,
        iteration: u64,
        source: StoreError,
    },

    #[error("worker {worker} thread could not be spawned: {source}")]
    Spawn { worker: usize, source: io::Error },

    #[error("worker {worker} panicked: {message}")]
    Panicked { worker: usize, message: String },
}

impl WorkerFailure {
    /// Id of the worker that failed.
    pub fn worker(&self) -> usize {
        match self {
            Self::Connect { worker, .. }
            | Self::Populate { worker, .. }
            | Self::Prepare { worker, .. }
            | Self::Query { worker, .. }
            | Self::Spawn { worker, .. }
            | Self::Panicked { worker, .. } => *worker,
        }
    }

    /// True if the worker had already passed the barrier when it failed.
    pub fn during_timed_phase(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}

/// Fatal errors: the run is aborted and nothing is reported.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("startup failed: {0}")]
    Startup(#[source] StoreError),

    #[error("unsupported store kind '{0}' (expected one of: memory, sqlite, strata)")]
    UnsupportedStore(String),

    #[error("unsupported access policy '{0}' (expected uniform or partitioned)")]
    UnsupportedPolicy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for fallible driver operations.
pub type BenchResult<T> = std::result::Result<T, BenchError>;
