//! Concurrent point-lookup benchmark.
//!
//! One worker thread per partition populates its table, waits at a shared
//! barrier so every worker starts measuring at the same instant, then issues
//! a fixed number of single-key lookups against the store. The orchestrator
//! reports each worker's time and the wall-clock time of the whole run.

pub mod barrier;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod report;
pub mod schema;
pub mod store;
pub mod worker;
pub mod workload;

pub use barrier::{Barrier, Rendezvous};
pub use config::{BenchConfig, StoreKind};
pub use error::{BenchError, BenchResult, StoreError, WorkerFailure};
pub use orchestrator::{Orchestrator, RunSummary};
pub use store::{open_store, Connection, DataStore};
pub use worker::{populate_partition, Population, Worker, WorkerOutcome, WorkerReport};
pub use workload::{AccessPolicy, FastRng, Request, WorkloadGenerator};
