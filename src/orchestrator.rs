//! Top-level run: schema setup, one worker thread per partition, join, report.

use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::barrier::{Barrier, Rendezvous};
use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult, WorkerFailure};
use crate::store::DataStore;
use crate::worker::{Worker, WorkerOutcome, WorkerReport};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// One outcome per worker, indexed by worker id.
    pub outcomes: Vec<WorkerOutcome>,
    /// From the first thread start until the last join.
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn reports(&self) -> impl Iterator<Item = &WorkerReport> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerFailure> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    pub fn failed_workers(&self) -> usize {
        self.failures().count()
    }

    /// Slowest completed worker, if any completed.
    pub fn max_worker_elapsed(&self) -> Option<Duration> {
        self.reports().map(|r| r.elapsed).max()
    }

    /// Lookups performed by workers that completed.
    pub fn completed_lookups(&self) -> u64 {
        self.reports().map(|r| r.iterations).sum()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

pub struct Orchestrator {
    config: BenchConfig,
    store: Arc<dyn DataStore>,
}

impl Orchestrator {
    pub fn new(config: BenchConfig, store: Arc<dyn DataStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run the benchmark.
    ///
    /// Fails only on startup errors. Worker failures end up in
    /// [`RunSummary::outcomes`].
    pub fn run(&self) -> BenchResult<RunSummary> {
        let config = &self.config;
        config.validate()?;

        info!(
            store = %self.store.kind(),
            partitions = config.partition_count,
            records = config.record_count,
            iterations = config.iteration_count,
            policy = %config.access_policy,
            "configuring schema"
        );
        self.store
            .configure_schema(config.partition_count, config.record_count)
            .map_err(BenchError::Startup)?;
        // Fail fast on an unreachable store instead of once per worker.
        drop(self.store.connect().map_err(BenchError::Startup)?);

        let barrier = Barrier::new(config.partition_count);
        let workers: Vec<Worker<'_>> = (0..config.partition_count)
            .map(|id| Worker::new(id, config))
            .collect();

        info!(workers = workers.len(), "starting workers");
        let start = Instant::now();
        let outcomes = self.execute(workers, &barrier);
        let elapsed = start.elapsed();

        let summary = RunSummary { outcomes, elapsed };
        if summary.failed_workers() > 0 {
            warn!(
                failed = summary.failed_workers(),
                total = config.partition_count,
                "aggregate elapsed time includes workers that did not finish"
            );
        }
        info!(elapsed_ms = summary.elapsed_ms() as u64, "run complete");
        Ok(summary)
    }

    fn execute(&self, workers: Vec<Worker<'_>>, barrier: &Barrier) -> Vec<WorkerOutcome> {
        let store: &dyn DataStore = self.store.as_ref();
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers.len());
            for worker in workers {
                let id = worker.id();
                let spawned = thread::Builder::new()
                    .name(format!("worker-{}", id))
                    .spawn_scoped(scope, move || worker.run(store, barrier));
                match spawned {
                    Ok(handle) => handles.push((id, Ok(handle))),
                    Err(source) => {
                        // Never going to arrive; let the others go.
                        barrier.abandon();
                        error!(worker = id, error = %source, "failed to spawn worker thread");
                        handles.push((id, Err(WorkerFailure::Spawn { worker: id, source })));
                    }
                }
            }

            handles
                .into_iter()
                .map(|(id, handle)| match handle {
                    Ok(handle) => handle.join().unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!(worker = id, %message, "worker panicked");
                        Err(WorkerFailure::Panicked {
                            worker: id,
                            message,
                        })
                    }),
                    Err(failure) => Err(failure),
                })
                .collect()
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
