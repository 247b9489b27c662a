//! One benchmark participant, bound to one partition.
//!
//! Protocol: connect, populate the own partition if it is empty, prepare
//! lookups for every partition, meet the other workers at the barrier, then
//! run the fixed number of timed lookups.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::barrier::Rendezvous;
use crate::config::BenchConfig;
use crate::error::{StoreError, WorkerFailure};
use crate::store::{Connection, DataStore};
use crate::workload::{FastRng, WorkloadGenerator};

/// Timing of a worker that completed its timed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub iterations: u64,
    /// Lookups that found a row.
    pub found: u64,
    /// Wall-clock time of the whole timed loop.
    pub elapsed: Duration,
    /// Whether this worker had to populate its partition.
    pub populated: bool,
}

impl WorkerReport {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

pub type WorkerOutcome = Result<WorkerReport, WorkerFailure>;

/// What [`populate_partition`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Inserted,
    AlreadyPopulated,
    /// Rows exist but not `record_count` of them. Left untouched.
    Partial(u64),
}

/// Insert keys `0..record_count` into `partition` unless it already has rows.
pub fn populate_partition(
    conn: &mut dyn Connection,
    partition: usize,
    record_count: u64,
) -> Result<Population, StoreError> {
    let rows = conn.row_count(partition)?;
    if rows == 0 {
        let start = Instant::now();
        conn.bulk_insert(partition, 0..record_count)?;
        info!(
            partition,
            record_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "partition populated"
        );
        Ok(Population::Inserted)
    } else if rows == record_count {
        debug!(partition, rows, "partition already populated");
        Ok(Population::AlreadyPopulated)
    } else {
        warn!(
            partition,
            rows,
            expected = record_count,
            "partition partially populated, leaving as is"
        );
        Ok(Population::Partial(rows))
    }
}

pub struct Worker<'a> {
    id: usize,
    config: &'a BenchConfig,
    generator: WorkloadGenerator,
}

impl<'a> Worker<'a> {
    /// Worker for partition `id`.
    pub fn new(id: usize, config: &'a BenchConfig) -> Self {
        let generator = WorkloadGenerator::new(
            config.access_policy,
            id,
            config.partition_count,
            config.record_count,
            FastRng::for_worker(config.seed, id),
        );
        Self {
            id,
            config,
            generator,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Run the full protocol and return the outcome.
    ///
    /// A worker whose setup fails abandons the barrier instead of waiting on
    /// it, so its peers still start their timed phase.
    pub fn run(mut self, store: &dyn DataStore, barrier: &dyn Rendezvous) -> WorkerOutcome {
        let (mut conn, populated) = match self.setup(store) {
            Ok(ready) => ready,
            Err(failure) => {
                barrier.abandon();
                error!(worker = self.id, error = %failure, "worker setup failed");
                return Err(failure);
            }
        };

        barrier.reach();

        let result = self.timed_loop(conn.as_mut());
        drop(conn);

        match result {
            Ok((found, elapsed)) => {
                let report = WorkerReport {
                    worker: self.id,
                    iterations: self.config.iteration_count,
                    found,
                    elapsed,
                    populated,
                };
                info!(
                    worker = self.id,
                    elapsed_ms = report.elapsed_ms() as u64,
                    found,
                    "timed phase complete"
                );
                Ok(report)
            }
            Err(failure) => {
                error!(worker = self.id, error = %failure, "worker aborted during timed phase");
                Err(failure)
            }
        }
    }

    fn setup(&self, store: &dyn DataStore) -> Result<(Box<dyn Connection>, bool), WorkerFailure> {
        let worker = self.id;
        let mut conn = store
            .connect()
            .map_err(|source| WorkerFailure::Connect { worker, source })?;

        let population = populate_partition(conn.as_mut(), worker, self.config.record_count)
            .map_err(|source| WorkerFailure::Populate { worker, source })?;

        conn.prepare_lookups(self.config.partition_count)
            .map_err(|source| WorkerFailure::Prepare { worker, source })?;

        Ok((conn, population == Population::Inserted))
    }

    fn timed_loop(&mut self, conn: &mut dyn Connection) -> Result<(u64, Duration), WorkerFailure> {
        let mut found = 0u64;
        let start = Instant::now();
        for iteration in 0..self.config.iteration_count {
            let request = self.generator.next_request();
            match conn.point_query(request.partition, request.key) {
                Ok(Some(_)) => found += 1,
                Ok(None) => {}
                Err(source) => {
                    return Err(WorkerFailure::Query {
                        worker: self.id,
                        iteration,
                        source,
                    })
                }
            }
        }
        Ok((found, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreKind;
    use crate::store::MemoryStore;
    use crate::workload::AccessPolicy;
    use std::ops::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct CountingBarrier {
        reached: AtomicUsize,
        abandoned: AtomicUsize,
    }

    impl Rendezvous for CountingBarrier {
        fn reach(&self) -> bool {
            self.reached.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn abandon(&self) {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Records every call; lookups fail from `fail_at` on.
    #[derive(Default)]
    struct ScriptedStore {
        rows: u64,
        refuse_connect: bool,
        fail_at: Option<usize>,
        calls: Mutex<Vec<String>>,
    }

    struct ScriptedConnection {
        store: &'static ScriptedStore,
        lookups: usize,
    }

    impl ScriptedStore {
        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Connection for ScriptedConnection {
        fn row_count(&mut self, partition: usize) -> Result<u64, StoreError> {
            self.store.log(format!("count {}", partition));
            Ok(self.store.rows)
        }

        fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError> {
            self.store
                .log(format!("insert {} {}..{}", partition, keys.start, keys.end));
            Ok(())
        }

        fn prepare_lookups(&mut self, partition_count: usize) -> Result<(), StoreError> {
            self.store.log(format!("prepare {}", partition_count));
            Ok(())
        }

        fn point_query(&mut self, _partition: usize, key: u64) -> Result<Option<u64>, StoreError> {
            self.lookups += 1;
            match self.store.fail_at {
                Some(limit) if self.lookups > limit => Err(StoreError::Backend("connection reset".into())),
                _ => Ok(Some(key)),
            }
        }
    }

    // Leaked so connections can hold it for `'static`.
    struct StaticScripted(&'static ScriptedStore);

    impl DataStore for StaticScripted {
        fn kind(&self) -> StoreKind {
            StoreKind::Memory
        }

        fn configure_schema(&self, _: usize, _: u64) -> Result<(), StoreError> {
            Ok(())
        }

        fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
            self.0.log("connect".into());
            if self.0.refuse_connect {
                return Err(StoreError::Connect("refused".into()));
            }
            Ok(Box::new(ScriptedConnection {
                store: self.0,
                lookups: 0,
            }))
        }
    }

    fn scripted(store: ScriptedStore) -> StaticScripted {
        StaticScripted(Box::leak(Box::new(store)))
    }

    fn config(partitions: usize, records: u64, iterations: u64) -> BenchConfig {
        BenchConfig {
            partition_count: partitions,
            record_count: records,
            iteration_count: iterations,
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Protocol
    // ------------------------------------------------------------------

    #[test]
    fn empty_partition_is_populated_before_barrier() {
        let store = scripted(ScriptedStore::default());
        let barrier = CountingBarrier::default();
        let config = config(3, 10, 5);

        let report = Worker::new(2, &config).run(&store, &barrier).unwrap();

        assert_eq!(
            store.0.calls(),
            vec!["connect", "count 2", "insert 2 0..10", "prepare 3"]
        );
        assert_eq!(barrier.reached.load(Ordering::SeqCst), 1);
        assert_eq!(report.worker, 2);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.found, 5);
        assert!(report.populated);
    }

    #[test]
    fn populated_partition_is_left_alone() {
        let store = scripted(ScriptedStore {
            rows: 10,
            ..Default::default()
        });
        let barrier = CountingBarrier::default();
        let config = config(1, 10, 1);

        let report = Worker::new(0, &config).run(&store, &barrier).unwrap();

        assert!(!store.0.calls().iter().any(|c| c.starts_with("insert")));
        assert!(!report.populated);
    }

    #[test]
    fn connect_failure_abandons_barrier() {
        let store = scripted(ScriptedStore {
            refuse_connect: true,
            ..Default::default()
        });
        let barrier = CountingBarrier::default();
        let config = config(2, 10, 10);

        let failure = Worker::new(1, &config).run(&store, &barrier).unwrap_err();

        assert!(matches!(failure, WorkerFailure::Connect { worker: 1, .. }));
        assert_eq!(barrier.reached.load(Ordering::SeqCst), 0);
        assert_eq!(barrier.abandoned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn query_failure_reports_iteration() {
        let store = scripted(ScriptedStore {
            rows: 10,
            fail_at: Some(3),
            ..Default::default()
        });
        let barrier = CountingBarrier::default();
        let config = config(1, 10, 100);

        let failure = Worker::new(0, &config).run(&store, &barrier).unwrap_err();

        assert!(failure.during_timed_phase());
        assert!(matches!(
            failure,
            WorkerFailure::Query { worker: 0, iteration: 3, .. }
        ));
        assert_eq!(barrier.reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn partitioned_worker_only_hits_own_partition() {
        let store = MemoryStore::new();
        store.configure_schema(3, 50).unwrap();
        let mut conn = store.connect().unwrap();
        conn.bulk_insert(1, 0..50).unwrap();

        let config = BenchConfig {
            access_policy: AccessPolicy::Partitioned,
            ..config(3, 50, 500)
        };
        let barrier = CountingBarrier::default();

        // Partitions 0 and 2 stay empty, so every hit came from partition 1.
        let report = Worker::new(1, &config).run(&store, &barrier).unwrap();
        assert_eq!(report.found, 500);
    }

    // ------------------------------------------------------------------
    // Population
    // ------------------------------------------------------------------

    #[test]
    fn population_is_idempotent() {
        let store = MemoryStore::new();
        store.configure_schema(1, 100).unwrap();
        let mut conn = store.connect().unwrap();

        assert_eq!(
            populate_partition(conn.as_mut(), 0, 100).unwrap(),
            Population::Inserted
        );
        assert_eq!(
            populate_partition(conn.as_mut(), 0, 100).unwrap(),
            Population::AlreadyPopulated
        );
        assert_eq!(conn.row_count(0).unwrap(), 100);
        assert_eq!(store.keys(0).unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn partial_partition_is_reported_not_refilled() {
        let store = MemoryStore::new();
        store.configure_schema(1, 100).unwrap();
        let mut conn = store.connect().unwrap();
        conn.bulk_insert(0, 0..40).unwrap();

        assert_eq!(
            populate_partition(conn.as_mut(), 0, 100).unwrap(),
            Population::Partial(40)
        );
        assert_eq!(conn.row_count(0).unwrap(), 40);
    }
}
