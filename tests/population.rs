//! Population invariants: dense keys, exactly once, idempotent.

mod common;

use std::sync::Arc;

use oltp_benchmarks::store::{MemoryStore, SqliteStore};
use oltp_benchmarks::{populate_partition, DataStore, Orchestrator, Population};

const PARTITIONS: usize = 3;
const RECORDS: u64 = 250;

fn assert_dense(store: &dyn DataStore) {
    let mut conn = store.connect().unwrap();
    conn.prepare_lookups(PARTITIONS).unwrap();
    for partition in 0..PARTITIONS {
        assert_eq!(conn.row_count(partition).unwrap(), RECORDS);
        for key in 0..RECORDS {
            assert_eq!(conn.point_query(partition, key).unwrap(), Some(key));
        }
        assert_eq!(conn.point_query(partition, RECORDS).unwrap(), None);
    }
}

#[test]
fn memory_partitions_hold_every_key_once() {
    let store = Arc::new(MemoryStore::new());
    Orchestrator::new(common::small_config(PARTITIONS, RECORDS, 10), store.clone())
        .run()
        .unwrap();

    assert_dense(store.as_ref());
    for partition in 0..PARTITIONS {
        assert_eq!(
            store.keys(partition).unwrap(),
            (0..RECORDS).collect::<Vec<_>>()
        );
    }
}

#[test]
fn sqlite_partitions_hold_every_key_once() {
    let store = Arc::new(SqliteStore::temporary().unwrap());
    Orchestrator::new(common::small_config(PARTITIONS, RECORDS, 10), store.clone())
        .run()
        .unwrap();

    assert_dense(store.as_ref());
}

#[test]
fn repopulating_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("bench.sqlite"));
    store.configure_schema(PARTITIONS, RECORDS).unwrap();

    let mut conn = store.connect().unwrap();
    for partition in 0..PARTITIONS {
        assert_eq!(
            populate_partition(conn.as_mut(), partition, RECORDS).unwrap(),
            Population::Inserted
        );
    }
    for partition in 0..PARTITIONS {
        assert_eq!(
            populate_partition(conn.as_mut(), partition, RECORDS).unwrap(),
            Population::AlreadyPopulated
        );
        assert_eq!(conn.row_count(partition).unwrap(), RECORDS);
    }

    // Schema setup against an existing database keeps the data.
    store.configure_schema(PARTITIONS, RECORDS).unwrap();
    assert_dense(&store);
}
