//! StrataDB store. StrataDB is a key-value engine with no tables, so a
//! partition is a key prefix: key `k` of partition `p` is stored as
//! `t<p>:<k:010>`.

use std::fmt::{Display, Write};
use std::ops::Range;
use std::sync::Arc;

use stratadb::{Strata, Value};

use super::{table_name, Connection, DataStore};
use crate::config::StoreKind;
use crate::error::StoreError;

fn strata_err(e: impl Display) -> StoreError {
    StoreError::Strata(e.to_string())
}

fn partition_prefix(partition: usize) -> String {
    format!("{}:", table_name(partition))
}

/// Write the key of `key` in `partition` into `buf`, replacing its contents.
fn write_key(buf: &mut String, partition: usize, key: u64) -> Result<(), StoreError> {
    buf.clear();
    write!(buf, "{}:{:010}", table_name(partition), key).map_err(strata_err)
}

pub struct StrataStore {
    db: Arc<Strata>,
}

impl StrataStore {
    /// Open a throwaway database.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = Strata::open_temp().map_err(strata_err)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl DataStore for StrataStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Strata
    }

    fn configure_schema(&self, partition_count: usize, _record_count: u64) -> Result<(), StoreError> {
        tracing::debug!(partition_count, "strata partitions are key prefixes, no schema to create");
        Ok(())
    }

    fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
        Ok(Box::new(StrataConnection {
            db: Arc::clone(&self.db),
            key_buf: String::with_capacity(32),
        }))
    }
}

struct StrataConnection {
    db: Arc<Strata>,
    key_buf: String,
}

impl Connection for StrataConnection {
    fn row_count(&mut self, partition: usize) -> Result<u64, StoreError> {
        let prefix = partition_prefix(partition);
        let keys = self.db.kv_list(Some(&prefix)).map_err(strata_err)?;
        Ok(keys.len() as u64)
    }

    fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError> {
        for key in keys {
            write_key(&mut self.key_buf, partition, key)?;
            self.db
                .kv_put(&self.key_buf, Value::Int(key as i64))
                .map_err(strata_err)?;
        }
        Ok(())
    }

    fn prepare_lookups(&mut self, _partition_count: usize) -> Result<(), StoreError> {
        Ok(())
    }

    fn point_query(&mut self, partition: usize, key: u64) -> Result<Option<u64>, StoreError> {
        write_key(&mut self.key_buf, partition, key)?;
        match self.db.kv_get(&self.key_buf).map_err(strata_err)? {
            None => Ok(None),
            Some(Value::Int(stored)) => Ok(Some(stored as u64)),
            Some(_) => Err(StoreError::Strata(format!(
                "{} holds a non-integer value",
                self.key_buf
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strata_key(partition: usize, key: u64) -> Result<String, StoreError> {
        let mut buf = String::new();
        write_key(&mut buf, partition, key)?;
        Ok(buf)
    }

    #[test]
    fn keys_sort_within_partition() {
        assert_eq!(strata_key(3, 42).unwrap(), "t3:0000000042");
        assert!(strata_key(0, 9).unwrap() < strata_key(0, 10).unwrap());
        assert!(!strata_key(10, 0).unwrap().starts_with(&partition_prefix(1)));
    }

    #[test]
    fn key_buffer_is_reused() {
        let mut buf = String::from("stale contents");
        write_key(&mut buf, 1, 7).unwrap();
        assert_eq!(buf, "t1:0000000007");
    }

    #[test]
    fn non_integer_value_is_an_error() {
        let store = StrataStore::temporary().unwrap();
        store
            .db
            .kv_put(&strata_key(0, 3).unwrap(), Value::String("three".into()))
            .unwrap();

        let mut conn = store.connect().unwrap();
        assert!(matches!(conn.point_query(0, 3), Err(StoreError::Strata(_))));
        assert_eq!(conn.point_query(0, 4).unwrap(), None);
    }

    #[test]
    fn insert_count_and_lookup() {
        let store = StrataStore::temporary().unwrap();
        store.configure_schema(2, 20).unwrap();
        let mut conn = store.connect().unwrap();

        conn.bulk_insert(0, 0..20).unwrap();
        assert_eq!(conn.row_count(0).unwrap(), 20);
        assert_eq!(conn.row_count(1).unwrap(), 0);

        conn.prepare_lookups(2).unwrap();
        assert_eq!(conn.point_query(0, 5).unwrap(), Some(5));
        assert_eq!(conn.point_query(0, 20).unwrap(), None);
        assert_eq!(conn.point_query(1, 5).unwrap(), None);
    }
}
