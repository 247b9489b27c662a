//! SQLite store. Every worker opens its own connection to a shared database
//! file; WAL mode lets readers proceed while a partition is being populated.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::OptionalExtension;
use tempfile::TempDir;

use super::{table_name, Connection, DataStore};
use crate::config::StoreKind;
use crate::error::StoreError;

// Lets population transactions from concurrent workers queue on the single
// write lock. Lookups read under WAL and never wait on it.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const DB_FILE: &str = "oltp-bench.sqlite";

#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    // Keeps a temporary database alive as long as the store.
    _dir: Option<TempDir>,
}

impl SqliteStore {
    /// Use the database file at `path`, creating it on first connect.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _dir: None,
        }
    }

    /// Use a fresh database in a temporary directory removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let dir = tempfile::tempdir()?;
        Ok(Self {
            path: dir.path().join(DB_FILE),
            _dir: Some(dir),
        })
    }

    fn open_connection(&self) -> Result<rusqlite::Connection, StoreError> {
        let conn = rusqlite::Connection::open(&self.path)
            .map_err(|e| StoreError::Connect(format!("{}: {}", self.path.display(), e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(conn)
    }
}

impl DataStore for SqliteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    fn configure_schema(&self, partition_count: usize, _record_count: u64) -> Result<(), StoreError> {
        let conn = self.open_connection()?;
        for partition in 0..partition_count {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (k INTEGER PRIMARY KEY)",
                    table_name(partition)
                ),
                [],
            )?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Box<dyn Connection>, StoreError> {
        Ok(Box::new(SqliteConnection {
            conn: self.open_connection()?,
            lookups: Vec::new(),
        }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
    // Lookup SQL per partition; the statements themselves live in the
    // connection's prepared statement cache.
    lookups: Vec<String>,
}

fn lookup_sql(partition: usize) -> String {
    format!("SELECT k FROM {} WHERE k = ?1", table_name(partition))
}

impl Connection for SqliteConnection {
    fn row_count(&mut self, partition: usize) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_name(partition)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn bulk_insert(&mut self, partition: usize, keys: Range<u64>) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (k) VALUES (?1)",
                table_name(partition)
            ))?;
            for key in keys {
                stmt.execute([key as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn prepare_lookups(&mut self, partition_count: usize) -> Result<(), StoreError> {
        self.conn
            .set_prepared_statement_cache_capacity(partition_count.max(16));
        self.lookups = (0..partition_count).map(lookup_sql).collect();
        for sql in &self.lookups {
            self.conn.prepare_cached(sql)?;
        }
        Ok(())
    }

    fn point_query(&mut self, partition: usize, key: u64) -> Result<Option<u64>, StoreError> {
        let sql = self
            .lookups
            .get(partition)
            .ok_or(StoreError::UnknownPartition(partition))?;
        let mut stmt = self.conn.prepare_cached(sql)?;
        let found = stmt
            .query_row([key as i64], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(found.map(|k| k as u64))
    }
}
