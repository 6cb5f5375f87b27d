pub mod migrations;
pub mod models;
pub mod queries;

pub use queries::Records;

use anyhow::Result;
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Message store with a reader/writer split.
///
/// All writes go through the single writer connection inside an immediate transaction,
/// so a mutation holds the write lock from its first read to its commit. File-backed
/// databases also get a small pool of read-only connections; in-memory databases read
/// through the writer.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    statements: AtomicU64,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(conn);
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self::from_parts(writer, readers))
    }

    pub fn open_in_memory() -> Result<Self> {
        let writer = Connection::open_in_memory()?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&writer)?;

        debug!("In-memory database opened");
        Ok(Self::from_parts(writer, Vec::new()))
    }

    fn from_parts(writer: Connection, readers: Vec<Connection>) -> Self {
        Self {
            writer: Mutex::new(writer),
            readers: readers.into_iter().map(Mutex::new).collect(),
            reader_idx: AtomicUsize::new(0),
            statements: AtomicU64::new(0),
        }
    }

    /// Total statements executed through [`Records`] since the database was opened.
    pub fn statements_executed(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    /// Read scope. Everything inside `f` sees one consistent snapshot.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Records<'_>) -> Result<T>,
    {
        let conn = if self.readers.is_empty() {
            &self.writer
        } else {
            let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
            &self.readers[idx]
        };
        let conn = conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Reader lock poisoned: {}", e))?;

        let snapshot = conn.unchecked_transaction()?;
        let value = f(&Records::new(&snapshot, &self.statements))?;
        snapshot.commit()?;
        Ok(value)
    }

    /// Write scope: `BEGIN IMMEDIATE`, commit when `f` returns `Ok`, roll back otherwise.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Records<'_>) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("Transaction started");

        let outcome = f(&Records::new(&tx, &self.statements));
        match outcome {
            Ok(value) => {
                tx.commit()?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed after '{}': {}", e, rollback_err);
                } else {
                    debug!("Transaction rolled back: {}", e);
                }
                Err(e)
            }
        }
    }

    /// Raw access to the writer connection, outside any transaction and uncounted.
    /// Used by tests to install schema-level fault triggers.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        f(&conn)
    }
}
