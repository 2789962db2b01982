// src/db/store.rs

use std::{
    path::{Path, PathBuf},
    thread::sleep,
    time::Duration,
};

use chrono::Local;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use thiserror::Error;

use crate::comms::Reading;
use crate::config::DatabaseConfig;
use super::connection::init_database;
use super::rows::InsertRow;

/// `YYYY-MM-DD HH:MM:SS.ffffff`, the layout existing databases already hold.
const CAPTURED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const MAX_BUSY_RETRIES: u64 = 5;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database {path} unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database is not connected")]
    NotConnected,

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Single-writer store for sensor readings.
///
/// Every write reads the sequence counter, appends the row under that id and
/// bumps the counter, all inside one IMMEDIATE transaction.
pub struct SensorStore {
    cfg:  DatabaseConfig,
    conn: Option<Connection>,
}

impl SensorStore {
    /// A store that has not touched the disk yet; call `connect`.
    pub fn new(cfg: DatabaseConfig) -> Self {
        Self { cfg, conn: None }
    }

    /// `new` + `connect`.
    pub fn open(cfg: DatabaseConfig) -> Result<Self, DbError> {
        let mut store = Self::new(cfg);
        store.connect()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.cfg.path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open (creating if absent) the backing file. No-op when already connected.
    pub fn connect(&mut self) -> Result<(), DbError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = init_database(&self.cfg).map_err(|source| DbError::Unavailable {
            path: self.cfg.path.clone(),
            source,
        })?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Persist one reading and return the id it was stored under.
    pub fn write(&mut self, reading: &Reading) -> Result<i64, DbError> {
        self.write_row(reading)
    }

    /// Transactional append with retry + backoff while the file is locked.
    pub fn write_row<T: InsertRow>(&mut self, record: &T) -> Result<i64, DbError> {
        let conn = self.conn.as_mut().ok_or(DbError::NotConnected)?;
        let captured_at = Local::now().format(CAPTURED_AT_FORMAT).to_string();
        let mut attempts = 0;

        loop {
            match append(conn, record, &captured_at) {
                Ok(id) => {
                    metrics::counter!("rtl_readings_written_total").increment(1);
                    return Ok(id);
                }
                Err(e) if is_busy(&e) && attempts < MAX_BUSY_RETRIES => {
                    attempts += 1;
                    log::warn!("database busy, retry {}/{}", attempts, MAX_BUSY_RETRIES);
                    sleep(Duration::from_millis(50 * attempts));
                }
                Err(e) => return Err(DbError::Sql(e)),
            }
        }
    }

    /// Current value of the sequence counter (rows ever written).
    pub fn current_id(&self) -> Result<i64, DbError> {
        let conn = self.conn.as_ref().ok_or(DbError::NotConnected)?;
        Ok(conn.query_row("SELECT id FROM current_id", [], |r| r.get(0))?)
    }

    /// Release the connection. Calling it again, or before `connect`, is fine.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                log::warn!("closing {} failed: {}", self.cfg.path.display(), e);
            }
        }
    }
}

fn append<T: InsertRow>(conn: &mut Connection, record: &T, captured_at: &str) -> rusqlite::Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let id: i64 = tx.query_row("SELECT id FROM current_id", [], |r| r.get(0))?;
    {
        let mut stmt = tx.prepare_cached(T::insert_sql())?;
        T::bind_and_execute(&mut stmt, id, captured_at, record)?;
    }
    tx.execute("UPDATE current_id SET id = ?1", [id + 1])?;
    tx.commit()?;
    Ok(id)
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
