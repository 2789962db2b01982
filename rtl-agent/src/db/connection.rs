// src/db/connection.rs
//! Opening and initialising SQLite with runtime parameters.

use std::{path::Path, time::Duration};
use rusqlite::Connection;
use crate::config::DatabaseConfig;

pub fn open_db_connection(path: &Path, cfg: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", cfg.synchronous.as_str())?;
    Ok(conn)
}

/// Open the store and make sure both tables and the counter row exist.
/// Safe to run against an existing file: nothing is recreated or reset.
pub fn init_database(cfg: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let first_run = !cfg.path.exists();

    let conn = open_db_connection(&cfg.path, cfg)?;
    let schema = include_str!("../../resources/schema.sql");
    conn.execute_batch(schema)?;

    if first_run {
        log::info!("Database created at {}", cfg.path.display());
    } else {
        log::info!("Database ready at {}", cfg.path.display());
    }
    Ok(conn)
}
