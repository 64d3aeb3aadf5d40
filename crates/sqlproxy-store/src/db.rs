//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use sqlproxy_core::config::StoreConfig;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection
///
/// WAL only applies to file-backed databases.
pub fn configure(conn: &Connection, wal: bool) -> Result<()> {
    if wal {
        // journal_mode returns the resulting mode as a row
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
    }
    Ok(())
}

/// Open and configure the connection described by `config`
pub fn open_from_config(config: &StoreConfig) -> Result<Connection> {
    let conn = match &config.path {
        Some(path) => open(path)?,
        None => open_in_memory()?,
    };
    configure(&conn, config.wal)?;
    Ok(conn)
}
