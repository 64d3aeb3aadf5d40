//! SQLite query executor
//!
//! One connection behind a mutex; every statement holds the lock for its
//! whole prepare/bind/step cycle, so statements never interleave.

#![allow(clippy::result_large_err)]

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::Connection;
use sqlproxy_core::config::StoreConfig;
use sqlproxy_core::errors::ProxyError;
use sqlproxy_core::query::{ColumnType, Params, QueryExecutor, ResultShape, Row, SqlValue};

use crate::db;
use crate::errors::{from_rusqlite, lock_poisoned, positional_parameter, Result};

/// [`QueryExecutor`] over an embedded SQLite connection
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(db::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(db::open_from_config(config)?))
    }

    /// Run a closure against the raw connection
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| lock_poisoned())?;
        f(&conn).map_err(from_rusqlite)
    }
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(v) => SqliteValue::Integer(*v),
        SqlValue::Text(v) => SqliteValue::Text(v.clone()),
    }
}

/// Bind every placeholder of `stmt` by name
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &Params) -> Result<()> {
    for index in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(index)
            .ok_or_else(|| positional_parameter(index))?;
        let key = name.trim_start_matches(&[':', '@', '$'][..]).to_string();
        let value = params
            .get(key.as_str())
            .ok_or(ProxyError::MissingArgument { name: key })?;
        stmt.raw_bind_parameter(index, to_sqlite(value))
            .map_err(from_rusqlite)?;
    }
    Ok(())
}

fn decode_column(
    name: &str,
    column_type: ColumnType,
    value: ValueRef<'_>,
) -> std::result::Result<SqlValue, ProxyError> {
    let malformed = |reason: String| ProxyError::DecodeFailed {
        tag: format!("column {}", name),
        reason,
    };
    let decoded = match (column_type, value) {
        (_, ValueRef::Null) => SqlValue::Null,
        (ColumnType::Integer, ValueRef::Integer(v)) => SqlValue::Integer(v),
        (ColumnType::Integer, ValueRef::Real(v)) if v.fract() == 0.0 => SqlValue::Integer(v as i64),
        (ColumnType::Integer, ValueRef::Text(bytes)) => {
            let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
            SqlValue::Integer(
                text.trim()
                    .parse()
                    .map_err(|_| malformed(format!("'{}' is not an integer", text)))?,
            )
        }
        (ColumnType::Integer, other) => {
            return Err(malformed(format!(
                "expected integer, found {}",
                other.data_type()
            )))
        }
        (ColumnType::Text, ValueRef::Text(bytes) | ValueRef::Blob(bytes)) => SqlValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| malformed(e.to_string()))?
                .to_string(),
        ),
        (ColumnType::Text, ValueRef::Integer(v)) => SqlValue::Text(v.to_string()),
        (ColumnType::Text, ValueRef::Real(v)) => SqlValue::Text(v.to_string()),
    };
    Ok(decoded)
}

impl QueryExecutor for SqliteExecutor {
    fn execute_query(&self, sql: &str, params: &Params, shape: &ResultShape) -> Result<Vec<Row>> {
        let conn = self.conn.lock().map_err(|_| lock_poisoned())?;
        let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
        bind_params(&mut stmt, params)?;

        let mut columns = Vec::with_capacity(shape.columns().len());
        for (name, column_type) in shape.columns() {
            let index = stmt
                .column_index(name)
                .map_err(|_| ProxyError::MissingColumn {
                    column: name.clone(),
                })?;
            columns.push((name.as_str(), *column_type, index));
        }

        let mut result = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            let mut values = Vec::with_capacity(columns.len());
            for (name, column_type, index) in &columns {
                let raw = row.get_ref(*index).map_err(from_rusqlite)?;
                values.push((name.to_string(), decode_column(name, *column_type, raw)?));
            }
            result.push(Row::new(values));
        }
        tracing::trace!(rows = result.len(), "sqlite query");
        Ok(result)
    }

    fn execute_update(&self, sql: &str, params: &Params) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| lock_poisoned())?;
        let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
        bind_params(&mut stmt, params)?;
        let affected = stmt.raw_execute().map_err(from_rusqlite)?;
        tracing::trace!(affected, "sqlite update");
        Ok(affected)
    }
}
