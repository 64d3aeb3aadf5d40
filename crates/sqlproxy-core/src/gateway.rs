//! Table gateway
//!
//! Fixed statement templates per table shape, executed through the
//! externally supplied [`QueryExecutor`]. Values always travel as bound
//! parameters; table names are validated [`TableId`]s.
//!
//! Failures raised by the executor are returned with the gateway operation
//! and table attached. Nothing is swallowed: an unreachable store never looks
//! like an empty table.

#![allow(clippy::result_large_err)]

use std::collections::HashSet;
use std::sync::Arc;

use sqlproxy_core_types::TableId;

use crate::codec::TableRow;
use crate::dialect::Dialect;
use crate::errors::{ExError, Result};
use crate::model::TypeTag;
use crate::query::{ColumnType, Params, QueryExecutor, ResultShape, Row, SqlValue, Statement};

/// Parameterized access to element tables of one namespace
#[derive(Clone)]
pub struct TableGateway {
    executor: Arc<dyn QueryExecutor>,
    dialect: Dialect,
}

impl std::fmt::Debug for TableGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableGateway")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

fn with_context(err: ExError, op: &str, table: Option<&TableId>) -> ExError {
    let wrapped = ExError::new(err.kind())
        .with_op(op)
        .with_message(err.message().to_string());
    let wrapped = match table {
        Some(table) => wrapped.with_table_id(table.as_str()),
        None => wrapped,
    };
    wrapped.with_source(err)
}

/// Bound parameters per statement (SQLite's historical compile-time limit)
pub const MAX_BOUND_PARAMETERS: usize = 999;

/// `(type, value)` pairs per `OR` chain; SQLite caps expression depth at 1000
pub const MAX_PAIRS_PER_CHAIN: usize = 200;

fn count_shape() -> ResultShape {
    ResultShape::new().column("row_count", ColumnType::Integer)
}

impl TableGateway {
    pub fn new(executor: Arc<dyn QueryExecutor>, dialect: Dialect) -> Self {
        Self { executor, dialect }
    }

    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Run a query statement
    pub fn query(
        &self,
        op: &str,
        table: Option<&TableId>,
        stmt: &Statement,
        shape: &ResultShape,
    ) -> Result<Vec<Row>> {
        tracing::debug!(op, table_id = table.map(TableId::as_str), sql = %stmt.sql, %shape, "query");
        let rows = self
            .executor
            .execute_query(&stmt.sql, &stmt.params, shape)
            .map_err(|e| with_context(e, op, table))?;
        tracing::trace!(op, row_count = rows.len(), "query returned");
        Ok(rows)
    }

    /// Run an update or DDL statement
    pub fn update(&self, op: &str, table: Option<&TableId>, stmt: &Statement) -> Result<usize> {
        tracing::debug!(op, table_id = table.map(TableId::as_str), sql = %stmt.sql, "update");
        let affected = self
            .executor
            .execute_update(&stmt.sql, &stmt.params)
            .map_err(|e| with_context(e, op, table))?;
        tracing::trace!(op, affected, "update applied");
        Ok(affected)
    }

    fn count(&self, op: &str, table: &TableId, stmt: Statement) -> Result<usize> {
        let rows = self.query(op, Some(table), &stmt, &count_shape())?;
        let count = match rows.first() {
            Some(row) => row.integer("row_count")?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ----- shared -----

    /// Number of rows, by a full scan of the `type` column
    pub fn row_count(&self, table: &TableId) -> Result<usize> {
        let stmt = Statement::new(format!("SELECT type FROM {}", self.dialect.qualified(table)));
        let shape = ResultShape::new().column("type", ColumnType::Integer);
        Ok(self.query("row_count", Some(table), &stmt, &shape)?.len())
    }

    /// Remove every row
    pub fn delete_all(&self, table: &TableId) -> Result<usize> {
        let stmt = Statement::new(format!("DELETE FROM {}", self.dialect.qualified(table)));
        self.update("delete_all", Some(table), &stmt)
    }

    /// Rows whose stored pair equals `(tag, value)`
    pub fn count_where_encoded(&self, table: &TableId, tag: TypeTag, value: &str) -> Result<usize> {
        let stmt = Statement::new(format!(
            "SELECT COUNT(*) AS row_count FROM {} WHERE type = :type AND value = :value",
            self.dialect.qualified(table)
        ))
        .bind("type", tag.code())
        .bind("value", value);
        self.count("count_where_encoded", table, stmt)
    }

    /// Delete at most one row whose stored pair equals `(tag, value)`
    pub fn delete_one_encoded(&self, table: &TableId, tag: TypeTag, value: &str) -> Result<usize> {
        let qualified = self.dialect.qualified(table);
        let locator = self.dialect.row_locator();
        let stmt = Statement::new(format!(
            "DELETE FROM {q} WHERE {loc} IN \
             (SELECT {loc} FROM {q} WHERE type = :type AND value = :value LIMIT 1)",
            q = qualified,
            loc = locator
        ))
        .bind("type", tag.code())
        .bind("value", value);
        self.update("delete_one_encoded", Some(table), &stmt)
    }

    /// Delete every row whose stored pair equals `(tag, value)`
    pub fn delete_all_encoded(&self, table: &TableId, tag: TypeTag, value: &str) -> Result<usize> {
        let stmt = Statement::new(format!(
            "DELETE FROM {} WHERE type = :type AND value = :value",
            self.dialect.qualified(table)
        ))
        .bind("type", tag.code())
        .bind("value", value);
        self.update("delete_all_encoded", Some(table), &stmt)
    }

    /// Delete every row whose stored pair is not listed in `keep`
    ///
    /// A `keep` list that fits one `OR` chain runs as a single statement.
    /// Longer lists read the distinct stored pairs first and delete the
    /// unlisted ones in chunks; rows added between the read and the deletes
    /// survive.
    pub fn delete_except_encoded(
        &self,
        table: &TableId,
        keep: &[(TypeTag, String)],
    ) -> Result<usize> {
        if keep.is_empty() {
            return self.delete_all(table);
        }
        if keep.len() <= MAX_PAIRS_PER_CHAIN {
            let (chain, params) = pair_chain(keep);
            let stmt = Statement {
                sql: format!(
                    "DELETE FROM {} WHERE NOT ({})",
                    self.dialect.qualified(table),
                    chain
                ),
                params,
            };
            return self.update("delete_except_encoded", Some(table), &stmt);
        }

        let keep: HashSet<(i64, &str)> = keep
            .iter()
            .map(|(tag, value)| (tag.code(), value.as_str()))
            .collect();
        let stored = self.select_distinct_pairs(table)?;
        let doomed: Vec<(TypeTag, String)> = stored
            .into_iter()
            .filter(|(tag, value)| !keep.contains(&(tag.code(), value.as_str())))
            .collect();
        let mut deleted = 0;
        for chunk in doomed.chunks(MAX_PAIRS_PER_CHAIN) {
            let (chain, params) = pair_chain(chunk);
            let stmt = Statement {
                sql: format!("DELETE FROM {} WHERE {}", self.dialect.qualified(table), chain),
                params,
            };
            deleted += self.update("delete_except_encoded", Some(table), &stmt)?;
        }
        Ok(deleted)
    }

    fn select_distinct_pairs(&self, table: &TableId) -> Result<Vec<(TypeTag, String)>> {
        let stmt = Statement::new(format!(
            "SELECT DISTINCT type, value FROM {}",
            self.dialect.qualified(table)
        ));
        let rows = self.query(
            "select_distinct_pairs",
            Some(table),
            &stmt,
            &TableRow::collection_shape(),
        )?;
        rows.iter()
            .map(|row| TableRow::from_row(row).map(|r| (r.tag, r.value)).map_err(ExError::from))
            .collect()
    }

    // ----- map tables -----

    /// Fetch the row stored under `name`
    pub fn select_map_row(&self, table: &TableId, name: &str) -> Result<Option<TableRow>> {
        let stmt = Statement::new(format!(
            "SELECT name, type, value FROM {} WHERE name = :name",
            self.dialect.qualified(table)
        ))
        .bind("name", name);
        let rows = self.query("select_map_row", Some(table), &stmt, &TableRow::map_shape())?;
        match rows.first() {
            Some(row) => Ok(Some(TableRow::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Rows stored under `name`
    pub fn count_where_name(&self, table: &TableId, name: &str) -> Result<usize> {
        let stmt = Statement::new(format!(
            "SELECT COUNT(*) AS row_count FROM {} WHERE name = :name",
            self.dialect.qualified(table)
        ))
        .bind("name", name);
        self.count("count_where_name", table, stmt)
    }

    pub fn select_map_rows(&self, table: &TableId) -> Result<Vec<TableRow>> {
        let stmt = Statement::new(format!(
            "SELECT name, type, value FROM {}",
            self.dialect.qualified(table)
        ));
        let rows = self.query("select_map_rows", Some(table), &stmt, &TableRow::map_shape())?;
        rows.iter()
            .map(|row| TableRow::from_row(row).map_err(ExError::from))
            .collect()
    }

    pub fn select_names(&self, table: &TableId) -> Result<Vec<String>> {
        let stmt = Statement::new(format!("SELECT name FROM {}", self.dialect.qualified(table)));
        let shape = ResultShape::new().column("name", ColumnType::Text);
        let rows = self.query("select_names", Some(table), &stmt, &shape)?;
        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(name) = row.optional_text("name")? {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn insert_map_row(&self, table: &TableId, row: &TableRow) -> Result<usize> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} (name, type, value) VALUES (:name, :type, :value)",
            self.dialect.qualified(table)
        ))
        .bind("name", name_param(row))
        .bind("type", row.tag.code())
        .bind("value", row.value.as_str());
        self.update("insert_map_row", Some(table), &stmt)
    }

    /// Bulk insert (`:name0`, `:type0`, `:value0`, ...), one statement per
    /// [`MAX_BOUND_PARAMETERS`] worth of rows
    pub fn insert_map_rows(&self, table: &TableId, rows: &[TableRow]) -> Result<usize> {
        let mut inserted = 0;
        for chunk in rows.chunks(MAX_BOUND_PARAMETERS / 3) {
            let mut params = Params::new();
            let mut tuples = Vec::with_capacity(chunk.len());
            for (i, row) in chunk.iter().enumerate() {
                tuples.push(format!("(:name{i}, :type{i}, :value{i})"));
                params.insert(format!("name{i}"), name_param(row));
                params.insert(format!("type{i}"), SqlValue::Integer(row.tag.code()));
                params.insert(format!("value{i}"), SqlValue::Text(row.value.clone()));
            }
            let stmt = Statement {
                sql: format!(
                    "INSERT INTO {} (name, type, value) VALUES {}",
                    self.dialect.qualified(table),
                    tuples.join(", ")
                ),
                params,
            };
            inserted += self.update("insert_map_rows", Some(table), &stmt)?;
        }
        Ok(inserted)
    }

    /// Overwrite the tag and payload stored under the row's name
    pub fn update_map_row(&self, table: &TableId, row: &TableRow) -> Result<usize> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET value = :value, type = :type WHERE name = :name",
            self.dialect.qualified(table)
        ))
        .bind("name", name_param(row))
        .bind("type", row.tag.code())
        .bind("value", row.value.as_str());
        self.update("update_map_row", Some(table), &stmt)
    }

    pub fn delete_where_name(&self, table: &TableId, name: &str) -> Result<usize> {
        let stmt = Statement::new(format!(
            "DELETE FROM {} WHERE name = :name",
            self.dialect.qualified(table)
        ))
        .bind("name", name);
        self.update("delete_where_name", Some(table), &stmt)
    }

    /// Delete every row whose name is listed; an empty list issues nothing
    pub fn delete_where_names(&self, table: &TableId, names: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for chunk in names.chunks(MAX_BOUND_PARAMETERS) {
            let mut params = Params::new();
            let placeholders: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    params.insert(format!("name{i}"), SqlValue::Text(name.clone()));
                    format!(":name{i}")
                })
                .collect();
            let stmt = Statement {
                sql: format!(
                    "DELETE FROM {} WHERE name IN ({})",
                    self.dialect.qualified(table),
                    placeholders.join(", ")
                ),
                params,
            };
            deleted += self.update("delete_where_names", Some(table), &stmt)?;
        }
        Ok(deleted)
    }

    // ----- collection tables -----

    pub fn insert_collection_row(&self, table: &TableId, row: &TableRow) -> Result<usize> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} (type, value) VALUES (:type, :value)",
            self.dialect.qualified(table)
        ))
        .bind("type", row.tag.code())
        .bind("value", row.value.as_str());
        self.update("insert_collection_row", Some(table), &stmt)
    }

    /// Bulk insert (`:type0`, `:value0`, ...), chunked like [`TableGateway::insert_map_rows`]
    pub fn insert_collection_rows(&self, table: &TableId, rows: &[TableRow]) -> Result<usize> {
        let mut inserted = 0;
        for chunk in rows.chunks(MAX_BOUND_PARAMETERS / 2) {
            let mut params = Params::new();
            let mut tuples = Vec::with_capacity(chunk.len());
            for (i, row) in chunk.iter().enumerate() {
                tuples.push(format!("(:type{i}, :value{i})"));
                params.insert(format!("type{i}"), SqlValue::Integer(row.tag.code()));
                params.insert(format!("value{i}"), SqlValue::Text(row.value.clone()));
            }
            let stmt = Statement {
                sql: format!(
                    "INSERT INTO {} (type, value) VALUES {}",
                    self.dialect.qualified(table),
                    tuples.join(", ")
                ),
                params,
            };
            inserted += self.update("insert_collection_rows", Some(table), &stmt)?;
        }
        Ok(inserted)
    }

    pub fn select_collection_rows(&self, table: &TableId) -> Result<Vec<TableRow>> {
        let stmt = Statement::new(format!(
            "SELECT type, value FROM {}",
            self.dialect.qualified(table)
        ));
        let rows = self.query(
            "select_collection_rows",
            Some(table),
            &stmt,
            &TableRow::collection_shape(),
        )?;
        rows.iter()
            .map(|row| TableRow::from_row(row).map_err(ExError::from))
            .collect()
    }

    /// Run each statement in order, stopping at the first failure
    pub fn execute_all(&self, op: &str, table: Option<&TableId>, stmts: &[Statement]) -> Result<()> {
        for stmt in stmts {
            self.update(op, table, stmt)?;
        }
        Ok(())
    }
}

/// `(type = :type0 AND value = :value0) OR ...` over `pairs`
fn pair_chain(pairs: &[(TypeTag, String)]) -> (String, Params) {
    let mut params = Params::new();
    let mut clauses = Vec::with_capacity(pairs.len());
    for (i, (tag, value)) in pairs.iter().enumerate() {
        clauses.push(format!("(type = :type{i} AND value = :value{i})"));
        params.insert(format!("type{i}"), SqlValue::Integer(tag.code()));
        params.insert(format!("value{i}"), SqlValue::Text(value.clone()));
    }
    (clauses.join(" OR "), params)
}

fn name_param(row: &TableRow) -> SqlValue {
    match &row.name {
        Some(name) => SqlValue::Text(name.clone()),
        None => SqlValue::Null,
    }
}
