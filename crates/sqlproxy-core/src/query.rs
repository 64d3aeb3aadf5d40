//! Query execution primitive
//!
//! The core never talks to a database driver directly. Everything goes
//! through [`QueryExecutor`], supplied by the surrounding system:
//!
//! - statement templates use `:name` placeholders
//! - every value is bound from a [`Params`] map, never spliced into the text
//! - query results are decoded according to a [`ResultShape`] and fully
//!   materialized before they are returned
//!
//! Thread safety, timeouts and cancellation are the executor's business.

use std::collections::BTreeMap;

use crate::errors::{ProxyError, Result};

/// A bound parameter or a decoded column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// Named parameters of one statement, keyed without the leading `:`
pub type Params = BTreeMap<String, SqlValue>;

/// Build a parameter map from literal pairs
pub fn params<const N: usize>(pairs: [(&str, SqlValue); N]) -> Params {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// A statement template together with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

/// Declared type of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

/// Describes how to decode the rows of a query
///
/// Metadata only; the database does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultShape {
    columns: Vec<(String, ColumnType)>,
}

impl ResultShape {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.columns.push((name.to_string(), column_type));
        self
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }
}

impl Default for ResultShape {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResultShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rows(")?;
        for (i, (name, column_type)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            let ty = match column_type {
                ColumnType::Integer => "integer",
                ColumnType::Text => "text",
            };
            write!(f, "{}:{}", name, ty)?;
        }
        write!(f, ")")
    }
}

/// One materialized result row, columns in shape order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Read an integer column
    pub fn integer(&self, column: &str) -> std::result::Result<i64, ProxyError> {
        match self.get(column) {
            Some(SqlValue::Integer(v)) => Ok(*v),
            Some(SqlValue::Text(s)) => s.trim().parse().map_err(|_| ProxyError::DecodeFailed {
                tag: format!("column {}", column),
                reason: format!("'{}' is not an integer", s),
            }),
            Some(SqlValue::Null) => Err(ProxyError::DecodeFailed {
                tag: format!("column {}", column),
                reason: "unexpected NULL".to_string(),
            }),
            None => Err(ProxyError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }

    /// Read a text column; integers are rendered in decimal
    pub fn text(&self, column: &str) -> std::result::Result<String, ProxyError> {
        match self.get(column) {
            Some(SqlValue::Text(s)) => Ok(s.clone()),
            Some(SqlValue::Integer(v)) => Ok(v.to_string()),
            Some(SqlValue::Null) => Err(ProxyError::DecodeFailed {
                tag: format!("column {}", column),
                reason: "unexpected NULL".to_string(),
            }),
            None => Err(ProxyError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }

    /// Read a nullable text column
    pub fn optional_text(&self, column: &str) -> std::result::Result<Option<String>, ProxyError> {
        match self.get(column) {
            Some(SqlValue::Null) => Ok(None),
            _ => self.text(column).map(Some),
        }
    }
}

/// Externally supplied statement executor
///
/// Implementations must bind every `:name` placeholder from `params` and
/// fail (rather than bind NULL) when a placeholder has no parameter.
pub trait QueryExecutor: Send + Sync {
    /// Run a query and materialize every row according to `shape`
    fn execute_query(&self, sql: &str, params: &Params, shape: &ResultShape) -> Result<Vec<Row>>;

    /// Run an INSERT/UPDATE/DELETE/DDL statement, returning affected rows
    fn execute_update(&self, sql: &str, params: &Params) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let p = params([("name", "k".into()), ("type", SqlValue::Integer(1))]);
        assert_eq!(p.get("name"), Some(&SqlValue::Text("k".to_string())));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_statement_bind() {
        let stmt = Statement::new("DELETE FROM elements.t WHERE name = :name").bind("name", "k");
        assert_eq!(stmt.params.get("name"), Some(&SqlValue::Text("k".into())));
    }

    #[test]
    fn test_shape_display() {
        let shape = ResultShape::new()
            .column("name", ColumnType::Text)
            .column("type", ColumnType::Integer);
        assert_eq!(shape.to_string(), "rows(name:text,type:integer)");
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::new(vec![
            ("type".to_string(), SqlValue::Integer(5)),
            ("value".to_string(), SqlValue::Text("abc".to_string())),
            ("name".to_string(), SqlValue::Null),
        ]);
        assert_eq!(row.integer("type").unwrap(), 5);
        assert_eq!(row.text("value").unwrap(), "abc");
        assert_eq!(row.text("type").unwrap(), "5");
        assert_eq!(row.optional_text("name").unwrap(), None);
        assert!(matches!(
            row.integer("missing"),
            Err(ProxyError::MissingColumn { .. })
        ));
        assert!(matches!(
            row.integer("value"),
            Err(ProxyError::DecodeFailed { .. })
        ));
    }
}
