//! SQL dialects
//!
//! Table and column names are fixed by the storage format: every element
//! table lives in the `elements` schema. Postgres speaks the canonical
//! statements; SQLite emulates the schema with an attached database.
//!
//! Identifiers are spliced into templates only after [`TableId`] validation;
//! everything else is a bound parameter.

use serde::Deserialize;
use sqlproxy_core_types::TableId;

use crate::query::{ColumnType, ResultShape, Statement};

/// Schema holding every element table
pub const SCHEMA_NAME: &str = "elements";

/// Attached database file used when SQLite has no configured schema file
pub const SQLITE_IN_MEMORY: &str = ":memory:";

fn default_schema_file() -> String {
    SQLITE_IN_MEMORY.to_string()
}

/// Statement flavour spoken by the query executor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dialect {
    Postgres,
    Sqlite {
        /// Database file attached as the `elements` schema
        #[serde(default = "default_schema_file")]
        schema_file: String,
    },
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::sqlite_in_memory()
    }
}

impl Dialect {
    /// SQLite with the schema attached as a private in-memory database
    pub fn sqlite_in_memory() -> Self {
        Dialect::Sqlite {
            schema_file: default_schema_file(),
        }
    }

    /// Schema-qualified table name
    pub fn qualified(&self, table: &TableId) -> String {
        format!("{}.{}", SCHEMA_NAME, table)
    }

    /// Column that addresses a single physical row
    pub fn row_locator(&self) -> &'static str {
        match self {
            Dialect::Postgres => "ctid",
            Dialect::Sqlite { .. } => "rowid",
        }
    }

    /// Query returning one `schema_name` row if the schema exists
    pub fn schema_exists(&self) -> Statement {
        let sql = match self {
            Dialect::Postgres => {
                "SELECT schema_name FROM information_schema.schemata WHERE schema_name = :schema"
            }
            Dialect::Sqlite { .. } => {
                "SELECT name AS schema_name FROM pragma_database_list WHERE name = :schema"
            }
        };
        Statement::new(sql).bind("schema", SCHEMA_NAME)
    }

    pub fn create_schema(&self) -> Statement {
        match self {
            Dialect::Postgres => Statement::new(format!("CREATE SCHEMA IF NOT EXISTS {}", SCHEMA_NAME)),
            Dialect::Sqlite { schema_file } => {
                Statement::new(format!("ATTACH DATABASE :schema_file AS {}", SCHEMA_NAME))
                    .bind("schema_file", schema_file.as_str())
            }
        }
    }

    /// Remove the schema; callers check emptiness first
    pub fn drop_schema(&self) -> Statement {
        match self {
            Dialect::Postgres => {
                Statement::new(format!("DROP SCHEMA IF EXISTS {} RESTRICT", SCHEMA_NAME))
            }
            Dialect::Sqlite { .. } => Statement::new(format!("DETACH DATABASE {}", SCHEMA_NAME)),
        }
    }

    /// Query returning the `table_name` of every table in the schema
    pub fn schema_tables(&self) -> Statement {
        match self {
            Dialect::Postgres => Statement::new(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' AND table_schema = :schema",
            )
            .bind("schema", SCHEMA_NAME),
            Dialect::Sqlite { .. } => Statement::new(format!(
                "SELECT name AS table_name FROM {}.sqlite_master WHERE type = 'table'",
                SCHEMA_NAME
            )),
        }
    }

    /// Query returning the `table_name` of every child table of `root`
    pub fn contained_tables(&self, root: &TableId) -> Statement {
        match self {
            Dialect::Postgres => Statement::new(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' AND table_schema = :schema \
                 AND table_name LIKE :pattern ESCAPE '\\'",
            )
            .bind("schema", SCHEMA_NAME)
            // Unquoted identifiers are folded to lower case by Postgres
            .bind("pattern", root.child_pattern().to_ascii_lowercase()),
            Dialect::Sqlite { .. } => Statement::new(format!(
                "SELECT name AS table_name FROM {}.sqlite_master \
                 WHERE type = 'table' AND name LIKE :pattern ESCAPE '\\'",
                SCHEMA_NAME
            ))
            .bind("pattern", root.child_pattern()),
        }
    }

    /// Shape of the catalog queries above
    pub fn table_name_shape() -> ResultShape {
        ResultShape::new().column("table_name", ColumnType::Text)
    }

    pub fn create_root_table(&self, root: &TableId) -> Statement {
        Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {} (next_element_id int, element_prefix varchar(255))",
            self.qualified(root)
        ))
    }

    pub fn create_map_table(&self, table: &TableId) -> Statement {
        Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {} (name text, type int, value text)",
            self.qualified(table)
        ))
    }

    pub fn create_collection_table(&self, table: &TableId) -> Statement {
        Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {} (type int, value text)",
            self.qualified(table)
        ))
    }

    /// Statements dropping every listed table
    ///
    /// Postgres drops them in one statement; SQLite needs one per table.
    pub fn drop_tables(&self, tables: &[TableId]) -> Vec<Statement> {
        if tables.is_empty() {
            return Vec::new();
        }
        match self {
            Dialect::Postgres => {
                let names: Vec<String> = tables.iter().map(|t| self.qualified(t)).collect();
                vec![Statement::new(format!(
                    "DROP TABLE IF EXISTS {}",
                    names.join(", ")
                ))]
            }
            Dialect::Sqlite { .. } => tables
                .iter()
                .map(|t| Statement::new(format!("DROP TABLE IF EXISTS {}", self.qualified(t))))
                .collect(),
        }
    }
}
