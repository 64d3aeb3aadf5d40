//! SQLProxy Store - Embedded SQLite execution for sqlproxy namespaces
//!
//! Provides:
//! - `SqliteExecutor`, a query executor over one SQLite connection
//! - Connection helpers (open, WAL configuration)
//! - `open_namespace`, wiring a configuration to a bootstrapped root element

#![allow(clippy::result_large_err)]

pub mod db;
pub mod errors;
pub mod executor;

use std::sync::Arc;

use sqlproxy_core::config::ProxyConfig;
use sqlproxy_core::{Dialect, ProxyError, RootElement};
use sqlproxy_core_types::TableId;

// Re-export key types
pub use errors::Result;
pub use executor::SqliteExecutor;

/// Open the configured store and bootstrap the namespace rooted at `root_table_id`
///
/// Validates the configuration (the dialect must be `sqlite`), opens the
/// SQLite connection, then ensures the schema and root table exist. An
/// existing namespace keeps its counter and tables.
pub fn open_namespace(config: &ProxyConfig, root_table_id: &str) -> Result<RootElement> {
    config.validate()?;
    if !matches!(config.dialect, Dialect::Sqlite { .. }) {
        return Err(ProxyError::InvalidConfig {
            reason: "the SQLite store requires the sqlite dialect".to_string(),
        }
        .into());
    }
    let table_id = TableId::parse_root(root_table_id)?;
    let executor = Arc::new(SqliteExecutor::from_config(&config.store)?);
    tracing::debug!(
        root_table_id = table_id.as_str(),
        path = ?config.store.path,
        "opening namespace"
    );
    let root = RootElement::with_options(executor, table_id, config.root_options());
    root.create_root_table_if_not_exists()?;
    Ok(root)
}
