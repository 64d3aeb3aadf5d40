//! SQLProxy Core - Maps and collections backed by SQL tables
//!
//! This crate stores ordinary map and collection structures in a relational
//! database without a schema per data shape:
//! - Tagged value model with a lossless string codec
//! - Table gateway issuing fixed, parameterized statements
//! - Live map and collection views over element tables
//! - Root element owning a namespace: identifier allocation, table creation
//!   and teardown
//! - Error and logging facilities shared by every crate of the workspace
//!
//! SQL is executed by an external [`query::QueryExecutor`]; see
//! `sqlproxy-store` for the SQLite implementation.

pub mod allocator;
pub mod codec;
pub mod config;
pub mod dialect;
pub mod errors;
pub mod gateway;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod root;
pub mod views;

// Re-export commonly used types
pub use allocator::AllocatorStrategy;
pub use config::ProxyConfig;
pub use dialect::Dialect;
pub use errors::{ExError, ExErrorKind, ProxyError, Result};
pub use model::{TypeTag, Value};
pub use query::{QueryExecutor, ResultShape, Row, SqlValue};
pub use root::{RootElement, RootOptions, RootState};
pub use sqlproxy_core_types::TableId;
pub use views::{SqlCollection, SqlMap};
