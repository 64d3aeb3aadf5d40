//! Child identifier allocation
//!
//! The root table holds a single `(next_element_id, element_prefix)` row.
//! Allocating returns the stored counter and writes back `counter + 1`.

#![allow(clippy::result_large_err)]

use serde::Deserialize;
use sqlproxy_core_types::TableId;

use crate::errors::{ProxyError, Result};
use crate::gateway::TableGateway;
use crate::query::{ColumnType, ResultShape, Row, Statement};

/// Attempts used by [`AllocatorStrategy::CompareAndSwap`] when not configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// How the counter is read and advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocatorStrategy {
    /// Read, then unconditionally write `counter + 1`
    ///
    /// Two round trips with nothing in between; concurrent callers can be
    /// handed the same identifier.
    #[default]
    ReadThenWrite,
    /// Read, then write only if the counter is still what was read
    ///
    /// A lost race is retried up to `max_attempts` times.
    CompareAndSwap {
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
    },
}

impl AllocatorStrategy {
    pub fn compare_and_swap() -> Self {
        AllocatorStrategy::CompareAndSwap {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Issue the next identifier from `root`'s counter
    pub fn allocate(&self, gateway: &TableGateway, root: &TableId) -> Result<i64> {
        match *self {
            AllocatorStrategy::ReadThenWrite => {
                let current = read_counter(gateway, root)?;
                let stmt = Statement::new(format!(
                    "UPDATE {} SET next_element_id = :next",
                    gateway.dialect().qualified(root)
                ))
                .bind("next", current + 1);
                gateway.update("allocate", Some(root), &stmt)?;
                Ok(current)
            }
            AllocatorStrategy::CompareAndSwap { max_attempts } => {
                let attempts = max_attempts.max(1);
                for attempt in 1..=attempts {
                    let current = read_counter(gateway, root)?;
                    let stmt = Statement::new(format!(
                        "UPDATE {} SET next_element_id = :next WHERE next_element_id = :expected",
                        gateway.dialect().qualified(root)
                    ))
                    .bind("next", current + 1)
                    .bind("expected", current);
                    if gateway.update("allocate", Some(root), &stmt)? > 0 {
                        return Ok(current);
                    }
                    tracing::debug!(root_table_id = root.as_str(), attempt, "allocation race lost");
                }
                Err(ProxyError::AllocationContended {
                    root_table_id: root.to_string(),
                    attempts,
                }
                .into())
            }
        }
    }
}

fn select_counter(gateway: &TableGateway, op: &str, root: &TableId) -> Result<Vec<Row>> {
    let stmt = Statement::new(format!(
        "SELECT next_element_id FROM {}",
        gateway.dialect().qualified(root)
    ));
    let shape = ResultShape::new().column("next_element_id", ColumnType::Integer);
    gateway.query(op, Some(root), &stmt, &shape)
}

/// Whether the root table already holds its counter row
pub fn counter_row_exists(gateway: &TableGateway, root: &TableId) -> Result<bool> {
    Ok(!select_counter(gateway, "counter_row_exists", root)?.is_empty())
}

/// Current counter value without advancing it
pub fn read_counter(gateway: &TableGateway, root: &TableId) -> Result<i64> {
    let rows = select_counter(gateway, "read_counter", root)?;
    match rows.first() {
        Some(row) => Ok(row.integer("next_element_id")?),
        None => Err(ProxyError::AllocatorRowMissing {
            root_table_id: root.to_string(),
        }
        .into()),
    }
}
