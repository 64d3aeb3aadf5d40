//! Structured logging facility for sqlproxy
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//!   keyed by operation and table
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use sqlproxy_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Root element lifecycle operations log a start/end pair; statements issued
//! by the table gateway log at `debug` with the `table_id` field.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use sqlproxy_core_types::schema;
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

/// Milliseconds since `started`, saturating
pub fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
