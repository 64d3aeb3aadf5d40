//! Core types shared across sqlproxy facilities
//!
//! This crate provides foundational types used by the codec, the views and
//! the logging facility:
//!
//! - **Table identifiers**: validated [`TableId`] and the hierarchical naming rules
//! - **Schema constants**: canonical field keys and event names for structured logs

pub mod schema;
pub mod table_id;

pub use table_id::{escape_like, TableId, TableIdError};
