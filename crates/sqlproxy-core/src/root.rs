//! Root element
//!
//! Owns one namespace of element tables: the root table holding the
//! identifier counter, and every child table `<root>__<n>` created from it.
//!
//! Lifecycle: `Uninitialized -> RootTableCreated -> Dropped`. Only
//! [`RootElement::create_schema_if_not_exists`],
//! [`RootElement::create_root_table_if_not_exists`], [`RootElement::drop`] and
//! the catalog reads are accepted before the root table exists; after `drop`
//! nothing but catalog reads is.
//!
//! Handles are cheap to clone and share state, so every view bound from a
//! root sees the same lifecycle: view operations fail once the root is
//! dropped.

#![allow(clippy::result_large_err)]

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use sqlproxy_core_types::TableId;

use crate::allocator::{self, AllocatorStrategy};
use crate::dialect::Dialect;
use crate::errors::{ProxyError, Result};
use crate::gateway::TableGateway;
use crate::query::{ColumnType, QueryExecutor, ResultShape, Statement};
use crate::views::{SqlCollection, SqlMap};
use crate::{log_op_end, log_op_error, log_op_start};

/// Value of the allocator counter in a freshly created root table
pub const INITIAL_ELEMENT_ID: i64 = 1;

/// Lifecycle state of a [`RootElement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    Uninitialized,
    RootTableCreated,
    Dropped,
}

impl RootState {
    fn to_u8(self) -> u8 {
        match self {
            RootState::Uninitialized => 0,
            RootState::RootTableCreated => 1,
            RootState::Dropped => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RootState::Uninitialized,
            1 => RootState::RootTableCreated,
            _ => RootState::Dropped,
        }
    }
}

/// Construction options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RootOptions {
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub allocator: AllocatorStrategy,
}

struct RootInner {
    table_id: TableId,
    gateway: TableGateway,
    allocator: AllocatorStrategy,
    state: AtomicU8,
}

/// Handle to one namespace
#[derive(Clone)]
pub struct RootElement {
    inner: Arc<RootInner>,
}

impl std::fmt::Debug for RootElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootElement")
            .field("table_id", &self.inner.table_id)
            .field("dialect", self.inner.gateway.dialect())
            .field("allocator", &self.inner.allocator)
            .field("state", &self.state())
            .finish()
    }
}

impl RootElement {
    /// Root element with the default dialect and allocator
    pub fn new(executor: Arc<dyn QueryExecutor>, table_id: TableId) -> Self {
        Self::with_options(executor, table_id, RootOptions::default())
    }

    pub fn with_options(
        executor: Arc<dyn QueryExecutor>,
        table_id: TableId,
        options: RootOptions,
    ) -> Self {
        Self {
            inner: Arc::new(RootInner {
                table_id,
                gateway: TableGateway::new(executor, options.dialect),
                allocator: options.allocator,
                state: AtomicU8::new(RootState::Uninitialized.to_u8()),
            }),
        }
    }

    pub fn table_id(&self) -> &TableId {
        &self.inner.table_id
    }

    pub fn state(&self) -> RootState {
        RootState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RootState) {
        self.inner.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn gateway(&self) -> &TableGateway {
        &self.inner.gateway
    }

    pub fn allocator(&self) -> AllocatorStrategy {
        self.inner.allocator
    }

    /// Whether `other` addresses the same namespace through the same executor
    pub fn same_namespace(&self, other: &RootElement) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let a = Arc::as_ptr(self.inner.gateway.executor()) as *const ();
        let b = Arc::as_ptr(other.inner.gateway.executor()) as *const ();
        self.inner.table_id == other.inner.table_id && std::ptr::eq(a, b)
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            RootState::RootTableCreated => Ok(()),
            _ => Err(ProxyError::NamespaceNotInitialized {
                root_table_id: self.inner.table_id.to_string(),
            }
            .into()),
        }
    }

    /// Gateway for view operations, refused unless the root table exists
    ///
    /// A view bound before `drop` must not reach a namespace recreated
    /// under the same name.
    pub(crate) fn live_gateway(&self) -> Result<&TableGateway> {
        self.ensure_ready()?;
        Ok(self.gateway())
    }

    fn ensure_not_dropped(&self) -> Result<()> {
        match self.state() {
            RootState::Dropped => Err(ProxyError::NamespaceNotInitialized {
                root_table_id: self.inner.table_id.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn logged<T>(&self, op: &'static str, table_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        log_op_start!(op, table_id);
        match f() {
            Ok(value) => {
                log_op_end!(op, table_id, started);
                Ok(value)
            }
            Err(e) => {
                log_op_error!(op, table_id, started, e);
                Err(e)
            }
        }
    }

    // ----- schema and root table -----

    pub fn schema_exists(&self) -> Result<bool> {
        let gateway = self.gateway();
        let shape = ResultShape::new().column("schema_name", ColumnType::Text);
        let rows = gateway.query("schema_exists", None, &gateway.dialect().schema_exists(), &shape)?;
        Ok(!rows.is_empty())
    }

    pub fn create_schema_if_not_exists(&self) -> Result<()> {
        self.ensure_not_dropped()?;
        if self.schema_exists()? {
            return Ok(());
        }
        let gateway = self.gateway();
        gateway.update("create_schema", None, &gateway.dialect().create_schema())?;
        Ok(())
    }

    /// Ensure the schema and the root table exist, seeding the counter once
    ///
    /// An existing root table keeps its counter, so this also attaches to a
    /// namespace persisted by an earlier process.
    pub fn create_root_table_if_not_exists(&self) -> Result<()> {
        let table_id = self.table_id().clone();
        self.logged("create_root_table", table_id.as_str(), || {
            self.ensure_not_dropped()?;
            table_id.check_root_capacity()?;
            self.create_schema_if_not_exists()?;
            let gateway = self.gateway();
            gateway.update(
                "create_root_table",
                Some(&table_id),
                &gateway.dialect().create_root_table(&table_id),
            )?;
            if !allocator::counter_row_exists(gateway, &table_id)? {
                let stmt = Statement::new(format!(
                    "INSERT INTO {} (next_element_id, element_prefix) VALUES (:next, :prefix)",
                    gateway.dialect().qualified(&table_id)
                ))
                .bind("next", INITIAL_ELEMENT_ID)
                .bind("prefix", table_id.element_prefix());
                gateway.update("create_root_table", Some(&table_id), &stmt)?;
            }
            self.set_state(RootState::RootTableCreated);
            Ok(())
        })
    }

    // ----- allocation -----

    /// Issue the next child identifier
    pub fn next_identifier(&self) -> Result<i64> {
        self.logged("next_identifier", self.table_id().as_str(), || {
            self.ensure_ready()?;
            self.inner.allocator.allocate(self.gateway(), self.table_id())
        })
    }

    /// Current counter value; `1` means nothing was ever allocated
    pub fn peek_next_identifier(&self) -> Result<i64> {
        self.ensure_ready()?;
        allocator::read_counter(self.gateway(), self.table_id())
    }

    // ----- child tables -----

    /// Create the map table for an allocated identifier
    pub fn create_map(&self, element_id: i64) -> Result<SqlMap> {
        let child = self.table_id().child(element_id)?;
        self.logged("create_map", child.as_str(), || {
            self.ensure_ready()?;
            let gateway = self.gateway();
            gateway.update(
                "create_map",
                Some(&child),
                &gateway.dialect().create_map_table(&child),
            )?;
            Ok(SqlMap::bind(self.clone(), child.clone()))
        })
    }

    /// Create the collection table for an allocated identifier
    pub fn create_collection(&self, element_id: i64) -> Result<SqlCollection> {
        let child = self.table_id().child(element_id)?;
        self.logged("create_collection", child.as_str(), || {
            self.ensure_ready()?;
            let gateway = self.gateway();
            gateway.update(
                "create_collection",
                Some(&child),
                &gateway.dialect().create_collection_table(&child),
            )?;
            Ok(SqlCollection::bind(self.clone(), child.clone()))
        })
    }

    /// Allocate an identifier and create a map table for it
    pub fn new_map(&self) -> Result<SqlMap> {
        let id = self.next_identifier()?;
        self.create_map(id)
    }

    /// Allocate an identifier and create a collection table for it
    pub fn new_collection(&self) -> Result<SqlCollection> {
        let id = self.next_identifier()?;
        self.create_collection(id)
    }

    /// View an existing map table; the table is not read
    pub fn bind_map(&self, table_id: &TableId) -> Result<SqlMap> {
        self.ensure_ready()?;
        Ok(SqlMap::bind(self.clone(), table_id.clone()))
    }

    /// View an existing collection table; the table is not read
    pub fn bind_collection(&self, table_id: &TableId) -> Result<SqlCollection> {
        self.ensure_ready()?;
        Ok(SqlCollection::bind(self.clone(), table_id.clone()))
    }

    /// The namespace's entry map
    ///
    /// Created on first use (allocating identifier 1); later calls, from
    /// this or any other process, bind to `<root>__1`.
    pub fn retrieve_root_map(&self) -> Result<SqlMap> {
        self.ensure_ready()?;
        if allocator::read_counter(self.gateway(), self.table_id())? == INITIAL_ELEMENT_ID {
            self.new_map()
        } else {
            self.bind_map(&self.table_id().child(INITIAL_ELEMENT_ID)?)
        }
    }

    // ----- teardown -----

    /// Drop one child table
    pub fn drop_table(&self, element_id: i64) -> Result<()> {
        let child = self.table_id().child(element_id)?;
        self.logged("drop_table", child.as_str(), || {
            self.ensure_ready()?;
            let gateway = self.gateway();
            let stmts = gateway.dialect().drop_tables(std::slice::from_ref(&child));
            gateway.execute_all("drop_table", Some(&child), &stmts)
        })
    }

    /// Every child table of this namespace, according to the catalog
    pub fn contained_tables(&self) -> Result<Vec<TableId>> {
        if !self.schema_exists()? {
            return Ok(Vec::new());
        }
        let gateway = self.gateway();
        let rows = gateway.query(
            "contained_tables",
            Some(self.table_id()),
            &gateway.dialect().contained_tables(self.table_id()),
            &Dialect::table_name_shape(),
        )?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            tables.push(TableId::parse(row.text("table_name")?)?);
        }
        Ok(tables)
    }

    /// Drop every child table and the root table, then the schema if empty
    ///
    /// The handle and every view bound from it are unusable afterwards.
    pub fn drop(&self) -> Result<()> {
        let table_id = self.table_id().clone();
        self.logged("drop", table_id.as_str(), || {
            self.ensure_not_dropped()?;
            if !self.schema_exists()? {
                self.set_state(RootState::Dropped);
                return Ok(());
            }
            let mut tables = self.contained_tables()?;
            tracing::debug!(
                root_table_id = table_id.as_str(),
                table_count = tables.len(),
                "dropping namespace"
            );
            tables.push(table_id.clone());

            let gateway = self.gateway();
            let dialect = gateway.dialect();
            gateway.execute_all("drop", Some(&table_id), &dialect.drop_tables(&tables))?;

            let remaining = gateway.query(
                "drop",
                None,
                &dialect.schema_tables(),
                &Dialect::table_name_shape(),
            )?;
            if remaining.is_empty() {
                gateway.update("drop", None, &dialect.drop_schema())?;
            }
            self.set_state(RootState::Dropped);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::query::{Params, Row};

    struct Unreachable;

    impl QueryExecutor for Unreachable {
        fn execute_query(&self, _: &str, _: &Params, _: &ResultShape) -> Result<Vec<Row>> {
            Err(crate::errors::persistence("test", "unreachable"))
        }

        fn execute_update(&self, _: &str, _: &Params) -> Result<usize> {
            Err(crate::errors::persistence("test", "unreachable"))
        }
    }

    fn root(executor: Arc<dyn QueryExecutor>, id: &str) -> RootElement {
        RootElement::new(executor, TableId::parse(id).unwrap())
    }

    #[test]
    fn test_operations_before_bootstrap_fail_fast() {
        let r = root(Arc::new(Unreachable), "root");
        assert_eq!(r.state(), RootState::Uninitialized);
        for err in [
            r.next_identifier().unwrap_err(),
            r.create_map(1).unwrap_err(),
            r.retrieve_root_map().unwrap_err(),
            r.bind_collection(&TableId::parse("root__2").unwrap()).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ExErrorKind::NamespaceNotInitialized);
        }
    }

    #[test]
    fn test_failed_bootstrap_stays_uninitialized() {
        let r = root(Arc::new(Unreachable), "root");
        let err = r.create_root_table_if_not_exists().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(r.state(), RootState::Uninitialized);
    }

    #[test]
    fn test_overlong_root_rejected_before_any_statement() {
        let r = root(Arc::new(Unreachable), &"r".repeat(60));
        let err = r.create_root_table_if_not_exists().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(err.message().contains("child names would not fit"));
        assert_eq!(r.state(), RootState::Uninitialized);
    }

    #[test]
    fn test_same_namespace_requires_same_executor_and_table() {
        let exec: Arc<dyn QueryExecutor> = Arc::new(Unreachable);
        let a = root(exec.clone(), "root");
        let b = root(exec.clone(), "root");
        let c = root(exec, "other");
        let d = root(Arc::new(Unreachable), "root");
        assert!(a.same_namespace(&a.clone()));
        assert!(a.same_namespace(&b));
        assert!(!a.same_namespace(&c));
        assert!(!a.same_namespace(&d));
    }

    #[test]
    fn test_state_encoding() {
        for s in [
            RootState::Uninitialized,
            RootState::RootTableCreated,
            RootState::Dropped,
        ] {
            assert_eq!(RootState::from_u8(s.to_u8()), s);
        }
    }
}
