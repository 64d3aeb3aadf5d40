#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sqlproxy_core::errors::{persistence, Result};
use sqlproxy_core::query::{Params, QueryExecutor, ResultShape, Row};
use sqlproxy_core::{AllocatorStrategy, Dialect, RootElement, RootOptions, TableId};
use sqlproxy_store::SqliteExecutor;

/// Fresh in-memory executor
pub fn executor() -> Arc<SqliteExecutor> {
    Arc::new(SqliteExecutor::open_in_memory().unwrap())
}

/// Bootstrapped root element over its own in-memory database
pub fn new_root(id: &str) -> RootElement {
    new_root_on(executor(), id)
}

/// Bootstrapped root element over a shared executor
pub fn new_root_on(executor: Arc<dyn QueryExecutor>, id: &str) -> RootElement {
    new_root_with(executor, id, AllocatorStrategy::ReadThenWrite)
}

pub fn new_root_with(
    executor: Arc<dyn QueryExecutor>,
    id: &str,
    allocator: AllocatorStrategy,
) -> RootElement {
    let root = RootElement::with_options(
        executor,
        TableId::parse(id).unwrap(),
        RootOptions {
            dialect: Dialect::sqlite_in_memory(),
            allocator,
        },
    );
    root.create_root_table_if_not_exists().unwrap();
    root
}

/// Names of every table in the `elements` schema, sorted
pub fn schema_tables(executor: &SqliteExecutor) -> Vec<String> {
    executor
        .with_connection(|conn| {
            let attached: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM pragma_database_list WHERE name = 'elements'",
                    [],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)?;
            if !attached {
                return Ok(Vec::new());
            }
            let mut stmt = conn.prepare(
                "SELECT name FROM elements.sqlite_master WHERE type = 'table' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
        .unwrap()
}

/// One statement seen by [`RecordingExecutor`]
#[derive(Debug, Clone)]
pub struct Recorded {
    pub sql: String,
    pub params: Params,
}

/// Forwards to an inner executor and records every statement
pub struct RecordingExecutor {
    inner: Arc<dyn QueryExecutor>,
    log: Mutex<Vec<Recorded>>,
}

impl RecordingExecutor {
    pub fn new(inner: Arc<dyn QueryExecutor>) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn record(&self, sql: &str, params: &Params) {
        self.log.lock().unwrap().push(Recorded {
            sql: sql.to_string(),
            params: params.clone(),
        });
    }
}

impl QueryExecutor for RecordingExecutor {
    fn execute_query(&self, sql: &str, params: &Params, shape: &ResultShape) -> Result<Vec<Row>> {
        self.record(sql, params);
        self.inner.execute_query(sql, params, shape)
    }

    fn execute_update(&self, sql: &str, params: &Params) -> Result<usize> {
        self.record(sql, params);
        self.inner.execute_update(sql, params)
    }
}

/// Fails updates whose SQL contains a trigger string, once armed
pub struct FaultyExecutor {
    inner: Arc<dyn QueryExecutor>,
    trigger: Mutex<Option<String>>,
}

impl FaultyExecutor {
    pub fn new(inner: Arc<dyn QueryExecutor>) -> Self {
        Self {
            inner,
            trigger: Mutex::new(None),
        }
    }

    /// Fail every update containing `fragment` until disarmed
    pub fn fail_updates_containing(&self, fragment: &str) {
        *self.trigger.lock().unwrap() = Some(fragment.to_string());
    }

    pub fn disarm(&self) {
        *self.trigger.lock().unwrap() = None;
    }
}

impl QueryExecutor for FaultyExecutor {
    fn execute_query(&self, sql: &str, params: &Params, shape: &ResultShape) -> Result<Vec<Row>> {
        self.inner.execute_query(sql, params, shape)
    }

    fn execute_update(&self, sql: &str, params: &Params) -> Result<usize> {
        let armed = self.trigger.lock().unwrap().clone();
        if let Some(fragment) = armed {
            if sql.contains(&fragment) {
                return Err(persistence("injected", format!("injected failure: {}", sql)));
            }
        }
        self.inner.execute_update(sql, params)
    }
}
