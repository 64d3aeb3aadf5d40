#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{executor, new_root_on, RecordingExecutor};
use sqlproxy_core::query::SqlValue;
use sqlproxy_core::Value;

const KEY: &str = "k'ey\"; DROP TABLE x; --";
const TEXT: &str = "payload%_'\\";

fn recorded_root(id: &str) -> (sqlproxy_core::RootElement, Arc<RecordingExecutor>) {
    let recorder = Arc::new(RecordingExecutor::new(executor()));
    let root = new_root_on(recorder.clone(), id);
    (root, recorder)
}

fn assert_only_bound(recorder: &RecordingExecutor, needle: &str) {
    let statements = recorder.statements();
    assert!(!statements.is_empty());
    for stmt in &statements {
        assert!(
            !stmt.sql.contains(needle),
            "{:?} was interpolated into {}",
            needle,
            stmt.sql
        );
    }
    assert!(
        statements
            .iter()
            .flat_map(|s| s.params.values())
            .any(|v| *v == SqlValue::Text(needle.to_string())),
        "{:?} was never bound",
        needle
    );
}

#[test]
fn test_map_keys_and_values_are_always_bound() {
    let (root, recorder) = recorded_root("bound");
    let map = root.new_map().unwrap();
    recorder.clear();

    map.put(KEY, TEXT).unwrap();
    map.put(KEY, TEXT).unwrap();
    map.get(KEY).unwrap();
    map.contains_key(KEY).unwrap();
    map.contains_value(&Value::from(TEXT)).unwrap();
    map.put_all([(KEY, Value::from(TEXT))]).unwrap();
    map.remove(KEY).unwrap();

    assert_only_bound(&recorder, KEY);
    assert_only_bound(&recorder, TEXT);
}

#[test]
fn test_collection_values_are_always_bound() {
    let (root, recorder) = recorded_root("bound");
    let bag = root.new_collection().unwrap();
    recorder.clear();

    bag.add(TEXT).unwrap();
    bag.add_all([TEXT, TEXT]).unwrap();
    bag.contains(&Value::from(TEXT)).unwrap();
    bag.remove(&Value::from(TEXT)).unwrap();
    bag.retain_all(&[Value::from(TEXT)]).unwrap();
    bag.remove_all(&[Value::from(TEXT)]).unwrap();

    assert_only_bound(&recorder, TEXT);
}

#[test]
fn test_documents_are_bound_whole() {
    let (root, recorder) = recorded_root("bound");
    let bag = root.new_collection().unwrap();
    recorder.clear();

    bag.add(BTreeMap::from([(KEY.to_string(), Value::from(TEXT))]))
        .unwrap();

    for stmt in recorder.statements() {
        assert!(!stmt.sql.contains("DROP TABLE x"), "{}", stmt.sql);
    }
    assert_eq!(bag.len().unwrap(), 1);
}

#[test]
fn test_schema_file_is_bound_on_attach() {
    let (_root, recorder) = recorded_root("attach");
    let attach = recorder
        .statements()
        .into_iter()
        .find(|s| s.sql.starts_with("ATTACH DATABASE"))
        .expect("schema was attached");
    assert_eq!(attach.sql, "ATTACH DATABASE :schema_file AS elements");
    assert_eq!(
        attach.params.get("schema_file"),
        Some(&SqlValue::Text(":memory:".to_string()))
    );
}
