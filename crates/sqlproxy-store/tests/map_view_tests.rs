#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::{BTreeMap, HashSet};

use common::{executor, new_root, new_root_on, schema_tables};
use sqlproxy_core::{TypeTag, Value};

#[test]
fn test_put_then_get() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();

    map.put("k", 42).unwrap();

    assert_eq!(map.get("k").unwrap(), Some(Value::Int(42)));
    assert_eq!(map.len().unwrap(), 1);
    assert!(!map.is_empty().unwrap());
}

#[test]
fn test_get_missing_key_is_none() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    assert_eq!(map.get("absent").unwrap(), None);
    assert!(map.is_empty().unwrap());
}

#[test]
fn test_overwrite_keeps_size() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();

    map.put("k", 1).unwrap();
    map.put("k", "now a string").unwrap();

    assert_eq!(map.len().unwrap(), 1);
    assert_eq!(
        map.get("k").unwrap(),
        Some(Value::Str("now a string".to_string()))
    );
}

#[test]
fn test_remove_returns_previous_value() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("a", true).unwrap();
    map.put("b", 2.5f64).unwrap();

    assert_eq!(map.remove("a").unwrap(), Some(Value::Bool(true)));
    assert_eq!(map.remove("a").unwrap(), None);
    assert!(!map.contains_key("a").unwrap());
    assert!(map.contains_key("b").unwrap());
    assert_eq!(map.len().unwrap(), 1);
}

#[test]
fn test_contains_value_compares_type_and_payload() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("n", 5).unwrap();

    assert!(map.contains_value(&Value::Int(5)).unwrap());
    // Same text, different tag
    assert!(!map.contains_value(&Value::Str("5".to_string())).unwrap());
    assert!(!map.contains_value(&Value::Int(6)).unwrap());
}

#[test]
fn test_keys_values_entries() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("a", 1).unwrap();
    map.put("b", 2).unwrap();
    map.put("c", Value::Null).unwrap();

    let keys = map.keys().unwrap();
    assert_eq!(
        keys,
        HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()])
    );

    let mut values = map.values().unwrap();
    values.sort_by_key(|v| v.as_int().unwrap_or(i32::MIN));
    assert_eq!(values, vec![Value::Null, Value::Int(1), Value::Int(2)]);

    let entries = map.entries().unwrap();
    assert_eq!(entries.get("b"), Some(&Value::Int(2)));
    assert_eq!(entries.get("c"), Some(&Value::Null));
    assert_eq!(entries.len(), 3);
}

#[test]
fn test_clear() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("a", 1).unwrap();
    map.put("b", 2).unwrap();

    map.clear().unwrap();

    assert!(map.is_empty().unwrap());
    assert!(map.keys().unwrap().is_empty());
}

#[test]
fn test_put_all_replaces_listed_keys() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("keep", "old").unwrap();
    map.put("replace", "old").unwrap();

    map.put_all([("replace", Value::from("new")), ("added", Value::from(7))])
        .unwrap();

    assert_eq!(map.len().unwrap(), 3);
    assert_eq!(map.get("keep").unwrap(), Some(Value::from("old")));
    assert_eq!(map.get("replace").unwrap(), Some(Value::from("new")));
    assert_eq!(map.get("added").unwrap(), Some(Value::Int(7)));
}

#[test]
fn test_put_all_repeated_key_keeps_last_value() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();

    map.put_all([("a", 1), ("a", 2)]).unwrap();

    assert_eq!(map.len().unwrap(), 1);
    assert_eq!(map.get("a").unwrap(), Some(Value::Int(2)));
}

#[test]
fn test_put_all_beyond_parameter_limit() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("k0", "old").unwrap();
    map.put("untouched", true).unwrap();

    let entries: Vec<(String, i32)> = (0..12_000).map(|i| (format!("k{i}"), i)).collect();
    map.put_all(entries).unwrap();

    assert_eq!(map.len().unwrap(), 12_001);
    assert_eq!(map.get("k0").unwrap(), Some(Value::Int(0)));
    assert_eq!(map.get("k11999").unwrap(), Some(Value::Int(11_999)));
    assert_eq!(map.get("untouched").unwrap(), Some(Value::Bool(true)));
}

#[test]
fn test_put_all_empty_input_is_a_no_op() {
    let root = new_root("maps");
    let map = root.new_map().unwrap();
    map.put("a", 1).unwrap();

    map.put_all(Vec::<(String, Value)>::new()).unwrap();

    assert_eq!(map.len().unwrap(), 1);
}

#[test]
fn test_nested_map_is_stored_by_reference() {
    let exec = executor();
    let root = new_root_on(exec.clone(), "nest");
    let map = root.retrieve_root_map().unwrap();
    let before = schema_tables(&exec).len();

    let stored = map
        .put("child", BTreeMap::from([("a".to_string(), Value::Int(1))]))
        .unwrap();

    // Exactly one new child table
    assert_eq!(schema_tables(&exec).len(), before + 1);
    let child = stored.as_sql_map().expect("adopted into a map table");
    assert!(root.table_id().is_ancestor_of(child.table_id()));

    // A fresh view of the root map resolves the reference
    let reopened = root.retrieve_root_map().unwrap();
    assert_eq!(reopened, map);
    let child = reopened.get("child").unwrap().unwrap();
    let child = child.as_sql_map().unwrap();
    assert_eq!(child.get("a").unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_same_namespace_view_is_not_copied() {
    let exec = executor();
    let root = new_root_on(exec.clone(), "refs");
    let parent = root.new_map().unwrap();
    let child = root.new_map().unwrap();
    let tables = schema_tables(&exec).len();

    parent.put("child", child.clone()).unwrap();
    child.put("late", 1).unwrap();

    assert_eq!(schema_tables(&exec).len(), tables);
    let resolved = parent.get("child").unwrap().unwrap();
    assert_eq!(resolved.as_sql_map(), Some(&child));
    assert_eq!(
        resolved.as_sql_map().unwrap().get("late").unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn test_same_root_id_on_another_database_is_copied() {
    let here = new_root("twin");
    let there = new_root("twin");
    assert!(!here.same_namespace(&there));

    let source = there.new_map().unwrap();
    source.put("x", 1).unwrap();
    here.new_map().unwrap();
    let target = here.new_map().unwrap();
    assert_eq!(source.table_id(), &sqlproxy_core::TableId::parse("twin__1").unwrap());

    let stored = target.put("copy", source.clone()).unwrap();
    let copy = stored.as_sql_map().unwrap();
    assert!(copy.root().same_namespace(&here));
    assert_eq!(copy.table_id().as_str(), "twin__3");
    assert_eq!(
        target.get("copy").unwrap().unwrap().as_sql_map().unwrap().get("x").unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn test_foreign_map_is_snapshotted_at_put() {
    let exec = executor();
    let ours = new_root_on(exec.clone(), "ours");
    let theirs = new_root_on(exec.clone(), "theirs");
    let source = theirs.new_map().unwrap();
    source.put("x", 1).unwrap();

    let target = ours.new_map().unwrap();
    let stored = target.put("copy", source.clone()).unwrap();
    source.put("x", 2).unwrap();
    source.put("y", 3).unwrap();

    let copy = stored.as_sql_map().unwrap();
    assert!(copy.root().same_namespace(&ours));
    assert_eq!(copy.get("x").unwrap(), Some(Value::Int(1)));
    assert_eq!(copy.get("y").unwrap(), None);
}

#[test]
fn test_deeply_nested_detached_maps_are_adopted_recursively() {
    let root = new_root("deep");
    let map = root.new_map().unwrap();
    let inner = BTreeMap::from([("leaf".to_string(), Value::from("v"))]);
    let outer = BTreeMap::from([("inner".to_string(), Value::Map(inner))]);

    map.put("outer", outer).unwrap();

    let outer = map.get("outer").unwrap().unwrap();
    let outer = outer.as_sql_map().unwrap();
    let inner = outer.get("inner").unwrap().unwrap();
    let inner = inner.as_sql_map().expect("nested maps become tables too");
    assert_eq!(inner.get("leaf").unwrap(), Some(Value::from("v")));
}

#[test]
fn test_put_all_stores_detached_maps_as_documents() {
    let exec = executor();
    let root = new_root_on(exec.clone(), "docs");
    let map = root.new_map().unwrap();
    let tables = schema_tables(&exec).len();

    let doc = BTreeMap::from([("a".to_string(), Value::Int(1))]);
    map.put_all([("doc", Value::Map(doc.clone()))]).unwrap();

    assert_eq!(schema_tables(&exec).len(), tables);
    assert_eq!(map.get("doc").unwrap(), Some(Value::Map(doc)));
    let row = root
        .gateway()
        .select_map_row(map.table_id(), "doc")
        .unwrap()
        .unwrap();
    assert_eq!(row.tag, TypeTag::GenericMap);
}

#[test]
fn test_keys_with_sql_metacharacters() {
    let root = new_root("meta");
    let map = root.new_map().unwrap();
    let key = "it's; DROP TABLE elements.meta --";

    map.put(key, "x'y").unwrap();

    assert_eq!(map.get(key).unwrap(), Some(Value::from("x'y")));
    assert!(map.contains_key(key).unwrap());
    assert_eq!(map.len().unwrap(), 1);
}
