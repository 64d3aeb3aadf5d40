//! Generic map and collection payloads
//!
//! Structures that do not belong to the namespace are stored as a single
//! JSON document. Every node carries its own tag so nested scalars come back
//! with the exact type they went in with (an `int` stays an `int`, a `char`
//! does not turn into a string).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlproxy_core_types::TableId;

use crate::errors::{ProxyError, Result};
use crate::model::{TypeTag, Value};
use crate::root::RootElement;

/// Tagged JSON tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JsonNode {
    Null,
    Int(i32),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    Bool(bool),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    CharArray(Vec<char>),
    StrArray(Vec<String>),
    BoolArray(Vec<bool>),
    Map(BTreeMap<String, JsonNode>),
    Collection(Vec<JsonNode>),
    /// Map table of the namespace the document is stored in
    MapRef(String),
    /// Collection table of the namespace the document is stored in
    CollectionRef(String),
}

fn non_finite(what: &str) -> ProxyError {
    ProxyError::Serialization {
        message: format!("non-finite {} cannot be stored in a JSON document", what),
    }
}

fn check_f32(v: f32) -> std::result::Result<f32, ProxyError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(non_finite("float"))
    }
}

fn check_f64(v: f64) -> std::result::Result<f64, ProxyError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(non_finite("double"))
    }
}

/// Convert a value into a tree, snapshotting views of other namespaces
pub fn to_node(value: &Value, root: &RootElement) -> Result<JsonNode> {
    let node = match value {
        Value::Null => JsonNode::Null,
        Value::Int(v) => JsonNode::Int(*v),
        Value::Float(v) => JsonNode::Float(check_f32(*v)?),
        Value::Double(v) => JsonNode::Double(check_f64(*v)?),
        Value::Char(v) => JsonNode::Char(*v),
        Value::Str(v) => JsonNode::Str(v.clone()),
        Value::Bool(v) => JsonNode::Bool(*v),
        Value::IntArray(v) => JsonNode::IntArray(v.clone()),
        Value::FloatArray(v) => JsonNode::FloatArray(
            v.iter().map(|f| check_f32(*f)).collect::<std::result::Result<_, _>>()?,
        ),
        Value::DoubleArray(v) => JsonNode::DoubleArray(
            v.iter().map(|f| check_f64(*f)).collect::<std::result::Result<_, _>>()?,
        ),
        Value::CharArray(v) => JsonNode::CharArray(v.clone()),
        Value::StrArray(v) => JsonNode::StrArray(v.clone()),
        Value::BoolArray(v) => JsonNode::BoolArray(v.clone()),
        Value::SqlMap(map) if map.root().same_namespace(root) => {
            JsonNode::MapRef(map.table_id().to_string())
        }
        Value::SqlMap(map) => {
            let mut entries = BTreeMap::new();
            for (key, item) in map.entries()? {
                entries.insert(key, to_node(&item, root)?);
            }
            JsonNode::Map(entries)
        }
        Value::SqlCollection(collection) if collection.root().same_namespace(root) => {
            JsonNode::CollectionRef(collection.table_id().to_string())
        }
        Value::SqlCollection(collection) => JsonNode::Collection(
            collection
                .to_vec()?
                .iter()
                .map(|item| to_node(item, root))
                .collect::<Result<_>>()?,
        ),
        Value::Map(map) => {
            let mut entries = BTreeMap::new();
            for (key, item) in map {
                entries.insert(key.clone(), to_node(item, root)?);
            }
            JsonNode::Map(entries)
        }
        Value::Collection(items) => JsonNode::Collection(
            items
                .iter()
                .map(|item| to_node(item, root))
                .collect::<Result<_>>()?,
        ),
        Value::Exception(_) => {
            return Err(ProxyError::UnknownElementType {
                type_name: value.type_name().to_string(),
            }
            .into())
        }
    };
    Ok(node)
}

/// Convert a tree back into a value, binding references against `root`
pub fn from_node(node: JsonNode, root: &RootElement) -> Result<Value> {
    let value = match node {
        JsonNode::Null => Value::Null,
        JsonNode::Int(v) => Value::Int(v),
        JsonNode::Float(v) => Value::Float(v),
        JsonNode::Double(v) => Value::Double(v),
        JsonNode::Char(v) => Value::Char(v),
        JsonNode::Str(v) => Value::Str(v),
        JsonNode::Bool(v) => Value::Bool(v),
        JsonNode::IntArray(v) => Value::IntArray(v),
        JsonNode::FloatArray(v) => Value::FloatArray(v),
        JsonNode::DoubleArray(v) => Value::DoubleArray(v),
        JsonNode::CharArray(v) => Value::CharArray(v),
        JsonNode::StrArray(v) => Value::StrArray(v),
        JsonNode::BoolArray(v) => Value::BoolArray(v),
        JsonNode::Map(entries) => {
            let mut map = BTreeMap::new();
            for (key, item) in entries {
                map.insert(key, from_node(item, root)?);
            }
            Value::Map(map)
        }
        JsonNode::Collection(items) => Value::Collection(
            items
                .into_iter()
                .map(|item| from_node(item, root))
                .collect::<Result<_>>()?,
        ),
        JsonNode::MapRef(id) => Value::SqlMap(root.bind_map(&TableId::parse(id)?)?),
        JsonNode::CollectionRef(id) => {
            Value::SqlCollection(root.bind_collection(&TableId::parse(id)?)?)
        }
    };
    Ok(value)
}

/// Serialize a generic map or collection document
pub fn encode_document(value: &Value, root: &RootElement) -> Result<String> {
    let node = to_node(value, root)?;
    Ok(serde_json::to_string(&node).map_err(ProxyError::from)?)
}

/// Parse a generic document stored under `tag`
pub fn decode_document(tag: TypeTag, raw: &str, root: &RootElement) -> Result<Value> {
    let node: JsonNode = serde_json::from_str(raw).map_err(|e| ProxyError::DecodeFailed {
        tag: tag.to_string(),
        reason: e.to_string(),
    })?;
    match (tag, &node) {
        (TypeTag::GenericMap, JsonNode::Map(_))
        | (TypeTag::GenericCollection, JsonNode::Collection(_)) => from_node(node, root),
        _ => Err(ProxyError::DecodeFailed {
            tag: tag.to_string(),
            reason: "document root does not match the stored type".to_string(),
        }
        .into()),
    }
}
