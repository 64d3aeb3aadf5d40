//! Value codec
//!
//! Maps every [`Value`] to a `(TypeTag, String)` pair and back:
//!
//! - scalars use their natural string form; null is stored as `(null)`
//! - primitive arrays are opaque base64 payloads ([`array`])
//! - maps and collections owned by the namespace are stored as their table
//!   identifier and decoded by binding a view, without reading the table
//! - any other map or collection is stored as a JSON document ([`json`])
//! - exceptions are refused
//!
//! `decode(root, classify(v, root), &encode(v, root)?)` reconstructs `v`.

pub mod array;
pub mod json;
pub mod row;

pub use row::TableRow;

use sqlproxy_core_types::TableId;

use crate::errors::{ProxyError, Result};
use crate::model::{TypeTag, Value};
use crate::root::RootElement;

/// Stored form of [`Value::Null`]
pub const NULL_MARKER: &str = "(null)";

/// Derive the storage tag of a value
///
/// Views count as references only when they belong to `root`'s namespace.
pub fn classify(value: &Value, root: &RootElement) -> TypeTag {
    match value {
        Value::Null => TypeTag::Null,
        Value::Int(_) => TypeTag::Int,
        Value::Float(_) => TypeTag::Float,
        Value::Double(_) => TypeTag::Double,
        Value::Char(_) => TypeTag::Char,
        Value::Str(_) => TypeTag::Str,
        Value::Bool(_) => TypeTag::Bool,
        Value::IntArray(_) => TypeTag::IntArray,
        Value::FloatArray(_) => TypeTag::FloatArray,
        Value::DoubleArray(_) => TypeTag::DoubleArray,
        Value::CharArray(_) => TypeTag::CharArray,
        Value::StrArray(_) => TypeTag::StrArray,
        Value::BoolArray(_) => TypeTag::BoolArray,
        Value::SqlMap(map) if map.root().same_namespace(root) => TypeTag::SqlMap,
        Value::SqlCollection(c) if c.root().same_namespace(root) => TypeTag::SqlCollection,
        Value::SqlMap(_) | Value::Map(_) => TypeTag::GenericMap,
        Value::SqlCollection(_) | Value::Collection(_) => TypeTag::GenericCollection,
        Value::Exception(_) => TypeTag::Exception,
    }
}

/// Encode a value into its stored string
pub fn encode(value: &Value, root: &RootElement) -> Result<String> {
    let encoded = match value {
        Value::Null => NULL_MARKER.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::Str(v) => v.clone(),
        Value::Bool(v) => v.to_string(),
        Value::IntArray(v) => array::encode_array(v)?,
        Value::FloatArray(v) => array::encode_array(v)?,
        Value::DoubleArray(v) => array::encode_array(v)?,
        Value::CharArray(v) => array::encode_array(v)?,
        Value::StrArray(v) => array::encode_array(v)?,
        Value::BoolArray(v) => array::encode_array(v)?,
        Value::SqlMap(map) if map.root().same_namespace(root) => map.table_id().to_string(),
        Value::SqlCollection(c) if c.root().same_namespace(root) => c.table_id().to_string(),
        Value::SqlMap(_) | Value::Map(_) | Value::SqlCollection(_) | Value::Collection(_) => {
            json::encode_document(value, root)?
        }
        Value::Exception(_) => {
            return Err(ProxyError::UnknownElementType {
                type_name: value.type_name().to_string(),
            }
            .into())
        }
    };
    Ok(encoded)
}

fn parse_scalar<T: std::str::FromStr>(tag: TypeTag, raw: &str) -> std::result::Result<T, ProxyError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ProxyError::DecodeFailed {
        tag: tag.to_string(),
        reason: format!("'{}': {}", raw, e),
    })
}

fn decode_char(raw: &str) -> std::result::Result<char, ProxyError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ProxyError::DecodeFailed {
            tag: TypeTag::Char.to_string(),
            reason: format!("expected exactly one character, got '{}'", raw),
        }),
    }
}

fn decode_bool(raw: &str) -> std::result::Result<bool, ProxyError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ProxyError::DecodeFailed {
            tag: TypeTag::Bool.to_string(),
            reason: format!("expected 'true' or 'false', got '{}'", raw),
        }),
    }
}

/// Decode a stored string for its tag
///
/// Reference tags bind a view to `root`; the referenced table is not read.
pub fn decode(root: &RootElement, tag: TypeTag, raw: &str) -> Result<Value> {
    let value = match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Int => Value::Int(parse_scalar(tag, raw)?),
        TypeTag::Float => Value::Float(parse_scalar(tag, raw)?),
        TypeTag::Double => Value::Double(parse_scalar(tag, raw)?),
        TypeTag::Char => Value::Char(decode_char(raw)?),
        TypeTag::Str => Value::Str(raw.to_string()),
        TypeTag::Bool => Value::Bool(decode_bool(raw)?),
        TypeTag::IntArray => Value::IntArray(array::decode_array(tag, raw)?),
        TypeTag::FloatArray => Value::FloatArray(array::decode_array(tag, raw)?),
        TypeTag::DoubleArray => Value::DoubleArray(array::decode_array(tag, raw)?),
        TypeTag::CharArray => Value::CharArray(array::decode_array(tag, raw)?),
        TypeTag::StrArray => Value::StrArray(array::decode_array(tag, raw)?),
        TypeTag::BoolArray => Value::BoolArray(array::decode_array(tag, raw)?),
        TypeTag::SqlMap => Value::SqlMap(root.bind_map(&reference(tag, raw)?)?),
        TypeTag::SqlCollection => {
            Value::SqlCollection(root.bind_collection(&reference(tag, raw)?)?)
        }
        TypeTag::GenericMap | TypeTag::GenericCollection => {
            json::decode_document(tag, raw, root)?
        }
        TypeTag::Exception => {
            return Err(ProxyError::UnknownElementType {
                type_name: tag.to_string(),
            }
            .into())
        }
    };
    Ok(value)
}

fn reference(tag: TypeTag, raw: &str) -> std::result::Result<TableId, ProxyError> {
    TableId::parse(raw).map_err(|e| ProxyError::DecodeFailed {
        tag: tag.to_string(),
        reason: e.to_string(),
    })
}
