//! Runtime values that can be stored in element tables

use std::collections::BTreeMap;

use crate::views::{SqlCollection, SqlMap};

/// A value stored in a map or collection view
///
/// `SqlMap` / `SqlCollection` are live views bound to a table; `Map` /
/// `Collection` are detached in-memory structures. Equality on views
/// compares the bound table, not the contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
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
    SqlMap(SqlMap),
    SqlCollection(SqlCollection),
    Map(BTreeMap<String, Value>),
    Collection(Vec<Value>),
    /// Error payloads are recognised but cannot be persisted
    Exception(String),
}

impl Value {
    /// Short description of the runtime shape
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::IntArray(_) => "int[]",
            Value::FloatArray(_) => "float[]",
            Value::DoubleArray(_) => "double[]",
            Value::CharArray(_) => "char[]",
            Value::StrArray(_) => "string[]",
            Value::BoolArray(_) => "bool[]",
            Value::SqlMap(_) => "sql map",
            Value::SqlCollection(_) => "sql collection",
            Value::Map(_) => "map",
            Value::Collection(_) => "collection",
            Value::Exception(_) => "exception",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sql_map(&self) -> Option<&SqlMap> {
        match self {
            Value::SqlMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sql_collection(&self) -> Option<&SqlCollection> {
        match self {
            Value::SqlCollection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i32 => Int,
    f32 => Float,
    f64 => Double,
    char => Char,
    String => Str,
    bool => Bool,
    Vec<i32> => IntArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<char> => CharArray,
    Vec<String> => StrArray,
    Vec<bool> => BoolArray,
    SqlMap => SqlMap,
    SqlCollection => SqlCollection,
    BTreeMap<String, Value> => Map,
    Vec<Value> => Collection,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
