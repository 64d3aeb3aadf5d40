//! Encoded table rows

use crate::errors::{ProxyError, Result};
use crate::model::{TypeTag, Value};
use crate::query::{ColumnType, ResultShape, Row};
use crate::root::RootElement;

/// One stored row: optional key (map tables only), type tag, payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub name: Option<String>,
    pub tag: TypeTag,
    pub value: String,
}

impl TableRow {
    /// Encode a value for storage in `root`'s namespace
    pub fn encode(name: Option<String>, value: &Value, root: &RootElement) -> Result<Self> {
        let tag = super::classify(value, root);
        let value = super::encode(value, root)?;
        Ok(Self { name, tag, value })
    }

    /// Read a row returned by a map or collection table query
    pub fn from_row(row: &Row) -> std::result::Result<Self, ProxyError> {
        let name = match row.get("name") {
            Some(_) => row.optional_text("name")?,
            None => None,
        };
        let tag = TypeTag::from_code(row.integer("type")?)?;
        let value = row.text("value")?;
        Ok(Self { name, tag, value })
    }

    /// Decode the payload, binding references against `root`
    pub fn decode(&self, root: &RootElement) -> Result<Value> {
        super::decode(root, self.tag, &self.value)
    }

    /// Shape of a full map table row
    pub fn map_shape() -> ResultShape {
        ResultShape::new()
            .column("name", ColumnType::Text)
            .column("type", ColumnType::Integer)
            .column("value", ColumnType::Text)
    }

    /// Shape of a full collection table row
    pub fn collection_shape() -> ResultShape {
        ResultShape::new()
            .column("type", ColumnType::Integer)
            .column("value", ColumnType::Text)
    }
}
