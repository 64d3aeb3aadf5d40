//! Map view over a map table
//!
//! Every call reads or writes the table; nothing is cached.

#![allow(clippy::result_large_err)]

use std::collections::{BTreeMap, HashMap, HashSet};

use sqlproxy_core_types::TableId;

use crate::codec::TableRow;
use crate::errors::Result;
use crate::model::Value;
use crate::root::RootElement;

/// String-keyed map stored in one `(name, type, value)` table
///
/// Two views are equal when they address the same table of the same
/// namespace.
#[derive(Clone)]
pub struct SqlMap {
    root: RootElement,
    table_id: TableId,
}

impl SqlMap {
    pub(crate) fn bind(root: RootElement, table_id: TableId) -> Self {
        Self { root, table_id }
    }

    /// Namespace this view belongs to
    pub fn root(&self) -> &RootElement {
        &self.root
    }

    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    pub fn len(&self) -> Result<usize> {
        self.root.live_gateway()?.row_count(&self.table_id)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.root.live_gateway()?.count_where_name(&self.table_id, key)? > 0)
    }

    /// Whether some entry stores exactly the encoded form of `value`
    pub fn contains_value(&self, value: &Value) -> Result<bool> {
        let row = TableRow::encode(None, value, &self.root)?;
        let found = self
            .root
            .live_gateway()?
            .count_where_encoded(&self.table_id, row.tag, &row.value)?;
        Ok(found > 0)
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.root.live_gateway()?.select_map_row(&self.table_id, key)? {
            Some(row) => Ok(Some(row.decode(&self.root)?)),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    ///
    /// Detached maps and maps of other namespaces are first copied into a
    /// new map table of this namespace; the stored entry then references
    /// that table. Later changes to the source are not seen. Returns the
    /// value as stored.
    ///
    /// The child table is created before the parent row is written. If
    /// writing the row fails, the child table stays behind.
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Result<Value> {
        let gateway = self.root.live_gateway()?;
        let value = self.adopt(value.into())?;
        let row = TableRow::encode(Some(key.to_string()), &value, &self.root)?;
        if gateway.count_where_name(&self.table_id, key)? > 0 {
            gateway.update_map_row(&self.table_id, &row)?;
        } else {
            gateway.insert_map_row(&self.table_id, &row)?;
        }
        Ok(value)
    }

    fn adopt(&self, value: Value) -> Result<Value> {
        let entries = match value {
            Value::Map(entries) => entries,
            Value::SqlMap(map) if !map.root.same_namespace(&self.root) => {
                map.entries()?.into_iter().collect()
            }
            other => return Ok(other),
        };
        let adopted = self.root.new_map()?;
        for (key, item) in entries {
            adopted.put(&key, item)?;
        }
        Ok(Value::SqlMap(adopted))
    }

    /// Delete the entry under `key`, returning what it held
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let previous = self.get(key)?;
        self.root.live_gateway()?.delete_where_name(&self.table_id, key)?;
        Ok(previous)
    }

    /// Replace the entries for every key of `entries`
    ///
    /// A key listed twice keeps its last value. Runs as bulk deletes of the
    /// listed keys followed by bulk inserts, each chunked to the bound
    /// parameter limit. Values are encoded as given; detached maps become
    /// generic documents rather than child tables. If an insert fails the
    /// deleted keys stay deleted.
    pub fn put_all<K, V, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let gateway = self.root.live_gateway()?;
        let latest: BTreeMap<String, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        if latest.is_empty() {
            return Ok(());
        }
        let mut keys = Vec::with_capacity(latest.len());
        let mut rows = Vec::with_capacity(latest.len());
        for (key, value) in latest {
            rows.push(TableRow::encode(Some(key.clone()), &value, &self.root)?);
            keys.push(key);
        }
        gateway.delete_where_names(&self.table_id, &keys)?;
        gateway.insert_map_rows(&self.table_id, &rows)?;
        Ok(())
    }

    pub fn keys(&self) -> Result<HashSet<String>> {
        Ok(self
            .root
            .live_gateway()?
            .select_names(&self.table_id)?
            .into_iter()
            .collect())
    }

    pub fn values(&self) -> Result<Vec<Value>> {
        self.root
            .live_gateway()?
            .select_map_rows(&self.table_id)?
            .iter()
            .map(|row| row.decode(&self.root))
            .collect()
    }

    pub fn entries(&self) -> Result<HashMap<String, Value>> {
        let mut entries = HashMap::new();
        for row in self.root.live_gateway()?.select_map_rows(&self.table_id)? {
            let value = row.decode(&self.root)?;
            if let Some(name) = row.name {
                entries.insert(name, value);
            }
        }
        Ok(entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.root.live_gateway()?.delete_all(&self.table_id)?;
        Ok(())
    }

    /// Read every entry into a detached, ordered map
    ///
    /// Nested views stay views; only this level is copied.
    pub fn to_btree(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self.entries()?.into_iter().collect())
    }
}

impl PartialEq for SqlMap {
    fn eq(&self, other: &Self) -> bool {
        self.table_id == other.table_id && self.root.same_namespace(&other.root)
    }
}

impl std::fmt::Debug for SqlMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMap")
            .field("table_id", &self.table_id)
            .finish()
    }
}
