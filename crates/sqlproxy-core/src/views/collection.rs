//! Collection view over a collection table
//!
//! The table is a bag: duplicates are kept and row order is whatever the
//! database returns. Equality of elements is equality of their encoded
//! `(type, value)` pair.

#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use sqlproxy_core_types::TableId;

use crate::codec::TableRow;
use crate::errors::Result;
use crate::model::{TypeTag, Value};
use crate::root::RootElement;

/// Unordered multiset stored in one `(type, value)` table
#[derive(Clone)]
pub struct SqlCollection {
    root: RootElement,
    table_id: TableId,
}

impl SqlCollection {
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

    fn encode(&self, value: &Value) -> Result<(TypeTag, String)> {
        let row = TableRow::encode(None, value, &self.root)?;
        Ok((row.tag, row.value))
    }

    pub fn len(&self) -> Result<usize> {
        self.root.live_gateway()?.row_count(&self.table_id)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append one element; always inserts
    pub fn add(&self, value: impl Into<Value>) -> Result<()> {
        let gateway = self.root.live_gateway()?;
        let row = TableRow::encode(None, &value.into(), &self.root)?;
        gateway.insert_collection_row(&self.table_id, &row)?;
        Ok(())
    }

    /// Append every element with bulk inserts chunked to the bound parameter limit
    pub fn add_all<V, I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rows = values
            .into_iter()
            .map(|v| TableRow::encode(None, &v.into(), &self.root))
            .collect::<Result<Vec<_>>>()?;
        self.root
            .live_gateway()?
            .insert_collection_rows(&self.table_id, &rows)?;
        Ok(())
    }

    /// Delete one occurrence of `value`; returns whether one was found
    pub fn remove(&self, value: &Value) -> Result<bool> {
        let (tag, encoded) = self.encode(value)?;
        let deleted = self
            .root
            .live_gateway()?
            .delete_one_encoded(&self.table_id, tag, &encoded)?;
        Ok(deleted > 0)
    }

    pub fn contains(&self, value: &Value) -> Result<bool> {
        let (tag, encoded) = self.encode(value)?;
        let found = self
            .root
            .live_gateway()?
            .count_where_encoded(&self.table_id, tag, &encoded)?;
        Ok(found > 0)
    }

    pub fn contains_all(&self, values: &[Value]) -> Result<bool> {
        self.root.live_gateway()?;
        for value in values {
            if !self.contains(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Delete every occurrence of each given value
    ///
    /// Returns whether the collection changed.
    pub fn remove_all(&self, values: &[Value]) -> Result<bool> {
        let gateway = self.root.live_gateway()?;
        let mut deleted = 0;
        for value in values {
            let (tag, encoded) = self.encode(value)?;
            deleted += gateway.delete_all_encoded(&self.table_id, tag, &encoded)?;
        }
        Ok(deleted > 0)
    }

    /// Delete every element not among `values`
    ///
    /// Returns whether the collection changed.
    pub fn retain_all(&self, values: &[Value]) -> Result<bool> {
        let mut keep = Vec::with_capacity(values.len());
        let mut seen = HashSet::new();
        for value in values {
            let pair = self.encode(value)?;
            if seen.insert(pair.clone()) {
                keep.push(pair);
            }
        }
        let deleted = self
            .root
            .live_gateway()?
            .delete_except_encoded(&self.table_id, &keep)?;
        Ok(deleted > 0)
    }

    pub fn clear(&self) -> Result<()> {
        self.root.live_gateway()?.delete_all(&self.table_id)?;
        Ok(())
    }

    /// Read the table once and iterate over the snapshot
    ///
    /// Elements are decoded lazily; later writes are not seen.
    pub fn iter(&self) -> Result<SnapshotIter> {
        let rows = self.root.live_gateway()?.select_collection_rows(&self.table_id)?;
        Ok(SnapshotIter {
            root: self.root.clone(),
            rows: rows.into_iter(),
        })
    }

    /// Read every element into a detached vector
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter()?.collect()
    }
}

/// One-shot, read-only cursor over a materialized collection
pub struct SnapshotIter {
    root: RootElement,
    rows: std::vec::IntoIter<TableRow>,
}

impl SnapshotIter {
    /// Elements not yet yielded
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for SnapshotIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.decode(&self.root))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl PartialEq for SqlCollection {
    fn eq(&self, other: &Self) -> bool {
        self.table_id == other.table_id && self.root.same_namespace(&other.root)
    }
}

impl std::fmt::Debug for SqlCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCollection")
            .field("table_id", &self.table_id)
            .finish()
    }
}
