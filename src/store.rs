//! Aggregate store of normalized per-object rows
//!
//! One row per table or index, appended once during analysis and never
//! modified afterwards. Rows are addressable by object name and grouped by
//! owning table; derived ratios are never stored here.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Raw per-object sums produced by the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRow {
    /// Name of the table or index
    pub name: String,
    /// Table the object belongs to
    pub owning_table_name: String,
    /// Whether the object is an index
    pub is_index: bool,
    /// Whether the object is a WITHOUT ROWID table
    pub is_without_rowid: bool,
    /// Entries in the B-tree
    pub entry_count: u64,
    /// Cells on leaf pages
    pub leaf_entry_count: u64,
    /// Payload bytes on all pages
    pub total_payload_bytes: u64,
    /// Payload bytes on overflow pages
    pub overflow_payload_bytes: u64,
    /// Entries that spill onto overflow pages
    pub overflow_cell_count: u64,
    /// Largest payload of any entry
    pub max_payload_bytes: u64,
    /// Internal pages
    pub internal_page_count: u64,
    /// Leaf pages
    pub leaf_page_count: u64,
    /// Overflow pages
    pub overflow_page_count: u64,
    /// Unused bytes on internal pages
    pub internal_unused_bytes: u64,
    /// Unused bytes on leaf pages
    pub leaf_unused_bytes: u64,
    /// Unused bytes on overflow pages
    pub overflow_unused_bytes: u64,
    /// Breaks in the leaf-level page sequence
    pub sequentiality_gap_count: u64,
    /// Bytes the object's pages occupy on disk
    pub on_disk_compressed_size: u64,
    /// Depth of the B-tree
    pub max_depth: u32,
}

impl ObjectRow {
    /// Pages of every type
    pub fn total_pages(&self) -> u64 {
        self.internal_page_count + self.leaf_page_count + self.overflow_page_count
    }
}

/// Which rows a statistics query covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A table together with all of its indices
    TableWithIndices(String),
    /// A table's own B-tree only
    TableOnly(String),
    /// A single index
    Index(String),
    /// Every table, including the schema catalog
    AllTables,
    /// Every index
    AllIndices,
    /// Every table and index
    Everything,
}

/// Append-only collection of object rows
#[derive(Debug, Clone, Default)]
pub struct AggregateStore {
    rows: Vec<ObjectRow>,
    by_name: HashMap<String, usize>,
    by_table: HashMap<String, Vec<usize>>,
}

impl AggregateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; a second row with an existing name is rejected
    pub fn insert(&mut self, row: ObjectRow) -> Result<()> {
        if self.by_name.contains_key(&row.name) {
            return Err(Error::Custom(format!("duplicate object in catalog: {}", row.name).into()));
        }
        let idx = self.rows.len();
        self.by_name.insert(row.name.clone(), idx);
        self.by_table.entry(row.owning_table_name.clone()).or_default().push(idx);
        self.rows.push(row);
        Ok(())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in insertion order
    pub fn rows(&self) -> &[ObjectRow] {
        &self.rows
    }

    /// Row for one object
    pub fn get(&self, name: &str) -> Option<&ObjectRow> {
        self.by_name.get(name).map(|&idx| &self.rows[idx])
    }

    /// Rows owned by `table`, the table itself included
    pub fn owned_by<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a ObjectRow> + 'a {
        self.by_table
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&idx| &self.rows[idx])
    }

    /// Rows matched by `selector`
    ///
    /// Named selectors fail with [`Error::UnknownObject`] when the name is
    /// not in the store, or names the wrong kind of object.
    pub fn select(&self, selector: &Selector) -> Result<Vec<&ObjectRow>> {
        match selector {
            Selector::TableWithIndices(table) => {
                self.expect_kind(table, false)?;
                Ok(self.owned_by(table).collect())
            }
            Selector::TableOnly(table) => Ok(vec![self.expect_kind(table, false)?]),
            Selector::Index(index) => Ok(vec![self.expect_kind(index, true)?]),
            Selector::AllTables => Ok(self.rows.iter().filter(|r| !r.is_index).collect()),
            Selector::AllIndices => Ok(self.rows.iter().filter(|r| r.is_index).collect()),
            Selector::Everything => Ok(self.rows.iter().collect()),
        }
    }

    fn expect_kind(&self, name: &str, is_index: bool) -> Result<&ObjectRow> {
        match self.get(name) {
            Some(row) if row.is_index == is_index => Ok(row),
            _ => Err(Error::UnknownObject(name.to_string())),
        }
    }
}
