//! Page record sources
//!
//! The analyzer never reads the database file itself. Everything it knows
//! comes through [`PageRecordSource`]: the catalog of B-tree objects, the
//! page records of each object, and a handful of file-level scalars.

use crate::error::{Error, Result};
use crate::page::RawPageRecord;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Name of the schema catalog object
pub const DEFAULT_CATALOG_NAME: &str = "sqlite_master";

/// A table or index listed in the schema catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    /// Name of the table or index
    pub name: String,
    /// Table the object belongs to (equal to `name` for tables)
    pub owning_table_name: String,
}

impl SchemaObject {
    /// Catalog entry for a table
    pub fn table(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { owning_table_name: name.clone(), name }
    }

    /// Catalog entry for an index on `table`
    pub fn index(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self { name: name.into(), owning_table_name: table.into() }
    }

    /// Whether the object is an index
    pub fn is_index(&self) -> bool {
        self.name != self.owning_table_name
    }
}

/// How an index came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Explicit `CREATE INDEX`
    Create,
    /// Implied by a `UNIQUE` constraint
    Unique,
    /// Implied by a `PRIMARY KEY` constraint
    PrimaryKey,
}

impl FromStr for IndexOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(IndexOrigin::Create),
            "u" => Ok(IndexOrigin::Unique),
            "pk" => Ok(IndexOrigin::PrimaryKey),
            other => Err(Error::InvalidIndexOrigin(other.to_string())),
        }
    }
}

/// One entry of a table's index list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index name
    pub name: String,
    /// Where the index comes from
    pub origin: IndexOrigin,
}

/// Auto-vacuum setting of the database file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoVacuum {
    /// No pointer-map pages
    #[default]
    None,
    /// Full auto-vacuum on every commit
    Full,
    /// Vacuum on request
    Incremental,
}

impl AutoVacuum {
    /// Decode the numeric pragma value
    pub fn from_pragma(value: i64) -> Self {
        match value {
            1 => AutoVacuum::Full,
            2 => AutoVacuum::Incremental,
            _ => AutoVacuum::None,
        }
    }

    /// Whether pointer-map pages are present
    pub fn is_enabled(self) -> bool {
        self != AutoVacuum::None
    }
}

/// File-level scalars reported by the storage engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Bytes per page
    pub page_size: u64,
    /// Pages in the file, according to the header
    pub page_count: u64,
    /// Pages on the free list, according to the header
    pub freelist_count: u64,
    /// Auto-vacuum mode
    pub auto_vacuum: AutoVacuum,
    /// Size of the file on disk in bytes
    pub file_byte_size: u64,
}

/// Supplier of catalog, page geometry and file-level facts
///
/// Page records are pushed to a visitor one object at a time so that a
/// source backed by a large file never has to hold every record in memory.
pub trait PageRecordSource {
    /// All B-tree objects, including the synthetic catalog entry
    fn list_schema_objects(&self) -> Result<Vec<SchemaObject>>;

    /// Feed the page records of `name` to `visit`, in path order
    fn page_records_for_object(
        &self,
        name: &str,
        visit: &mut dyn FnMut(RawPageRecord),
    ) -> Result<()>;

    /// File-level scalars
    fn file_info(&self) -> Result<FileInfo>;

    /// Index list of `table`
    fn index_list(&self, table: &str) -> Result<Vec<IndexInfo>>;
}

/// Page record source held entirely in memory
///
/// Useful for fixtures and for feeding geometry captured elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    objects: Vec<SchemaObject>,
    pages: BTreeMap<String, Vec<RawPageRecord>>,
    indexes: BTreeMap<String, Vec<IndexInfo>>,
    info: FileInfo,
}

impl MemorySource {
    /// Create an empty source with the given file scalars
    pub fn new(info: FileInfo) -> Self {
        Self { info, ..Default::default() }
    }

    /// Register a catalog object
    pub fn add_object(&mut self, object: SchemaObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    /// Append a page record; the object must be registered separately
    pub fn add_page(&mut self, record: RawPageRecord) -> &mut Self {
        self.pages.entry(record.object_name.clone()).or_default().push(record);
        self
    }

    /// Add an entry to `table`'s index list
    pub fn add_index_info(&mut self, table: &str, info: IndexInfo) -> &mut Self {
        self.indexes.entry(table.to_string()).or_default().push(info);
        self
    }
}

impl PageRecordSource for MemorySource {
    fn list_schema_objects(&self) -> Result<Vec<SchemaObject>> {
        Ok(self.objects.clone())
    }

    fn page_records_for_object(
        &self,
        name: &str,
        visit: &mut dyn FnMut(RawPageRecord),
    ) -> Result<()> {
        if let Some(pages) = self.pages.get(name) {
            for page in pages {
                visit(page.clone());
            }
        }
        Ok(())
    }

    fn file_info(&self) -> Result<FileInfo> {
        Ok(self.info)
    }

    fn index_list(&self, table: &str) -> Result<Vec<IndexInfo>> {
        Ok(self.indexes.get(table).cloned().unwrap_or_default())
    }
}
