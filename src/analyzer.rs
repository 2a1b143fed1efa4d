//! Space analyzer with builder pattern
//!
//! [`AnalyzerBuilder`] runs the single analysis pass: for every catalog
//! object it streams the object's page records through an
//! [`ObjectExtractor`] and appends the resulting row to the
//! [`AggregateStore`]. The finished [`SpaceAnalyzer`] is read-only; every
//! statistics query recomputes its ratios from the stored sums.

use crate::dump;
use crate::error::{Error, Result};
use crate::estimate::{self, FreelistCheck};
use crate::extract::ObjectExtractor;
use crate::metrics::{percentage, SpaceStats};
use crate::page::RawPageRecord;
use crate::preflight;
use crate::source::{FileInfo, PageRecordSource, DEFAULT_CATALOG_NAME};
use crate::sqlite::SqliteSource;
use crate::store::{AggregateStore, ObjectRow, Selector};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, info_span, warn};

/// Name prefix of indices created implicitly for constraints
pub const AUTOINDEX_PREFIX: &str = "sqlite_autoindex";

/// Builder for creating analyzers
#[derive(Debug, Clone)]
pub struct AnalyzerBuilder {
    catalog_name: String,
    verify_header: bool,
}

impl AnalyzerBuilder {
    /// Create a new analyzer builder
    pub fn new() -> Self {
        Self { catalog_name: DEFAULT_CATALOG_NAME.to_string(), verify_header: true }
    }

    /// Set the name the schema catalog is reported under
    ///
    /// The name must not be used by a table or index in the file; such a
    /// collision fails the analysis with [`Error::CatalogNameCollision`].
    pub fn catalog_name(mut self, name: impl Into<String>) -> Self {
        self.catalog_name = name.into();
        self
    }

    /// Check the file header before handing the file to the engine
    pub fn verify_header(mut self, enabled: bool) -> Self {
        self.verify_header = enabled;
        self
    }

    /// Open a database file and analyse it
    pub fn open(self, path: impl AsRef<Path>) -> Result<SpaceAnalyzer> {
        let path = path.as_ref();
        if self.verify_header {
            let header = preflight::check_file(path)?;
            debug!(path = %path.display(), page_size = header.page_size, "header preflight passed");
        }
        let source = SqliteSource::open_with_catalog_name(path, &self.catalog_name)?;
        self.build(&source)
    }

    /// Analyse every object `source` lists
    pub fn build<S: PageRecordSource + ?Sized>(self, source: &S) -> Result<SpaceAnalyzer> {
        let _span = info_span!("analyze").entered();

        let info = source.file_info()?;
        let objects = source.list_schema_objects()?;
        if objects.iter().filter(|o| o.name == self.catalog_name).count() > 1 {
            return Err(Error::CatalogNameCollision(self.catalog_name));
        }
        let in_catalog: HashSet<&str> = objects.iter().map(|o| o.name.as_str()).collect();

        let mut store = AggregateStore::new();
        for object in &objects {
            let without_rowid = if object.is_index() {
                false
            } else {
                match source.index_list(&object.name) {
                    Ok(list) => estimate::is_without_rowid(&list, |name| in_catalog.contains(name)),
                    Err(err) => {
                        warn!(table = %object.name, %err, "index list unavailable, assuming rowid table");
                        false
                    }
                }
            };

            let mut extractor = ObjectExtractor::new(object, without_rowid);
            source.page_records_for_object(&object.name, &mut |record: RawPageRecord| {
                extractor.push(&record)
            })?;
            let row = extractor.finish();

            if row.total_pages() == 0 {
                warn!(object = %row.name, "object has no pages");
            }
            debug!(
                object = %row.name,
                pages = row.total_pages(),
                entries = row.entry_count,
                depth = row.max_depth,
                gaps = row.sequentiality_gap_count,
                "extracted object"
            );
            store.insert(row)?;
        }

        if store.is_empty() {
            warn!("source listed no objects");
        }
        let analyzer = SpaceAnalyzer { store, info, catalog_name: self.catalog_name };

        let check = analyzer.freelist_check();
        if !check.is_consistent() {
            warn!(%check, "free-list count disagrees with page accounting");
        }
        info!(
            objects = analyzer.store.len(),
            in_use_pages = analyzer.in_use_pages(),
            page_count = info.page_count,
            "analysis complete"
        );

        Ok(analyzer)
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pages used by one table and its indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUsage {
    /// Table name
    pub name: String,
    /// Objects (the table plus its indices)
    pub object_count: u64,
    /// Pages across those objects
    pub pages: u64,
}

/// Read-only space usage statistics for one database file
#[derive(Debug, Clone)]
pub struct SpaceAnalyzer {
    store: AggregateStore,
    info: FileInfo,
    catalog_name: String,
}

static_assertions::assert_impl_all!(SpaceAnalyzer: Send, Sync);

impl SpaceAnalyzer {
    /// Open and analyse a database file with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        AnalyzerBuilder::new().open(path)
    }

    /// Analyse an arbitrary page record source with default settings
    pub fn from_source<S: PageRecordSource + ?Sized>(source: &S) -> Result<Self> {
        AnalyzerBuilder::new().build(source)
    }

    /// Statistics for the rows matched by `selector`
    pub fn stats(&self, selector: &Selector) -> Result<SpaceStats> {
        let rows = self.store.select(selector)?;
        Ok(SpaceStats::compute(rows, self.info.page_size, self.info.page_count))
    }

    /// Statistics for a table, with or without its indices
    pub fn table_stats(&self, table: &str, exclude_indices: bool) -> Result<SpaceStats> {
        let selector = if exclude_indices {
            Selector::TableOnly(table.to_string())
        } else {
            Selector::TableWithIndices(table.to_string())
        };
        self.stats(&selector)
    }

    /// Statistics for one index
    pub fn index_stats(&self, index: &str) -> Result<SpaceStats> {
        self.stats(&Selector::Index(index.to_string()))
    }

    /// Statistics for everything, or for all tables when `exclude_indices`
    pub fn global_stats(&self, exclude_indices: bool) -> SpaceStats {
        let rows = self.store.rows().iter().filter(|r| !(exclude_indices && r.is_index));
        SpaceStats::compute(rows, self.info.page_size, self.info.page_count)
    }

    /// Statistics for all indices together
    pub fn indices_stats(&self) -> SpaceStats {
        let rows = self.store.rows().iter().filter(|r| r.is_index);
        SpaceStats::compute(rows, self.info.page_size, self.info.page_count)
    }

    /// Raw row of one object
    pub fn object(&self, name: &str) -> Option<&ObjectRow> {
        self.store.get(name)
    }

    /// The underlying store
    pub fn store(&self) -> &AggregateStore {
        &self.store
    }

    /// File-level scalars captured at construction
    pub fn file_info(&self) -> &FileInfo {
        &self.info
    }

    /// Name the schema catalog is reported under
    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    /// Bytes per page
    pub fn page_size(&self) -> u64 {
        self.info.page_size
    }

    /// Pages in the file according to the header
    pub fn page_count(&self) -> u64 {
        self.info.page_count
    }

    /// Pages on the free list according to the header
    pub fn freelist_count(&self) -> u64 {
        self.info.freelist_count
    }

    /// Size of the file on disk
    pub fn file_size(&self) -> u64 {
        self.info.file_byte_size
    }

    /// Size the file would have uncompressed
    pub fn logical_file_size(&self) -> u64 {
        self.info.page_count * self.info.page_size
    }

    /// Objects analysed, the schema catalog included
    pub fn item_count(&self) -> usize {
        self.store.len()
    }

    /// Pages belonging to some table or index
    pub fn in_use_pages(&self) -> u64 {
        self.store.rows().iter().map(ObjectRow::total_pages).sum()
    }

    /// In-use pages as a share of the file
    pub fn in_use_percent(&self) -> f64 {
        percentage(self.in_use_pages() as f64, self.page_count() as f64)
    }

    /// Pointer-map pages of an auto-vacuum file
    pub fn autovacuum_page_count(&self) -> u64 {
        estimate::autovacuum_overhead_pages(
            self.info.auto_vacuum,
            self.info.page_size,
            self.info.page_count,
        )
    }

    /// Free pages implied by page accounting
    pub fn calculated_free_pages(&self) -> i64 {
        self.freelist_check().calculated
    }

    /// Page count implied by in-use, free and pointer-map pages
    pub fn calculated_page_count(&self) -> u64 {
        self.in_use_pages() + self.freelist_count() + self.autovacuum_page_count()
    }

    /// Header free-list count against page accounting
    pub fn freelist_check(&self) -> FreelistCheck {
        FreelistCheck::new(
            self.page_count(),
            self.in_use_pages(),
            self.autovacuum_page_count(),
            self.freelist_count(),
        )
    }

    /// Table names, sorted
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> =
            self.store.rows().iter().filter(|r| !r.is_index).map(|r| r.name.as_str()).collect();
        tables.sort_unstable();
        tables
    }

    /// Index rows in catalog order
    pub fn indices(&self) -> Vec<&ObjectRow> {
        self.store.rows().iter().filter(|r| r.is_index).collect()
    }

    /// Indices of `table`, sorted by name
    pub fn indices_of(&self, table: &str) -> Vec<&ObjectRow> {
        let mut indices: Vec<&ObjectRow> = self.store.owned_by(table).filter(|r| r.is_index).collect();
        indices.sort_by(|a, b| a.name.cmp(&b.name));
        indices
    }

    /// Tables, the schema catalog included
    pub fn ntable(&self) -> usize {
        self.store.rows().iter().filter(|r| !r.is_index).count()
    }

    /// Indices of any origin
    pub fn nindex(&self) -> usize {
        self.indices().len()
    }

    /// Indices created implicitly for constraints
    pub fn nautoindex(&self) -> usize {
        self.indices().iter().filter(|r| r.name.starts_with(AUTOINDEX_PREFIX)).count()
    }

    /// Indices created with an explicit statement
    pub fn nmanindex(&self) -> usize {
        self.nindex() - self.nautoindex()
    }

    /// User payload: tables only, the schema catalog excluded
    pub fn payload_size(&self) -> u64 {
        self.store
            .rows()
            .iter()
            .filter(|r| !r.is_index && r.name != self.catalog_name)
            .map(|r| r.total_payload_bytes)
            .sum()
    }

    /// Whether the file as a whole appears compressed below the page layer
    pub fn is_compressed(&self) -> bool {
        self.global_stats(false).is_compressed
    }

    /// Pages per table (indices included), largest first
    pub fn table_space_usage(&self) -> Vec<TableUsage> {
        let mut grouped: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        for row in self.store.rows() {
            let entry = grouped.entry(row.owning_table_name.as_str()).or_default();
            entry.0 += 1;
            entry.1 += row.total_pages();
        }
        let mut usage: Vec<TableUsage> = grouped
            .into_iter()
            .map(|(name, (object_count, pages))| TableUsage {
                name: name.to_string(),
                object_count,
                pages,
            })
            .collect();
        usage.sort_by(|a, b| b.pages.cmp(&a.pages).then_with(|| a.name.cmp(&b.name)));
        usage
    }

    /// Pages of one table and its indices
    pub fn table_usage(&self, table: &str) -> Option<TableUsage> {
        let mut rows = self.store.owned_by(table).peekable();
        rows.peek()?;
        let (object_count, pages) =
            rows.fold((0, 0), |(count, pages), row| (count + 1, pages + row.total_pages()));
        Some(TableUsage { name: table.to_string(), object_count, pages })
    }

    /// Pages of a table, optionally without its indices
    pub fn table_page_count(&self, table: &str, exclude_indices: bool) -> Result<u64> {
        Ok(self.table_stats(table, exclude_indices)?.total_pages)
    }

    /// Pages of one index
    pub fn index_page_count(&self, index: &str) -> Result<u64> {
        self.store
            .get(index)
            .filter(|r| r.is_index)
            .map(ObjectRow::total_pages)
            .ok_or_else(|| Error::UnknownObject(index.to_string()))
    }

    /// SQL statements recreating the per-object table
    pub fn dump_sql(&self) -> Vec<String> {
        dump::dump_rows(self.store.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageNumber;
    use crate::page::PageType;
    use crate::source::{AutoVacuum, IndexInfo, IndexOrigin, MemorySource, SchemaObject};

    fn page(object: &str, number: u64, page_type: PageType, path: &str) -> RawPageRecord {
        RawPageRecord {
            object_name: object.into(),
            page_number: PageNumber(number),
            page_type,
            cell_count: if page_type == PageType::Overflow { 0 } else { 10 },
            payload_bytes: 500,
            unused_bytes: 100,
            max_cell_payload: 80,
            structural_path: path.into(),
            page_size_on_disk: 1024,
        }
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new(FileInfo {
            page_size: 1024,
            page_count: 10,
            freelist_count: 2,
            auto_vacuum: AutoVacuum::None,
            file_byte_size: 10 * 1024,
        });
        source
            .add_object(SchemaObject::table("t1"))
            .add_object(SchemaObject::index("t1_a", "t1"))
            .add_object(SchemaObject::index("sqlite_autoindex_t1_1", "t1"))
            .add_object(SchemaObject::table("t2"))
            .add_object(SchemaObject::table("sqlite_master"))
            .add_page(page("sqlite_master", 1, PageType::Leaf, "/"))
            .add_page(page("t1", 2, PageType::Internal, "/"))
            .add_page(page("t1", 3, PageType::Leaf, "/000/"))
            .add_page(page("t1", 5, PageType::Leaf, "/001/"))
            .add_page(page("t1_a", 4, PageType::Leaf, "/"))
            .add_page(page("sqlite_autoindex_t1_1", 6, PageType::Leaf, "/"))
            .add_page(page("t2", 7, PageType::Leaf, "/"))
            .add_page(page("t2", 8, PageType::Overflow, "/000+000000"))
            .add_index_info("t1", IndexInfo { name: "t1_a".into(), origin: IndexOrigin::Create })
            .add_index_info(
                "t1",
                IndexInfo { name: "sqlite_autoindex_t1_1".into(), origin: IndexOrigin::PrimaryKey },
            );
        source
    }

    /// Delegates to a [`MemorySource`] but cannot list one table's indices
    struct FailingIndexList {
        inner: MemorySource,
        table: &'static str,
    }

    impl PageRecordSource for FailingIndexList {
        fn list_schema_objects(&self) -> Result<Vec<SchemaObject>> {
            self.inner.list_schema_objects()
        }

        fn page_records_for_object(
            &self,
            name: &str,
            visit: &mut dyn FnMut(RawPageRecord),
        ) -> Result<()> {
            self.inner.page_records_for_object(name, visit)
        }

        fn file_info(&self) -> Result<FileInfo> {
            self.inner.file_info()
        }

        fn index_list(&self, table: &str) -> Result<Vec<IndexInfo>> {
            if table == self.table {
                return Err(Error::Sqlite("no such table".into()));
            }
            self.inner.index_list(table)
        }
    }

    #[test]
    fn test_build_populates_store() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        assert_eq!(analyzer.item_count(), 5);
        assert_eq!(analyzer.in_use_pages(), 8);
        assert_eq!(analyzer.tables(), vec!["sqlite_master", "t1", "t2"]);
        assert_eq!(analyzer.ntable(), 3);
        assert_eq!(analyzer.nindex(), 2);
        assert_eq!(analyzer.nautoindex(), 1);
        assert_eq!(analyzer.nmanindex(), 1);
    }

    #[test]
    fn test_pk_index_in_catalog_is_rowid_table() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        assert!(!analyzer.object("t1").unwrap().is_without_rowid);
    }

    #[test]
    fn test_pk_index_missing_from_catalog_is_without_rowid() {
        let mut source = source();
        source.add_index_info(
            "t2",
            IndexInfo { name: "sqlite_autoindex_t2_1".into(), origin: IndexOrigin::PrimaryKey },
        );
        let analyzer = SpaceAnalyzer::from_source(&source).unwrap();
        assert!(analyzer.object("t2").unwrap().is_without_rowid);
    }

    #[test]
    fn test_missing_index_list_means_rowid_table() {
        let mut inner = source();
        // Would mark t2 WITHOUT ROWID if the list were readable.
        inner.add_index_info(
            "t2",
            IndexInfo { name: "sqlite_autoindex_t2_1".into(), origin: IndexOrigin::PrimaryKey },
        );
        let source = FailingIndexList { inner, table: "t2" };

        let analyzer = AnalyzerBuilder::new().build(&source).unwrap();
        let t2 = analyzer.object("t2").unwrap();
        assert!(!t2.is_without_rowid);
        assert_eq!(t2.entry_count, 10);
        assert_eq!(analyzer.item_count(), 5);
    }

    #[test]
    fn test_catalog_name_collision_is_rejected() {
        let mut source = source();
        source.add_object(SchemaObject::table("t1"));
        let err = AnalyzerBuilder::new().catalog_name("t1").build(&source).unwrap_err();
        assert!(matches!(err, Error::CatalogNameCollision(name) if name == "t1"));
    }

    #[test]
    fn test_empty_source_gives_empty_analyzer() {
        let source =
            MemorySource::new(FileInfo { page_size: 4096, page_count: 1, ..Default::default() });
        let analyzer = SpaceAnalyzer::from_source(&source).unwrap();
        assert_eq!(analyzer.item_count(), 0);
        assert!(analyzer.store().is_empty());
        assert_eq!(analyzer.stats(&Selector::Everything).unwrap(), SpaceStats::default());
    }

    #[test]
    fn test_freelist_cross_check() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        assert_eq!(analyzer.autovacuum_page_count(), 0);
        assert_eq!(analyzer.calculated_free_pages(), 2);
        assert!(analyzer.freelist_check().is_consistent());
        assert_eq!(analyzer.calculated_page_count(), 10);
    }

    #[test]
    fn test_table_space_usage_order() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        let usage = analyzer.table_space_usage();
        let names: Vec<&str> = usage.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "t2", "sqlite_master"]);
        assert_eq!(usage[0], TableUsage { name: "t1".into(), object_count: 3, pages: 5 });
        assert_eq!(analyzer.table_usage("t2").unwrap().pages, 2);
        assert!(analyzer.table_usage("nope").is_none());
    }

    #[test]
    fn test_page_counts() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        assert_eq!(analyzer.table_page_count("t1", false).unwrap(), 5);
        assert_eq!(analyzer.table_page_count("t1", true).unwrap(), 3);
        assert_eq!(analyzer.index_page_count("t1_a").unwrap(), 1);
        assert!(matches!(analyzer.index_page_count("t1"), Err(Error::UnknownObject(_))));
    }

    #[test]
    fn test_payload_excludes_indices_and_catalog() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        // t1: three pages, t2: two pages, 500 bytes each
        assert_eq!(analyzer.payload_size(), 2500);
    }

    #[test]
    fn test_indices_of_sorted() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        let names: Vec<&str> = analyzer.indices_of("t1").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sqlite_autoindex_t1_1", "t1_a"]);
        assert!(analyzer.indices_of("t2").is_empty());
    }

    #[test]
    fn test_global_stats_match_selectors() {
        let analyzer = SpaceAnalyzer::from_source(&source()).unwrap();
        assert_eq!(analyzer.global_stats(false), analyzer.stats(&Selector::Everything).unwrap());
        assert_eq!(analyzer.global_stats(true), analyzer.stats(&Selector::AllTables).unwrap());
        assert_eq!(analyzer.indices_stats(), analyzer.stats(&Selector::AllIndices).unwrap());
        assert!(!analyzer.is_compressed());
    }
}
