//! Per-object extraction
//!
//! Folds the page records of one B-tree object into a single
//! [`ObjectRow`]. Records are consumed one at a time; only the leaf page
//! numbers are kept until [`ObjectExtractor::finish`], where they are
//! sorted to count physical gaps in the leaf level.

use crate::error::PageNumber;
use crate::page::{PageType, RawPageRecord};
use crate::source::SchemaObject;
use crate::store::ObjectRow;

/// Accumulates page records for one object
#[derive(Debug)]
pub struct ObjectExtractor {
    row: ObjectRow,
    all_cells: u64,
    leaf_pages: Vec<PageNumber>,
}

impl ObjectExtractor {
    /// Start extracting `object`
    pub fn new(object: &SchemaObject, is_without_rowid: bool) -> Self {
        let row = ObjectRow {
            name: object.name.clone(),
            owning_table_name: object.owning_table_name.clone(),
            is_index: object.is_index(),
            is_without_rowid,
            ..Default::default()
        };
        Self { row, all_cells: 0, leaf_pages: Vec::new() }
    }

    /// Fold one page record into the row
    pub fn push(&mut self, record: &RawPageRecord) {
        let row = &mut self.row;

        self.all_cells += record.cell_count;
        row.total_payload_bytes += record.payload_bytes;
        row.max_payload_bytes = row.max_payload_bytes.max(record.max_cell_payload);
        row.on_disk_compressed_size += record.page_size_on_disk;

        match record.page_type {
            PageType::Internal => {
                row.internal_page_count += 1;
                row.internal_unused_bytes += record.unused_bytes;
            }
            PageType::Leaf => {
                row.leaf_page_count += 1;
                row.leaf_unused_bytes += record.unused_bytes;
                row.leaf_entry_count += record.cell_count;
                self.leaf_pages.push(record.page_number);
            }
            PageType::Overflow => {
                row.overflow_page_count += 1;
                row.overflow_unused_bytes += record.unused_bytes;
                row.overflow_payload_bytes += record.payload_bytes;
            }
        }

        if record.starts_overflow_chain() {
            row.overflow_cell_count += 1;
        }
        if let Some(depth) = record.depth() {
            row.max_depth = row.max_depth.max(depth);
        }
    }

    /// Finish the object and produce its row
    pub fn finish(mut self) -> ObjectRow {
        // Internal cells of a rowid table only route; every other kind of
        // tree stores an entry in each cell.
        self.row.entry_count = if self.row.is_index || self.row.is_without_rowid {
            self.all_cells
        } else {
            self.row.leaf_entry_count
        };

        self.leaf_pages.sort_unstable();
        self.row.sequentiality_gap_count = count_gaps(&self.leaf_pages);
        self.row
    }
}

/// Extract a row from an in-memory sequence of records
pub fn extract_object<'a, I>(object: &SchemaObject, is_without_rowid: bool, records: I) -> ObjectRow
where
    I: IntoIterator<Item = &'a RawPageRecord>,
{
    let mut extractor = ObjectExtractor::new(object, is_without_rowid);
    for record in records {
        extractor.push(record);
    }
    extractor.finish()
}

/// Count breaks in an ascending run of leaf page numbers
///
/// Page 0 acts as the "nothing visited yet" sentinel, so neither the first
/// page nor a page following a 0 is charged a gap.
pub fn count_gaps(sorted_leaf_pages: &[PageNumber]) -> u64 {
    let mut gaps = 0;
    let mut previous = PageNumber(0);
    for &page in sorted_leaf_pages {
        if previous.0 > 0 && !page.follows(previous) {
            gaps += 1;
        }
        previous = page;
    }
    gaps
}
