//! Auxiliary page-count estimators
//!
//! Small calculations that sit beside the main aggregation: pointer-map
//! overhead of auto-vacuum files, the free-list cross-check and WITHOUT
//! ROWID detection.

use crate::source::{AutoVacuum, IndexInfo, IndexOrigin};
use std::fmt;

/// Bytes per pointer-map entry
pub const POINTER_MAP_ENTRY_BYTES: u64 = 5;

/// Number of pointer-map pages in a file
///
/// The first pointer-map page is the second page of the file; after it
/// come `page_size / 5` ordinary pages, then another pointer-map page,
/// and so on.
pub fn autovacuum_overhead_pages(auto_vacuum: AutoVacuum, page_size: u64, page_count: u64) -> u64 {
    if !auto_vacuum.is_enabled() || page_count <= 1 {
        return 0;
    }
    let pointers_per_page = page_size / POINTER_MAP_ENTRY_BYTES;
    (page_count - 1).div_ceil(pointers_per_page + 1)
}

/// Free-list count from the header next to the one implied by page usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreelistCheck {
    /// Free pages according to the file header
    pub declared: u64,
    /// `page_count - in_use - autovacuum_overhead`
    pub calculated: i64,
}

impl FreelistCheck {
    /// Compare the header's free-list count with the page accounting
    pub fn new(page_count: u64, in_use_pages: u64, autovacuum_pages: u64, freelist_count: u64) -> Self {
        Self {
            declared: freelist_count,
            calculated: page_count as i64 - in_use_pages as i64 - autovacuum_pages as i64,
        }
    }

    /// Whether the two counts agree
    pub fn is_consistent(&self) -> bool {
        self.calculated == self.declared as i64
    }
}

impl fmt::Display for FreelistCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "free pages: {} declared, {} calculated", self.declared, self.calculated)
    }
}

/// Whether a table keeps its primary key in the main B-tree
///
/// Such a table lists a primary-key index that has no B-tree of its own,
/// so the index name is missing from the catalog.
pub fn is_without_rowid<F>(index_list: &[IndexInfo], in_catalog: F) -> bool
where
    F: Fn(&str) -> bool,
{
    index_list
        .iter()
        .any(|index| index.origin == IndexOrigin::PrimaryKey && !in_catalog(&index.name))
}
