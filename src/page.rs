//! Raw page geometry records
//!
//! A page record describes one physical page of one B-tree object: its type,
//! how many cells it holds, how many bytes are payload and how many are
//! unused, and the structural path from the object's root page down to it.
//!
//! Paths use fixed-width segments: the root page is `/`, its children are
//! `/000/`, `/001/`, ..., grandchildren `/000/01a/`, and so on. An overflow
//! chain hangs off one cell of a page: the page's path, the cell index and a
//! `+` suffix. `/000/003+000000` is the first overflow page of cell 3 on
//! page `/000/`, `/000/003+000001` the second; on a root leaf the same chain
//! is `/003+000000`.

use crate::error::{Error, PageNumber, Result};
use std::fmt;
use std::str::FromStr;

/// Suffix marking the first page of an overflow chain
pub const OVERFLOW_MARKER: &str = "+000000";

/// Character introducing the overflow part of a path
pub const OVERFLOW_SEPARATOR: char = '+';

/// Width of one path segment (three hex digits plus a slash)
pub const PATH_SEGMENT_WIDTH: usize = 4;

/// Page type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// Internal page (routing keys only)
    Internal,
    /// Leaf page (contains entries)
    Leaf,
    /// Overflow page (payload spilled from a cell)
    Overflow,
}

impl PageType {
    /// Name used by the storage engine for this page type
    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Internal => "internal",
            PageType::Leaf => "leaf",
            PageType::Overflow => "overflow",
        }
    }
}

impl FromStr for PageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "internal" => Ok(PageType::Internal),
            "leaf" => Ok(PageType::Leaf),
            "overflow" => Ok(PageType::Overflow),
            other => Err(Error::InvalidPageType(other.to_string())),
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical page belonging to a named B-tree object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPageRecord {
    /// Table or index the page belongs to
    pub object_name: String,
    /// Page number in the file
    pub page_number: PageNumber,
    /// Kind of B-tree page
    pub page_type: PageType,
    /// Cells on the page (0 for overflow pages)
    pub cell_count: u64,
    /// Bytes of payload stored on the page
    pub payload_bytes: u64,
    /// Bytes of unused space on the page
    pub unused_bytes: u64,
    /// Largest payload of any cell on the page
    pub max_cell_payload: u64,
    /// Root-to-page path
    pub structural_path: String,
    /// Bytes the page occupies on disk (smaller than the page size when
    /// the file is compressed below the page layer)
    pub page_size_on_disk: u64,
}

impl RawPageRecord {
    /// Whether the page is the first page of an overflow chain
    pub fn starts_overflow_chain(&self) -> bool {
        is_overflow_chain_start(&self.structural_path)
    }

    /// Tree level of the page, or `None` for overflow-chain pages
    pub fn depth(&self) -> Option<u32> {
        path_depth(&self.structural_path)
    }
}

/// Whether `path` ends in the overflow marker
pub fn is_overflow_chain_start(path: &str) -> bool {
    path.ends_with(OVERFLOW_MARKER)
}

/// Whether `path` addresses a page reached through an overflow chain
pub fn is_overflow_chain_page(path: &str) -> bool {
    path.contains(OVERFLOW_SEPARATOR)
}

/// Number of tree levels encoded by `path`
///
/// Returns `None` for overflow-chain pages, which sit outside the tree
/// proper and do not contribute to depth.
pub fn path_depth(path: &str) -> Option<u32> {
    if is_overflow_chain_page(path) {
        return None;
    }
    let levels = (path.len() + 3).div_ceil(PATH_SEGMENT_WIDTH);
    Some(u32::try_from(levels).unwrap_or(u32::MAX))
}
