//! Pre-flight checks on the database file header
//!
//! Run before the file is handed to the storage engine so that a missing
//! or foreign file fails fast with a clear error instead of an engine
//! message about a malformed schema.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Magic string at the start of every database file
pub const HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the file header
pub const HEADER_SIZE: usize = 100;

/// Smallest legal page size
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest legal page size
pub const MAX_PAGE_SIZE: u32 = 65536;

const PAGE_SIZE_OFFSET: usize = 16;
const PAGE_COUNT_OFFSET: usize = 28;
const FREELIST_COUNT_OFFSET: usize = 36;

/// Header fields checked by the preflight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSummary {
    /// Bytes per page
    pub page_size: u32,
    /// In-header database size in pages
    pub page_count: u32,
    /// Pages on the free list
    pub freelist_count: u32,
}

/// Check that `path` looks like a database file and summarise its header
pub fn check_file(path: &Path) -> Result<HeaderSummary> {
    let mut file = File::open(path)?;
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if filled < HEADER_SIZE {
        return Err(Error::NotADatabase {
            path: path.to_path_buf(),
            reason: format!("file is {filled} bytes, shorter than the {HEADER_SIZE}-byte header")
                .into(),
        });
    }

    parse_header(&header).map_err(|err| match err {
        Error::InvalidHeader { field, value } => Error::NotADatabase {
            path: path.to_path_buf(),
            reason: format!("invalid {field} ({value})").into(),
        },
        other => other,
    })
}

/// Decode the checked fields of a raw header
pub fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<HeaderSummary> {
    if &header[..HEADER_MAGIC.len()] != HEADER_MAGIC {
        return Err(Error::InvalidHeader { field: "magic", value: 0 });
    }

    // A stored value of 1 means 65536, which does not fit in two bytes.
    let raw = BigEndian::read_u16(&header[PAGE_SIZE_OFFSET..]) as u32;
    let page_size = if raw == 1 { MAX_PAGE_SIZE } else { raw };
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) || !page_size.is_power_of_two() {
        return Err(Error::InvalidHeader { field: "page size", value: raw });
    }

    Ok(HeaderSummary {
        page_size,
        page_count: BigEndian::read_u32(&header[PAGE_COUNT_OFFSET..]),
        freelist_count: BigEndian::read_u32(&header[FREELIST_COUNT_OFFSET..]),
    })
}
