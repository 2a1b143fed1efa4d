//! Derived space statistics
//!
//! [`SpaceStats::compute`] sums a group of [`ObjectRow`]s and derives every
//! ratio the report needs. Nothing here is cached; each call recomputes
//! from the raw sums.

use crate::store::ObjectRow;

/// Per-page overhead charged by a compression layer below the pages
pub const COMPRESSION_OVERHEAD_BYTES: u64 = 14;

/// Bytes of next-page pointer at the head of each continuation overflow page
pub const OVERFLOW_POINTER_BYTES: i64 = 4;

/// `100 * value / total`, or 0 when `total` is 0
pub fn percentage(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    100.0 * value / total
}

/// Aggregated statistics for a group of tables and indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaceStats {
    /// Rows (objects) that contributed
    pub row_count: u64,
    /// Entries stored
    pub entry_count: u64,
    /// Payload bytes
    pub total_payload_bytes: u64,
    /// Payload bytes on overflow pages
    pub overflow_payload_bytes: u64,
    /// Largest payload of any entry
    pub max_payload_bytes: u64,
    /// Entries that use overflow pages
    pub overflow_cell_count: u64,
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
    /// Breaks in leaf page order
    pub sequentiality_gap_count: u64,
    /// Bytes actually written to disk
    pub on_disk_compressed_size: u64,
    /// Deepest B-tree in the group
    pub max_depth: u32,

    /// Pages of every type
    pub total_pages: u64,
    /// Pages as a share of the whole file
    pub total_pages_percent: f64,
    /// Logical bytes occupied by the pages
    pub storage_bytes: u64,
    /// Whether fewer bytes reached disk than the pages occupy
    pub is_compressed: bool,
    /// Overhead charged by the compression layer
    pub compression_overhead_bytes: u64,
    /// Payload as a share of storage
    pub payload_percent: f64,
    /// Unused bytes on all pages
    pub total_unused_bytes: u64,
    /// Structural bytes: neither payload nor unused
    pub total_metadata_bytes: i64,
    /// Metadata as a share of storage
    pub metadata_percent: f64,
    /// Payload bytes per entry
    pub average_payload: f64,
    /// Unused bytes per entry
    pub average_unused: f64,
    /// Metadata bytes per entry
    pub average_metadata: f64,
    /// Share of entries that use overflow pages
    pub overflow_percent: f64,
    /// Share of pages that break sequential order
    pub fragmentation_percent: f64,
    /// Unused share of internal pages
    pub internal_unused_percent: f64,
    /// Unused share of leaf pages
    pub leaf_unused_percent: f64,
    /// Unused share of overflow pages
    pub overflow_unused_percent: f64,
    /// Unused share of all pages
    pub total_unused_percent: f64,
}

impl SpaceStats {
    /// Sum `rows` and derive ratios against a file of `page_count` pages
    /// of `page_size` bytes
    pub fn compute<'a, I>(rows: I, page_size: u64, page_count: u64) -> Self
    where
        I: IntoIterator<Item = &'a ObjectRow>,
    {
        let mut s = SpaceStats::default();
        for row in rows {
            s.row_count += 1;
            s.entry_count += row.entry_count;
            s.total_payload_bytes += row.total_payload_bytes;
            s.overflow_payload_bytes += row.overflow_payload_bytes;
            s.max_payload_bytes = s.max_payload_bytes.max(row.max_payload_bytes);
            s.overflow_cell_count += row.overflow_cell_count;
            s.internal_page_count += row.internal_page_count;
            s.leaf_page_count += row.leaf_page_count;
            s.overflow_page_count += row.overflow_page_count;
            s.internal_unused_bytes += row.internal_unused_bytes;
            s.leaf_unused_bytes += row.leaf_unused_bytes;
            s.overflow_unused_bytes += row.overflow_unused_bytes;
            s.sequentiality_gap_count += row.sequentiality_gap_count;
            s.on_disk_compressed_size += row.on_disk_compressed_size;
            s.max_depth = s.max_depth.max(row.max_depth);
        }
        s.derive(page_size, page_count);
        s
    }

    fn derive(&mut self, page_size: u64, page_count: u64) {
        self.total_pages = self.internal_page_count + self.leaf_page_count + self.overflow_page_count;
        self.total_pages_percent = percentage(self.total_pages as f64, page_count as f64);
        self.storage_bytes = self.total_pages * page_size;

        self.is_compressed = self.storage_bytes > self.on_disk_compressed_size;
        self.compression_overhead_bytes =
            if self.is_compressed { COMPRESSION_OVERHEAD_BYTES } else { 0 };

        let storage = self.storage_bytes as f64;
        self.payload_percent = percentage(self.total_payload_bytes as f64, storage);

        self.total_unused_bytes =
            self.internal_unused_bytes + self.leaf_unused_bytes + self.overflow_unused_bytes;

        // Every overflow page but the last of its chain carries a next-page
        // pointer; one chain per overflowing entry approximates that count.
        let continuation_pages = self.overflow_page_count as i64 - self.overflow_cell_count as i64;
        self.total_metadata_bytes = self.storage_bytes as i64
            - self.total_payload_bytes as i64
            - self.total_unused_bytes as i64
            + OVERFLOW_POINTER_BYTES * continuation_pages;
        self.metadata_percent = percentage(self.total_metadata_bytes as f64, storage);

        if self.entry_count == 0 {
            self.average_payload = 0.0;
            self.average_unused = 0.0;
            self.average_metadata = 0.0;
        } else {
            let entries = self.entry_count as f64;
            self.average_payload = self.total_payload_bytes as f64 / entries;
            self.average_unused = self.total_unused_bytes as f64 / entries;
            self.average_metadata = self.total_metadata_bytes as f64 / entries;
        }

        self.overflow_percent =
            percentage(self.overflow_cell_count as f64, self.entry_count as f64);
        self.fragmentation_percent = percentage(
            self.sequentiality_gap_count as f64,
            self.total_pages.saturating_sub(1) as f64,
        );

        let bytes_of = |pages: u64| (pages * page_size) as f64;
        self.internal_unused_percent =
            percentage(self.internal_unused_bytes as f64, bytes_of(self.internal_page_count));
        self.leaf_unused_percent =
            percentage(self.leaf_unused_bytes as f64, bytes_of(self.leaf_page_count));
        self.overflow_unused_percent =
            percentage(self.overflow_unused_bytes as f64, bytes_of(self.overflow_page_count));
        self.total_unused_percent = percentage(self.total_unused_bytes as f64, storage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ObjectRow {
        ObjectRow {
            name: "t1".into(),
            owning_table_name: "t1".into(),
            entry_count: 100,
            leaf_entry_count: 100,
            total_payload_bytes: 6000,
            overflow_payload_bytes: 2000,
            overflow_cell_count: 2,
            max_payload_bytes: 1500,
            internal_page_count: 1,
            leaf_page_count: 4,
            overflow_page_count: 3,
            internal_unused_bytes: 900,
            leaf_unused_bytes: 1000,
            overflow_unused_bytes: 100,
            sequentiality_gap_count: 2,
            on_disk_compressed_size: 8 * 1024,
            max_depth: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_percentage_guard() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(42.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }

    #[test]
    fn test_derived_fields() {
        let s = SpaceStats::compute([&sample_row()], 1024, 16);

        assert_eq!(s.row_count, 1);
        assert_eq!(s.total_pages, 8);
        assert_eq!(s.total_pages_percent, 50.0);
        assert_eq!(s.storage_bytes, 8192);
        assert!(!s.is_compressed);
        assert_eq!(s.compression_overhead_bytes, 0);
        assert_eq!(s.total_unused_bytes, 2000);
        // 8192 - 6000 - 2000 + 4 * (3 - 2)
        assert_eq!(s.total_metadata_bytes, 196);
        assert_eq!(s.average_payload, 60.0);
        assert_eq!(s.average_unused, 20.0);
        assert_eq!(s.average_metadata, 1.96);
        assert_eq!(s.overflow_percent, 2.0);
        assert_eq!(s.fragmentation_percent, percentage(2.0, 7.0));
        assert_eq!(s.leaf_unused_percent, percentage(1000.0, 4096.0));
        assert_eq!(s.internal_unused_percent, percentage(900.0, 1024.0));
        assert_eq!(s.overflow_unused_percent, percentage(100.0, 3072.0));
        assert_eq!(s.total_unused_percent, percentage(2000.0, 8192.0));
        assert_eq!(s.payload_percent, percentage(6000.0, 8192.0));
    }

    #[test]
    fn test_compression_detected() {
        let mut row = sample_row();
        row.on_disk_compressed_size = 3000;
        let s = SpaceStats::compute([&row], 1024, 16);
        assert!(s.is_compressed);
        assert_eq!(s.compression_overhead_bytes, COMPRESSION_OVERHEAD_BYTES);
    }

    #[test]
    fn test_empty_group_is_all_zero() {
        let s = SpaceStats::compute(std::iter::empty(), 4096, 10);
        assert_eq!(s.row_count, 0);
        assert_eq!(s.total_pages, 0);
        assert_eq!(s.fragmentation_percent, 0.0);
        assert_eq!(s.average_payload, 0.0);
        assert_eq!(s.metadata_percent, 0.0);
        assert!(!s.is_compressed);
    }

    #[test]
    fn test_single_page_has_no_fragmentation() {
        let row = ObjectRow {
            leaf_page_count: 1,
            sequentiality_gap_count: 0,
            on_disk_compressed_size: 4096,
            ..Default::default()
        };
        let s = SpaceStats::compute([&row], 4096, 1);
        assert_eq!(s.total_pages, 1);
        assert_eq!(s.fragmentation_percent, 0.0);
        assert_eq!(s.total_pages_percent, 100.0);
    }

    #[test]
    fn test_group_takes_max_of_depth_and_payload() {
        let mut other = sample_row();
        other.max_depth = 4;
        other.max_payload_bytes = 10;
        let s = SpaceStats::compute([&sample_row(), &other], 1024, 32);
        assert_eq!(s.row_count, 2);
        assert_eq!(s.max_depth, 4);
        assert_eq!(s.max_payload_bytes, 1500);
        assert_eq!(s.entry_count, 200);
        assert_eq!(s.total_pages, 16);
    }
}
