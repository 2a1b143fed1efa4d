//! Property tests over extraction and statistics

use proptest::prelude::*;
use quickcheck_macros::quickcheck;
use spaceanalyzer::extract::{count_gaps, extract_object};
use spaceanalyzer::metrics::percentage;
use spaceanalyzer::page::path_depth;
use spaceanalyzer::{ObjectRow, PageNumber, PageType, RawPageRecord, SchemaObject, SpaceStats};

const PAGE_SIZE: u64 = 4096;

fn arb_row() -> impl Strategy<Value = ObjectRow> {
    (
        0u8..4,
        0u64..1000,
        0u64..20,
        1u64..50,
        0u64..10,
        0u64..50_000,
        0u64..5,
        0u64..50,
    )
        .prop_map(|(table, entries, internal, leaves, overflow, payload, ovfl_cells, gaps)| {
            let owner = format!("t{table}");
            ObjectRow {
                name: owner.clone(),
                owning_table_name: owner,
                entry_count: entries,
                leaf_entry_count: entries,
                total_payload_bytes: payload,
                overflow_cell_count: ovfl_cells.min(overflow),
                internal_page_count: internal,
                leaf_page_count: leaves,
                overflow_page_count: overflow,
                leaf_unused_bytes: leaves * 100,
                sequentiality_gap_count: gaps.min(leaves - 1),
                on_disk_compressed_size: (internal + leaves + overflow) * PAGE_SIZE,
                max_depth: if internal > 0 { 2 } else { 1 },
                ..Default::default()
            }
        })
}

fn arb_rows() -> impl Strategy<Value = Vec<ObjectRow>> {
    (prop::collection::vec(arb_row(), 0..12), prop::collection::vec(any::<bool>(), 12)).prop_map(
        |(mut rows, index_flags)| {
            for (i, (row, is_index)) in rows.iter_mut().zip(index_flags).enumerate() {
                if is_index {
                    row.name = format!("{}_idx{i}", row.owning_table_name);
                    row.is_index = true;
                } else {
                    row.name = format!("{}_{i}", row.owning_table_name);
                }
            }
            rows
        },
    )
}

proptest! {
    #[test]
    fn prop_percentage_bounds(total in 1u64..1_000_000, share in 0.0f64..=1.0) {
        let value = (total as f64 * share).floor();
        let p = percentage(value, total as f64);
        prop_assert!((0.0..=100.0).contains(&p));
    }

    #[test]
    fn prop_tables_plus_indices_is_everything(rows in arb_rows()) {
        let page_count = 10_000;
        let all = SpaceStats::compute(&rows, PAGE_SIZE, page_count);
        let tables = SpaceStats::compute(rows.iter().filter(|r| !r.is_index), PAGE_SIZE, page_count);
        let indices = SpaceStats::compute(rows.iter().filter(|r| r.is_index), PAGE_SIZE, page_count);

        prop_assert_eq!(tables.total_pages + indices.total_pages, all.total_pages);
        prop_assert_eq!(tables.entry_count + indices.entry_count, all.entry_count);
        prop_assert_eq!(tables.storage_bytes + indices.storage_bytes, all.storage_bytes);
        prop_assert_eq!(
            tables.total_metadata_bytes + indices.total_metadata_bytes,
            all.total_metadata_bytes
        );
        prop_assert_eq!(all.max_depth, tables.max_depth.max(indices.max_depth));
    }

    #[test]
    fn prop_byte_accounting_balances(rows in arb_rows()) {
        let s = SpaceStats::compute(&rows, PAGE_SIZE, 10_000);
        let continuation = s.overflow_page_count as i64 - s.overflow_cell_count as i64;
        prop_assert_eq!(
            s.total_payload_bytes as i64 + s.total_unused_bytes as i64 + s.total_metadata_bytes,
            s.storage_bytes as i64 + 4 * continuation
        );
        prop_assert!(!s.is_compressed);
        prop_assert!((0.0..=100.0).contains(&s.fragmentation_percent));
        prop_assert!((0.0..=100.0).contains(&s.total_pages_percent));
    }

    #[test]
    fn prop_averages_zero_without_entries(mut rows in arb_rows()) {
        for row in &mut rows {
            row.entry_count = 0;
        }
        let s = SpaceStats::compute(&rows, PAGE_SIZE, 10_000);
        prop_assert_eq!(s.average_payload, 0.0);
        prop_assert_eq!(s.average_unused, 0.0);
        prop_assert_eq!(s.average_metadata, 0.0);
        prop_assert_eq!(s.overflow_percent, 0.0);
    }

    #[test]
    fn prop_consecutive_leaves_have_no_gaps(start in 1u64..100_000, len in 0usize..500) {
        let pages: Vec<PageNumber> = (start..start + len as u64).map(PageNumber).collect();
        prop_assert_eq!(count_gaps(&pages), 0);
    }

    #[test]
    fn prop_well_formed_path_depth(segments in prop::collection::vec(0u16..0x1000, 0..8)) {
        let mut path = String::from("/");
        for segment in &segments {
            path.push_str(&format!("{segment:03x}/"));
        }
        prop_assert_eq!(path_depth(&path), Some(segments.len() as u32 + 1));
    }

    #[test]
    fn prop_leaf_order_does_not_change_row(mut numbers in prop::collection::vec(1u64..10_000, 1..40)) {
        numbers.dedup();
        let object = SchemaObject::table("t");
        let records: Vec<RawPageRecord> = numbers
            .iter()
            .map(|&n| RawPageRecord {
                object_name: "t".into(),
                page_number: PageNumber(n),
                page_type: PageType::Leaf,
                cell_count: 3,
                payload_bytes: 90,
                unused_bytes: 10,
                max_cell_payload: 30,
                structural_path: "/".into(),
                page_size_on_disk: PAGE_SIZE,
            })
            .collect();

        let forward = extract_object(&object, false, &records);
        let backward = extract_object(&object, false, records.iter().rev());
        prop_assert_eq!(forward, backward);
    }
}

#[quickcheck]
fn gaps_never_exceed_breaks(mut pages: Vec<u32>) -> bool {
    pages.retain(|&p| p > 0);
    pages.sort_unstable();
    pages.dedup();
    let pages: Vec<PageNumber> = pages.into_iter().map(|p| PageNumber(p.into())).collect();
    let gaps = count_gaps(&pages);
    gaps <= pages.len().saturating_sub(1) as u64
}
