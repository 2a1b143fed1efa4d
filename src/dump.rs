//! SQL dump of the per-object table
//!
//! Emits the normalized rows as a self-contained script so the raw sums
//! can be loaded into any SQL engine for further analysis.

use crate::store::ObjectRow;

/// Schema of the dumped table
pub const SPACE_USED_SCHEMA: &str = "CREATE TABLE space_used(
   name clob,        -- Name of a table or index in the database file
   tblname clob,     -- Name of associated table
   is_index boolean, -- TRUE if it is an index, false for a table
   is_without_rowid boolean, -- TRUE if WITHOUT ROWID table
   nentry int,       -- Number of entries in the BTree
   leaf_entries int, -- Number of leaf entries
   depth int,        -- Depth of the b-tree
   payload int,      -- Total amount of data stored in this table or index
   ovfl_payload int, -- Total amount of data stored on overflow pages
   ovfl_cnt int,     -- Number of entries that use overflow
   mx_payload int,   -- Maximum payload size
   int_pages int,    -- Number of interior pages used
   leaf_pages int,   -- Number of leaf pages used
   ovfl_pages int,   -- Number of overflow pages used
   int_unused int,   -- Number of unused bytes on interior pages
   leaf_unused int,  -- Number of unused bytes on primary pages
   ovfl_unused int,  -- Number of unused bytes on overflow pages
   gap_cnt int,      -- Number of gaps in the page layout
   compressed_size int  -- Total bytes stored on disk
);";

/// Quote a string as an SQL literal
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// One `INSERT` statement for `row`
pub fn insert_statement(row: &ObjectRow) -> String {
    format!(
        "INSERT INTO space_used VALUES({},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{});",
        quote_literal(&row.name),
        quote_literal(&row.owning_table_name),
        row.is_index as u8,
        row.is_without_rowid as u8,
        row.entry_count,
        row.leaf_entry_count,
        row.max_depth,
        row.total_payload_bytes,
        row.overflow_payload_bytes,
        row.overflow_cell_count,
        row.max_payload_bytes,
        row.internal_page_count,
        row.leaf_page_count,
        row.overflow_page_count,
        row.internal_unused_bytes,
        row.leaf_unused_bytes,
        row.overflow_unused_bytes,
        row.sequentiality_gap_count,
        row.on_disk_compressed_size,
    )
}

/// Full script: transaction, schema and one insert per row
pub fn dump_rows(rows: &[ObjectRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push("BEGIN TRANSACTION;".to_string());
    lines.push(SPACE_USED_SCHEMA.to_string());
    lines.extend(rows.iter().map(insert_statement));
    lines.push("COMMIT;".to_string());
    lines
}
