//! Classic text report
//!
//! Renders an analyzer's statistics in the layout of the traditional
//! `sqlite3_analyzer` report: a file summary, page counts per table and per
//! object, aggregate blocks, per-table details, definitions, and finally an
//! SQL dump of the raw per-object sums.

use crate::analyzer::SpaceAnalyzer;
use crate::error::Result;
use crate::metrics::{percentage, SpaceStats};
use bitflags::bitflags;
use std::fmt;
use std::io::Write;

/// Report width in characters
pub const REPORT_WIDTH: usize = 79;

const LABEL_WIDTH: usize = 50;
const VALUE_WIDTH: usize = 10;

bitflags! {
    /// Sections of the report
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sections: u16 {
        /// File-level summary
        const SUMMARY = 0x01;
        /// Pages per table, indices included
        const TABLE_PAGES = 0x02;
        /// Pages per table and per index separately
        const OBJECT_PAGES = 0x04;
        /// All objects and all tables
        const GLOBAL = 0x08;
        /// All indices
        const INDICES = 0x10;
        /// One block per table and index
        const DETAILS = 0x20;
        /// Explanation of every figure
        const DEFINITIONS = 0x40;
        /// SQL dump of the raw sums
        const DUMP = 0x80;
    }
}

impl Default for Sections {
    fn default() -> Self {
        Sections::all()
    }
}

/// A figure on a report line
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Whole number
    Int(i64),
    /// Fractional number, printed with two decimals
    Float(f64),
    /// Percentage, printed without trailing zeros and with a `%` suffix
    Percent(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            // At most three decimals, trailing zeros dropped: 50%, 12.5%, 33.333%
            Value::Percent(v) => write!(f, "{}%", (v * 1000.0).round() / 1000.0),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Format a percentage with precision that grows near 0% and 100%
pub fn round_percentage(p: f64) -> String {
    if p == 100.0 || p < 0.001 || (p > 1.0 && p < 99.0) {
        format!("{p:5.1}")
    } else if p < 0.1 || p > 99.9 {
        format!("{p:7.3}")
    } else {
        format!("{p:6.2}")
    }
}

/// One `label..... value   percent%` line, without trailing newline
pub fn stat_line(label: &str, value: impl Into<Value>, percent: Option<f64>) -> String {
    let dots = ".".repeat(LABEL_WIDTH.saturating_sub(label.len()));
    let value = value.into().to_string();
    match percent {
        None => format!("{label}{dots} {value}"),
        Some(p) => {
            let sep = " ".repeat(VALUE_WIDTH.saturating_sub(value.len()));
            let p = format!("{}%", round_percentage(p));
            format!("{label}{dots} {value}{sep} {p:>10}")
        }
    }
}

/// `*** title *****` banner, without trailing newline
pub fn title_line(title: &str) -> String {
    let stars = "*".repeat(REPORT_WIDTH.saturating_sub(title.len() + 5));
    format!("*** {title} {stars}")
}

/// Classic report over one analyzer
pub struct ClassicReport<'a> {
    analyzer: &'a SpaceAnalyzer,
    database_label: String,
}

impl<'a> ClassicReport<'a> {
    /// Report on `analyzer`, naming the file `database_label`
    pub fn new(analyzer: &'a SpaceAnalyzer, database_label: impl Into<String>) -> Self {
        Self { analyzer, database_label: database_label.into() }
    }

    /// Write the selected sections in order
    pub fn write<W: Write>(&self, out: &mut W, sections: Sections) -> Result<()> {
        if sections.contains(Sections::SUMMARY) {
            self.write_summary(out)?;
        }
        if sections.contains(Sections::TABLE_PAGES) {
            self.write_table_pages(out)?;
        }
        if sections.contains(Sections::OBJECT_PAGES) {
            self.write_object_pages(out)?;
        }
        if sections.contains(Sections::GLOBAL) {
            self.write_global(out)?;
        }
        if sections.contains(Sections::INDICES) {
            self.write_indices(out)?;
        }
        if sections.contains(Sections::DETAILS) {
            self.write_details(out)?;
        }
        if sections.contains(Sections::DEFINITIONS) {
            self.write_definitions(out)?;
        }
        if sections.contains(Sections::DUMP) {
            self.write_dump(out)?;
        }
        Ok(())
    }

    /// File-level summary
    pub fn write_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        let a = self.analyzer;
        let page_count = a.page_count();
        let pct = |v: u64| Some(percentage(v as f64, page_count as f64));

        writeln!(out, "/** Disk-Space Utilization Report For {}", self.database_label)?;
        writeln!(out)?;
        writeln!(out, "{}", stat_line("Page size in bytes", a.page_size(), None))?;
        writeln!(out, "{}", stat_line("Pages in the whole file (measured)", page_count, None))?;
        writeln!(
            out,
            "{}",
            stat_line("Pages in the whole file (calculated)", a.calculated_page_count(), None)
        )?;
        writeln!(out, "{}", stat_line("Pages that store data", a.in_use_pages(), pct(a.in_use_pages())))?;
        writeln!(out, "{}", stat_line("Pages on the freelist (per header)", a.freelist_count(), None))?;
        writeln!(
            out,
            "{}",
            stat_line("Pages on the freelist (calculated)", a.calculated_free_pages(), None)
        )?;
        let av = a.autovacuum_page_count();
        writeln!(out, "{}", stat_line("Pages of auto-vacuum overhead", av, pct(av)))?;
        writeln!(out, "{}", stat_line("Number of tables in the database", a.ntable(), None))?;
        writeln!(out, "{}", stat_line("Number of indices", a.nindex(), None))?;
        writeln!(out, "{}", stat_line("Number of defined indices", a.nmanindex(), None))?;
        writeln!(out, "{}", stat_line("Number of implied indices", a.nautoindex(), None))?;

        let file_size = a.file_size();
        if a.is_compressed() {
            writeln!(
                out,
                "{}",
                stat_line("Size of uncompressed content in bytes", a.logical_file_size(), None)
            )?;
            let efficiency = percentage(file_size as f64, a.logical_file_size() as f64);
            writeln!(
                out,
                "{}",
                stat_line("Size of compressed file on disk", file_size, Some(efficiency))
            )?;
        } else {
            writeln!(out, "{}", stat_line("Size of the file in bytes", file_size, None))?;
        }

        let payload = a.payload_size();
        writeln!(
            out,
            "{}",
            stat_line(
                "Bytes of user payload stored",
                payload,
                Some(percentage(payload as f64, file_size as f64))
            )
        )?;
        writeln!(out)?;
        Ok(())
    }

    /// Pages per table with its indices, largest first
    pub fn write_table_pages<W: Write>(&self, out: &mut W) -> Result<()> {
        let page_count = self.analyzer.page_count() as f64;
        writeln!(out, "{}\n", title_line("Page counts for all tables with their indices"))?;
        for usage in self.analyzer.table_space_usage() {
            let p = percentage(usage.pages as f64, page_count);
            writeln!(out, "{}", stat_line(&usage.name.to_uppercase(), usage.pages, Some(p)))?;
        }
        writeln!(out)?;
        Ok(())
    }

    /// Pages per table and per index, largest first
    pub fn write_object_pages<W: Write>(&self, out: &mut W) -> Result<()> {
        let a = self.analyzer;
        let page_count = a.page_count() as f64;
        writeln!(out, "{}\n", title_line("Page counts for all tables and indices separately"))?;

        let mut counts: Vec<(&str, u64)> =
            a.store().rows().iter().map(|r| (r.name.as_str(), r.total_pages())).collect();
        counts.sort_by(|x, y| y.1.cmp(&x.1).then_with(|| x.0.cmp(y.0)));

        for (name, pages) in counts {
            let p = percentage(pages as f64, page_count);
            writeln!(out, "{}", stat_line(&name.to_uppercase(), pages, Some(p)))?;
        }
        writeln!(out)?;
        Ok(())
    }

    /// Everything, then all tables
    pub fn write_global<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}\n", title_line("All tables and indices"))?;
        write_stats(out, &self.analyzer.global_stats(false))?;
        writeln!(out, "{}\n", title_line("All tables"))?;
        write_stats(out, &self.analyzer.global_stats(true))?;
        Ok(())
    }

    /// All indices, when there are any
    pub fn write_indices<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.analyzer.nindex() == 0 {
            return Ok(());
        }
        writeln!(out, "{}\n", title_line("All indices"))?;
        write_stats(out, &self.analyzer.indices_stats())?;
        Ok(())
    }

    /// One block per table, largest first, then one per index
    pub fn write_details<W: Write>(&self, out: &mut W) -> Result<()> {
        let a = self.analyzer;
        for usage in a.table_space_usage() {
            let table = usage.name.as_str();
            let upper = table.to_uppercase();
            let indices = a.indices_of(table);

            if indices.is_empty() {
                writeln!(out, "{}\n", title_line(&format!("Table {upper}")))?;
                write_stats(out, &a.table_stats(table, false)?)?;
                continue;
            }

            writeln!(out, "{}\n", title_line(&format!("Table {upper} and all its indices")))?;
            write_stats(out, &a.table_stats(table, false)?)?;
            writeln!(out, "{}\n", title_line(&format!("Table {upper} w/o any indices")))?;
            write_stats(out, &a.table_stats(table, true)?)?;

            for index in indices {
                let title = format!("Index {} of table {upper}", index.name.to_uppercase());
                writeln!(out, "{}\n", title_line(&title))?;
                write_stats(out, &a.index_stats(&index.name)?)?;
            }
        }
        Ok(())
    }

    /// Explanation of the figures
    pub fn write_definitions<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}\n", title_line("Definitions"))?;
        for (term, text) in DEFINITIONS {
            writeln!(out, "{term}\n")?;
            for line in text.lines() {
                writeln!(out, "    {line}")?;
            }
            writeln!(out)?;
        }
        writeln!(out, "{}", "*".repeat(REPORT_WIDTH))?;
        Ok(())
    }

    /// Raw sums as SQL; everything before it forms one SQL comment
    pub fn write_dump<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "The entire text of this report can be sourced into any SQL database")?;
        writeln!(out, "engine for further analysis. All of the text above is an SQL comment.")?;
        writeln!(out, "The data used to generate this report follows:")?;
        writeln!(out, "*/")?;
        for line in self.analyzer.dump_sql() {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

/// Statistics block shared by every table, index and aggregate section
pub fn write_stats<W: Write>(out: &mut W, s: &SpaceStats) -> Result<()> {
    let line = |label: &str, value: Value, p: Option<f64>| stat_line(label, value, p);

    writeln!(
        out,
        "{}",
        line("Percentage of total database", Value::Percent(s.total_pages_percent), None)
    )?;
    writeln!(out, "{}", line("Number of entries", s.entry_count.into(), None))?;
    writeln!(out, "{}", line("Bytes of storage consumed", s.storage_bytes.into(), None))?;
    writeln!(
        out,
        "{}",
        line("Bytes of payload", s.total_payload_bytes.into(), Some(s.payload_percent))
    )?;
    writeln!(
        out,
        "{}",
        line("Bytes of metadata", s.total_metadata_bytes.into(), Some(s.metadata_percent))
    )?;
    if s.row_count == 1 {
        writeln!(out, "{}", line("B-tree depth", s.max_depth.into(), None))?;
    }
    writeln!(out, "{}", line("Average payload per entry", s.average_payload.into(), None))?;
    writeln!(out, "{}", line("Average unused bytes per entry", s.average_unused.into(), None))?;
    writeln!(out, "{}", line("Average metadata per entry", s.average_metadata.into(), None))?;
    if s.total_pages > 1 {
        writeln!(
            out,
            "{}",
            line(
                "Non-sequential pages",
                s.sequentiality_gap_count.into(),
                Some(s.fragmentation_percent)
            )
        )?;
    }
    writeln!(out, "{}", line("Maximum payload per entry", s.max_payload_bytes.into(), None))?;
    writeln!(
        out,
        "{}",
        line("Entries that use overflow", s.overflow_cell_count.into(), Some(s.overflow_percent))
    )?;
    if s.internal_page_count > 0 {
        writeln!(out, "{}", line("Index pages used", s.internal_page_count.into(), None))?;
    }
    writeln!(out, "{}", line("Primary pages used", s.leaf_page_count.into(), None))?;
    writeln!(out, "{}", line("Overflow pages used", s.overflow_page_count.into(), None))?;
    writeln!(out, "{}", line("Total pages used", s.total_pages.into(), None))?;
    if s.internal_unused_bytes > 0 {
        writeln!(
            out,
            "{}",
            line(
                "Unused bytes on index pages",
                s.internal_unused_bytes.into(),
                Some(s.internal_unused_percent)
            )
        )?;
    }
    writeln!(
        out,
        "{}",
        line(
            "Unused bytes on primary pages",
            s.leaf_unused_bytes.into(),
            Some(s.leaf_unused_percent)
        )
    )?;
    writeln!(
        out,
        "{}",
        line(
            "Unused bytes on overflow pages",
            s.overflow_unused_bytes.into(),
            Some(s.overflow_unused_percent)
        )
    )?;
    writeln!(
        out,
        "{}",
        line("Unused bytes on all pages", s.total_unused_bytes.into(), Some(s.total_unused_percent))
    )?;
    writeln!(out)?;
    Ok(())
}

const DEFINITIONS: &[(&str, &str)] = &[
    ("Page size in bytes", "Bytes in a single page of the database file."),
    (
        "Number of pages in the whole file",
        "Pages that make up the complete database file, as recorded in its header.",
    ),
    (
        "Pages that store data",
        "Pages holding B-tree or overflow content. The percentage is relative to\n\
         every page in the file.",
    ),
    (
        "Pages on the freelist",
        "Pages not in use but kept for reuse. The calculated figure is derived from\n\
         page accounting and must match the header.",
    ),
    (
        "Pages of auto-vacuum overhead",
        "Pointer-map pages kept by auto-vacuum files. Zero when auto-vacuum is off.",
    ),
    (
        "Number of tables in the database",
        "Tables in the file, the schema catalog included.",
    ),
    ("Number of indices", "Indices of any origin."),
    ("Number of defined indices", "Indices created with an explicit CREATE INDEX."),
    (
        "Number of implied indices",
        "Indices the engine created to enforce PRIMARY KEY or UNIQUE constraints.",
    ),
    ("Size of the file in bytes", "Bytes the file occupies on disk."),
    (
        "Bytes of user payload stored",
        "Payload of all tables, excluding indices and the schema catalog. The\n\
         percentage is relative to the file size.",
    ),
    (
        "Percentage of total database",
        "Share of the file's pages used by this category.",
    ),
    ("Number of entries", "B-tree entries (rows or index keys) in this category."),
    (
        "Bytes of storage consumed",
        "Pages used by this category times the page size.",
    ),
    (
        "Bytes of payload",
        "Row data of tables and key data of indices. The percentage is relative\n\
         to the storage consumed.",
    ),
    (
        "Bytes of metadata",
        "Page headers, cell pointers, cell size fields, child and overflow\n\
         pointers and rowids: everything that is neither payload nor unused.",
    ),
    ("Average payload per entry", "Bytes of payload divided by the number of entries."),
    (
        "Average unused bytes per entry",
        "Unused bytes on all pages of the category divided by the number of entries.",
    ),
    (
        "Non-sequential pages",
        "Leaf pages that do not directly follow the previous leaf page in the file.\n\
         Sequential layouts favour fast scans on most filesystems.",
    ),
    ("Maximum payload per entry", "Largest payload of any single entry."),
    ("Entries that use overflow", "Entries whose payload spills onto overflow pages."),
    (
        "Total pages used",
        "Index, primary and overflow pages of this category together.",
    ),
    (
        "Index pages used",
        "Interior B-tree pages that only route searches toward the leaves.",
    ),
    ("Primary pages used", "Leaf pages holding entries."),
    ("Overflow pages used", "Pages holding payload that did not fit on its leaf."),
    (
        "Unused bytes on index pages",
        "Free space on interior pages, relative to their total size.",
    ),
    (
        "Unused bytes on primary pages",
        "Free space on leaf pages, relative to their total size.",
    ),
    (
        "Unused bytes on overflow pages",
        "Free space on overflow pages, relative to their total size.",
    ),
    (
        "Unused bytes on all pages",
        "Free space on every page of the category, relative to the storage consumed.",
    ),
];
