//! Space usage analysis for SQLite database files
//!
//! This crate reads page geometry of every B-tree in a database file,
//! condenses it into one row of sums per table and index, and derives
//! space statistics (payload, metadata and unused bytes, fragmentation,
//! overflow usage, free-list accounting) for any selection of objects.
//!
//! ```no_run
//! use spaceanalyzer::{Selector, SpaceAnalyzer};
//!
//! # fn main() -> spaceanalyzer::Result<()> {
//! let analyzer = SpaceAnalyzer::open("app.db")?;
//! let stats = analyzer.stats(&Selector::TableWithIndices("users".into()))?;
//! println!("{} pages, {:.1}% unused", stats.total_pages, stats.total_unused_percent);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod analyzer;
pub mod dump;
pub mod error;
pub mod estimate;
pub mod extract;
pub mod metrics;
pub mod page;
pub mod preflight;
pub mod report;
pub mod source;
pub mod sqlite;
pub mod store;

// Re-exports
pub use analyzer::{AnalyzerBuilder, SpaceAnalyzer, TableUsage};
pub use error::{Error, PageNumber, Result};
pub use estimate::FreelistCheck;
pub use metrics::SpaceStats;
pub use page::{PageType, RawPageRecord};
pub use report::{ClassicReport, Sections};
pub use source::{
    AutoVacuum, FileInfo, IndexInfo, IndexOrigin, MemorySource, PageRecordSource, SchemaObject,
};
pub use sqlite::SqliteSource;
pub use store::{AggregateStore, ObjectRow, Selector};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
