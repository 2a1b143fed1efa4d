//! Page record source backed by the SQLite `dbstat` virtual table
//!
//! The file is opened read-only. On open the whole `dbstat` table is
//! snapshotted into a temp table ordered by object name and path, so each
//! later per-object query is a cheap indexed read and every object sees
//! the same consistent view of the file.

use crate::error::{Error, PageNumber, Result};
use crate::page::RawPageRecord;
use crate::source::{
    AutoVacuum, FileInfo, IndexInfo, PageRecordSource, SchemaObject, DEFAULT_CATALOG_NAME,
};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SNAPSHOT_SQL: &str = "
    CREATE VIRTUAL TABLE temp.stat USING dbstat;
    CREATE TEMP TABLE space_stat AS SELECT * FROM temp.stat ORDER BY name, path;
    DROP TABLE temp.stat;
    CREATE INDEX temp.space_stat_name ON space_stat(name);
";

const PAGES_SQL: &str = "
    SELECT pageno, pagetype, ncell, payload, unused, mx_payload, path, pgsize
    FROM temp.space_stat
    WHERE name = ?1
    ORDER BY path";

/// Database file opened through SQLite
pub struct SqliteSource {
    conn: Connection,
    path: PathBuf,
    catalog_name: String,
    /// Name `dbstat` uses for the schema table (differs between versions)
    stat_catalog_name: String,
}

impl SqliteSource {
    /// Open `path` read-only and snapshot its page statistics
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_catalog_name(path, DEFAULT_CATALOG_NAME)
    }

    /// Open `path`, reporting the schema catalog under `catalog_name`
    pub fn open_with_catalog_name(path: impl AsRef<Path>, catalog_name: &str) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        if !has_dbstat(&conn)? {
            return Err(Error::StatUnavailable(
                "SQLite was built without SQLITE_ENABLE_DBSTAT_VTAB".into(),
            ));
        }

        conn.execute_batch(SNAPSHOT_SQL)?;

        // Page 1 always holds the root of the schema table.
        let stat_catalog_name: String = conn
            .query_row("SELECT name FROM temp.space_stat WHERE pageno = 1", [], |row| row.get(0))
            .unwrap_or_else(|_| DEFAULT_CATALOG_NAME.to_string());

        debug!(path = %path.display(), %stat_catalog_name, "page statistics snapshot ready");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            catalog_name: catalog_name.to_string(),
            stat_catalog_name,
        })
    }

    fn pragma_u64(&self, name: &str) -> Result<u64> {
        let value: i64 = self.conn.pragma_query_value(None, name, |row| row.get(0))?;
        u64::try_from(value).map_err(|_| Error::Sqlite(format!("PRAGMA {name} returned {value}")))
    }
}

fn has_dbstat(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM pragma_compile_options WHERE compile_options = 'ENABLE_DBSTAT_VTAB'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: Option<i64> = row.get(idx)?;
    Ok(value.unwrap_or(0).max(0) as u64)
}

impl PageRecordSource for SqliteSource {
    fn list_schema_objects(&self) -> Result<Vec<SchemaObject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, tbl_name FROM sqlite_master WHERE rootpage > 0")?;
        let mut objects = stmt
            .query_map([], |row| {
                Ok(SchemaObject { name: row.get(0)?, owning_table_name: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        objects.push(SchemaObject::table(self.catalog_name.clone()));
        Ok(objects)
    }

    fn page_records_for_object(
        &self,
        name: &str,
        visit: &mut dyn FnMut(RawPageRecord),
    ) -> Result<()> {
        let stat_name =
            if name == self.catalog_name { self.stat_catalog_name.as_str() } else { name };

        let mut stmt = self.conn.prepare_cached(PAGES_SQL)?;
        let mut rows = stmt.query([stat_name])?;
        while let Some(row) = rows.next()? {
            let page_type: String = row.get(1)?;
            visit(RawPageRecord {
                object_name: name.to_string(),
                page_number: PageNumber(column_u64(row, 0)?),
                page_type: page_type.parse()?,
                cell_count: column_u64(row, 2)?,
                payload_bytes: column_u64(row, 3)?,
                unused_bytes: column_u64(row, 4)?,
                max_cell_payload: column_u64(row, 5)?,
                structural_path: row.get(6)?,
                page_size_on_disk: column_u64(row, 7)?,
            });
        }
        Ok(())
    }

    fn file_info(&self) -> Result<FileInfo> {
        let auto_vacuum: i64 = self.conn.pragma_query_value(None, "auto_vacuum", |row| row.get(0))?;
        Ok(FileInfo {
            page_size: self.pragma_u64("page_size")?,
            page_count: self.pragma_u64("page_count")?,
            freelist_count: self.pragma_u64("freelist_count")?,
            auto_vacuum: AutoVacuum::from_pragma(auto_vacuum),
            file_byte_size: std::fs::metadata(&self.path)?.len(),
        })
    }

    fn index_list(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let mut stmt = self.conn.prepare_cached("SELECT name, origin FROM pragma_index_list(?1)")?;
        let mut rows = stmt.query([table])?;
        let mut indexes = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let origin: String = row.get(1)?;
            match origin.parse() {
                Ok(origin) => indexes.push(IndexInfo { name, origin }),
                Err(err) => warn!(%table, index = %name, %err, "skipping index with unknown origin"),
            }
        }
        Ok(indexes)
    }
}
