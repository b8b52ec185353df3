//! Catalog file collaborator: row-level I/O over newline-delimited JSON.
//!
//! The orchestrator treats catalogs as opaque row sets; the only structure it
//! reads is the row count and, for neighbor-modeled runs, the group-id column
//! of the FOF membership file. Rows are JSON objects, one per line;
//! empty/whitespace-only lines are skipped on read.

use crate::error::{MixError, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One catalog row: a flat JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Column holding the friends-of-friends group identifier.
pub const GROUP_ID_COLUMN: &str = "fofid";

/// Read every row of a catalog file into memory.
///
/// # Errors
/// [`MixError::MissingData`] if the file is absent, [`MixError::UnitIo`] for
/// read or parse failures (with the offending line number in the cause).
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| MixError::from_io(path, e))?;
    let rdr = BufReader::new(f);
    let mut out = Vec::new();
    for (i, line) in rdr.lines().enumerate() {
        let line = line.map_err(|e| MixError::unit_io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line).map_err(|e| {
            MixError::unit_io(path, format!("parse row on line {}: {e}", i + 1))
        })?;
        out.push(row);
    }
    Ok(out)
}

/// Write rows as newline-delimited JSON, creating parent directories as
/// needed.
///
/// # Returns
/// The number of rows written.
///
/// # Errors
/// [`MixError::UnitIo`] if the file or its directories cannot be created or
/// any row fails to serialize/flush.
pub fn write_rows(path: impl AsRef<Path>, rows: &[Row]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|e| MixError::unit_io(parent, e))?;
    }
    let f = File::create(path).map_err(|e| MixError::unit_io(path, e))?;
    let mut w = BufWriter::new(f);
    for row in rows {
        serde_json::to_writer(&mut w, row).map_err(|e| MixError::unit_io(path, e))?;
        w.write_all(b"\n").map_err(|e| MixError::unit_io(path, e))?;
    }
    w.flush().map_err(|e| MixError::unit_io(path, e))?;
    Ok(rows.len())
}

/// Count the rows of a catalog file without parsing them.
///
/// # Errors
/// [`MixError::MissingData`] if the file is absent, [`MixError::UnitIo`] on
/// read failure.
pub fn row_count(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| MixError::from_io(path, e))?;
    let rdr = BufReader::new(f);
    let mut total = 0u64;
    for line in rdr.lines() {
        let line = line.map_err(|e| MixError::unit_io(path, e))?;
        if !line.trim().is_empty() {
            total += 1;
        }
    }
    Ok(total)
}

/// Count distinct [`GROUP_ID_COLUMN`] values in a FOF membership file.
///
/// # Errors
/// [`MixError::MissingData`] if the file is absent; [`MixError::UnitIo`] if a
/// row is unreadable or lacks an integer group id.
pub fn distinct_group_count(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    let mut groups = HashSet::new();
    for (i, row) in rows.iter().enumerate() {
        let id = row.get(GROUP_ID_COLUMN).and_then(Value::as_i64).ok_or_else(|| {
            MixError::unit_io(
                path,
                format!("row {} has no integer {GROUP_ID_COLUMN} column", i + 1),
            )
        })?;
        groups.insert(id);
    }
    Ok(groups.len() as u64)
}
