//! Tile-batch running with per-tile fault isolation.
//!
//! A batch run resolves each tile id to its file set and invokes the
//! requested action exactly as a single-unit invocation would. Faults local
//! to one tile (missing data, unit I/O, collation) are logged with the tile
//! id and counted; the batch moves on. Anything else aborts the batch.

use crate::error::{MixError, Result};
use crate::paths::{TileLayout, WorkUnit};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{error, info};

/// One tile the batch could not process.
#[derive(Debug)]
pub struct TileFailure {
    /// The offending tile.
    pub tile_id: String,
    /// Short cause string.
    pub cause: String,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tiles processed successfully.
    pub processed: usize,
    /// Tiles that failed with a recoverable fault.
    pub failures: Vec<TileFailure>,
}

/// Read a tile list: one tile id per line, `#` comments and blank lines
/// skipped.
///
/// # Errors
/// [`MixError::MissingData`] if the list is absent, [`MixError::UnitIo`] on
/// read failure.
pub fn read_tile_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| MixError::from_io(path, e))?;
    let rdr = BufReader::new(f);
    let mut ids = Vec::new();
    for line in rdr.lines() {
        let line = line.map_err(|e| MixError::unit_io(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ids.push(line.to_string());
    }
    Ok(ids)
}

/// Run `action` over every tile, isolating recoverable per-tile faults.
///
/// # Errors
/// Propagates the first non-recoverable fault (configuration or backend
/// errors are never swallowed).
pub fn run_batch<F>(tile_ids: &[String], layout: &TileLayout, mut action: F) -> Result<BatchReport>
where
    F: FnMut(&WorkUnit) -> Result<()>,
{
    let mut report = BatchReport::default();
    for tile_id in tile_ids {
        let unit = layout.resolve(tile_id);
        match action(&unit) {
            Ok(()) => report.processed += 1,
            Err(e) if e.is_tile_recoverable() => {
                error!(tile = %tile_id, cause = %e, "tile failed, continuing");
                report.failures.push(TileFailure {
                    tile_id: tile_id.clone(),
                    cause: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        processed = report.processed,
        failed = report.failures.len(),
        "batch finished"
    );
    Ok(report)
}
