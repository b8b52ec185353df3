//! Chunk planning: slicing a work unit's rows into fixed-size ranges.
//!
//! A [`ChunkRange`] is a contiguous, inclusive `[start, stop]` index range.
//! [`plan`] covers `[0, total_count - 1]` with `ceil(total_count / chunk_size)`
//! disjoint ranges in ascending order. Planning is pure and stateless, so the
//! same inputs always reproduce the same ranges; the missing-output sweep and
//! collation both rely on that.

use crate::error::{MixError, Result};
use std::fmt;

/// One contiguous slice of a work unit's rows, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    /// First row index covered by this chunk.
    pub start: u64,
    /// Last row index covered by this chunk (inclusive).
    pub stop: u64,
}

impl ChunkRange {
    /// Number of rows in the range. Ranges are never empty by construction.
    pub fn len(&self) -> u64 {
        self.stop - self.start + 1
    }

    /// The zero-padded `start-stop` tag used in artifact file names.
    pub fn tag(&self) -> String {
        format!("{:06}-{:06}", self.start, self.stop)
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.stop)
    }
}

/// Plan the ordered chunk ranges covering `total_count` rows.
///
/// For `total_count == 0` the plan is empty. The final range is truncated to
/// end at `total_count - 1` even when shorter than `chunk_size`.
///
/// # Errors
/// Returns [`MixError::InvalidConfiguration`] if `chunk_size` is zero.
pub fn plan(total_count: u64, chunk_size: u64) -> Result<Vec<ChunkRange>> {
    if chunk_size == 0 {
        return Err(MixError::InvalidConfiguration(
            "chunk_size must be a positive integer".into(),
        ));
    }
    if total_count == 0 {
        return Ok(Vec::new());
    }
    let n_chunks = total_count.div_ceil(chunk_size);
    let mut ranges = Vec::with_capacity(n_chunks as usize);
    for i in 0..n_chunks {
        let start = i * chunk_size;
        let stop = (start + chunk_size - 1).min(total_count - 1);
        ranges.push(ChunkRange { start, stop });
    }
    Ok(ranges)
}
