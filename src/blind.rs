//! Deterministic blinding of sensitive output columns.
//!
//! Shear-like columns are scaled by a factor derived from the run name, so
//! collaborators producing the same named run reproduce bit-identical
//! blinded catalogs. The factor lies in `[0.9, 1.0)` and does not depend on
//! row order.

use sha2::{Digest, Sha256};

/// Columns scaled during blinding.
pub const BLIND_COLUMNS: &[&str] = &["g_1", "g_2"];

/// Derive the blinding factor for a key, uniform in `[0.9, 1.0)`.
pub fn blind_factor(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    // Top 53 bits of the digest, mapped to [0, 1).
    let unit = (u64::from_be_bytes(word) >> 11) as f64 / (1u64 << 53) as f64;
    0.9 + 0.1 * unit
}
