//! Fault taxonomy for the orchestrator.
//!
//! Errors fall into two classes: faults local to one work unit
//! ([`MixError::MissingData`], [`MixError::UnitIo`], [`MixError::Concat`]),
//! which a tile-batch run recovers from and counts, and configuration-level
//! faults ([`MixError::InvalidConfiguration`],
//! [`MixError::UnsupportedBackend`]), which always abort the whole run.
//! [`MixError::is_tile_recoverable`] encodes that split in one place so the
//! batch runner and the CLI agree on it.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause for I/O-adjacent failures (raw `io::Error`, JSON parse
/// errors, and similar).
pub type IoCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All faults the orchestrator can surface.
#[derive(Debug, Error)]
pub enum MixError {
    /// Malformed or missing required settings. Fatal, never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A required input file is absent.
    #[error("missing input data: {}", path.display())]
    MissingData { path: PathBuf },

    /// A readable/writable resource was unexpectedly inaccessible.
    #[error("i/o failure on {}: {source}", path.display())]
    UnitIo {
        path: PathBuf,
        #[source]
        source: IoCause,
    },

    /// Collation could not produce a valid merged output.
    #[error("collation failed: {0}")]
    Concat(String),

    /// The requested backend identifier is not recognized.
    #[error("unsupported backend {0:?} (expected one of: local, slurm, lsf)")]
    UnsupportedBackend(String),
}

impl MixError {
    /// Wrap an I/O-adjacent failure with the path it occurred on.
    pub fn unit_io(path: impl Into<PathBuf>, source: impl Into<IoCause>) -> Self {
        Self::UnitIo {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Classify an `io::Error` on `path`: not-found becomes
    /// [`MixError::MissingData`], everything else [`MixError::UnitIo`].
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::MissingData { path }
        } else {
            Self::UnitIo {
                path,
                source: Box::new(err),
            }
        }
    }

    /// Whether a tile-batch run may log this fault and continue with the
    /// next tile. Configuration and backend-selection errors abort the run.
    pub fn is_tile_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingData { .. } | Self::UnitIo { .. } | Self::Concat(_)
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MixError>;
