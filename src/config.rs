//! Run configuration: a validated YAML document, parsed once and shared
//! read-only for the whole run.
//!
//! Only recognized keys are accepted; unknown keys and missing required keys
//! fail at load time rather than surfacing as malformed artifacts later.

use crate::error::{MixError, Result};
use crate::paths::expand_path;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Collation flavor, selected by the `concat_type` key.
///
/// The flavors form a closed registry: `plain` concatenates chunk outputs
/// verbatim, `des` additionally derives per-band magnitude columns and
/// applies blinding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum ConcatKind {
    /// Concatenate rows only.
    #[serde(rename = "plain")]
    Plain,
    /// Concatenate, derive magnitudes, blind sensitive columns.
    #[serde(rename = "des")]
    #[default]
    Des,
}

impl fmt::Display for ConcatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Des => write!(f, "des"),
        }
    }
}

fn default_fitter() -> String {
    "tilefit".into()
}

/// The validated run configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Name of this processing run; part of every artifact name and the
    /// blinding key.
    pub run_name: String,
    /// Rows (or FOF groups) per chunk. Must be positive.
    pub chunk_size: u64,
    /// Whether neighbor modeling is enabled for this run.
    #[serde(default)]
    pub model_nbrs: bool,
    /// Band identifiers, in catalog order. Must be non-empty.
    pub bands: Vec<String>,
    /// Run seed; may instead be supplied with `--seed`.
    #[serde(default)]
    pub global_seed: Option<u64>,
    /// Collation flavor.
    #[serde(default)]
    pub concat_type: ConcatKind,
    /// Name of the fitting executable referenced by worker scripts.
    #[serde(default = "default_fitter")]
    pub fitter: String,
    /// Base output directory; `~` and `$VAR` references are expanded.
    pub output_dir: String,
}

impl RunConfig {
    /// Load and validate a YAML run configuration.
    ///
    /// # Errors
    /// [`MixError::InvalidConfiguration`] if the file is unreadable, fails to
    /// parse, contains unknown keys, or violates a field invariant.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MixError::InvalidConfiguration(format!("read {}: {e}", path.display()))
        })?;
        let cfg: Self = serde_yaml::from_str(&text).map_err(|e| {
            MixError::InvalidConfiguration(format!("parse {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.run_name.is_empty() {
            return Err(MixError::InvalidConfiguration(
                "run_name must not be empty".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(MixError::InvalidConfiguration(
                "chunk_size must be a positive integer".into(),
            ));
        }
        if self.bands.is_empty() {
            return Err(MixError::InvalidConfiguration(
                "bands must list at least one band".into(),
            ));
        }
        Ok(())
    }

    /// The expanded, absolute base output directory.
    ///
    /// # Errors
    /// [`MixError::UnitIo`] if absolutization fails.
    pub fn output_dir(&self) -> Result<PathBuf> {
        expand_path(&self.output_dir)
    }

    /// Resolve the run seed from the config or an explicit override.
    ///
    /// # Errors
    /// [`MixError::InvalidConfiguration`] when neither is present.
    pub fn resolve_seed(&self, override_seed: Option<u64>) -> Result<u64> {
        override_seed.or(self.global_seed).ok_or_else(|| {
            MixError::InvalidConfiguration(
                "no seed available: set global_seed in the config or pass --seed".into(),
            )
        })
    }
}
