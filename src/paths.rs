//! Work units and deterministic artifact path resolution.
//!
//! Every job artifact lives under `{output_dir}/{run_name}/{unit_id}/` with a
//! name derived from the unit id, the run name, and either a chunk range or
//! the neighbor tag. Resolution is pure: the same inputs always produce the
//! same path, and two distinct selectors never collide (chunk names carry a
//! zero-padded range tag, neighbor names carry the literal `nbrs` tag, and
//! the collated output sits in its own `output/` subdirectory).

use crate::chunk::ChunkRange;
use crate::error::{MixError, Result};
use regex::Regex;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static pattern")
});

/// The artifact kinds emitted or consumed for one job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The executable worker script.
    Script,
    /// The cluster submission descriptor.
    Submit,
    /// Marker recording that the descriptor was handed to the queue.
    Marker,
    /// The chunk's result catalog, written by the fitter.
    Output,
    /// The job log.
    Log,
}

impl ArtifactKind {
    /// File extension for this kind.
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Script => "sh",
            Self::Submit => "slr",
            Self::Marker => "submitted",
            Self::Output => "jsonl",
            Self::Log => "log",
        }
    }
}

/// One catalog file-set for one tile, read-only for the lifetime of a run.
#[derive(Clone, Debug)]
pub struct WorkUnit {
    /// Stable identifier, the file stem of the first band's data file.
    pub id: String,
    /// Primary data files, one per configured band, in band order.
    pub data_files: Vec<PathBuf>,
    /// PSF map consumed by the fitter.
    pub psf_map: PathBuf,
    /// FOF group-membership file (neighbor-modeled runs only).
    pub fof_file: Option<PathBuf>,
    /// Neighbor data file (neighbor-modeled runs only).
    pub nbrs_file: Option<PathBuf>,
}

impl WorkUnit {
    /// Build a unit from an explicit file list.
    ///
    /// # Errors
    /// [`MixError::InvalidConfiguration`] if `data_files` is empty.
    pub fn from_files(
        data_files: Vec<PathBuf>,
        psf_map: PathBuf,
        fof_file: Option<PathBuf>,
        nbrs_file: Option<PathBuf>,
    ) -> Result<Self> {
        let first = data_files.first().ok_or_else(|| {
            MixError::InvalidConfiguration("at least one data file is required".into())
        })?;
        let id = file_stem(first);
        Ok(Self {
            id,
            data_files,
            psf_map,
            fof_file,
            nbrs_file,
        })
    }

    /// The first band's data file, used for row counting.
    pub fn primary(&self) -> &Path {
        &self.data_files[0]
    }

    /// Space-joined data file list as it appears on the fitter command line.
    pub fn data_file_args(&self) -> String {
        self.data_files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Directory-naming collaborator: resolves a tile id to its file set.
#[derive(Clone, Debug)]
pub struct TileLayout {
    /// Base directory holding one subdirectory per tile.
    pub tile_dir: PathBuf,
    /// Band identifiers, in catalog order.
    pub bands: Vec<String>,
    /// Whether FOF/neighbor files are part of the file set.
    pub model_nbrs: bool,
}

impl TileLayout {
    /// Resolve the file set for one tile.
    pub fn resolve(&self, tile_id: &str) -> WorkUnit {
        let dir = self.tile_dir.join(tile_id);
        let data_files = self
            .bands
            .iter()
            .map(|band| dir.join(format!("{tile_id}_{band}_meds.jsonl")))
            .collect();
        let (fof_file, nbrs_file) = if self.model_nbrs {
            (
                Some(dir.join(format!("{tile_id}_fofs.jsonl"))),
                Some(dir.join(format!("{tile_id}_nbrs.jsonl"))),
            )
        } else {
            (None, None)
        };
        WorkUnit {
            id: tile_id.to_string(),
            data_files,
            psf_map: dir.join(format!("{tile_id}_psf_map.txt")),
            fof_file,
            nbrs_file,
        }
    }
}

/// Resolved artifact paths for one work unit under one run.
#[derive(Clone, Debug)]
pub struct UnitPaths {
    dir: PathBuf,
    unit_id: String,
    run_name: String,
}

impl UnitPaths {
    /// Resolve the unit directory under `{output_dir}/{run_name}/{unit_id}`.
    pub fn new(output_dir: &Path, run_name: &str, unit_id: &str) -> Self {
        Self {
            dir: output_dir.join(run_name).join(unit_id),
            unit_id: unit_id.to_string(),
            run_name: run_name.to_string(),
        }
    }

    /// The unit's artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a chunk-level artifact:
    /// `{unit}-{run}-{start:06}-{stop:06}.{ext}`.
    pub fn chunk(&self, range: ChunkRange, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}.{}",
            self.unit_id,
            self.run_name,
            range.tag(),
            kind.ext()
        ))
    }

    /// Path of a neighbor-job artifact: `{unit}-{run}-nbrs.{ext}`.
    pub fn nbrs(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-nbrs.{}",
            self.unit_id,
            self.run_name,
            kind.ext()
        ))
    }

    /// Path of the collated output: `output/{unit}-{run}.jsonl`.
    pub fn collated(&self) -> PathBuf {
        self.dir
            .join("output")
            .join(format!("{}-{}.jsonl", self.unit_id, self.run_name))
    }

    /// Create the unit directory (idempotent).
    ///
    /// # Errors
    /// [`MixError::UnitIo`] if creation fails.
    pub fn ensure_dir(&self) -> Result<()> {
        create_dir_all(&self.dir).map_err(|e| MixError::unit_io(&self.dir, e))
    }
}

/// File stem of a path: the final component with its last extension removed.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Expand `~`, `$VAR`, and `${VAR}` references and absolutize the result.
///
/// Unset variables expand to the empty string, matching shell behavior.
///
/// # Errors
/// [`MixError::UnitIo`] if the current directory is unavailable for
/// absolutization.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let mut s = raw.to_string();
    if s == "~" || s.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        s = format!("{home}{}", &s[1..]);
    }
    let expanded = VAR_RE.replace_all(&s, |caps: &regex::Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        std::env::var(name).unwrap_or_default()
    });
    let p = PathBuf::from(expanded.into_owned());
    std::path::absolute(&p).map_err(|e| MixError::unit_io(&p, e))
}
