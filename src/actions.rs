//! Command-level actions over one work unit.
//!
//! Each action is the single-unit body that the tile-batch runner wraps:
//! `setup` emits the chunk grid's scripts, `setup-nbrs` the neighbor-prep
//! job, `collate` merges chunk outputs, and `verify`/`clean`/`archive`
//! manage the artifacts a finished (or stuck) run leaves behind.

use crate::backend::Backend;
use crate::chunk;
use crate::collate::{self, CollateOptions, CollateReport};
use crate::config::RunConfig;
use crate::error::{MixError, Result};
use crate::paths::{ArtifactKind, UnitPaths, WorkUnit};
use crate::script::{self, EmitOptions, EmitReport};
use crate::seeds::SeedSequence;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Shared, read-only inputs for every action in one run.
pub struct ActionContext<'a> {
    /// The validated run configuration.
    pub cfg: &'a RunConfig,
    /// Absolute path of the configuration file, referenced by scripts.
    pub config_path: PathBuf,
    /// Selected submission backend.
    pub backend: Backend,
    /// Queue name for submission descriptors.
    pub queue: String,
    /// Regenerate only artifacts for chunks lacking output.
    pub missing: bool,
    /// Apply blinding during collation.
    pub blind: bool,
    /// Overwrite an existing collated output.
    pub clobber: bool,
    /// Tolerate unreadable chunks during collation.
    pub skip_errors: bool,
    /// Compress logs when archiving.
    pub compress: bool,
    /// Seed override from the command line.
    pub seed: Option<u64>,
}

impl ActionContext<'_> {
    fn unit_paths(&self, unit: &WorkUnit) -> Result<UnitPaths> {
        Ok(UnitPaths::new(
            &self.cfg.output_dir()?,
            &self.cfg.run_name,
            &unit.id,
        ))
    }

    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            missing: self.missing,
            queue: self.queue.clone(),
        }
    }
}

/// Emit per-chunk worker scripts for one unit.
///
/// # Errors
/// Seed resolution, counting, or emission failures.
pub fn setup(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<EmitReport> {
    if unit.psf_map.as_os_str().is_empty() {
        return Err(MixError::InvalidConfiguration(format!(
            "unit {} has no PSF map (pass --psf-map)",
            unit.id
        )));
    }
    let seed = ctx.cfg.resolve_seed(ctx.seed)?;
    let mut seeds = SeedSequence::for_unit(seed, &unit.id);
    let up = ctx.unit_paths(unit)?;
    script::emit_unit(
        ctx.cfg,
        &ctx.config_path,
        unit,
        &up,
        ctx.backend,
        &ctx.emit_options(),
        &mut seeds,
    )
}

/// Emit the neighbor-data preparation job for one unit.
///
/// # Errors
/// [`MixError::InvalidConfiguration`] unless neighbor modeling is enabled.
pub fn setup_nbrs(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<EmitReport> {
    if !ctx.cfg.model_nbrs {
        return Err(MixError::InvalidConfiguration(
            "setup-nbrs requires model_nbrs: true".into(),
        ));
    }
    let up = ctx.unit_paths(unit)?;
    script::emit_nbrs(
        ctx.cfg,
        &ctx.config_path,
        unit,
        &up,
        ctx.backend,
        &ctx.emit_options(),
    )
}

/// Merge one unit's chunk outputs into its collated catalog.
///
/// # Errors
/// Counting or collation failures; see [`collate::collate`].
pub fn collate_unit(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<CollateReport> {
    let up = ctx.unit_paths(unit)?;
    let count = script::count_for_unit(ctx.cfg, unit)?;
    let ranges = chunk::plan(count, ctx.cfg.chunk_size)?;
    let chunks: Vec<_> = ranges
        .into_iter()
        .map(|r| (r, up.chunk(r, ArtifactKind::Output)))
        .collect();
    let opts = CollateOptions::from_config(ctx.cfg, ctx.blind, ctx.clobber, ctx.skip_errors);
    collate::collate(&chunks, &up.collated(), &opts)
}

/// What `verify` found for one unit.
#[derive(Debug)]
pub struct VerifyReport {
    /// Chunks in the plan.
    pub planned: usize,
    /// Planned chunks whose output file is absent.
    pub missing_chunks: Vec<chunk::ChunkRange>,
    /// Whether the collated output exists.
    pub collated_exists: bool,
}

/// Report which chunk outputs are still missing for one unit. Never mutates.
///
/// # Errors
/// Counting or planning failures.
pub fn verify_unit(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<VerifyReport> {
    let up = ctx.unit_paths(unit)?;
    let count = script::count_for_unit(ctx.cfg, unit)?;
    let ranges = chunk::plan(count, ctx.cfg.chunk_size)?;
    let planned = ranges.len();
    let missing_chunks: Vec<_> = ranges
        .into_iter()
        .filter(|r| !up.chunk(*r, ArtifactKind::Output).exists())
        .collect();
    let collated_exists = up.collated().exists();
    if missing_chunks.is_empty() {
        info!(unit = %unit.id, chunks = planned, collated = collated_exists, "all chunk outputs present");
    } else {
        warn!(
            unit = %unit.id,
            missing = missing_chunks.len(),
            chunks = planned,
            "chunk outputs missing"
        );
    }
    Ok(VerifyReport {
        planned,
        missing_chunks,
        collated_exists,
    })
}

/// Remove one unit's chunk-level artifacts, keeping the collated output.
///
/// # Returns
/// The number of files removed.
///
/// # Errors
/// Counting, planning, or removal failures.
pub fn clean_unit(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<usize> {
    const CHUNK_KINDS: &[ArtifactKind] = &[
        ArtifactKind::Script,
        ArtifactKind::Submit,
        ArtifactKind::Marker,
        ArtifactKind::Output,
        ArtifactKind::Log,
    ];
    let up = ctx.unit_paths(unit)?;
    let count = script::count_for_unit(ctx.cfg, unit)?;
    let ranges = chunk::plan(count, ctx.cfg.chunk_size)?;
    let mut removed = 0usize;
    for range in ranges {
        for kind in CHUNK_KINDS {
            let path = up.chunk(range, *kind);
            if path.exists() {
                script::remove_stale(&path)?;
                removed += 1;
            }
        }
    }
    for kind in CHUNK_KINDS {
        let path = up.nbrs(*kind);
        if path.exists() {
            script::remove_stale(&path)?;
            removed += 1;
        }
    }
    info!(unit = %unit.id, removed, "cleaned chunk artifacts");
    Ok(removed)
}

/// Archive one unit's job logs into its `logs/` subdirectory, compressing
/// unless disabled (or compiled out).
///
/// # Returns
/// The number of logs archived.
///
/// # Errors
/// [`MixError::UnitIo`] on glob or file failures.
pub fn archive_unit(ctx: &ActionContext<'_>, unit: &WorkUnit) -> Result<usize> {
    let up = ctx.unit_paths(unit)?;
    let logs_dir = up.dir().join("logs");
    create_dir_all(&logs_dir).map_err(|e| MixError::unit_io(&logs_dir, e))?;
    let pattern = format!("{}/*.log", up.dir().display());
    let entries = glob::glob(&pattern)
        .map_err(|e| MixError::InvalidConfiguration(format!("bad log pattern: {e}")))?;
    let mut archived = 0usize;
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                let p = e.path().to_path_buf();
                return Err(MixError::unit_io(p, e.into_error()));
            }
        };
        if ctx.compress {
            gzip_into(&path, &logs_dir)?;
        } else {
            move_into(&path, &logs_dir)?;
        }
        archived += 1;
    }
    info!(unit = %unit.id, archived, compressed = ctx.compress, "archived logs");
    Ok(archived)
}

#[cfg(feature = "archive-gzip")]
fn gzip_into(src: &Path, dest_dir: &Path) -> Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use std::io::{BufReader, BufWriter};

    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dest = dest_dir.join(format!("{name}.gz"));
    let input = File::open(src).map_err(|e| MixError::unit_io(src, e))?;
    let out = File::create(&dest).map_err(|e| MixError::unit_io(&dest, e))?;
    let mut enc = GzEncoder::new(BufWriter::new(out), Compression::default());
    std::io::copy(&mut BufReader::new(input), &mut enc)
        .map_err(|e| MixError::unit_io(src, e))?;
    enc.finish().map_err(|e| MixError::unit_io(&dest, e))?;
    script::remove_stale(src)
}

#[cfg(not(feature = "archive-gzip"))]
fn gzip_into(src: &Path, dest_dir: &Path) -> Result<()> {
    move_into(src, dest_dir)
}

fn move_into(src: &Path, dest_dir: &Path) -> Result<()> {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dest = dest_dir.join(name);
    std::fs::rename(src, &dest).map_err(|e| MixError::unit_io(src, e))
}
