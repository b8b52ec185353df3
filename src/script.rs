//! Worker-script emission.
//!
//! Scripts are rendered from fixed templates by placeholder substitution.
//! Substitution is validated both ways against the template's placeholder
//! set: a parameter the template needs but the caller did not supply, or a
//! parameter the caller supplied but the template never uses, fails before
//! anything is written. Literal shell constructs like `${TMPDIR:-/tmp}` pass
//! through untouched (placeholders are lowercase `{name}` tokens only).
//!
//! Emission walks the chunk plan in ascending order, draws one seed per
//! chunk from the unit's [`SeedSequence`], and writes the worker script (and
//! the backend's submission descriptor) with the executable bit set. In
//! missing mode, chunks whose output already exists are skipped and their
//! stale submission artifacts removed, so an external submission sweep
//! re-queues only unfinished work. The seed is drawn before the missing gate;
//! skipping a chunk never shifts the seeds of the chunks after it.

use crate::backend::Backend;
use crate::catalog;
use crate::chunk::{self, ChunkRange};
use crate::config::RunConfig;
use crate::error::{MixError, Result};
use crate::paths::{self, ArtifactKind, UnitPaths, WorkUnit};
use crate::seeds::SeedSequence;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static pattern"));

/// Per-chunk worker script. The fitter writes into a scratch directory and
/// the log lands in its final location only after the job finishes.
const CHUNK_WORKER_TEMPLATE: &str = r#"#!/bin/bash

tmpdir="${TMPDIR:-/tmp}/{job_name}"
mkdir -p "$tmpdir"
cd "$tmpdir"

logbase=$(basename {logfile})
tmplog="$tmpdir/$logbase"

{fitter} \
    --fof-range={start},{stop} \
    --work-dir="$tmpdir" \
    --psf-map={psf_map} \
    {nbrs_flags}--seed={seed} \
    --output={output} \
    {config} {data_files} &> "$tmplog"

mv -f "$tmplog" {logfile}
"#;

/// Neighbor-data preparation script: same shape, keyed off the primary data
/// file with no chunk range.
const NBRS_WORKER_TEMPLATE: &str = r#"#!/bin/bash

tmpdir="${TMPDIR:-/tmp}/{job_name}"
mkdir -p "$tmpdir"
cd "$tmpdir"

logbase=$(basename {logfile})
tmplog="$tmpdir/$logbase"

{fitter}-make-nbrs \
    --work-dir="$tmpdir" \
    --fof-output={fof_output} \
    --nbrs-output={nbrs_output} \
    {config} {data_file} &> "$tmplog"

mv -f "$tmplog" {logfile}
"#;

/// Everything a backend needs to render one job's artifacts.
pub struct JobParams {
    /// Job name, the worker script's basename without extension.
    pub job_name: String,
    /// Queue the submission descriptor targets.
    pub queue: String,
    /// Path of the worker script, referenced by the descriptor.
    pub worker_path: PathBuf,
    /// Worker template to render.
    pub worker_template: &'static str,
    /// Substitution values for the worker template.
    pub worker_values: BTreeMap<&'static str, String>,
}

/// Emission switches shared by the setup actions.
pub struct EmitOptions {
    /// Skip chunks whose output already exists.
    pub missing: bool,
    /// Queue name for submission descriptors.
    pub queue: String,
}

/// What one emission pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Chunks in the plan.
    pub planned: usize,
    /// Scripts freshly written.
    pub written: usize,
    /// Chunks skipped because their output exists.
    pub skipped: usize,
}

/// Substitute `values` into `template`.
///
/// # Errors
/// [`MixError::InvalidConfiguration`] if the template references a parameter
/// not in `values`, or `values` carries a parameter the template never uses.
pub fn render_template(template: &str, values: &BTreeMap<&'static str, String>) -> Result<String> {
    let needed: BTreeSet<&str> = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|c| c.get(1).map(|m| m.as_str()).unwrap_or_default())
        .collect();
    for key in &needed {
        if !values.contains_key(*key) {
            return Err(MixError::InvalidConfiguration(format!(
                "template parameter {key:?} has no value"
            )));
        }
    }
    for key in values.keys() {
        if !needed.contains(*key) {
            return Err(MixError::InvalidConfiguration(format!(
                "template does not use parameter {key:?}"
            )));
        }
    }
    let out = PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        values[name].clone()
    });
    Ok(out.into_owned())
}

/// Countable rows for one unit: distinct FOF groups when neighbor modeling
/// is on, otherwise the primary catalog's row count.
///
/// # Errors
/// [`MixError::MissingData`] if the counted file is absent;
/// [`MixError::InvalidConfiguration`] if neighbor modeling is on but the
/// unit has no FOF file.
pub fn count_for_unit(cfg: &RunConfig, unit: &WorkUnit) -> Result<u64> {
    if cfg.model_nbrs {
        let fof = unit.fof_file.as_ref().ok_or_else(|| {
            MixError::InvalidConfiguration(format!(
                "unit {} has no FOF file but model_nbrs is enabled",
                unit.id
            ))
        })?;
        catalog::distinct_group_count(fof)
    } else {
        catalog::row_count(unit.primary())
    }
}

/// Emit per-chunk worker scripts (and submission descriptors) for one unit.
///
/// # Errors
/// Planning, counting, rendering, or write failures; see [`count_for_unit`]
/// and [`render_template`].
pub fn emit_unit(
    cfg: &RunConfig,
    config_path: &Path,
    unit: &WorkUnit,
    up: &UnitPaths,
    backend: Backend,
    opts: &EmitOptions,
    seeds: &mut SeedSequence,
) -> Result<EmitReport> {
    up.ensure_dir()?;
    let count = count_for_unit(cfg, unit)?;
    let ranges = chunk::plan(count, cfg.chunk_size)?;
    info!(
        unit = %unit.id,
        rows = count,
        chunks = ranges.len(),
        backend = backend.name(),
        "planned chunk grid"
    );

    let mut report = EmitReport {
        planned: ranges.len(),
        ..Default::default()
    };
    for range in ranges {
        let seed = seeds.draw();
        let output = up.chunk(range, ArtifactKind::Output);
        let script_path = up.chunk(range, ArtifactKind::Script);
        let submit_path = up.chunk(range, ArtifactKind::Submit);

        if opts.missing && output.exists() {
            remove_stale(&submit_path)?;
            remove_stale(&up.chunk(range, ArtifactKind::Marker))?;
            debug!(unit = %unit.id, chunk = %range, "output present, skipping");
            report.skipped += 1;
            continue;
        }

        remove_stale(&script_path)?;
        let job = chunk_job(cfg, config_path, unit, up, range, seed, &opts.queue);
        let rendered = backend.render(&job)?;
        write_executable(&script_path, &rendered.worker)?;
        if let Some(text) = rendered.submit {
            write_executable(&submit_path, &text)?;
        }
        debug!(unit = %unit.id, chunk = %range, seed, "wrote worker script");
        report.written += 1;
    }
    Ok(report)
}

/// Emit the neighbor-data preparation job for one unit.
///
/// The job has no chunk range; its outputs are the unit's FOF and neighbor
/// files, which later `setup` passes count against.
///
/// # Errors
/// [`MixError::InvalidConfiguration`] if the unit lacks FOF/neighbor
/// destinations; rendering or write failures otherwise.
pub fn emit_nbrs(
    cfg: &RunConfig,
    config_path: &Path,
    unit: &WorkUnit,
    up: &UnitPaths,
    backend: Backend,
    opts: &EmitOptions,
) -> Result<EmitReport> {
    up.ensure_dir()?;
    let (fof_output, nbrs_output) = match (&unit.fof_file, &unit.nbrs_file) {
        (Some(f), Some(n)) => (f.clone(), n.clone()),
        _ => {
            return Err(MixError::InvalidConfiguration(format!(
                "unit {} has no FOF/neighbor destinations for setup-nbrs",
                unit.id
            )));
        }
    };

    let mut report = EmitReport {
        planned: 1,
        ..Default::default()
    };
    let script_path = up.nbrs(ArtifactKind::Script);
    let submit_path = up.nbrs(ArtifactKind::Submit);
    if opts.missing && fof_output.exists() && nbrs_output.exists() {
        remove_stale(&submit_path)?;
        remove_stale(&up.nbrs(ArtifactKind::Marker))?;
        debug!(unit = %unit.id, "neighbor data present, skipping");
        report.skipped = 1;
        return Ok(report);
    }

    remove_stale(&script_path)?;
    let job_name = paths::file_stem(&script_path);
    let worker_values = BTreeMap::from([
        ("job_name", job_name.clone()),
        ("fitter", cfg.fitter.clone()),
        ("logfile", up.nbrs(ArtifactKind::Log).display().to_string()),
        ("fof_output", fof_output.display().to_string()),
        ("nbrs_output", nbrs_output.display().to_string()),
        ("config", config_path.display().to_string()),
        ("data_file", unit.primary().display().to_string()),
    ]);
    let job = JobParams {
        job_name,
        queue: opts.queue.clone(),
        worker_path: script_path.clone(),
        worker_template: NBRS_WORKER_TEMPLATE,
        worker_values,
    };
    let rendered = backend.render(&job)?;
    write_executable(&script_path, &rendered.worker)?;
    if let Some(text) = rendered.submit {
        write_executable(&submit_path, &text)?;
    }
    debug!(unit = %unit.id, "wrote neighbor-prep script");
    report.written = 1;
    Ok(report)
}

fn chunk_job(
    cfg: &RunConfig,
    config_path: &Path,
    unit: &WorkUnit,
    up: &UnitPaths,
    range: ChunkRange,
    seed: u32,
    queue: &str,
) -> JobParams {
    let script_path = up.chunk(range, ArtifactKind::Script);
    let job_name = paths::file_stem(&script_path);
    let nbrs_flags = match (&unit.fof_file, &unit.nbrs_file) {
        (Some(fof), Some(nbrs)) if cfg.model_nbrs => format!(
            "--fof-file={} \\\n    --nbrs-file={} \\\n    ",
            fof.display(),
            nbrs.display()
        ),
        _ => String::new(),
    };
    let worker_values = BTreeMap::from([
        ("job_name", job_name.clone()),
        ("fitter", cfg.fitter.clone()),
        ("start", range.start.to_string()),
        ("stop", range.stop.to_string()),
        ("psf_map", unit.psf_map.display().to_string()),
        ("nbrs_flags", nbrs_flags),
        ("seed", seed.to_string()),
        (
            "output",
            up.chunk(range, ArtifactKind::Output).display().to_string(),
        ),
        (
            "logfile",
            up.chunk(range, ArtifactKind::Log).display().to_string(),
        ),
        ("config", config_path.display().to_string()),
        ("data_files", unit.data_file_args()),
    ]);
    JobParams {
        job_name,
        queue: queue.to_string(),
        worker_path: script_path,
        worker_template: CHUNK_WORKER_TEMPLATE,
        worker_values,
    }
}

/// Remove a possibly stale artifact; absence is fine.
pub fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MixError::unit_io(path, e)),
    }
}

/// Write `text` to `path` and mark it executable.
fn write_executable(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| MixError::unit_io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o755);
        fs::set_permissions(path, perms).map_err(|e| MixError::unit_io(path, e))?;
    }
    Ok(())
}
