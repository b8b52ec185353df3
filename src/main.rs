//! The `tilemix` command line.
//!
//! One surface selects an action over either a single explicit file set or a
//! tile list: `setup`, `setup-nbrs`, the collate family, `verify`, `clean`,
//! `archive`, and the `link` stub. Flags mirror the orchestration switches;
//! the run configuration carries everything else.

use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::str::FromStr;
use tilemix::actions::{self, ActionContext};
use tilemix::{Backend, MixError, RunConfig, TileLayout, WorkUnit, read_tile_list, run_batch};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tilemix",
    version,
    about = "Batch-job orchestrator for chunked catalog processing"
)]
struct Cli {
    /// Run configuration file (YAML).
    config: PathBuf,
    /// Action: setup, setup-nbrs, collate, verify, clean, archive, link.
    command: String,
    /// Data files for a single work unit, one per configured band.
    files: Vec<PathBuf>,

    /// Submission backend.
    #[arg(long, default_value = "local")]
    backend: String,
    /// Submission queue name.
    #[arg(long, default_value = "regular")]
    queue: String,
    /// Regenerate only artifacts for chunks lacking output.
    #[arg(long)]
    missing: bool,
    /// Disable blinding of sensitive columns during collation.
    #[arg(long)]
    noblind: bool,
    /// Overwrite an existing collated output.
    #[arg(long)]
    clobber: bool,
    /// Tolerate unreadable chunks during collation.
    #[arg(long = "skip-errors")]
    skip_errors: bool,
    /// Archive logs without compressing them.
    #[arg(long = "no-compress")]
    no_compress: bool,
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Random seed override.
    #[arg(long)]
    seed: Option<u64>,

    /// Process every tile listed in this file instead of explicit files.
    #[arg(long = "tile-list")]
    tile_list: Option<PathBuf>,
    /// Base directory holding one subdirectory per tile.
    #[arg(long = "tile-dir")]
    tile_dir: Option<PathBuf>,
    /// PSF map for an explicit work unit.
    #[arg(long = "psf-map")]
    psf_map: Option<PathBuf>,
    /// FOF group-membership file for an explicit work unit.
    #[arg(long = "fof-file")]
    fof_file: Option<PathBuf>,
    /// Neighbor data file for an explicit work unit.
    #[arg(long = "nbrs-file")]
    nbrs_file: Option<PathBuf>,
}

/// The resolved action. `Link` stays a named stub until symlink farms land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Setup,
    SetupNbrs,
    Collate,
    Verify,
    Clean,
    Archive,
    Link,
}

fn resolve_action(command: &str) -> Result<Action, MixError> {
    match command {
        "setup" => Ok(Action::Setup),
        "setup-nbrs" => Ok(Action::SetupNbrs),
        c if c.contains("collate") => Ok(Action::Collate),
        "verify" => Ok(Action::Verify),
        "clean" => Ok(Action::Clean),
        "archive" => Ok(Action::Archive),
        "link" => Ok(Action::Link),
        other => Err(MixError::InvalidConfiguration(format!(
            "unknown command {other:?}"
        ))),
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_action(
    ctx: &ActionContext<'_>,
    action: Action,
    unit: &WorkUnit,
) -> Result<(), MixError> {
    match action {
        Action::Setup => {
            let report = actions::setup(ctx, unit)?;
            info!(
                unit = %unit.id,
                planned = report.planned,
                written = report.written,
                skipped = report.skipped,
                "setup done"
            );
        }
        Action::SetupNbrs => {
            let report = actions::setup_nbrs(ctx, unit)?;
            info!(unit = %unit.id, written = report.written, skipped = report.skipped, "setup-nbrs done");
        }
        Action::Collate => {
            let report = actions::collate_unit(ctx, unit)?;
            info!(
                unit = %unit.id,
                rows = report.rows_written,
                skipped_chunks = report.chunks_skipped,
                dest = %report.dest.display(),
                "collate done"
            );
        }
        Action::Verify => {
            actions::verify_unit(ctx, unit)?;
        }
        Action::Clean => {
            actions::clean_unit(ctx, unit)?;
        }
        Action::Archive => {
            actions::archive_unit(ctx, unit)?;
        }
        Action::Link => unreachable!("link is rejected before dispatch"),
    }
    Ok(())
}

fn unit_from_cli(cli: &Cli, cfg: &RunConfig) -> Result<WorkUnit, MixError> {
    if cli.files.len() != cfg.bands.len() {
        return Err(MixError::InvalidConfiguration(format!(
            "expected {} data files (one per band), got {}",
            cfg.bands.len(),
            cli.files.len()
        )));
    }
    WorkUnit::from_files(
        cli.files.clone(),
        cli.psf_map.clone().unwrap_or_default(),
        cli.fof_file.clone(),
        cli.nbrs_file.clone(),
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = RunConfig::load(&cli.config)?;
    let backend = Backend::from_str(&cli.backend)?;
    let action = resolve_action(&cli.command)?;
    if action == Action::Link {
        bail!("the link action is not implemented yet");
    }

    let ctx = ActionContext {
        cfg: &cfg,
        config_path: std::path::absolute(&cli.config)?,
        backend,
        queue: cli.queue.clone(),
        missing: cli.missing,
        blind: !cli.noblind,
        clobber: cli.clobber,
        skip_errors: cli.skip_errors,
        compress: !cli.no_compress,
        seed: cli.seed,
    };

    if let Some(list) = &cli.tile_list {
        let tile_dir = cli.tile_dir.clone().ok_or_else(|| {
            MixError::InvalidConfiguration("--tile-list requires --tile-dir".into())
        })?;
        let layout = TileLayout {
            tile_dir,
            bands: cfg.bands.clone(),
            model_nbrs: cfg.model_nbrs,
        };
        let ids = read_tile_list(list)?;
        let report = run_batch(&ids, &layout, |unit| run_action(&ctx, action, unit))?;
        if !report.failures.is_empty() {
            for failure in &report.failures {
                eprintln!("tile {} failed: {}", failure.tile_id, failure.cause);
            }
        }
    } else {
        let unit = unit_from_cli(&cli, &cfg)?;
        run_action(&ctx, action, &unit)?;
    }
    Ok(())
}
