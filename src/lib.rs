//! # Tilemix
//!
//! A **batch-job orchestrator** for chunked astronomical catalog processing.
//! Tilemix partitions a per-tile catalog into fixed-size work chunks, writes
//! one worker script (and, for cluster backends, one submission descriptor)
//! per chunk, regenerates only missing work on re-runs, and collates the
//! per-chunk result files into one final catalog per tile.
//!
//! ## Key behaviors
//!
//! - **Deterministic chunk planning** - the same row count and chunk size
//!   always produce the same ordered, disjoint, covering ranges
//! - **Backend-polymorphic emission** - `local`, `slurm`, and `lsf` backends
//!   share one worker script and differ only in submission descriptors
//! - **Idempotent re-runs** - missing mode skips finished chunks and clears
//!   their stale submission artifacts
//! - **Ordered collation** - chunk outputs merge in ascending chunk order,
//!   with derived magnitude columns and optional deterministic blinding
//! - **Tile isolation** - a batch over many tiles logs and counts per-tile
//!   faults instead of aborting the run
//!
//! ## Quick Start
//!
//! ```no_run
//! use tilemix::*;
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = RunConfig::load("run.yaml")?;
//! let unit = WorkUnit::from_files(
//!     vec![PathBuf::from("tile_r_meds.jsonl")],
//!     PathBuf::from("tile_psf_map.txt"),
//!     None,
//!     None,
//! )?;
//!
//! let ranges = chunk::plan(250, cfg.chunk_size)?;
//! assert_eq!(ranges.len(), (250u64.div_ceil(cfg.chunk_size)) as usize);
//! println!("{}: {} chunks", unit.id, ranges.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`chunk`] - chunk planning over a row or group count
//! - [`paths`] - work units, tile layout, artifact path resolution
//! - [`script`] - template rendering and worker-script emission
//! - [`backend`] - the closed set of submission backends
//! - [`collate`] - ordered merging, magnitudes, blinding
//! - [`tiles`] - tile-batch running with fault isolation
//! - [`actions`] - the command surface glue
//! - [`config`] - the validated run configuration
//! - [`catalog`] - row-level catalog I/O
//! - [`error`] - the fault taxonomy

pub mod actions;
pub mod backend;
pub mod blind;
pub mod catalog;
pub mod chunk;
pub mod collate;
pub mod config;
pub mod error;
pub mod paths;
pub mod script;
pub mod seeds;
pub mod tiles;

// General re-exports
pub use backend::{Backend, Rendered};
pub use chunk::ChunkRange;
pub use collate::{CollateOptions, CollateReport};
pub use config::{ConcatKind, RunConfig};
pub use error::{MixError, Result};
pub use paths::{ArtifactKind, TileLayout, UnitPaths, WorkUnit};
pub use script::{EmitOptions, EmitReport};
pub use seeds::SeedSequence;
pub use tiles::{BatchReport, read_tile_list, run_batch};
