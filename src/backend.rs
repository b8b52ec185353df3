//! Submission backends.
//!
//! A backend decides which artifacts one job needs: every backend renders
//! the worker script, and cluster backends additionally render a submission
//! descriptor carrying the queue directives. The set is closed and selected
//! once at startup; an unrecognized identifier is rejected before any
//! artifact is touched.

use crate::error::{MixError, Result};
use crate::script::{self, JobParams};
use std::collections::BTreeMap;
use std::str::FromStr;

/// CPUs requested per job.
const JOB_CPUS: u32 = 1;
/// Wall-clock limit per job.
const JOB_WALLTIME: &str = "48:00:00";
/// Scratch-space requirement per job, in megabytes.
const JOB_SCRATCH_MB: u64 = 2000;

/// Slurm single-job descriptor.
const SLURM_SUBMIT_TEMPLATE: &str = r#"#!/bin/bash
#SBATCH --job-name={job_name}
#SBATCH --partition={queue}
#SBATCH --cpus-per-task={n_cpus}
#SBATCH --time={walltime}
#SBATCH --tmp={scratch_mb}

bash {worker_path}
"#;

/// LSF single-job descriptor. Directive syntax differs from Slurm; the
/// worker script is identical.
const LSF_SUBMIT_TEMPLATE: &str = r#"#!/bin/bash
#BSUB -J {job_name}
#BSUB -q {queue}
#BSUB -n {n_cpus}
#BSUB -W {walltime}
#BSUB -R "rusage[scratch={scratch_mb}]"

bash {worker_path}
"#;

/// The artifacts rendered for one job.
pub struct Rendered {
    /// Worker script text, backend-independent.
    pub worker: String,
    /// Submission descriptor text; `None` for the local backend.
    pub submit: Option<String>,
}

/// The closed set of submission backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Worker script only; jobs are run by hand.
    Local,
    /// Slurm cluster: worker script plus `sbatch` descriptor.
    Slurm,
    /// LSF cluster: worker script plus `bsub` descriptor.
    Lsf,
}

impl FromStr for Backend {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "slurm" => Ok(Self::Slurm),
            "lsf" => Ok(Self::Lsf),
            other => Err(MixError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl Backend {
    /// The identifier accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Slurm => "slurm",
            Self::Lsf => "lsf",
        }
    }

    /// Render the worker script and, for cluster backends, the submission
    /// descriptor for one job.
    ///
    /// # Errors
    /// [`MixError::InvalidConfiguration`] if a template parameter is missing
    /// or unused (nothing is written in that case).
    pub fn render(&self, job: &JobParams) -> Result<Rendered> {
        let worker = script::render_template(job.worker_template, &job.worker_values)?;
        let submit = match self {
            Self::Local => None,
            Self::Slurm => Some(script::render_template(
                SLURM_SUBMIT_TEMPLATE,
                &submit_values(job),
            )?),
            Self::Lsf => Some(script::render_template(
                LSF_SUBMIT_TEMPLATE,
                &submit_values(job),
            )?),
        };
        Ok(Rendered { worker, submit })
    }
}

fn submit_values(job: &JobParams) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("job_name", job.job_name.clone()),
        ("queue", job.queue.clone()),
        ("n_cpus", JOB_CPUS.to_string()),
        ("walltime", JOB_WALLTIME.to_string()),
        ("scratch_mb", JOB_SCRATCH_MB.to_string()),
        ("worker_path", job.worker_path.display().to_string()),
    ])
}
