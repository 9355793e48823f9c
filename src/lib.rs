// file: src/lib.rs
// version: 1.0.0
// guid: 9c4e7b20-1f6a-4d83-a5e9-2b70c8d4f611

//! # fyrd
//!
//! Submit and manage batch jobs on compute clusters from a single entry
//! point. fyrd wraps the scheduler's own tools (`sbatch`/`squeue` for Slurm,
//! `qsub`/`qstat` for Torque) and falls back to running jobs as local
//! background processes when no scheduler is installed.
//!
//! The CLI exposes `conf`, `profile`, `submit`, `wait`, `queue`, and `clean`
//! subcommands; the same functionality is available as a library through the
//! modules below.

pub mod batch;
pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod output;
pub mod queue;

pub use error::{FyrdError, Result};

/// Version information for the tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
