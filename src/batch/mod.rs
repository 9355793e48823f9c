// file: src/batch/mod.rs
// version: 1.0.0
// guid: 1d6c8e35-a942-4f07-b3d8-56e09a1c7f24

//! Scheduler detection and adapters
//!
//! fyrd never talks to a scheduler directly; it shells out to the cluster's
//! own tools. Each supported queue type gets a [`BatchSystem`] adapter:
//! Slurm (`sbatch`/`squeue`/`scancel`), Torque (`qsub`/`qstat`/`qdel`), and
//! a local fallback that runs scripts as background processes.

pub mod local;
pub mod slurm;
pub mod torque;

pub use local::LocalBatch;
pub use slurm::SlurmBatch;
pub use torque::TorqueBatch;

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::FyrdConfig;
use crate::error::FyrdError;
use crate::queue::QueueJob;
use crate::Result;

/// The scheduler a job is submitted through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueType {
    Slurm,
    Torque,
    Local,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Slurm => "slurm",
            QueueType::Torque => "torque",
            QueueType::Local => "local",
        }
    }
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueType {
    type Err = FyrdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "slurm" => Ok(QueueType::Slurm),
            "torque" | "pbs" => Ok(QueueType::Torque),
            "local" | "normal" => Ok(QueueType::Local),
            other => Err(FyrdError::validation(format!(
                "Unknown queue type '{}' (expected slurm, torque, or local)",
                other
            ))),
        }
    }
}

/// Detect the cluster environment from the tools on PATH
pub fn detect() -> QueueType {
    if which::which("sbatch").is_ok() {
        debug!("Found sbatch on PATH, using slurm");
        QueueType::Slurm
    } else if which::which("qsub").is_ok() {
        debug!("Found qsub on PATH, using torque");
        QueueType::Torque
    } else {
        debug!("No scheduler found on PATH, using local mode");
        QueueType::Local
    }
}

/// Resolve the queue type from the CLI flag, the config, or detection.
///
/// An explicit flag wins, then a non-"auto" config value, then detection.
pub fn resolve(requested: Option<QueueType>, config: &FyrdConfig) -> Result<QueueType> {
    if let Some(qtype) = requested {
        return Ok(qtype);
    }
    match config.queue.queue_type.as_str() {
        "auto" => Ok(detect()),
        other => other.parse(),
    }
}

/// A scheduler adapter
#[async_trait]
pub trait BatchSystem: Send + Sync {
    /// The queue type this adapter drives
    fn queue_type(&self) -> QueueType;

    /// Submit a written job script, returning the scheduler's job id
    async fn submit(&self, script: &Path, dependencies: &[u64]) -> Result<u64>;

    /// Fetch the current queue contents
    async fn queue(&self) -> Result<Vec<QueueJob>>;

    /// Cancel a job
    async fn cancel(&self, job_id: u64) -> Result<()>;
}

/// Build the adapter for a queue type
pub fn batch_system(qtype: QueueType, config: &FyrdConfig) -> Box<dyn BatchSystem> {
    match qtype {
        QueueType::Slurm => Box::new(SlurmBatch::new(config.queue.sub_retries)),
        QueueType::Torque => Box::new(TorqueBatch::new(config.queue.sub_retries)),
        QueueType::Local => Box::new(LocalBatch::new(
            config.registry_path(),
            config.queue.sleep_len,
            config.local.max_threads,
        )),
    }
}

/// Run a scheduler command, retrying on failure.
///
/// Schedulers reject submissions transiently under load, so failed
/// invocations are retried with a one second pause, mirroring how cluster
/// users wrap these tools by hand. Returns stdout on success.
pub(crate) async fn run_scheduler(program: &str, args: &[String], retries: u32) -> Result<String> {
    let mut attempt = 0;
    loop {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                FyrdError::Scheduler(format!("Failed to run {}: {}", program, e))
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }

        attempt += 1;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if attempt > retries {
            return Err(FyrdError::Scheduler(format!(
                "{} failed after {} attempts (exit code {}): {}",
                program,
                attempt,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        warn!(
            "{} failed (attempt {}/{}): {}",
            program,
            attempt,
            retries + 1,
            stderr.trim()
        );
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_type_from_str() {
        assert_eq!("slurm".parse::<QueueType>().unwrap(), QueueType::Slurm);
        assert_eq!("torque".parse::<QueueType>().unwrap(), QueueType::Torque);
        assert_eq!("pbs".parse::<QueueType>().unwrap(), QueueType::Torque);
        assert_eq!("local".parse::<QueueType>().unwrap(), QueueType::Local);
        assert_eq!("normal".parse::<QueueType>().unwrap(), QueueType::Local);
        assert!("sge".parse::<QueueType>().is_err());
    }

    #[test]
    fn test_resolve_precedence() {
        let mut config = FyrdConfig::default();
        config.queue.queue_type = "torque".to_string();

        // Explicit flag wins over config
        let qtype = resolve(Some(QueueType::Local), &config).unwrap();
        assert_eq!(qtype, QueueType::Local);

        // Config wins over detection
        let qtype = resolve(None, &config).unwrap();
        assert_eq!(qtype, QueueType::Torque);

        config.queue.queue_type = "bogus".to_string();
        assert!(resolve(None, &config).is_err());
    }

    #[tokio::test]
    async fn test_run_scheduler_success() {
        let out = run_scheduler("echo", &["hello".to_string()], 0).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_scheduler_missing_program() {
        let result = run_scheduler("fyrd-no-such-scheduler-tool", &[], 0).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_scheduler_exhausts_retries() {
        let result = run_scheduler("false", &[], 1).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("after 2 attempts"), "got: {}", err);
    }
}
