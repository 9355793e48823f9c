// file: src/batch/slurm.rs
// version: 1.0.0
// guid: f0b38d62-74c1-4e95-8a20-cd516e97b3a8

//! Slurm adapter: sbatch, squeue, scancel

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use super::{run_scheduler, BatchSystem, QueueType};
use crate::error::FyrdError;
use crate::queue::{JobState, QueueJob};
use crate::Result;

/// Pipe-separated squeue format: id, name, user, partition, long state
const SQUEUE_FORMAT: &str = "%i|%j|%u|%P|%T";

pub struct SlurmBatch {
    retries: u32,
}

impl SlurmBatch {
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }
}

#[async_trait]
impl BatchSystem for SlurmBatch {
    fn queue_type(&self) -> QueueType {
        QueueType::Slurm
    }

    async fn submit(&self, script: &Path, dependencies: &[u64]) -> Result<u64> {
        let mut args = Vec::new();
        if !dependencies.is_empty() {
            let deps = dependencies
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(":");
            args.push(format!("--dependency=afterok:{}", deps));
        }
        args.push(script.display().to_string());

        let stdout = run_scheduler("sbatch", &args, self.retries).await?;
        let id = parse_sbatch_output(&stdout)?;
        info!("Submitted {} as slurm job {}", script.display(), id);
        Ok(id)
    }

    async fn queue(&self) -> Result<Vec<QueueJob>> {
        let args = vec!["-h".to_string(), "-o".to_string(), SQUEUE_FORMAT.to_string()];
        let stdout = run_scheduler("squeue", &args, self.retries).await?;
        parse_squeue_output(&stdout)
    }

    async fn cancel(&self, job_id: u64) -> Result<()> {
        run_scheduler("scancel", &[job_id.to_string()], self.retries).await?;
        debug!("Cancelled slurm job {}", job_id);
        Ok(())
    }
}

/// Pull the job id out of sbatch's "Submitted batch job NNN" line
fn parse_sbatch_output(stdout: &str) -> Result<u64> {
    stdout
        .trim()
        .rsplit(char::is_whitespace)
        .next()
        .and_then(|tok| tok.parse().ok())
        .ok_or_else(|| {
            FyrdError::Submission(format!("Could not parse sbatch output: '{}'", stdout.trim()))
        })
}

fn parse_squeue_output(stdout: &str) -> Result<Vec<QueueJob>> {
    let mut jobs = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 5 {
            return Err(FyrdError::Queue(format!(
                "Unexpected squeue line: '{}'",
                line
            )));
        }
        let id: u64 = fields[0].parse().map_err(|_| {
            FyrdError::Queue(format!("Bad job id in squeue line: '{}'", line))
        })?;
        jobs.push(QueueJob {
            id,
            name: fields[1].to_string(),
            owner: fields[2].to_string(),
            partition: fields[3].to_string(),
            state: state_from_slurm(fields[4]),
        });
    }
    Ok(jobs)
}

/// Map squeue's long state strings onto [`JobState`]
fn state_from_slurm(state: &str) -> JobState {
    match state {
        "PENDING" | "CONFIGURING" => JobState::Pending,
        "RUNNING" => JobState::Running,
        "COMPLETING" => JobState::Completing,
        "COMPLETED" => JobState::Completed,
        "FAILED" | "CANCELLED" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" => JobState::Failed,
        "SUSPENDED" | "RESV_DEL_HOLD" => JobState::Held,
        _ => JobState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sbatch_output() {
        assert_eq!(parse_sbatch_output("Submitted batch job 2764832\n").unwrap(), 2764832);
        assert_eq!(parse_sbatch_output("123").unwrap(), 123);
        assert!(parse_sbatch_output("sbatch: error: no such partition").is_err());
        assert!(parse_sbatch_output("").is_err());
    }

    #[test]
    fn test_parse_squeue_output() {
        let out = "\
2764832|align_reads|jeff|normal|RUNNING
2764833|call_variants|jeff|high-mem|PENDING
2764900|qc|ana|normal|COMPLETING
";
        let jobs = parse_squeue_output(out).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].id, 2764832);
        assert_eq!(jobs[0].state, JobState::Running);
        assert_eq!(jobs[1].partition, "high-mem");
        assert_eq!(jobs[1].state, JobState::Pending);
        assert_eq!(jobs[2].owner, "ana");
        assert_eq!(jobs[2].state, JobState::Completing);
    }

    #[test]
    fn test_parse_squeue_output_rejects_garbage() {
        assert!(parse_squeue_output("not|enough|fields").is_err());
        assert!(parse_squeue_output("abc|n|u|p|RUNNING").is_err());
        assert!(parse_squeue_output("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(state_from_slurm("PENDING"), JobState::Pending);
        assert_eq!(state_from_slurm("CANCELLED"), JobState::Failed);
        assert_eq!(state_from_slurm("TIMEOUT"), JobState::Failed);
        assert_eq!(state_from_slurm("SUSPENDED"), JobState::Held);
        assert_eq!(state_from_slurm("WEIRD"), JobState::Unknown);
    }
}
