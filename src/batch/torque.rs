// file: src/batch/torque.rs
// version: 1.0.0
// guid: a49d2c71-e583-4b06-9f34-12d8b7e60c5f

//! Torque/PBS adapter: qsub, qstat, qdel

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use super::{run_scheduler, BatchSystem, QueueType};
use crate::error::FyrdError;
use crate::queue::{JobState, QueueJob};
use crate::Result;

pub struct TorqueBatch {
    retries: u32,
}

impl TorqueBatch {
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }
}

#[async_trait]
impl BatchSystem for TorqueBatch {
    fn queue_type(&self) -> QueueType {
        QueueType::Torque
    }

    async fn submit(&self, script: &Path, dependencies: &[u64]) -> Result<u64> {
        let mut args = Vec::new();
        if !dependencies.is_empty() {
            let deps = dependencies
                .iter()
                .map(|d| format!("afterok:{}", d))
                .collect::<Vec<_>>()
                .join(",");
            args.push("-W".to_string());
            args.push(format!("depend={}", deps));
        }
        args.push(script.display().to_string());

        let stdout = run_scheduler("qsub", &args, self.retries).await?;
        let id = parse_qsub_output(&stdout)?;
        info!("Submitted {} as torque job {}", script.display(), id);
        Ok(id)
    }

    async fn queue(&self) -> Result<Vec<QueueJob>> {
        let stdout = run_scheduler("qstat", &["-a".to_string()], self.retries).await?;
        parse_qstat_output(&stdout)
    }

    async fn cancel(&self, job_id: u64) -> Result<()> {
        run_scheduler("qdel", &[job_id.to_string()], self.retries).await?;
        debug!("Cancelled torque job {}", job_id);
        Ok(())
    }
}

/// qsub prints the full job id, e.g. `1234.pbsserver.example.org`;
/// the numeric prefix before the first dot is the id
fn parse_qsub_output(stdout: &str) -> Result<u64> {
    stdout
        .trim()
        .split('.')
        .next()
        .and_then(|tok| tok.parse().ok())
        .ok_or_else(|| {
            FyrdError::Submission(format!("Could not parse qsub output: '{}'", stdout.trim()))
        })
}

/// Parse `qstat -a` tabular output.
///
/// Header and separator lines are skipped; data lines start with a numeric
/// job id and carry the single-letter state in the tenth column.
fn parse_qstat_output(stdout: &str) -> Result<Vec<QueueJob>> {
    // Unwrap is safe on a literal pattern
    let data_line = Regex::new(r"^\d+").unwrap();
    let mut jobs = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if !data_line.is_match(line) {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            return Err(FyrdError::Queue(format!(
                "Unexpected qstat line: '{}'",
                line
            )));
        }
        let id = parse_qsub_output(fields[0])?;
        jobs.push(QueueJob {
            id,
            name: fields[3].to_string(),
            owner: fields[1].to_string(),
            partition: fields[2].to_string(),
            state: state_from_torque(fields[9]),
        });
    }
    Ok(jobs)
}

/// Map qstat's single-letter states onto [`JobState`]
fn state_from_torque(state: &str) -> JobState {
    match state {
        "Q" | "W" | "T" => JobState::Pending,
        "R" => JobState::Running,
        "E" => JobState::Completing,
        "C" => JobState::Completed,
        "H" => JobState::Held,
        _ => JobState::Unknown,
    }
}
