// file: src/queue/mod.rs
// version: 1.0.0
// guid: 84a2f6d1-0c59-4b37-9e18-3d7b42c08a65

//! Queue inspection and blocking waits
//!
//! A [`Queue`] is a point-in-time snapshot of the scheduler's job list.
//! [`wait_for`] polls snapshots until the watched jobs finish; a job that
//! has left the queue entirely is treated as completed, since schedulers
//! drop finished jobs from their listings after a grace period.

use serde::Serialize;
use std::time::{Duration, Instant};
use tabled::Tabled;
use tracing::{debug, info};

use crate::batch::BatchSystem;
use crate::error::FyrdError;
use crate::Result;

/// Scheduler-independent job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completing,
    Completed,
    Failed,
    Held,
    Unknown,
}

impl JobState {
    /// Whether the job will never run again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completing => "completing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Held => "held",
            JobState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job as reported by the scheduler
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct QueueJob {
    #[tabled(rename = "ID")]
    pub id: u64,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "USER")]
    pub owner: String,
    #[tabled(rename = "PARTITION")]
    pub partition: String,
    #[tabled(rename = "STATE")]
    pub state: JobState,
}

/// A snapshot of the scheduler queue
#[derive(Debug, Clone, Default)]
pub struct Queue {
    jobs: Vec<QueueJob>,
}

impl Queue {
    /// Fetch the current queue through a scheduler adapter
    pub async fn fetch(batch: &dyn BatchSystem) -> Result<Self> {
        let jobs = batch.queue().await?;
        debug!("Fetched {} jobs from the {} queue", jobs.len(), batch.queue_type());
        Ok(Self { jobs })
    }

    pub fn from_jobs(jobs: Vec<QueueJob>) -> Self {
        Self { jobs }
    }

    pub fn jobs(&self) -> &[QueueJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Look up a job by id
    pub fn get(&self, id: u64) -> Option<&QueueJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Jobs matching the given filters; `None` means no filtering
    pub fn filtered(&self, user: Option<&str>, partition: Option<&str>) -> Vec<QueueJob> {
        self.jobs
            .iter()
            .filter(|j| user.map_or(true, |u| j.owner == u))
            .filter(|j| partition.map_or(true, |p| j.partition == p))
            .cloned()
            .collect()
    }
}

/// Block until every listed job has finished.
///
/// Polls the queue every `sleep_len`. A job is finished once it reaches a
/// terminal state or disappears from the queue. With a timeout, returns a
/// timeout error listing the jobs still outstanding.
pub async fn wait_for(
    batch: &dyn BatchSystem,
    ids: &[u64],
    sleep_len: Duration,
    timeout: Option<Duration>,
) -> Result<()> {
    let started = Instant::now();
    loop {
        let queue = Queue::fetch(batch).await?;
        let outstanding: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| queue.get(*id).map_or(false, |j| !j.state.is_terminal()))
            .collect();

        if outstanding.is_empty() {
            info!("All {} watched jobs have finished", ids.len());
            return Ok(());
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Err(FyrdError::Timeout(format!(
                    "Gave up waiting after {}s; still in queue: {}",
                    limit.as_secs(),
                    outstanding
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        debug!("{} of {} jobs still queued, sleeping", outstanding.len(), ids.len());
        tokio::time::sleep(sleep_len).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::QueueType;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Serves canned queue snapshots, repeating the last one
    struct FakeBatch {
        snapshots: Mutex<Vec<Vec<QueueJob>>>,
    }

    impl FakeBatch {
        fn new(mut snapshots: Vec<Vec<QueueJob>>) -> Self {
            snapshots.reverse();
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl crate::batch::BatchSystem for FakeBatch {
        fn queue_type(&self) -> QueueType {
            QueueType::Local
        }

        async fn submit(&self, _script: &Path, _deps: &[u64]) -> Result<u64> {
            unimplemented!("not used in these tests")
        }

        async fn queue(&self) -> Result<Vec<QueueJob>> {
            let mut snapshots = self.snapshots.lock().unwrap();
            if snapshots.len() > 1 {
                Ok(snapshots.pop().unwrap())
            } else {
                Ok(snapshots.last().cloned().unwrap_or_default())
            }
        }

        async fn cancel(&self, _job_id: u64) -> Result<()> {
            Ok(())
        }
    }

    fn job(id: u64, owner: &str, partition: &str, state: JobState) -> QueueJob {
        QueueJob {
            id,
            name: format!("job{}", id),
            owner: owner.to_string(),
            partition: partition.to_string(),
            state,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Held.is_terminal());
    }

    #[test]
    fn test_queue_filters() {
        let queue = Queue::from_jobs(vec![
            job(1, "jeff", "normal", JobState::Running),
            job(2, "jeff", "high-mem", JobState::Pending),
            job(3, "ana", "high-mem", JobState::Running),
        ]);

        assert_eq!(queue.filtered(None, None).len(), 3);
        assert_eq!(queue.filtered(Some("jeff"), None).len(), 2);
        assert_eq!(queue.filtered(None, Some("high-mem")).len(), 2);
        assert_eq!(queue.filtered(Some("jeff"), Some("high-mem")).len(), 1);
        assert!(queue.filtered(Some("nobody"), None).is_empty());

        assert_eq!(queue.get(3).unwrap().owner, "ana");
        assert!(queue.get(99).is_none());
    }

    #[tokio::test]
    async fn test_wait_until_jobs_leave_queue() {
        let batch = FakeBatch::new(vec![
            vec![
                job(10, "jeff", "normal", JobState::Running),
                job(11, "jeff", "normal", JobState::Pending),
            ],
            vec![job(11, "jeff", "normal", JobState::Running)],
            vec![],
        ]);

        wait_for(&batch, &[10, 11], Duration::from_millis(1), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_treats_terminal_state_as_done() {
        let batch = FakeBatch::new(vec![vec![job(5, "jeff", "normal", JobState::Completed)]]);
        wait_for(&batch, &[5], Duration::from_millis(1), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let batch = FakeBatch::new(vec![vec![job(7, "jeff", "normal", JobState::Running)]]);
        let err = wait_for(
            &batch,
            &[7],
            Duration::from_millis(1),
            Some(Duration::from_millis(5)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("7"));
    }
}
