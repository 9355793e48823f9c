// file: src/batch/local.rs
// version: 1.0.0
// guid: 6e24b9f0-d1c7-483a-bb62-905a3f7d18ce

//! Local fallback: run job scripts as background processes
//!
//! Without a scheduler there is nothing to keep state between fyrd
//! invocations, so submitted jobs are recorded in a JSON registry file.
//! `queue` and `wait` probe the recorded pids; entries whose process has
//! exited are reported once as completed and then pruned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

use super::{BatchSystem, QueueType};
use crate::error::FyrdError;
use crate::queue::{JobState, QueueJob};
use crate::Result;

/// One locally spawned job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalJob {
    pub id: u64,
    pub name: String,
    pub pid: u32,
    pub script: PathBuf,
    pub started: DateTime<Utc>,
}

/// The on-disk registry of local jobs
#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    next_id: u64,
    jobs: Vec<LocalJob>,
}

pub struct LocalBatch {
    registry_path: PathBuf,
    sleep_len: u64,
    max_threads: u32,
}

impl LocalBatch {
    pub fn new(registry_path: PathBuf, sleep_len: u64, max_threads: u32) -> Self {
        Self {
            registry_path,
            sleep_len,
            max_threads,
        }
    }

    /// Run a closure against the locked registry, persisting any changes
    fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> Result<R>) -> Result<R> {
        let _lock = RegistryLock::acquire(&self.registry_path)?;
        let mut registry = if self.registry_path.exists() {
            let content = std::fs::read_to_string(&self.registry_path)?;
            serde_json::from_str(&content).map_err(|e| {
                FyrdError::Queue(format!(
                    "Corrupt local registry {}: {}",
                    self.registry_path.display(),
                    e
                ))
            })?
        } else {
            Registry::default()
        };

        let result = f(&mut registry)?;

        if let Some(parent) = self.registry_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.registry_path, serde_json::to_string_pretty(&registry)?)?;
        Ok(result)
    }

    /// Block until a registered dependency's process has exited.
    ///
    /// An id missing from the registry counts as already finished.
    async fn wait_for_dependency(&self, dep: u64) -> Result<()> {
        loop {
            let running = self.with_registry(|registry| {
                Ok(registry
                    .jobs
                    .iter()
                    .any(|j| j.id == dep && pid_alive(j.pid)))
            })?;
            if !running {
                return Ok(());
            }
            debug!("Local dependency {} still running, sleeping", dep);
            tokio::time::sleep(std::time::Duration::from_secs(self.sleep_len)).await;
        }
    }

    /// Block until the number of live local jobs is below `max_threads`.
    ///
    /// A cap of zero means unlimited.
    async fn wait_for_thread_room(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Ok(());
        }
        loop {
            let running = self.with_registry(|registry| {
                Ok(registry.jobs.iter().filter(|j| pid_alive(j.pid)).count())
            })?;
            if (running as u32) < self.max_threads {
                return Ok(());
            }
            debug!(
                "{} local jobs running (cap {}), sleeping",
                running, self.max_threads
            );
            tokio::time::sleep(std::time::Duration::from_secs(self.sleep_len)).await;
        }
    }
}

#[async_trait]
impl BatchSystem for LocalBatch {
    fn queue_type(&self) -> QueueType {
        QueueType::Local
    }

    async fn submit(&self, script: &Path, dependencies: &[u64]) -> Result<u64> {
        // No scheduler to track dependencies, so block on them here
        for dep in dependencies {
            self.wait_for_dependency(*dep).await?;
        }
        self.wait_for_thread_room().await?;

        let outfile = format!("{}.out", script.display());
        let errfile = format!("{}.err", script.display());
        let stdout = File::create(&outfile)?;
        let stderr = File::create(&errfile)?;

        let child = std::process::Command::new("bash")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                FyrdError::Submission(format!(
                    "Failed to spawn bash {}: {}",
                    script.display(),
                    e
                ))
            })?;
        let pid = child.id();

        let name = script
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("job")
            .to_string();

        let id = self.with_registry(|registry| {
            registry.next_id += 1;
            let id = registry.next_id;
            registry.jobs.push(LocalJob {
                id,
                name: name.clone(),
                pid,
                script: script.to_path_buf(),
                started: Utc::now(),
            });
            Ok(id)
        })?;

        info!("Started local job {} (pid {}) from {}", id, pid, script.display());
        Ok(id)
    }

    async fn queue(&self) -> Result<Vec<QueueJob>> {
        let owner = current_user();
        self.with_registry(|registry| {
            let mut jobs = Vec::new();
            let mut live = Vec::new();
            for job in registry.jobs.drain(..) {
                let state = if pid_alive(job.pid) {
                    live.push(job.clone());
                    JobState::Running
                } else {
                    // Reported once as completed, then dropped
                    JobState::Completed
                };
                jobs.push(QueueJob {
                    id: job.id,
                    name: job.name,
                    owner: owner.clone(),
                    partition: "local".to_string(),
                    state,
                });
            }
            registry.jobs = live;
            Ok(jobs)
        })
    }

    async fn cancel(&self, job_id: u64) -> Result<()> {
        self.with_registry(|registry| {
            let job = registry
                .jobs
                .iter()
                .find(|j| j.id == job_id)
                .ok_or_else(|| {
                    FyrdError::Queue(format!("No local job with id {}", job_id))
                })?;
            let killed = unsafe { libc::kill(job.pid as libc::pid_t, libc::SIGTERM) == 0 };
            if !killed {
                warn!("Local job {} (pid {}) was already gone", job_id, job.pid);
            }
            Ok(())
        })
    }
}

/// Probe a pid with the null signal
pub fn pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// The invoking user's name, for queue listings and default filters
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Exclusive advisory lock over the registry file.
///
/// Uses create-new semantics on an adjacent `.lock` file so that concurrent
/// fyrd invocations serialize their registry updates.
struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    fn acquire(registry_path: &Path) -> Result<Self> {
        let path = registry_path.with_extension("lock");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        for _ in 0..50 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(FyrdError::Queue(format!(
            "Could not lock local registry (stale lock file at {}?)",
            path.display()
        )))
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
