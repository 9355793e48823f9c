// file: src/config/settings.rs
// version: 1.0.0
// guid: e2a64f80-3b17-49dc-95e8-70c4d1b2a6f9

//! Sectioned configuration loading, rendering, and single-key updates

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::FyrdError;
use crate::Result;

/// Queue interaction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    /// Maximum jobs allowed in the queue before submission blocks
    pub max_jobs: u32,
    /// Seconds to sleep between queue polls
    pub sleep_len: u64,
    /// Seconds before a cached queue snapshot is considered stale
    pub queue_update: u64,
    /// Times to retry a failed scheduler submission
    pub sub_retries: u32,
    /// Scheduler to use: "auto", "slurm", "torque", or "local"
    pub queue_type: String,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            max_jobs: 1000,
            sleep_len: 2,
            queue_update: 2,
            sub_retries: 5,
            queue_type: "auto".to_string(),
        }
    }
}

/// Job file generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsSection {
    /// Where named submission profiles live
    pub profile_file: String,
    /// Directory for generated scripts; empty means the job's own directory
    pub scriptpath: String,
    /// Suffix inserted into every generated file name
    pub suffix: String,
    /// Remove script files when a job is cleaned
    pub clean_files: bool,
    /// Also remove stdout/stderr files when a job is cleaned
    pub clean_outfiles: bool,
}

impl Default for JobsSection {
    fn default() -> Self {
        Self {
            profile_file: "~/.fyrd/profiles.toml".to_string(),
            scriptpath: String::new(),
            suffix: "cluster".to_string(),
            clean_files: true,
            clean_outfiles: false,
        }
    }
}

/// Local (scheduler-free) mode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSection {
    /// Registry file tracking locally spawned jobs
    pub registry: String,
    /// Concurrent local jobs allowed; 0 means no cap
    pub max_threads: u32,
}

impl Default for LocalSection {
    fn default() -> Self {
        Self {
            registry: "~/.fyrd/local_jobs.json".to_string(),
            max_threads: 0,
        }
    }
}

/// The full fyrd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FyrdConfig {
    pub queue: QueueSection,
    pub jobs: JobsSection,
    pub local: LocalSection,
}

impl FyrdConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            FyrdError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            FyrdError::Config(format!("Malformed config file {}: {}", path.display(), e))
        })
    }

    /// Save configuration, creating the parent directory if needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered)?;
        debug!("Wrote config to {}", path.display());
        Ok(())
    }

    /// Render the whole config, or one section, as TOML
    pub fn show(&self, section: Option<&str>) -> Result<String> {
        match section {
            None => Ok(toml::to_string_pretty(self)?),
            Some("queue") => Ok(toml::to_string_pretty(&self.queue)?),
            Some("jobs") => Ok(toml::to_string_pretty(&self.jobs)?),
            Some("local") => Ok(toml::to_string_pretty(&self.local)?),
            Some(other) => Err(FyrdError::validation(format!(
                "Unknown config section '{}' (expected queue, jobs, or local)",
                other
            ))),
        }
    }

    /// Set a single key in a section from its string representation
    pub fn update(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        match section {
            "queue" => match key {
                "max_jobs" => self.queue.max_jobs = parse_value(section, key, value)?,
                "sleep_len" => self.queue.sleep_len = parse_value(section, key, value)?,
                "queue_update" => self.queue.queue_update = parse_value(section, key, value)?,
                "sub_retries" => self.queue.sub_retries = parse_value(section, key, value)?,
                "queue_type" => {
                    let allowed = ["auto", "slurm", "torque", "local"];
                    if !allowed.contains(&value) {
                        return Err(FyrdError::validation(format!(
                            "queue_type must be one of {}, got '{}'",
                            allowed.join(", "),
                            value
                        )));
                    }
                    self.queue.queue_type = value.to_string();
                }
                _ => return Err(unknown_key(section, key)),
            },
            "jobs" => match key {
                "profile_file" => self.jobs.profile_file = value.to_string(),
                "scriptpath" => self.jobs.scriptpath = value.to_string(),
                "suffix" => {
                    if value.is_empty() {
                        return Err(FyrdError::validation("suffix may not be empty"));
                    }
                    self.jobs.suffix = value.to_string();
                }
                "clean_files" => self.jobs.clean_files = parse_value(section, key, value)?,
                "clean_outfiles" => self.jobs.clean_outfiles = parse_value(section, key, value)?,
                _ => return Err(unknown_key(section, key)),
            },
            "local" => match key {
                "registry" => self.local.registry = value.to_string(),
                "max_threads" => self.local.max_threads = parse_value(section, key, value)?,
                _ => return Err(unknown_key(section, key)),
            },
            other => {
                return Err(FyrdError::validation(format!(
                    "Unknown config section '{}' (expected queue, jobs, or local)",
                    other
                )))
            }
        }
        Ok(())
    }

    /// The resolved profile file path
    pub fn profile_path(&self) -> std::path::PathBuf {
        super::expand_path(&self.jobs.profile_file)
    }

    /// The resolved local-registry path
    pub fn registry_path(&self) -> PathBuf {
        super::expand_path(&self.local.registry)
    }
}

fn parse_value<T: std::str::FromStr>(section: &str, key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        FyrdError::Validation(format!(
            "Invalid value '{}' for {}.{}",
            value, section, key
        ))
    })
}

fn unknown_key(section: &str, key: &str) -> FyrdError {
    FyrdError::Validation(format!("Unknown key '{}' in section '{}'", key, section))
}
