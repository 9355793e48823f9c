// file: src/job/mod.rs
// version: 1.0.0
// guid: d57a90c6-3e82-41fb-8d04-76b1f2ae95c0

//! Job construction, script generation, and submission
//!
//! A [`Job`] turns a command plus submission options into the script files
//! the chosen scheduler expects, using the naming scheme `NAME.SUFFIX.EXT`.
//! The suffix (default `cluster`) is always inserted so that `fyrd clean`
//! can never match files fyrd did not create.

pub mod script;

pub use script::Script;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::batch::{BatchSystem, QueueType};
use crate::config::{FyrdConfig, Profile};
use crate::error::FyrdError;
use crate::Result;

/// Submission options, merged from flags, a profile, and defaults
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub cores: Option<u32>,
    /// Memory in MB
    pub mem: Option<u64>,
    /// Walltime as HH:MM:SS
    pub time: Option<String>,
    pub partition: Option<String>,
    pub modules: Vec<String>,
    pub dependencies: Vec<u64>,
    pub suffix: Option<String>,
}

impl JobOptions {
    /// Fill unset fields from a profile; explicit values win
    pub fn fill_from(&mut self, profile: &Profile) {
        if self.cores.is_none() {
            self.cores = profile.cores;
        }
        if self.mem.is_none() {
            self.mem = profile.mem;
        }
        if self.time.is_none() {
            self.time = profile.time.clone();
        }
        if self.partition.is_none() {
            self.partition = profile.partition.clone();
        }
        if self.modules.is_empty() {
            self.modules = profile.modules.clone();
        }
    }
}

/// A single job: command, generated scripts, and submission state
#[derive(Debug)]
pub struct Job {
    pub name: String,
    pub command: String,
    pub workdir: PathBuf,
    pub qtype: QueueType,
    pub outfile: PathBuf,
    pub errfile: PathBuf,
    pub submission: Script,
    /// Slurm runs the wrapper through a separate exec script, because some
    /// Slurm systems execute submission-file lines concurrently
    pub exec_script: Option<Script>,
    pub id: Option<u64>,
    pub written: bool,
    pub options: JobOptions,
}

impl Job {
    /// Build a job and its scheduler-specific scripts
    pub fn new(
        command: &str,
        name: Option<&str>,
        path: Option<&Path>,
        qtype: QueueType,
        options: JobOptions,
        config: &FyrdConfig,
    ) -> Result<Self> {
        if command.trim().is_empty() {
            return Err(FyrdError::validation("Job command may not be empty"));
        }
        let name = match name {
            Some(n) => n.to_string(),
            None => default_name(command),
        };

        let workdir = match path {
            Some(p) => std::fs::canonicalize(p).map_err(|e| {
                FyrdError::Validation(format!("Bad job path {}: {}", p.display(), e))
            })?,
            None => std::env::current_dir()?,
        };
        let scriptdir = if config.jobs.scriptpath.is_empty() {
            workdir.clone()
        } else {
            crate::config::expand_path(&config.jobs.scriptpath)
        };

        let suffix = options
            .suffix
            .clone()
            .unwrap_or_else(|| config.jobs.suffix.clone());
        let outfile = workdir.join(format!("{}.{}.out", name, suffix));
        let errfile = workdir.join(format!("{}.{}.err", name, suffix));

        let wrapper = script::command_wrapper(&workdir, &name, command, &options.modules);
        let cores = options.cores.unwrap_or(1);

        let (submission, exec_script) = match qtype {
            QueueType::Slurm => {
                let exec_path = scriptdir.join(format!("{}.{}.script", name, suffix));
                let mut sub = vec!["#!/bin/bash".to_string()];
                if let Some(partition) = &options.partition {
                    sub.push(format!("#SBATCH -p {}", partition));
                }
                sub.push("#SBATCH --ntasks 1".to_string());
                sub.push(format!("#SBATCH --cpus-per-task {}", cores));
                if let Some(time) = &options.time {
                    sub.push(format!("#SBATCH --time={}", time));
                }
                if let Some(mem) = options.mem {
                    sub.push(format!("#SBATCH --mem={}", mem));
                }
                sub.push(format!("#SBATCH -o {}", outfile.display()));
                sub.push(format!("#SBATCH -e {}", errfile.display()));
                sub.push(format!("cd {}", workdir.display()));
                sub.push(format!("srun bash {}", exec_path.display()));

                let exec = format!("#!/bin/bash\n{}", wrapper);
                (
                    Script::new(
                        scriptdir.join(format!("{}.{}.sbatch", name, suffix)),
                        sub.join("\n"),
                    ),
                    Some(Script::new(exec_path, exec)),
                )
            }
            QueueType::Torque => {
                let mut sub = vec!["#!/bin/bash".to_string()];
                if let Some(partition) = &options.partition {
                    sub.push(format!("#PBS -q {}", partition));
                }
                sub.push(format!("#PBS -l nodes=1:ppn={}", cores));
                if let Some(time) = &options.time {
                    sub.push(format!("#PBS -l walltime={}", time));
                }
                if let Some(mem) = options.mem {
                    sub.push(format!("#PBS -l mem={}mb", mem));
                }
                sub.push(format!("#PBS -o {}", outfile.display()));
                sub.push(format!("#PBS -e {}", errfile.display()));
                sub.push(String::new());
                sub.push(wrapper);
                (
                    Script::new(
                        scriptdir.join(format!("{}.{}.qsub", name, suffix)),
                        sub.join("\n"),
                    ),
                    None,
                )
            }
            QueueType::Local => (
                Script::new(
                    scriptdir.join(format!("{}.{}", name, suffix)),
                    format!("#!/bin/bash\n{}", wrapper),
                ),
                None,
            ),
        };

        Ok(Self {
            name,
            command: command.to_string(),
            workdir,
            qtype,
            outfile,
            errfile,
            submission,
            exec_script,
            id: None,
            written: false,
            options,
        })
    }

    /// Write all script files
    pub fn write(&mut self) -> Result<()> {
        self.submission.write(true)?;
        if let Some(exec) = &mut self.exec_script {
            exec.write(true)?;
            #[cfg(unix)]
            exec.make_executable()?;
        }
        self.written = true;
        debug!("Wrote job files for '{}'", self.name);
        Ok(())
    }

    /// Submit the job, writing scripts first if needed
    pub async fn submit(&mut self, batch: &dyn BatchSystem) -> Result<u64> {
        if !self.written {
            self.write()?;
        }
        let id = batch
            .submit(&self.submission.file_name, &self.options.dependencies)
            .await?;
        self.id = Some(id);
        info!("Job '{}' submitted as {}", self.name, id);
        Ok(id)
    }

    /// Delete files this job wrote; with `clean_outputs`, the out/err files too
    pub fn clean(&mut self, clean_outputs: bool) -> Result<Vec<PathBuf>> {
        let mut deleted = Vec::new();
        if self.submission.clean()? {
            deleted.push(self.submission.file_name.clone());
        }
        if let Some(exec) = &mut self.exec_script {
            if exec.clean()? {
                deleted.push(exec.file_name.clone());
            }
        }
        if clean_outputs {
            for file in [&self.outfile, &self.errfile] {
                if file.exists() {
                    std::fs::remove_file(file)?;
                    deleted.push(file.clone());
                }
            }
        }
        Ok(deleted)
    }
}

/// Default job name: basename of the command's first word
pub fn default_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or("job")
        .rsplit('/')
        .next()
        .unwrap_or("job")
        .to_string()
}
