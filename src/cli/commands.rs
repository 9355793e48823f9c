// file: src/cli/commands.rs
// version: 1.0.0
// guid: 7b2d9e50-c4a8-4631-bf79-0e85d2c7a194

//! Command implementations for the CLI

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::batch::{self, local::current_user, BatchSystem, QueueType};
use crate::cli::args::SubmitArgs;
use crate::config::{profiles, FyrdConfig, Profile, ProfileStore};
use crate::error::FyrdError;
use crate::job::{Job, JobOptions};
use crate::output;
use crate::queue::{self, Queue};
use crate::Result;

/// Show the configuration, or one section of it
pub async fn conf_show_command(config: &FyrdConfig, section: Option<&str>) -> Result<()> {
    print!("{}", config.show(section)?);
    Ok(())
}

/// Set one configuration key and persist the file
pub async fn conf_update_command(
    config_path: &Path,
    section: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut config = FyrdConfig::load(config_path)?;
    config.update(section, key, value)?;
    config.save(config_path)?;
    output::print_success(&format!("Set {}.{} = {}", section, key, value));
    Ok(())
}

/// Show all profiles, or one by name
pub async fn profile_show_command(config: &FyrdConfig, name: Option<&str>) -> Result<()> {
    let store = ProfileStore::load(config.profile_path())?;
    match name {
        Some(name) => {
            let profile = store
                .get(name)
                .ok_or_else(|| FyrdError::Profile(format!("No profile named '{}'", name)))?;
            let name = name.to_string();
            println!("{}", output::profile_table(std::iter::once((&name, profile))));
        }
        None => {
            if store.is_empty() {
                output::print_info("No profiles defined yet (try 'fyrd profile add')");
            } else {
                println!("{}", output::profile_table(store.iter()));
            }
        }
    }
    Ok(())
}

/// Create a new profile from key:value specs
pub async fn profile_add_command(config: &FyrdConfig, name: &str, specs: &[String]) -> Result<()> {
    let mut store = ProfileStore::load(config.profile_path())?;
    store.add(name, Profile::from_specs(specs)?)?;
    store.save()?;
    output::print_success(&format!("Added profile '{}'", name));
    Ok(())
}

/// Change keys on an existing profile
pub async fn profile_update_command(
    config: &FyrdConfig,
    name: &str,
    specs: &[String],
) -> Result<()> {
    let mut store = ProfileStore::load(config.profile_path())?;
    store.update(name, specs)?;
    store.save()?;
    output::print_success(&format!("Updated profile '{}'", name));
    Ok(())
}

/// Delete a profile
pub async fn profile_remove_command(config: &FyrdConfig, name: &str) -> Result<()> {
    let mut store = ProfileStore::load(config.profile_path())?;
    store.remove(name)?;
    store.save()?;
    output::print_success(&format!("Removed profile '{}'", name));
    Ok(())
}

/// Submit a command (or an existing script file) as a job.
///
/// Prints the assigned job id on stdout so scripts can capture it.
pub async fn submit_command(
    config: &FyrdConfig,
    qtype: QueueType,
    args: &SubmitArgs,
) -> Result<()> {
    let batch = batch::batch_system(qtype, config);
    let options = build_options(config, args)?;

    block_for_queue_room(config, batch.as_ref()).await?;

    let id = if args.file {
        // Pre-made script, submitted as-is
        if args.command.len() != 1 {
            return Err(FyrdError::validation(
                "--file takes exactly one script path",
            ));
        }
        let script = PathBuf::from(&args.command[0]);
        if !script.is_file() {
            return Err(FyrdError::Validation(format!(
                "Script file {} does not exist",
                script.display()
            )));
        }
        batch.submit(&script, &options.dependencies).await?
    } else {
        let command = args.command.join(" ");
        let mut job = Job::new(
            &command,
            args.name.as_deref(),
            args.path.as_deref(),
            qtype,
            options,
            config,
        )?;
        job.submit(batch.as_ref()).await?
    };

    println!("{}", id);
    Ok(())
}

/// Block until the listed jobs finish
pub async fn wait_command(
    config: &FyrdConfig,
    qtype: QueueType,
    ids: &[u64],
    timeout: Option<u64>,
) -> Result<()> {
    let batch = batch::batch_system(qtype, config);
    info!("Waiting for {} jobs on the {} queue", ids.len(), qtype);
    queue::wait_for(
        batch.as_ref(),
        ids,
        Duration::from_secs(config.queue.sleep_len),
        timeout.map(Duration::from_secs),
    )
    .await?;
    output::print_success("All jobs finished");
    Ok(())
}

/// Show the scheduler queue
pub async fn queue_command(
    config: &FyrdConfig,
    qtype: QueueType,
    user: Option<&str>,
    partition: Option<&str>,
    all: bool,
    json: bool,
) -> Result<()> {
    let batch = batch::batch_system(qtype, config);
    let queue = Queue::fetch(batch.as_ref()).await?;

    // Default to the invoking user's jobs unless told otherwise
    let owner = if all {
        None
    } else {
        Some(user.map(str::to_string).unwrap_or_else(current_user))
    };
    let jobs = queue.filtered(owner.as_deref(), partition);
    output::print_jobs(&jobs, json)
}

/// Remove generated job files from a directory
pub async fn clean_command(
    config: &FyrdConfig,
    qtype: QueueType,
    dir: Option<&Path>,
    suffix: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let suffix = suffix.unwrap_or(&config.jobs.suffix);
    let deleted = crate::clean::clean_dir(&dir, suffix, qtype, dry_run)?;

    for path in &deleted {
        println!("{}", path.display());
    }
    if dry_run {
        output::print_info(&format!("Would delete {} files", deleted.len()));
    } else {
        output::print_success(&format!("Deleted {} files", deleted.len()));
    }
    Ok(())
}

/// Merge flags, the requested profile, and the default profile into options
fn build_options(config: &FyrdConfig, args: &SubmitArgs) -> Result<JobOptions> {
    let mut options = JobOptions {
        cores: args.cores,
        mem: args
            .mem
            .as_deref()
            .map(|m| {
                profiles::parse_mem(m).ok_or_else(|| {
                    FyrdError::Validation(format!("Bad memory spec '{}'", m))
                })
            })
            .transpose()?,
        time: args
            .time
            .as_deref()
            .map(|t| {
                profiles::parse_time(t).ok_or_else(|| {
                    FyrdError::Validation(format!("Bad time spec '{}'", t))
                })
            })
            .transpose()?,
        partition: args.partition.clone(),
        modules: args.modules.clone(),
        dependencies: args.depends.clone(),
        suffix: None,
    };

    let store = ProfileStore::load(config.profile_path())?;
    if let Some(name) = &args.profile {
        let profile = store
            .get(name)
            .ok_or_else(|| FyrdError::Profile(format!("No profile named '{}'", name)))?;
        options.fill_from(profile);
    }
    if let Some(default) = store.default_profile() {
        options.fill_from(default);
    }
    Ok(options)
}

/// Hold submission while the user's queue is at the configured cap
async fn block_for_queue_room(config: &FyrdConfig, batch: &dyn BatchSystem) -> Result<()> {
    if config.queue.max_jobs == 0 || batch.queue_type() == QueueType::Local {
        return Ok(());
    }
    let user = current_user();
    loop {
        let queue = Queue::fetch(batch).await?;
        let mine = queue.filtered(Some(&user), None).len();
        if (mine as u32) < config.queue.max_jobs {
            return Ok(());
        }
        warn!(
            "Queue is full ({} >= {}), sleeping before submission",
            mine, config.queue.max_jobs
        );
        tokio::time::sleep(Duration::from_secs(config.queue.sleep_len)).await;
    }
}
