// file: tests/integration_test.rs
// version: 1.0.0
// guid: e83f5a06-b2d1-4c97-a6e0-184c9d72f5b3

//! Integration tests for fyrd

use std::path::Path;
use tempfile::TempDir;

use fyrd::batch::{batch_system, QueueType};
use fyrd::clean::clean_dir;
use fyrd::config::{FyrdConfig, Profile, ProfileStore};
use fyrd::job::{Job, JobOptions};
use fyrd::queue::{wait_for, JobState, Queue};
use fyrd::Result;

fn config_in(dir: &Path) -> FyrdConfig {
    let mut config = FyrdConfig::default();
    config.jobs.profile_file = dir.join("profiles.toml").display().to_string();
    config.local.registry = dir.join("registry.json").display().to_string();
    config.queue.sleep_len = 1;
    config
}

#[test]
fn test_config_profile_integration() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    // Point the config at a profile file and persist it
    let mut config = config_in(temp_dir.path());
    config.update(
        "jobs",
        "profile_file",
        &temp_dir.path().join("my_profiles.toml").display().to_string(),
    )?;
    config.save(&config_path)?;

    let loaded = FyrdConfig::load(&config_path)?;
    assert!(loaded.jobs.profile_file.ends_with("my_profiles.toml"));

    // Profiles round-trip through the configured location
    let mut store = ProfileStore::load(loaded.profile_path())?;
    store.add(
        "high_mem",
        Profile::from_specs(&[
            "cores:92".to_string(),
            "mem:250GB".to_string(),
            "partition:high-mem".to_string(),
        ])?,
    )?;
    store.save()?;

    let store = ProfileStore::load(loaded.profile_path())?;
    let profile = store.get("high_mem").unwrap();
    assert_eq!(profile.cores, Some(92));
    assert_eq!(profile.mem, Some(250 * 1024));
    assert_eq!(profile.partition.as_deref(), Some("high-mem"));

    Ok(())
}

#[tokio::test]
async fn test_local_job_lifecycle() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(temp_dir.path());
    let batch = batch_system(QueueType::Local, &config);

    let mut job = Job::new(
        "echo integration",
        Some("greet"),
        Some(temp_dir.path()),
        QueueType::Local,
        JobOptions::default(),
        &config,
    )?;
    let id = job.submit(batch.as_ref()).await?;
    assert_eq!(job.id, Some(id));
    assert!(temp_dir.path().join("greet.cluster").exists());

    wait_for(
        batch.as_ref(),
        &[id],
        std::time::Duration::from_millis(100),
        Some(std::time::Duration::from_secs(30)),
    )
    .await?;

    let stdout = std::fs::read_to_string(temp_dir.path().join("greet.cluster.out"))?;
    assert!(stdout.contains("Running greet"));
    assert!(stdout.contains("integration"));
    assert!(stdout.contains("Done"));

    Ok(())
}

#[tokio::test]
async fn test_local_dependency_ordering() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(temp_dir.path());
    let batch = batch_system(QueueType::Local, &config);

    let mut first = Job::new(
        "echo first",
        Some("first"),
        Some(temp_dir.path()),
        QueueType::Local,
        JobOptions::default(),
        &config,
    )?;
    let first_id = first.submit(batch.as_ref()).await?;

    // The dependent submit blocks until the first job's process is gone
    let mut second = Job::new(
        "echo second",
        Some("second"),
        Some(temp_dir.path()),
        QueueType::Local,
        JobOptions {
            dependencies: vec![first_id],
            ..Default::default()
        },
        &config,
    )?;
    let second_id = second.submit(batch.as_ref()).await?;
    assert!(second_id > first_id);

    wait_for(
        batch.as_ref(),
        &[second_id],
        std::time::Duration::from_millis(100),
        Some(std::time::Duration::from_secs(30)),
    )
    .await?;

    let first_out = std::fs::read_to_string(temp_dir.path().join("first.cluster.out"))?;
    assert!(first_out.contains("first"));

    Ok(())
}

#[tokio::test]
async fn test_queue_snapshot_filters_local_jobs() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(temp_dir.path());
    let batch = batch_system(QueueType::Local, &config);

    let mut job = Job::new(
        "sleep 5",
        Some("napper"),
        Some(temp_dir.path()),
        QueueType::Local,
        JobOptions::default(),
        &config,
    )?;
    let id = job.submit(batch.as_ref()).await?;

    let queue = Queue::fetch(batch.as_ref()).await?;
    let mine = queue.get(id).unwrap();
    assert_eq!(mine.name, "napper");
    assert_eq!(mine.partition, "local");
    assert_eq!(mine.state, JobState::Running);

    // Local jobs all land in the "local" partition
    assert!(queue.filtered(None, Some("high-mem")).is_empty());
    assert_eq!(queue.filtered(None, Some("local")).len(), queue.len());

    batch.cancel(id).await?;
    Ok(())
}

#[tokio::test]
async fn test_written_job_files_are_cleanable() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(temp_dir.path());

    // A written (never submitted) slurm job leaves its scripts behind
    let mut job = Job::new(
        "bwa mem ref.fa",
        Some("align"),
        Some(temp_dir.path()),
        QueueType::Slurm,
        JobOptions::default(),
        &config,
    )?;
    job.write()?;
    assert!(temp_dir.path().join("align.cluster.sbatch").exists());
    assert!(temp_dir.path().join("align.cluster.script").exists());

    let deleted = clean_dir(temp_dir.path(), "cluster", QueueType::Slurm, false)?;
    assert_eq!(deleted.len(), 2);
    assert!(!temp_dir.path().join("align.cluster.sbatch").exists());

    Ok(())
}
