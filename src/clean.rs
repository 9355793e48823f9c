// file: src/clean.rs
// version: 1.0.0
// guid: 48f1d3a9-27c6-40e8-b5f1-9e03c6a82d17

//! Cleanup of generated job files
//!
//! Deletes every file in a directory whose name carries the fyrd suffix and
//! one of the generated extensions. The suffix keeps this from ever touching
//! files fyrd did not write, but it still removes *all* matching files, not
//! just those from the current session.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::batch::QueueType;
use crate::Result;

/// Extensions generated for a queue type with the given suffix.
///
/// Out/err files are always included; the script extensions depend on the
/// scheduler that wrote them.
pub fn extensions(suffix: &str, qtype: QueueType) -> Vec<String> {
    let mut exts = vec![format!(".{}.err", suffix), format!(".{}.out", suffix)];
    match qtype {
        QueueType::Slurm => {
            exts.push(format!(".{}.sbatch", suffix));
            exts.push(format!(".{}.script", suffix));
        }
        QueueType::Torque => exts.push(format!(".{}.qsub", suffix)),
        QueueType::Local => exts.push(format!(".{}", suffix)),
    }
    exts
}

/// Delete generated files in `dir`, returning what was (or would be) removed
pub fn clean_dir(dir: &Path, suffix: &str, qtype: QueueType, dry_run: bool) -> Result<Vec<PathBuf>> {
    let exts = extensions(suffix, qtype);
    let mut deleted = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if exts.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            if dry_run {
                debug!("Would delete {}", path.display());
            } else {
                std::fs::remove_file(&path)?;
                debug!("Deleted {}", path.display());
            }
            deleted.push(path);
        }
    }

    deleted.sort();
    if !dry_run {
        info!("Deleted {} generated files from {}", deleted.len(), dir.display());
    }
    Ok(deleted)
}
