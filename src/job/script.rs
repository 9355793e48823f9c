// file: src/job/script.rs
// version: 1.0.0
// guid: 2c91e7b4-680d-4f53-ae27-c40b8d19f6a3

//! Generated script files
//!
//! A [`Script`] is a shell script body plus the file it belongs in. Every
//! job writes its scripts before submission, even in local mode, so that a
//! failed run can always be reproduced by hand.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// A script body and its target file
#[derive(Debug, Clone)]
pub struct Script {
    pub file_name: PathBuf,
    pub script: String,
    pub written: bool,
}

impl Script {
    pub fn new(file_name: PathBuf, script: String) -> Self {
        Self {
            file_name,
            script,
            written: false,
        }
    }

    pub fn exists(&self) -> bool {
        self.file_name.exists()
    }

    /// Write the script file; with `overwrite` false an existing file wins
    pub fn write(&mut self, overwrite: bool) -> Result<bool> {
        if !overwrite && self.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.file_name.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.file_name, format!("{}\n", self.script.trim_end()))?;
        self.written = true;
        debug!("Wrote script {}", self.file_name.display());
        Ok(true)
    }

    /// Mark the file executable (0755)
    #[cfg(unix)]
    pub fn make_executable(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&self.file_name)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&self.file_name, perms)?;
        Ok(())
    }

    /// Remove the file if this object wrote it
    pub fn clean(&mut self) -> Result<bool> {
        if self.written && self.exists() {
            std::fs::remove_file(&self.file_name)?;
            self.written = false;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Wrap a user command in the shared shell prologue and epilogue.
///
/// The wrapper loads requested modules, moves to the working directory,
/// stamps start and end times around the command, and reports a non-zero
/// exit code on stderr so it lands in the job's `.err` file.
pub fn command_wrapper(workdir: &Path, name: &str, command: &str, modules: &[String]) -> String {
    let mut lines = Vec::new();
    for module in modules {
        lines.push(format!("module load {}", module));
    }
    lines.push(format!("cd {}", workdir.display()));
    lines.push("date +'%y-%m-%d-%H:%M:%S'".to_string());
    lines.push(format!("echo \"Running {}\"", name));
    lines.push(command.to_string());
    lines.push("exitcode=$?".to_string());
    lines.push("echo Done".to_string());
    lines.push("date +'%y-%m-%d-%H:%M:%S'".to_string());
    lines.push("if [[ $exitcode != 0 ]]; then".to_string());
    lines.push("    echo Exited with code: $exitcode >&2".to_string());
    lines.push("fi".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_clean() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.cluster");
        let mut script = Script::new(path.clone(), "#!/bin/bash\necho hi".to_string());

        assert!(!script.exists());
        assert!(script.write(true).unwrap());
        assert!(script.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("echo hi\n"));

        assert!(script.clean().unwrap());
        assert!(!script.exists());
        // Cleaning twice is a no-op
        assert!(!script.clean().unwrap());
    }

    #[test]
    fn test_write_respects_overwrite_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.cluster");
        std::fs::write(&path, "original").unwrap();

        let mut script = Script::new(path.clone(), "replacement".to_string());
        assert!(!script.write(false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");

        assert!(script.write(true).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "replacement\n");
    }

    #[test]
    fn test_clean_skips_files_it_did_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("precious.sh");
        std::fs::write(&path, "keep me").unwrap();

        let mut script = Script::new(path.clone(), "other".to_string());
        assert!(!script.clean().unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_command_wrapper_contents() {
        let wrapper = command_wrapper(
            Path::new("/work/run1"),
            "align",
            "bwa mem ref.fa reads.fq",
            &["bwa/0.7".to_string()],
        );
        let lines: Vec<&str> = wrapper.lines().collect();
        assert_eq!(lines[0], "module load bwa/0.7");
        assert_eq!(lines[1], "cd /work/run1");
        assert!(wrapper.contains("echo \"Running align\""));
        assert!(wrapper.contains("bwa mem ref.fa reads.fq"));
        assert!(wrapper.contains("exitcode=$?"));
        assert!(wrapper.contains("echo Exited with code: $exitcode >&2"));
    }
}
