// file: src/cli/args.rs
// version: 1.0.0
// guid: 5e38b0c7-12d9-4fa6-9347-80cd1b6e52a9

//! Command line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::batch::QueueType;

#[derive(Parser)]
#[command(name = "fyrd")]
#[command(about = "Submit and manage cluster jobs from a single entry point")]
#[command(version = crate::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Scheduler to use instead of auto-detection
    #[arg(long, global = true, value_enum)]
    pub queue_type: Option<QueueTypeArg>,

    /// Alternate config file (default ~/.fyrd/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or change configuration
    Conf {
        #[command(subcommand)]
        action: ConfAction,
    },

    /// Manage submission profiles
    #[command(visible_alias = "prof")]
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Submit a command as a cluster job
    Submit(SubmitArgs),

    /// Block until the listed jobs finish
    Wait {
        /// Job ids to wait for
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show the scheduler queue
    Queue {
        /// Only this user's jobs (default: your own)
        #[arg(short, long)]
        user: Option<String>,

        /// Only jobs in this partition
        #[arg(short, long)]
        partition: Option<String>,

        /// Everyone's jobs
        #[arg(short, long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Remove generated job files from a directory
    Clean {
        /// Directory to clean (default: current directory)
        dir: Option<PathBuf>,

        /// Override the configured file suffix
        #[arg(long)]
        suffix: Option<String>,

        /// List what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfAction {
    /// Print the configuration, or one section of it
    Show {
        /// Section to show: queue, jobs, or local
        section: Option<String>,
    },

    /// Set a single configuration key
    Update {
        section: String,
        key: String,
        value: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Print all profiles, or one by name
    Show { name: Option<String> },

    /// Create a profile from key:value specs, e.g. cores:92 mem:250GB
    Add {
        name: String,
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Change keys on an existing profile
    Update {
        name: String,
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Delete a profile
    Remove { name: String },
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Command to run (quote it, or pass it after --)
    #[arg(required = true, trailing_var_arg = true)]
    pub command: Vec<String>,

    /// Job name (default: the command's basename)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Submission profile to draw options from
    #[arg(short = 'P', long)]
    pub profile: Option<String>,

    #[arg(short, long)]
    pub cores: Option<u32>,

    /// Memory, e.g. 4000, 4000MB, or 250GB
    #[arg(short, long)]
    pub mem: Option<String>,

    /// Walltime, e.g. 02:30:00 or plain minutes
    #[arg(short, long)]
    pub time: Option<String>,

    #[arg(short, long)]
    pub partition: Option<String>,

    /// Module to load before the command (repeatable)
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Job ids this job must wait for (repeatable or comma-separated)
    #[arg(short, long = "depends", value_delimiter = ',')]
    pub depends: Vec<u64>,

    /// Directory to run in (default: current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// The command is an existing script file; submit it as-is
    #[arg(short, long)]
    pub file: bool,
}

/// Queue type argument for the CLI
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum QueueTypeArg {
    Auto,
    Slurm,
    Torque,
    Local,
}

impl QueueTypeArg {
    /// `Auto` defers to config and detection
    pub fn to_queue_type(self) -> Option<QueueType> {
        match self {
            QueueTypeArg::Auto => None,
            QueueTypeArg::Slurm => Some(QueueType::Slurm),
            QueueTypeArg::Torque => Some(QueueType::Torque),
            QueueTypeArg::Local => Some(QueueType::Local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_matches_crate() {
        assert_eq!(Cli::command().get_version(), Some(crate::VERSION));
    }

    #[test]
    fn test_parse_release_note_examples() {
        // The documented invocations must keep parsing
        Cli::try_parse_from(["fyrd", "conf", "show"]).unwrap();
        Cli::try_parse_from([
            "fyrd", "conf", "update", "jobs", "profile_file", "~/fyrd_profiles",
        ])
        .unwrap();
        Cli::try_parse_from(["fyrd", "profile", "show"]).unwrap();
        Cli::try_parse_from([
            "fyrd", "prof", "add", "high_mem", "cores:92", "mem:250GB", "partition:high-mem",
        ])
        .unwrap();
        Cli::try_parse_from(["fyrd", "wait", "2764832", "27464896"]).unwrap();
        Cli::try_parse_from(["fyrd", "queue"]).unwrap();
        Cli::try_parse_from(["fyrd", "queue", "-p", "high-mem"]).unwrap();
        Cli::try_parse_from(["fyrd", "queue", "-u", "jeff"]).unwrap();
    }

    #[test]
    fn test_wait_requires_ids() {
        assert!(Cli::try_parse_from(["fyrd", "wait"]).is_err());
    }

    #[test]
    fn test_submit_parses_options() {
        let cli = Cli::try_parse_from([
            "fyrd", "submit", "-n", "align", "-c", "8", "-m", "16GB", "-d", "1,2", "--", "bwa",
            "mem", "ref.fa",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.name.as_deref(), Some("align"));
                assert_eq!(args.cores, Some(8));
                assert_eq!(args.mem.as_deref(), Some("16GB"));
                assert_eq!(args.depends, vec![1, 2]);
                assert_eq!(args.command, vec!["bwa", "mem", "ref.fa"]);
            }
            _ => panic!("expected submit"),
        }
    }
}
