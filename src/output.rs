// file: src/output.rs
// version: 1.0.0
// guid: 91c5e2d8-4a70-4b16-ae39-6f28d0b7c453

//! Output formatting utilities

use colored::Colorize;
use tabled::builder::Builder;
use tabled::Table;

use crate::config::Profile;
use crate::queue::QueueJob;
use crate::Result;

/// Render queue jobs as a table
pub fn job_table(jobs: &[QueueJob]) -> String {
    Table::new(jobs.iter().cloned()).to_string()
}

/// Print queue jobs as a table or JSON
pub fn print_jobs(jobs: &[QueueJob], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(jobs)?);
    } else if jobs.is_empty() {
        println!("{}", "Queue is empty".dimmed());
    } else {
        println!("{}", job_table(jobs));
    }
    Ok(())
}

/// Render named profiles as a table
pub fn profile_table<'a>(profiles: impl Iterator<Item = (&'a String, &'a Profile)>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["NAME", "CORES", "MEM (MB)", "TIME", "PARTITION", "MODULES"]);
    for (name, profile) in profiles {
        builder.push_record([
            name.clone(),
            opt_cell(profile.cores),
            opt_cell(profile.mem),
            profile.time.clone().unwrap_or_else(|| "-".to_string()),
            profile.partition.clone().unwrap_or_else(|| "-".to_string()),
            if profile.modules.is_empty() {
                "-".to_string()
            } else {
                profile.modules.join(",")
            },
        ]);
    }
    builder.build().to_string()
}

fn opt_cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
