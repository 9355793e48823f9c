// file: src/main.rs
// version: 1.0.0
// guid: 64b8d1f2-a903-47c5-8e6a-3f50c29d7b18

//! fyrd - Main entry point

use clap::Parser;
use fyrd::{
    batch,
    cli::{args::Cli, args::Commands, args::ConfAction, args::ProfileAction, commands::*},
    config::{self, FyrdConfig},
    logging::logger,
    Result,
};
use tokio::signal;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    logger::init_logger(cli.verbose, cli.quiet)?;

    let config_path = config::config_path(cli.config.as_deref())?;
    let config = FyrdConfig::load(&config_path)?;
    let requested = cli.queue_type.and_then(|q| q.to_queue_type());

    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        warn!("Received Ctrl+C, shutting down");
    };

    let command_future = async {
        match cli.command {
            Commands::Conf { action } => match action {
                ConfAction::Show { section } => {
                    conf_show_command(&config, section.as_deref()).await
                }
                ConfAction::Update {
                    section,
                    key,
                    value,
                } => conf_update_command(&config_path, &section, &key, &value).await,
            },
            Commands::Profile { action } => match action {
                ProfileAction::Show { name } => {
                    profile_show_command(&config, name.as_deref()).await
                }
                ProfileAction::Add { name, specs } => {
                    profile_add_command(&config, &name, &specs).await
                }
                ProfileAction::Update { name, specs } => {
                    profile_update_command(&config, &name, &specs).await
                }
                ProfileAction::Remove { name } => profile_remove_command(&config, &name).await,
            },
            Commands::Submit(args) => {
                let qtype = batch::resolve(requested, &config)?;
                submit_command(&config, qtype, &args).await
            }
            Commands::Wait { ids, timeout } => {
                let qtype = batch::resolve(requested, &config)?;
                wait_command(&config, qtype, &ids, timeout).await
            }
            Commands::Queue {
                user,
                partition,
                all,
                json,
            } => {
                let qtype = batch::resolve(requested, &config)?;
                queue_command(
                    &config,
                    qtype,
                    user.as_deref(),
                    partition.as_deref(),
                    all,
                    json,
                )
                .await
            }
            Commands::Clean {
                dir,
                suffix,
                dry_run,
            } => {
                let qtype = batch::resolve(requested, &config)?;
                clean_command(&config, qtype, dir.as_deref(), suffix.as_deref(), dry_run).await
            }
        }
    };

    tokio::select! {
        result = command_future => result,
        _ = shutdown_signal => {
            warn!("Interrupted by user");
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
    }
}
