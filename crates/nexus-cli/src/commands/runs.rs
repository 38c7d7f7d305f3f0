//! `nexus runs` command.

use crate::commands::client;
use crate::render;
use crate::Cli;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommand,
}

#[derive(Subcommand)]
pub enum RunsCommand {
    /// Fetch the status of a run
    Status {
        /// Run identifier
        run_id: String,
    },

    /// Request cooperative cancellation of a run
    Cancel {
        /// Run identifier
        run_id: String,
    },
}

pub async fn run(cli: &Cli, args: &RunsArgs) -> anyhow::Result<()> {
    let (command, run_id) = match &args.command {
        RunsCommand::Status { run_id } => ("status", run_id),
        RunsCommand::Cancel { run_id } => ("cancel", run_id),
    };

    let data = client(cli)
        .command(command, serde_json::json!({ "run_id": run_id }))
        .await?;
    render::render(&data, cli.output);
    Ok(())
}
