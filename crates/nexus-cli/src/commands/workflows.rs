//! `nexus workflows` command.

use crate::commands::client;
use crate::render;
use crate::Cli;
use clap::{Args, Subcommand};
use serde_json::Value;

#[derive(Args)]
pub struct WorkflowsArgs {
    #[command(subcommand)]
    pub command: WorkflowsCommand,
}

#[derive(Subcommand)]
pub enum WorkflowsCommand {
    /// List workflows visible to the session
    List,
}

pub async fn run(cli: &Cli, args: &WorkflowsArgs) -> anyhow::Result<()> {
    match args.command {
        WorkflowsCommand::List => {
            let data = client(cli)
                .command("workflows", Value::Object(Default::default()))
                .await?;
            render::render(&data, cli.output);
            Ok(())
        }
    }
}
