//! `nexus session` command.

use crate::client::store_token;
use crate::commands::client;
use crate::render;
use crate::Cli;
use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Mint a fresh session token from principal credentials and store it
    Login,

    /// Describe the current session
    Whoami,

    /// Revoke the current session and forget the stored token
    Logout,
}

pub async fn run(cli: &Cli, args: &SessionArgs) -> anyhow::Result<()> {
    match args.command {
        SessionCommand::Login => login(cli).await,
        SessionCommand::Whoami => {
            let data = client(cli)
                .command("whoami", Value::Object(Default::default()))
                .await?;
            render::render(&data, cli.output);
            Ok(())
        }
        SessionCommand::Logout => {
            let gateway = client(cli);
            if gateway.has_token() {
                // Best-effort remote revocation; the local token is
                // forgotten either way.
                if let Err(e) = gateway
                    .command("revoke", Value::Object(Default::default()))
                    .await
                {
                    eprintln!("{} could not revoke session: {e}", style("!").yellow());
                }
            }
            let path = crate::client::token_path()?;
            if path.exists() {
                std::fs::remove_file(&path)?;
                eprintln!("{} stored token removed", style("*").green());
            } else {
                eprintln!("{} no stored token", style("-").dim());
            }
            Ok(())
        }
    }
}

async fn login(cli: &Cli) -> anyhow::Result<()> {
    let data = client(cli)
        .command("login", Value::Object(Default::default()))
        .await?;

    if let Some(token) = data["token"].as_str() {
        store_token(token)?;
        eprintln!(
            "{} session {} stored",
            style("*").green(),
            style(data["session_id"].as_str().unwrap_or("-")).bold()
        );
    }
    render::render(&data, cli.output);
    Ok(())
}
