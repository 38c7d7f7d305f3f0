//! Nexus command-line interface.
//!
//! The CLI is a command-protocol client: every command maps onto a named
//! gateway command with a map of options, and the structured result is
//! rendered as text, a table, or JSON on request.

pub mod client;
pub mod commands;
pub mod render;

use clap::{Parser, Subcommand};
use render::OutputFormat;

/// Nexus - unified orchestration gateway
#[derive(Parser)]
#[command(name = "nexus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "NEXUS_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Gateway base URL
    #[arg(long, env = "NEXUS_GATEWAY_URL", default_value = "http://127.0.0.1:18930")]
    pub gateway_url: String,

    /// Bearer token (falls back to the stored token)
    #[arg(long, env = "NEXUS_TOKEN")]
    pub token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway server
    Gateway(commands::gateway::GatewayArgs),

    /// Invoke a workflow
    Invoke(commands::invoke::InvokeArgs),

    /// Inspect registered workflows
    Workflows(commands::workflows::WorkflowsArgs),

    /// Inspect and control execution runs
    Runs(commands::runs::RunsArgs),

    /// Session management
    Session(commands::session::SessionArgs),

    /// Follow gateway events
    Events(commands::events::EventsArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Gateway(ref args) => commands::gateway::run(&cli, args).await,
        Commands::Invoke(ref args) => commands::invoke::run(&cli, args).await,
        Commands::Workflows(ref args) => commands::workflows::run(&cli, args).await,
        Commands::Runs(ref args) => commands::runs::run(&cli, args).await,
        Commands::Session(ref args) => commands::session::run(&cli, args).await,
        Commands::Events(ref args) => commands::events::run(&cli, args).await,
        Commands::Version => {
            println!("nexus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["nexus", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_parse_invoke_with_inputs() {
        let cli = Cli::try_parse_from([
            "nexus", "invoke", "echo", "--input", "message=hi", "--input", "count=3",
        ])
        .unwrap();
        match cli.command {
            Commands::Invoke(args) => {
                assert_eq!(args.workflow, "echo");
                assert_eq!(args.inputs.len(), 2);
            }
            _ => panic!("Expected Invoke command"),
        }
    }

    #[test]
    fn test_parse_runs_status() {
        let cli = Cli::try_parse_from(["nexus", "runs", "status", "run-abc"]).unwrap();
        match cli.command {
            Commands::Runs(args) => match args.command {
                commands::runs::RunsCommand::Status { run_id } => {
                    assert_eq!(run_id, "run-abc");
                }
                _ => panic!("Expected Runs Status command"),
            },
            _ => panic!("Expected Runs command"),
        }
    }

    #[test]
    fn test_parse_session_login() {
        let cli = Cli::try_parse_from(["nexus", "session", "login"]).unwrap();
        match cli.command {
            Commands::Session(args) => {
                assert!(matches!(
                    args.command,
                    commands::session::SessionCommand::Login
                ));
            }
            _ => panic!("Expected Session command"),
        }
    }

    #[test]
    fn test_parse_gateway_run_with_port() {
        let cli = Cli::try_parse_from(["nexus", "gateway", "run", "--port", "9999"]).unwrap();
        match cli.command {
            Commands::Gateway(args) => match args.command {
                commands::gateway::GatewayCommand::Run { port, .. } => {
                    assert_eq!(port, Some(9999));
                }
            },
            _ => panic!("Expected Gateway command"),
        }
    }

    #[test]
    fn test_parse_output_format() {
        let cli = Cli::try_parse_from(["nexus", "--output", "json", "workflows", "list"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_parse_events_tail_pattern() {
        let cli =
            Cli::try_parse_from(["nexus", "events", "tail", "--pattern", "workflow.*"]).unwrap();
        match cli.command {
            Commands::Events(args) => match args.command {
                commands::events::EventsCommand::Tail { pattern, .. } => {
                    assert_eq!(pattern, "workflow.*");
                }
            },
            _ => panic!("Expected Events command"),
        }
    }
}
