//! `nexus events` command.

use crate::commands::client;
use crate::render;
use crate::Cli;
use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

#[derive(Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    /// Subscribe and poll for events until interrupted
    Tail {
        /// Event type pattern (literal or trailing wildcard)
        #[arg(long, default_value = "*")]
        pattern: String,

        /// Poll interval in seconds
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
}

pub async fn run(cli: &Cli, args: &EventsArgs) -> anyhow::Result<()> {
    match &args.command {
        EventsCommand::Tail { pattern, interval } => tail(cli, pattern, *interval).await,
    }
}

/// The command channel delivers events by queued poll: register a
/// subscription, then drain it on an interval.
async fn tail(cli: &Cli, pattern: &str, interval: u64) -> anyhow::Result<()> {
    let client = client(cli);

    let sub = client
        .command("subscribe", serde_json::json!({ "pattern": pattern }))
        .await?;
    let subscription_id = sub["subscription_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    eprintln!(
        "{} subscribed to {} ({})",
        style("*").green(),
        style(pattern).bold(),
        style(&subscription_id).dim()
    );

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let data = client
                    .command(
                        "poll",
                        serde_json::json!({ "subscription_id": subscription_id }),
                    )
                    .await?;
                if let Some(events) = data["events"].as_array() {
                    for event in events {
                        print_event(event, cli);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = client
                    .command(
                        "unsubscribe",
                        serde_json::json!({ "subscription_id": subscription_id }),
                    )
                    .await;
                eprintln!("{} unsubscribed", style("*").green());
                return Ok(());
            }
        }
    }
}

fn print_event(event: &Value, cli: &Cli) {
    match cli.output {
        render::OutputFormat::Json => {
            println!("{}", serde_json::to_string(event).unwrap_or_default());
        }
        _ => {
            println!(
                "{} {} {}",
                style(event["timestamp"].as_str().unwrap_or("-")).dim(),
                style(event["type"].as_str().unwrap_or("?")).bold(),
                event["payload"],
            );
        }
    }
}
