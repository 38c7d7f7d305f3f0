//! `nexus gateway` command.

use crate::Cli;
use clap::{Args, Subcommand};
use nexus_core::config::BindMode;
use nexus_core::{Config, FieldSpec, FieldType, InputSchema, WorkflowHandle};
use nexus_gateway::Gateway;
use nexus_workflows::EchoRuntime;
use semver::Version;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct GatewayArgs {
    #[command(subcommand)]
    pub command: GatewayCommand,
}

#[derive(Subcommand)]
pub enum GatewayCommand {
    /// Start the gateway server
    Run {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,

        /// Bind to all interfaces instead of loopback
        #[arg(long)]
        lan: bool,
    },
}

pub async fn run(cli: &Cli, args: &GatewayArgs) -> anyhow::Result<()> {
    match &args.command {
        GatewayCommand::Run { port, lan } => serve(cli, *port, *lan).await,
    }
}

async fn serve(cli: &Cli, port: Option<u16>, lan: bool) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => match Config::default_path().ok().filter(|p| p.exists()) {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        },
    };
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if lan {
        config.gateway.bind = BindMode::Lan;
    }
    config.validate()?;

    let gateway = Gateway::in_memory(config, Arc::new(EchoRuntime::new()));
    gateway.registry().register(echo_workflow())?;
    info!("registered built-in workflow 'echo'");

    gateway.run().await
}

/// The built-in reference workflow served by the bundled runtime.
fn echo_workflow() -> WorkflowHandle {
    let schema = InputSchema::empty()
        .field(FieldSpec::required("message", FieldType::String).describe("Text to echo back"))
        .field(FieldSpec::optional("delay_ms", FieldType::Integer).describe("Artificial delay"));
    WorkflowHandle::new("echo", Version::new(1, 0, 0), schema, "workflow:execute")
        .with_description("Echo the message back")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_workflow_schema() {
        let handle = echo_workflow();
        assert_eq!(handle.id.as_str(), "echo");
        assert!(handle
            .input_schema
            .validate(&serde_json::json!({"message": "hi"}))
            .is_ok());
        assert!(handle
            .input_schema
            .validate(&serde_json::json!({}))
            .is_err());
    }
}
