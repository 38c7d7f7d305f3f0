//! CLI command implementations.

pub mod events;
pub mod gateway;
pub mod invoke;
pub mod runs;
pub mod session;
pub mod workflows;

use crate::client::GatewayClient;
use crate::Cli;

/// Build the gateway client from the global CLI options.
pub(crate) fn client(cli: &Cli) -> GatewayClient {
    GatewayClient::new(&cli.gateway_url, cli.token.clone())
}
