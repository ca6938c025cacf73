pub mod agent;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use agent::{Agent, AgentError};
pub use config::{Config, ConfigError, LogLevel, TransportKind};

use tracing::info;

/// Binary entry point: parse configuration, set up logging, run the agent
/// until a shutdown signal arrives.
pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_args(std::env::args())?;
    logging::init(&config);

    info!("Starting beacon-agent v{}", env!("CARGO_PKG_VERSION"));

    let agent = Agent::from_config(&config)?;
    shutdown::spawn_signal_listener(agent.cancel_token());
    agent.run().await?;

    info!("beacon-agent stopped");
    Ok(())
}
