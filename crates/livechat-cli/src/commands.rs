//! Command handlers for the livechat CLI

use std::time::Duration;
use tracing::info;

use crate::app::LivechatApp;
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::Result;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, app: LivechatApp) -> Result<()> {
        match command {
            Commands::Watch { .. } => app.watch().await,
            Commands::Status { timeout } => {
                info!("Checking server status");
                app.status(Duration::from_secs(timeout)).await
            }
            Commands::Config => {
                println!("{}", AppConfig::example_config());
                Ok(())
            }
        }
    }
}
