//! Livechat CLI entry point

use anyhow::Context;
use clap::Parser;
use tracing::info;

use livechat_cli::{
    app::LivechatApp,
    cli::{Cli, Commands},
    commands::CommandDispatcher,
    config::AppConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Printing the example needs no configuration at all
    if matches!(cli.command, Commands::Config) {
        return CommandDispatcher::execute(cli.command, LivechatApp::new(AppConfig::default())?)
            .await
            .context("config command failed");
    }

    // Load configuration, then apply command line overrides
    let limit = match &cli.command {
        Commands::Watch { limit } => *limit,
        _ => None,
    };
    let config = AppConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_overrides(cli.server.clone(), limit);

    let app = LivechatApp::new(config).context("invalid configuration")?;
    CommandDispatcher::execute(cli.command, app)
        .await
        .context("command execution failed")?;

    info!("livechat exited");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
