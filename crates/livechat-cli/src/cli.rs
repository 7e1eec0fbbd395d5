//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};
use livechat_core::DisplayLimit;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live chat viewer for Twitch and YouTube streams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Chat server URL, overrides the configuration file
    #[arg(short, long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the live feed until interrupted
    Watch {
        /// Most recent messages to show, or "all"
        #[arg(short, long)]
        limit: Option<DisplayLimit>,
    },
    /// Connect once and report connection and feed status
    Status {
        /// Seconds to wait for the message history
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,
    },
    /// Print an example configuration file
    Config,
}
