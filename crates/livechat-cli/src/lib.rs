//! Livechat CLI library
//!
//! Command parsing, configuration and terminal output for the `livechat`
//! binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal;

pub use app::LivechatApp;
pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::{AppConfig, DisplayConfig};
pub use error::{CliError, Result};
