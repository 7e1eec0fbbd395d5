//! Livechat CLI application
//!
//! Owns the loaded configuration and implements the long-running command
//! bodies on top of the shared live chat connection.

use std::collections::BTreeMap;
use std::time::Duration;

use livechat_core::{DisplayLimit, FeedUpdate};
use livechat_runtime::{LiveChat, LiveChatHandle};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::terminal::{format_message, format_stats, format_status};

/// CLI application state
pub struct LivechatApp {
    config: AppConfig,
}

impl LivechatApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Follow the feed until Ctrl-C or the connection is torn down
    pub async fn watch(&self) -> Result<()> {
        let handle = LiveChat::global(self.config.session.clone())?;
        let mut consumer = handle.attach();
        let limit = self.config.display.limit;

        info!(
            "Watching {} (showing {} messages)",
            self.config.session.server_url, limit
        );
        self.print_view(&handle, limit);

        loop {
            tokio::select! {
                update = consumer.recv() => match update {
                    Some(FeedUpdate::StatusChanged { connected }) => {
                        println!("{}", format_status(connected));
                    }
                    Some(FeedUpdate::MessageAppended(message)) => {
                        if let Some(line) = format_message(&message, &self.config.display) {
                            println!("{}", line);
                        }
                    }
                    Some(FeedUpdate::MessagesReplaced { count }) => {
                        debug!("History received with {} messages", count);
                        self.print_view(&handle, limit);
                    }
                    None => {
                        warn!("Feed closed");
                        break;
                    }
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(error) = signal {
                        warn!("Failed to listen for Ctrl-C: {}", error);
                    }
                    break;
                }
            }
        }

        drop(consumer);
        handle.shutdown().await?;
        Ok(())
    }

    /// Connect, wait for history and summarize the feed
    pub async fn status(&self, wait: Duration) -> Result<()> {
        let handle = LiveChat::start(self.config.session.clone())?;
        let mut consumer = handle.attach();

        let history = tokio::time::timeout(wait, async {
            while let Some(update) = consumer.recv().await {
                if let FeedUpdate::MessagesReplaced { count } = update {
                    return Some(count);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        let snapshot = handle.snapshot();
        println!("Server:    {}", self.config.session.server_url);
        println!(
            "Connected: {}",
            if snapshot.connected { "yes" } else { "no" }
        );
        match history {
            Some(count) => println!("History:   {} messages", count),
            None => println!("History:   not received within {:?}", wait),
        }

        let mut per_source: BTreeMap<&'static str, usize> = BTreeMap::new();
        for message in &snapshot.messages {
            let label = message.source().map(|source| source.name()).unwrap_or("unknown");
            *per_source.entry(label).or_default() += 1;
        }
        for (source, count) in &per_source {
            println!("  {:<8} {}", source, count);
        }
        println!("Feed:      {}", format_stats(&snapshot.stats));

        handle.shutdown().await?;
        Ok(())
    }

    fn print_view(&self, handle: &LiveChatHandle, limit: DisplayLimit) {
        for message in handle.view(limit) {
            if let Some(line) = format_message(&message, &self.config.display) {
                println!("{}", line);
            }
        }
    }
}
