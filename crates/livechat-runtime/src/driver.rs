//! Connection driver
//!
//! Owns the transport and translates between it and a [`ChatSession`]:
//! connect, report lifecycle events, execute the session's effects, forward
//! chat events, and reconnect with backoff when the connection drops.

use livechat_core::{ChatSession, ClientEvent, Effect, ServerEvent, SessionEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::error::Result;
use crate::transport::Transport;

/// How a live connection ended
enum ConnectionEnd {
    Lost(String),
    Shutdown,
}

/// Reconnect loop around a single transport
pub struct ConnectionDriver<T: Transport> {
    transport: T,
    session: Arc<ChatSession>,
    backoff: Backoff,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport> ConnectionDriver<T> {
    pub fn new(
        transport: T,
        session: Arc<ChatSession>,
        backoff: Backoff,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            session,
            backoff,
            shutdown,
        }
    }

    /// Run until shutdown is signalled or the shutdown sender is dropped
    pub async fn run(mut self) -> Result<()> {
        info!("Connection driver started");

        while !self.shutdown_requested() {
            let connected = tokio::select! {
                result = self.transport.connect() => result,
                _ = self.shutdown.changed() => break,
            };

            match connected {
                Ok(info) => {
                    self.backoff.reset();
                    let effects = self.session.handle(SessionEvent::Connected {
                        session_id: info.session_id,
                    });

                    let end = match self.execute(effects).await {
                        Ok(()) => self.pump().await,
                        Err(error) => ConnectionEnd::Lost(error.to_string()),
                    };

                    match end {
                        ConnectionEnd::Shutdown => break,
                        ConnectionEnd::Lost(reason) => {
                            warn!("Connection lost: {}", reason);
                            self.session.handle(SessionEvent::Disconnected { reason });
                            if let Err(error) = self.transport.close().await {
                                debug!("Error closing transport: {}", error);
                            }
                        }
                    }
                }
                Err(error) => warn!("Connect attempt failed: {}", error),
            }

            let delay = self.backoff.next_delay();
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.transport.close().await?;
        if self.session.is_connected() {
            self.session.handle(SessionEvent::Disconnected {
                reason: "shutdown".to_string(),
            });
        }
        info!("Connection driver stopped");
        Ok(())
    }

    /// Forward chat events until the connection ends
    async fn pump(&mut self) -> ConnectionEnd {
        loop {
            let received = tokio::select! {
                received = self.transport.recv() => received,
                _ = self.shutdown.changed() => return ConnectionEnd::Shutdown,
            };

            let event = match received {
                Ok(Some(event)) => event,
                Ok(None) => return ConnectionEnd::Lost("closed by server".to_string()),
                Err(error) => return ConnectionEnd::Lost(error.to_string()),
            };

            let effects = match event {
                ServerEvent::StreamMessage(message) => {
                    self.session.handle(SessionEvent::Message(message))
                }
                ServerEvent::StreamMessages(messages) => {
                    self.session.handle(SessionEvent::History(messages))
                }
                ServerEvent::Other { .. } => continue,
            };

            if let Err(error) = self.execute(effects).await {
                return ConnectionEnd::Lost(error.to_string());
            }
        }
    }

    async fn execute(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::RequestSync => {
                    debug!("Requesting message history");
                    self.transport.send(ClientEvent::Sync).await?;
                }
            }
        }
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}
