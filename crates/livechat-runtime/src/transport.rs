//! Transport abstraction
//!
//! The driver only needs a connection that can be opened, read as a stream of
//! chat events, written with client events and closed. Keeping that behind a
//! trait lets tests drive the reconnect loop with an in-memory transport.

use async_trait::async_trait;
use livechat_core::{ClientEvent, ServerEvent};

use crate::error::Result;

/// Details of an established connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectInfo {
    /// Session id assigned by the server, if it reports one
    pub session_id: Option<String>,
}

/// Bidirectional chat event channel to the upstream server
#[async_trait]
pub trait Transport: Send {
    /// Open a fresh connection, replacing any previous one
    async fn connect(&mut self) -> Result<ConnectInfo>;

    /// Next chat event; `Ok(None)` once the server closed the connection
    async fn recv(&mut self) -> Result<Option<ServerEvent>>;

    /// Send a client event on the open connection
    async fn send(&mut self, event: ClientEvent) -> Result<()>;

    /// Close the connection; a no-op when nothing is open
    async fn close(&mut self) -> Result<()>;
}
