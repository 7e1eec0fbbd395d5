//! Livechat Runtime
//!
//! Drives a [`livechat_core::ChatSession`] from a live Socket.IO connection:
//! - `SocketIoTransport`: Engine.IO v4 over WebSocket
//! - `ConnectionDriver`: connect, resync, forward events, reconnect with backoff
//! - `LiveChat`: the process-wide connection registry consumers attach to

pub mod backoff;
pub mod driver;
pub mod error;
pub mod registry;
pub mod socketio;
pub mod transport;

pub use backoff::Backoff;
pub use driver::ConnectionDriver;
pub use error::{Result, RuntimeError};
pub use registry::{FeedConsumer, LiveChat, LiveChatHandle};
pub use socketio::{engine_url, SocketIoTransport};
pub use transport::{ConnectInfo, Transport};

// Re-export core types for convenience
pub use livechat_core::{
    ChatMessage, ChatSession, DisplayLimit, FeedUpdate, SessionConfig, SessionSnapshot,
};
