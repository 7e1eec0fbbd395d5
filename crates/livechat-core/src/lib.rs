//! Livechat Core
//!
//! Message model, feed aggregation and connection session for a viewer that
//! merges live chat from Twitch, YouTube and the host system into one feed.
//! Nothing in this crate performs I/O: the session consumes transport events
//! and returns effects, and the runtime crate owns the network.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod feed;
pub mod message;
pub mod render;
pub mod session;
pub mod types;
pub mod wire;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{FeedConfig, SessionConfig};
pub use errors::{LivechatError, ProtocolError, Result, StateTransitionError};
pub use feed::{DisplayLimit, FeedAggregator, FeedStats};
pub use message::{
    twitch_emote_url, Badge, ChatMessage, ChatUser, CheermoteVisual, ExtraShape, Fragment,
    MessageBody, MessageSource, Place, Run,
};
pub use render::{render, Author, Decoration, DisplayElement, RenderedMessage};
pub use session::{
    AuditEntry, ChatSession, ConnectionEvent, ConnectionState, Effect, FeedUpdate, SessionEvent,
    SessionSnapshot, StateTransition, Subscription,
};
pub use types::{MessageId, Timestamp};
pub use wire::{ClientEvent, ServerEvent};
