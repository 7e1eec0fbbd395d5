//! Connection session
//!
//! Tracks whether the upstream connection is live and routes message events
//! into the feed aggregator. The session never drives the network itself: a
//! runtime feeds it [`SessionEvent`]s and executes the [`Effect`]s it returns.
//!
//! The connection lifecycle is a small consuming state machine. Connection
//! events that would not change the state (a second `Connected` while already
//! connected, for example) are rejected, which keeps the resync request to
//! exactly one per established connection.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::errors::StateTransitionError;
use crate::feed::{DisplayLimit, FeedAggregator, FeedStats};
use crate::message::ChatMessage;
use crate::types::Timestamp;

/// Number of audit entries a session retains
pub const AUDIT_LOG_CAPACITY: usize = 100;

// ----------------------------------------------------------------------------
// Connection State Types
// ----------------------------------------------------------------------------

/// Linear connection state that must be consumed to transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No live connection; received messages stay buffered
    Disconnected(DisconnectedState),
    /// Live connection delivering events
    Connected(ConnectedState),
}

/// State when no connection exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectedState {
    /// When the last connection was lost, `None` before the first connect
    pub since: Option<Timestamp>,
    /// Connections lost so far
    pub reconnects: u32,
}

/// State when the connection is established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedState {
    pub since: Timestamp,
    /// Engine session id reported by the server, if any
    pub session_id: Option<String>,
    /// Live and history messages received on this connection
    pub messages_received: u64,
    /// Connections lost before this one
    pub reconnects: u32,
}

// ----------------------------------------------------------------------------
// State Transition Events
// ----------------------------------------------------------------------------

/// Lifecycle events that drive the connection state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// Transport reports an established connection
    Connected { session_id: Option<String> },
    /// Transport reports the connection is gone
    Disconnected { reason: String },
    /// Messages arrived on the connection
    MessagesReceived { count: usize },
}

impl ConnectionEvent {
    fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected { .. } => "Connected",
            ConnectionEvent::Disconnected { .. } => "Disconnected",
            ConnectionEvent::MessagesReceived { .. } => "MessagesReceived",
        }
    }
}

/// Everything the transport can deliver to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { session_id: Option<String> },
    Disconnected { reason: String },
    /// A single live message (`streamMessage`)
    Message(ChatMessage),
    /// Authoritative history (`streamMessages`)
    History(Vec<ChatMessage>),
}

/// Work the session asks its runtime to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Ask the server for its full message history
    RequestSync,
}

// ----------------------------------------------------------------------------
// State Transition Results
// ----------------------------------------------------------------------------

/// Result of a state transition
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// New connection state
    pub new_state: ConnectionState,
    /// Effects to execute as result of transition
    pub effects: Vec<Effect>,
    /// Audit trail entry
    pub audit_entry: AuditEntry,
}

/// Audit trail entry for state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: Timestamp,
    pub from_state: String,
    pub to_state: String,
    pub event: String,
    pub effects_count: usize,
}

// ----------------------------------------------------------------------------
// State Machine Implementation
// ----------------------------------------------------------------------------

impl ConnectionState {
    /// Initial state of every session
    pub fn new_disconnected() -> Self {
        ConnectionState::Disconnected(DisconnectedState {
            since: None,
            reconnects: 0,
        })
    }

    /// Get current state name for logging/audit
    pub fn state_name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Connected(_) => "Connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Process an event and transition to new state (consumes self)
    pub fn transition(
        self,
        event: ConnectionEvent,
    ) -> Result<StateTransition, StateTransitionError> {
        let from_state = self.state_name().to_string();
        let event_name = event.name();

        let (new_state, effects) = match (self, event) {
            (ConnectionState::Disconnected(state), ConnectionEvent::Connected { session_id }) => {
                let new_state = ConnectionState::Connected(ConnectedState {
                    since: Timestamp::now(),
                    session_id,
                    messages_received: 0,
                    reconnects: state.reconnects,
                });
                // Anything sent while we were away is only recoverable via history
                (new_state, vec![Effect::RequestSync])
            }

            (ConnectionState::Connected(state), ConnectionEvent::Disconnected { .. }) => {
                let new_state = ConnectionState::Disconnected(DisconnectedState {
                    since: Some(Timestamp::now()),
                    reconnects: state.reconnects.saturating_add(1),
                });
                (new_state, Vec::new())
            }

            (ConnectionState::Connected(mut state), ConnectionEvent::MessagesReceived { count }) => {
                state.messages_received = state.messages_received.saturating_add(count as u64);
                (ConnectionState::Connected(state), Vec::new())
            }

            // Late deliveries after a drop are still buffered, nothing to track
            (state @ ConnectionState::Disconnected(_), ConnectionEvent::MessagesReceived { .. }) => {
                (state, Vec::new())
            }

            (_, event) => {
                return Err(StateTransitionError::InvalidTransition {
                    from_state,
                    event: format!("{:?}", event),
                });
            }
        };

        let to_state = new_state.state_name().to_string();
        let audit_entry = AuditEntry {
            timestamp: Timestamp::now(),
            from_state,
            to_state,
            event: event_name.to_string(),
            effects_count: effects.len(),
        };

        Ok(StateTransition {
            new_state,
            effects,
            audit_entry,
        })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new_disconnected()
    }
}

// ----------------------------------------------------------------------------
// Feed Updates
// ----------------------------------------------------------------------------

/// Notification delivered to session subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    StatusChanged { connected: bool },
    MessageAppended(ChatMessage),
    MessagesReplaced { count: usize },
}

/// Listener registration on a session
///
/// Dropping it unregisters the listener; the session and its connection are
/// unaffected.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<FeedUpdate>,
}

impl Subscription {
    /// Wait for the next update, `None` once the session is gone
    ///
    /// A subscriber that falls behind skips the updates it missed; the
    /// session snapshot remains authoritative.
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        loop {
            match self.receiver.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Feed subscriber lagged, skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next update if one is already queued
    pub fn try_recv(&mut self) -> Option<FeedUpdate> {
        loop {
            match self.receiver.try_recv() {
                Ok(update) => return Some(update),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Feed subscriber lagged, skipped {} updates", skipped);
                }
                Err(_) => return None,
            }
        }
    }
}

/// Point-in-time copy of the consumer-facing session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connected: bool,
    /// Buffered messages in arrival order
    pub messages: Vec<ChatMessage>,
    pub stats: FeedStats,
}

// ----------------------------------------------------------------------------
// Chat Session
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct SessionInner {
    state: ConnectionState,
    feed: FeedAggregator,
    audit_log: VecDeque<AuditEntry>,
}

/// Shared session state: connection status plus the message feed
///
/// Every mutation and every read happens under one lock, so readers observe
/// either the whole state before an event or the whole state after it.
#[derive(Debug)]
pub struct ChatSession {
    inner: RwLock<SessionInner>,
    updates: broadcast::Sender<FeedUpdate>,
}

impl ChatSession {
    pub fn new(feed_config: FeedConfig, update_capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(update_capacity.max(1));
        Self {
            inner: RwLock::new(SessionInner {
                state: ConnectionState::new_disconnected(),
                feed: FeedAggregator::with_config(feed_config),
                audit_log: VecDeque::with_capacity(AUDIT_LOG_CAPACITY),
            }),
            updates,
        }
    }

    /// Apply one transport event, returning the effects to execute
    pub fn handle(&self, event: SessionEvent) -> Vec<Effect> {
        let mut inner = self.write();

        match event {
            SessionEvent::Connected { session_id } => {
                let was_connected = inner.state.is_connected();
                let effects = inner.apply(ConnectionEvent::Connected { session_id });
                if !was_connected && inner.state.is_connected() {
                    info!("Connected to chat server");
                    self.publish(FeedUpdate::StatusChanged { connected: true });
                }
                effects
            }
            SessionEvent::Disconnected { reason } => {
                let was_connected = inner.state.is_connected();
                let effects = inner.apply(ConnectionEvent::Disconnected {
                    reason: reason.clone(),
                });
                if was_connected && !inner.state.is_connected() {
                    info!("Disconnected from chat server: {}", reason);
                    self.publish(FeedUpdate::StatusChanged { connected: false });
                }
                effects
            }
            SessionEvent::Message(message) => {
                let effects = inner.apply(ConnectionEvent::MessagesReceived { count: 1 });
                if inner.feed.append(message.clone()) {
                    self.publish(FeedUpdate::MessageAppended(message));
                }
                effects
            }
            SessionEvent::History(messages) => {
                let effects = inner.apply(ConnectionEvent::MessagesReceived {
                    count: messages.len(),
                });
                inner.feed.replace_all(messages);
                let count = inner.feed.len();
                debug!("History replaced feed, {} messages buffered", count);
                self.publish(FeedUpdate::MessagesReplaced { count });
                effects
            }
        }
    }

    /// Register a listener for feed updates
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.updates.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    pub fn is_connected(&self) -> bool {
        self.read().state.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.read().state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.read();
        SessionSnapshot {
            connected: inner.state.is_connected(),
            messages: inner.feed.messages().cloned().collect(),
            stats: inner.feed.stats().clone(),
        }
    }

    /// Sorted display view of the current feed
    pub fn view(&self, limit: DisplayLimit) -> Vec<ChatMessage> {
        self.read().feed.view(limit)
    }

    pub fn stats(&self) -> FeedStats {
        self.read().feed.stats().clone()
    }

    /// Most recent transitions, oldest first
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.read().audit_log.iter().cloned().collect()
    }

    fn publish(&self, update: FeedUpdate) {
        // No subscribers is not an error
        let _ = self.updates.send(update);
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(FeedConfig::default(), 256)
    }
}

impl SessionInner {
    fn apply(&mut self, event: ConnectionEvent) -> Vec<Effect> {
        match self.state.clone().transition(event) {
            Ok(transition) => {
                if self.audit_log.len() >= AUDIT_LOG_CAPACITY {
                    self.audit_log.pop_front();
                }
                self.audit_log.push_back(transition.audit_entry);
                self.state = transition.new_state;
                transition.effects
            }
            Err(error) => {
                warn!("Ignoring session event: {}", error);
                Vec::new()
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
