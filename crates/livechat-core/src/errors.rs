//! Error types for the livechat core
//!
//! Payload anomalies are never surfaced through these types: a malformed
//! fragment, run or badge degrades to an `Unknown` element instead. The errors
//! here cover things a caller can actually act on, such as an unparseable
//! frame on the wire or an invalid configuration.


// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised while decoding transport framing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty frame")]
    EmptyFrame,
    #[error("Unknown engine packet type: {packet_type}")]
    UnknownEnginePacket { packet_type: char },
    #[error("Unknown socket packet type: {packet_type}")]
    UnknownSocketPacket { packet_type: char },
    #[error("Malformed event payload: {reason}")]
    MalformedEvent { reason: String },
    #[error("Malformed handshake: {reason}")]
    MalformedHandshake { reason: String },
    #[error("Server rejected namespace connection: {reason}")]
    ConnectRejected { reason: String },
}

/// Errors that can occur during session state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateTransitionError {
    #[error("Invalid transition from {from_state} on event {event}")]
    InvalidTransition { from_state: String, event: String },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for the livechat crates
#[derive(Debug, thiserror::Error)]
pub enum LivechatError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("State transition error: {0}")]
    Transition(#[from] StateTransitionError),
}

impl LivechatError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a malformed event error
    pub fn malformed_event(reason: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::MalformedEvent {
            reason: reason.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, LivechatError>;
