//! Feed aggregation
//!
//! The aggregator is the session's authoritative copy of every message seen so
//! far, kept in arrival order. Display order is always derived on read by a
//! stable sort on timestamp, so history batches racing live messages never
//! corrupt what consumers see.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FeedConfig;
use crate::errors::LivechatError;
use crate::message::ChatMessage;
use crate::types::MessageId;

// ----------------------------------------------------------------------------
// Display Limit
// ----------------------------------------------------------------------------

/// How many of the most recent messages a view should contain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum DisplayLimit {
    /// The whole sorted feed
    #[default]
    All,
    /// Only the `n` messages with the largest timestamps
    Recent(usize),
}

impl DisplayLimit {
    fn apply(&self, len: usize) -> usize {
        match self {
            Self::All => 0,
            Self::Recent(n) => len.saturating_sub(*n),
        }
    }
}

impl fmt::Display for DisplayLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Recent(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for DisplayLimit {
    type Err = LivechatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .parse::<usize>()
            .map(Self::Recent)
            .map_err(|_| LivechatError::invalid_config(format!(
                "display limit must be a non-negative integer or \"all\", got {:?}",
                s
            )))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<LimitRepr> for DisplayLimit {
    type Error = LivechatError;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Count(n) => Ok(Self::Recent(n)),
            LimitRepr::Keyword(keyword) => keyword.parse(),
        }
    }
}

impl From<DisplayLimit> for LimitRepr {
    fn from(limit: DisplayLimit) -> Self {
        match limit {
            DisplayLimit::All => Self::Keyword("all".to_string()),
            DisplayLimit::Recent(n) => Self::Count(n),
        }
    }
}

// ----------------------------------------------------------------------------
// Feed Aggregator
// ----------------------------------------------------------------------------

/// Counters describing what the aggregator has done this session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub appended: u64,
    pub duplicates_dropped: u64,
    pub evicted: u64,
    pub replacements: u64,
}

/// Arrival-ordered message buffer with derived sorted views
#[derive(Debug, Clone)]
pub struct FeedAggregator {
    /// Messages in arrival order
    buffer: VecDeque<ChatMessage>,
    /// Ids currently buffered, maintained only when deduping
    ids: HashSet<MessageId>,
    config: FeedConfig,
    stats: FeedStats,
}

impl FeedAggregator {
    /// Create an unbounded aggregator that dedupes by id
    pub fn new() -> Self {
        Self::with_config(FeedConfig::default())
    }

    pub fn with_config(config: FeedConfig) -> Self {
        Self {
            buffer: VecDeque::new(),
            ids: HashSet::new(),
            config,
            stats: FeedStats::default(),
        }
    }

    /// Add one live message at the end of the buffer
    ///
    /// Returns `false` when the message was dropped as a duplicate.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if self.config.dedupe_by_id {
            if self.ids.contains(message.id()) {
                debug!("Dropping duplicate message {}", message.id());
                self.stats.duplicates_dropped += 1;
                return false;
            }
            self.ids.insert(message.id().clone());
        }

        self.buffer.push_back(message);
        self.stats.appended += 1;
        self.enforce_retention();
        true
    }

    /// Swap the whole buffer for an authoritative history batch
    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        let incoming = messages.len();
        let mut buffer = VecDeque::with_capacity(incoming);
        let mut ids = HashSet::with_capacity(if self.config.dedupe_by_id { incoming } else { 0 });

        for message in messages {
            if self.config.dedupe_by_id && !ids.insert(message.id().clone()) {
                self.stats.duplicates_dropped += 1;
                continue;
            }
            buffer.push_back(message);
        }

        self.buffer = buffer;
        self.ids = ids;
        self.stats.replacements += 1;
        self.enforce_retention();

        debug!(
            "Replaced feed with {} messages ({} received)",
            self.buffer.len(),
            incoming
        );
    }

    /// Sorted copy of the buffer, optionally limited to the most recent
    ///
    /// Ties on timestamp keep arrival order.
    pub fn view(&self, limit: DisplayLimit) -> Vec<ChatMessage> {
        let mut sorted: Vec<&ChatMessage> = self.buffer.iter().collect();
        sorted.sort_by_key(|message| message.timestamp());

        let skip = limit.apply(sorted.len());
        sorted.into_iter().skip(skip).cloned().collect()
    }

    /// Messages in arrival order
    pub fn messages(&self) -> impl ExactSizeIterator<Item = &ChatMessage> + '_ {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether a message id is buffered, a linear scan when dedupe is off
    pub fn contains(&self, id: &MessageId) -> bool {
        if self.config.dedupe_by_id {
            self.ids.contains(id)
        } else {
            self.buffer.iter().any(|message| message.id() == id)
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    fn enforce_retention(&mut self) {
        let Some(max) = self.config.max_messages else {
            return;
        };

        while self.buffer.len() > max {
            if let Some(evicted) = self.buffer.pop_front() {
                if self.config.dedupe_by_id {
                    self.ids.remove(evicted.id());
                }
                self.stats.evicted += 1;
            }
        }
    }
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
