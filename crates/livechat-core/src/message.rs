//! Chat message model
//!
//! A [`ChatMessage`] is created once from an upstream payload and never
//! mutated afterwards. Its [`MessageBody`] is a closed sum over the three
//! sources, so a message can never carry Twitch fragments and YouTube runs at
//! the same time.
//!
//! Decoding is tolerant: every fragment, run and badge is decoded on its own
//! and anything unrecognized becomes an `Unknown` element that renders as
//! nothing, leaving the rest of the message intact.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{MessageId, Timestamp};

/// CDN template for Twitch emote images
pub const TWITCH_EMOTE_URL_TEMPLATE: &str =
    "https://static-cdn.jtvnw.net/emoticons/v2/{id}/default/dark/3.0";

/// Resolve a Twitch emote id to its image URL
pub fn twitch_emote_url(emote_id: &str) -> String {
    TWITCH_EMOTE_URL_TEMPLATE.replace("{id}", emote_id)
}

// ----------------------------------------------------------------------------
// Source Discriminator
// ----------------------------------------------------------------------------

/// Upstream that produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageSource {
    /// Generated by the chat server itself
    #[serde(rename = "SYSTEM")]
    System,
    /// Twitch chat, carrying inline fragments and badges
    #[serde(rename = "TW")]
    Twitch,
    /// YouTube live chat, carrying inline runs
    #[serde(rename = "YT")]
    YouTube,
}

/// Shape of the variant payload a source is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraShape {
    None,
    Fragments,
    Runs,
}

impl MessageSource {
    /// Parse the wire tag of a source
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SYSTEM" => Some(Self::System),
            "TW" => Some(Self::Twitch),
            "YT" => Some(Self::YouTube),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Twitch => "TW",
            Self::YouTube => "YT",
        }
    }

    /// Lowercase name used by consumers for theming keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Twitch => "twitch",
            Self::YouTube => "youtube",
        }
    }

    /// Which `extra` payload is valid for this source
    pub fn expected_extra(&self) -> ExtraShape {
        match self {
            Self::System => ExtraShape::None,
            Self::Twitch => ExtraShape::Fragments,
            Self::YouTube => ExtraShape::Runs,
        }
    }
}

// ----------------------------------------------------------------------------
// Author
// ----------------------------------------------------------------------------

/// Leaderboard placement shown next to an author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Place {
    #[serde(rename = "1ST")]
    First,
    #[serde(rename = "2ND")]
    Second,
    #[serde(rename = "3RD")]
    Third,
}

impl Place {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "1ST" => Some(Self::First),
            "2ND" => Some(Self::Second),
            "3RD" => Some(Self::Third),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }
}

/// Author of a platform message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub username: String,
    pub is_mod: bool,
    pub is_streamer: bool,
    pub place: Option<Place>,
}

impl ChatUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_mod(mut self, is_mod: bool) -> Self {
        self.is_mod = is_mod;
        self
    }

    pub fn with_streamer(mut self, is_streamer: bool) -> Self {
        self.is_streamer = is_streamer;
        self
    }

    pub fn with_place(mut self, place: Option<Place>) -> Self {
        self.place = place;
        self
    }
}

// ----------------------------------------------------------------------------
// Twitch Payload
// ----------------------------------------------------------------------------

/// Resolved visual for a cheermote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheermoteVisual {
    pub image_url: String,
    pub color: Option<String>,
}

/// Atomic displayable unit of a Twitch message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
    Text {
        text: String,
    },
    Emote {
        emote_id: String,
        text: String,
    },
    Cheermote {
        bits: u64,
        visual: Option<CheermoteVisual>,
    },
    /// Unrecognized or malformed upstream fragment
    Unknown,
}

/// Chat badge shown before a Twitch author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub icon_url: String,
    pub title: String,
}

// ----------------------------------------------------------------------------
// YouTube Payload
// ----------------------------------------------------------------------------

/// Atomic displayable unit of a YouTube message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Run {
    Text {
        text: String,
    },
    Emoji {
        text: String,
        emoji_id: String,
        image_url: Option<String>,
    },
    /// Run carrying neither text nor an emoji
    Unknown,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Whether this run is an emoji rather than plain text
    pub fn is_emoji(&self) -> bool {
        matches!(self, Self::Emoji { .. })
    }
}

// ----------------------------------------------------------------------------
// Chat Message
// ----------------------------------------------------------------------------

/// Source-specific body of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    /// Server-generated message; the plain text is authoritative
    System,
    Twitch {
        user: ChatUser,
        fragments: Vec<Fragment>,
        badges: Vec<Badge>,
    },
    YouTube {
        user: ChatUser,
        runs: Vec<Run>,
    },
    /// Message from a source tag this client does not know
    Unrecognized { source: String },
}

/// Immutable chat event as delivered by the upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    timestamp: Timestamp,
    text: String,
    body: MessageBody,
}

impl ChatMessage {
    pub fn new(
        id: impl Into<MessageId>,
        timestamp: Timestamp,
        text: impl Into<String>,
        body: MessageBody,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            text: text.into(),
            body,
        }
    }

    pub fn system(
        id: impl Into<MessageId>,
        millis: i64,
        text: impl Into<String>,
    ) -> Self {
        Self::new(id, Timestamp::new(millis), text, MessageBody::System)
    }

    pub fn twitch(
        id: impl Into<MessageId>,
        millis: i64,
        user: ChatUser,
        text: impl Into<String>,
        fragments: Vec<Fragment>,
        badges: Vec<Badge>,
    ) -> Self {
        Self::new(
            id,
            Timestamp::new(millis),
            text,
            MessageBody::Twitch {
                user,
                fragments,
                badges,
            },
        )
    }

    pub fn youtube(
        id: impl Into<MessageId>,
        millis: i64,
        user: ChatUser,
        text: impl Into<String>,
        runs: Vec<Run>,
    ) -> Self {
        Self::new(id, Timestamp::new(millis), text, MessageBody::YouTube { user, runs })
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Known source of this message, `None` for unrecognized tags
    pub fn source(&self) -> Option<MessageSource> {
        match self.body {
            MessageBody::System => Some(MessageSource::System),
            MessageBody::Twitch { .. } => Some(MessageSource::Twitch),
            MessageBody::YouTube { .. } => Some(MessageSource::YouTube),
            MessageBody::Unrecognized { .. } => None,
        }
    }

    /// Author of a platform message
    pub fn user(&self) -> Option<&ChatUser> {
        match &self.body {
            MessageBody::Twitch { user, .. } | MessageBody::YouTube { user, .. } => Some(user),
            MessageBody::System | MessageBody::Unrecognized { .. } => None,
        }
    }

    /// Decode one upstream payload
    ///
    /// Returns `None` only when the payload is not an object or lacks an id;
    /// everything else degrades element by element.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            warn!("Dropping chat payload that is not an object");
            return None;
        };

        let Some(id) = object.get("id").and_then(id_string) else {
            warn!("Dropping chat payload without an id");
            return None;
        };

        let timestamp = match object.get("timestamp").and_then(Timestamp::from_json) {
            Some(timestamp) => timestamp,
            None => {
                debug!("Message {} has no usable timestamp, ordering it first", id);
                Timestamp::default()
            }
        };

        let text = match object.remove("message") {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };

        let source_tag = object
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let extra = object.remove("extra").unwrap_or(Value::Null);

        let body = match MessageSource::from_tag(&source_tag) {
            Some(MessageSource::System) => MessageBody::System,
            Some(MessageSource::Twitch) => MessageBody::Twitch {
                user: decode_user(object.remove("user")),
                fragments: decode_list(&extra, "fragments", decode_fragment),
                badges: decode_list(&extra, "badges", decode_badge)
                    .into_iter()
                    .flatten()
                    .collect(),
            },
            Some(MessageSource::YouTube) => MessageBody::YouTube {
                user: decode_user(object.remove("user")),
                runs: decode_list(&extra, "runs", decode_run),
            },
            None => {
                debug!("Message {} has unrecognized source {:?}", id, source_tag);
                MessageBody::Unrecognized { source: source_tag }
            }
        };

        Some(Self {
            id: MessageId::new(id),
            timestamp,
            text,
            body,
        })
    }

    /// Decode a history batch, skipping payloads that cannot be identified
    pub fn batch_from_json(value: Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.into_iter().filter_map(Self::from_json).collect(),
            Value::Null => Vec::new(),
            other => {
                warn!("Expected message array, got {}", json_kind(&other));
                Vec::new()
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Wire Decoding
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireUser {
    username: String,
    is_mod: bool,
    is_streamer: bool,
    place: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireFragment {
    Text {
        #[serde(default)]
        text: String,
    },
    Emote {
        #[serde(default)]
        text: String,
        #[serde(default)]
        emote: Option<WireEmote>,
        #[serde(default, rename = "emoteId")]
        emote_id: Option<Value>,
    },
    Cheermote {
        #[serde(default)]
        cheermote: Option<WireCheermote>,
        #[serde(default, rename = "bitsAmount")]
        bits_amount: Option<u64>,
        #[serde(default, rename = "cheermoteData")]
        cheermote_data: Option<WireCheermoteData>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireEmote {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct WireCheermote {
    #[serde(default)]
    bits: u64,
}

#[derive(Debug, Deserialize)]
struct WireCheermoteData {
    #[serde(default)]
    color: Option<String>,
    images: WireCheermoteImages,
}

#[derive(Debug, Deserialize)]
struct WireCheermoteImages {
    dark: WireCheermoteTheme,
}

#[derive(Debug, Deserialize)]
struct WireCheermoteTheme {
    #[serde(default)]
    animated: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "static")]
    still: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct WireBadge {
    data: WireBadgeData,
}

#[derive(Debug, Deserialize)]
struct WireBadgeData {
    image_url_1x: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireRun {
    text: Option<String>,
    emoji: Option<WireEmoji>,
    #[serde(rename = "emojiId")]
    emoji_id: Option<Value>,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireEmoji {
    emoji_id: Option<Value>,
    image: Vec<WireImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireImage {
    url: Option<String>,
}

fn decode_user(value: Option<Value>) -> ChatUser {
    let wire = value
        .filter(|value| !value.is_null())
        .and_then(|value| serde_json::from_value::<WireUser>(value).ok())
        .unwrap_or_default();

    ChatUser {
        username: wire.username,
        is_mod: wire.is_mod,
        is_streamer: wire.is_streamer,
        place: wire.place.as_deref().and_then(Place::from_tag),
    }
}

fn decode_list<T>(extra: &Value, key: &str, decode: fn(&Value) -> T) -> Vec<T> {
    match extra.get(key) {
        Some(Value::Array(items)) => items.iter().map(decode).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            debug!("Ignoring non-array extra.{}: {}", key, json_kind(other));
            Vec::new()
        }
    }
}

fn decode_fragment(value: &Value) -> Fragment {
    let wire = match WireFragment::deserialize(value) {
        Ok(wire) => wire,
        Err(e) => {
            debug!("Unreadable fragment: {}", e);
            return Fragment::Unknown;
        }
    };

    match wire {
        WireFragment::Text { text } => Fragment::Text { text },
        WireFragment::Emote {
            text,
            emote,
            emote_id,
        } => {
            let id = emote
                .as_ref()
                .and_then(|emote| id_string(&emote.id))
                .or_else(|| emote_id.as_ref().and_then(id_string));
            match id {
                Some(emote_id) => Fragment::Emote { emote_id, text },
                None => Fragment::Unknown,
            }
        }
        WireFragment::Cheermote {
            cheermote,
            bits_amount,
            cheermote_data,
        } => {
            let bits = bits_amount
                .or_else(|| cheermote.map(|cheermote| cheermote.bits))
                .unwrap_or_default();
            let visual = cheermote_data.and_then(|data| {
                let theme = data.images.dark;
                theme
                    .animated
                    .and_then(|images| images.get("1").cloned())
                    .or_else(|| theme.still.and_then(|images| images.get("1").cloned()))
                    .map(|image_url| CheermoteVisual {
                        image_url,
                        color: data.color,
                    })
            });
            Fragment::Cheermote { bits, visual }
        }
        WireFragment::Other => Fragment::Unknown,
    }
}

fn decode_badge(value: &Value) -> Option<Badge> {
    match WireBadge::deserialize(value) {
        Ok(badge) => Some(Badge {
            icon_url: badge.data.image_url_1x,
            title: badge.data.title,
        }),
        Err(e) => {
            debug!("Skipping unreadable badge: {}", e);
            None
        }
    }
}

fn decode_run(value: &Value) -> Run {
    let wire = match WireRun::deserialize(value) {
        Ok(wire) => wire,
        Err(e) => {
            debug!("Unreadable run: {}", e);
            return Run::Unknown;
        }
    };

    let text = wire.text.unwrap_or_default();

    if let Some(emoji) = wire.emoji {
        return Run::Emoji {
            text,
            emoji_id: emoji
                .emoji_id
                .as_ref()
                .and_then(id_string)
                .unwrap_or_default(),
            image_url: emoji.image.into_iter().find_map(|image| image.url),
        };
    }

    if let Some(emoji_id) = wire.emoji_id.as_ref().and_then(id_string) {
        return Run::Emoji {
            text,
            emoji_id,
            image_url: wire.image_url,
        };
    }

    if text.is_empty() && value.get("text").is_none() {
        Run::Unknown
    } else {
        Run::Text { text }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_discriminator() {
        assert_eq!(MessageSource::from_tag("TW"), Some(MessageSource::Twitch));
        assert_eq!(MessageSource::from_tag("YT"), Some(MessageSource::YouTube));
        assert_eq!(MessageSource::from_tag("SYSTEM"), Some(MessageSource::System));
        assert_eq!(MessageSource::from_tag("KICK"), None);

        assert_eq!(MessageSource::System.expected_extra(), ExtraShape::None);
        assert_eq!(MessageSource::Twitch.expected_extra(), ExtraShape::Fragments);
        assert_eq!(MessageSource::YouTube.expected_extra(), ExtraShape::Runs);
    }

    #[test]
    fn test_decode_twitch_message() {
        let message = ChatMessage::from_json(json!({
            "id": "tw-1",
            "source": "TW",
            "timestamp": 1700000000000_i64,
            "user": { "username": "viewer", "isMod": true, "isStreamer": false, "place": "2ND" },
            "message": "gg Kappa",
            "extra": {
                "fragments": [
                    { "type": "text", "text": "gg " },
                    { "type": "emote", "text": "Kappa", "emote": { "id": "25" } }
                ],
                "badges": [
                    { "set_id": "moderator", "id": "1",
                      "data": { "image_url_1x": "https://badges/mod.png", "title": "Moderator" } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(message.id().as_str(), "tw-1");
        assert_eq!(message.source(), Some(MessageSource::Twitch));
        assert_eq!(message.timestamp(), Timestamp::new(1700000000000));

        let user = message.user().unwrap();
        assert_eq!(user.username, "viewer");
        assert!(user.is_mod);
        assert_eq!(user.place, Some(Place::Second));

        match message.body() {
            MessageBody::Twitch { fragments, badges, .. } => {
                assert_eq!(
                    fragments,
                    &vec![
                        Fragment::Text { text: "gg ".to_string() },
                        Fragment::Emote {
                            emote_id: "25".to_string(),
                            text: "Kappa".to_string()
                        },
                    ]
                );
                assert_eq!(badges.len(), 1);
                assert_eq!(badges[0].title, "Moderator");
            }
            other => panic!("Expected Twitch body, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_cheermote_prefers_animated_dark_image() {
        let fragment = decode_fragment(&json!({
            "type": "cheermote",
            "text": "Cheer100",
            "cheermote": { "prefix": "cheer", "bits": 100, "tier": 100 },
            "cheermoteData": {
                "color": "#9c3ee8",
                "images": { "dark": {
                    "animated": { "1": "https://cheer/anim/1.gif", "2": "https://cheer/anim/2.gif" },
                    "static": { "1": "https://cheer/static/1.png" }
                } }
            }
        }));

        assert_eq!(
            fragment,
            Fragment::Cheermote {
                bits: 100,
                visual: Some(CheermoteVisual {
                    image_url: "https://cheer/anim/1.gif".to_string(),
                    color: Some("#9c3ee8".to_string()),
                }),
            }
        );

        let without_data = decode_fragment(&json!({
            "type": "cheermote", "cheermote": { "bits": 5 }
        }));
        assert_eq!(without_data, Fragment::Cheermote { bits: 5, visual: None });
    }

    #[test]
    fn test_malformed_fragments_degrade_individually() {
        let message = ChatMessage::from_json(json!({
            "id": "tw-2",
            "source": "TW",
            "timestamp": 3,
            "extra": { "fragments": [
                { "type": "mention", "text": "@someone" },
                { "type": "emote", "text": "NoId" },
                { "text": "untagged" },
                { "type": "text", "text": "still here" }
            ] }
        }))
        .unwrap();

        match message.body() {
            MessageBody::Twitch { user, fragments, badges } => {
                assert_eq!(user, &ChatUser::default());
                assert!(badges.is_empty());
                assert_eq!(fragments.len(), 4);
                assert_eq!(fragments[0], Fragment::Unknown);
                assert_eq!(fragments[1], Fragment::Unknown);
                assert_eq!(fragments[2], Fragment::Unknown);
                assert_eq!(fragments[3], Fragment::Text { text: "still here".to_string() });
            }
            other => panic!("Expected Twitch body, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_youtube_runs() {
        let message = ChatMessage::from_json(json!({
            "id": "yt-1",
            "source": "YT",
            "timestamp": 10.5,
            "user": { "username": "host", "isStreamer": true },
            "message": "hi :wave:",
            "extra": { "runs": [
                { "text": "hi " },
                { "text": ":wave:", "emoji": {
                    "emoji_id": "UCwave", "image": [{ "url": "https://yt/wave.png" }, { "url": "https://yt/wave2.png" }]
                } },
                { "emoji": null, "text": "!" },
                42
            ] }
        }))
        .unwrap();

        assert_eq!(message.timestamp(), Timestamp::new(10));
        match message.body() {
            MessageBody::YouTube { user, runs } => {
                assert!(user.is_streamer);
                assert_eq!(runs[0], Run::text("hi "));
                assert!(runs[1].is_emoji());
                assert_eq!(
                    runs[1],
                    Run::Emoji {
                        text: ":wave:".to_string(),
                        emoji_id: "UCwave".to_string(),
                        image_url: Some("https://yt/wave.png".to_string()),
                    }
                );
                assert!(!runs[2].is_emoji());
                assert_eq!(runs[3], Run::Unknown);
            }
            other => panic!("Expected YouTube body, got {:?}", other),
        }
    }

    #[test]
    fn test_emoji_run_with_missing_image_url() {
        let message = ChatMessage::from_json(json!({
            "id": "yt-2",
            "source": "YT",
            "timestamp": 1,
            "user": { "username": "viewer" },
            "message": ":clap:",
            "extra": { "runs": [
                { "text": ":clap:", "emoji": { "emoji_id": "UCclap", "image": [{ "width": 24 }] } },
                { "text": ":wave:", "emoji": {
                    "emoji_id": "UCwave", "image": [{}, { "url": "https://yt/wave.png" }]
                } }
            ] }
        }))
        .unwrap();

        match message.body() {
            MessageBody::YouTube { runs, .. } => {
                assert_eq!(
                    runs[0],
                    Run::Emoji {
                        text: ":clap:".to_string(),
                        emoji_id: "UCclap".to_string(),
                        image_url: None,
                    }
                );
                assert_eq!(
                    runs[1],
                    Run::Emoji {
                        text: ":wave:".to_string(),
                        emoji_id: "UCwave".to_string(),
                        image_url: Some("https://yt/wave.png".to_string()),
                    }
                );
            }
            other => panic!("Expected YouTube body, got {:?}", other),
        }
    }

    #[test]
    fn test_system_message_ignores_user_and_extra() {
        let message = ChatMessage::from_json(json!({
            "id": "sys-1",
            "source": "SYSTEM",
            "timestamp": 1,
            "user": { "username": "ignored" },
            "message": "Stream starting",
            "extra": { "runs": [{ "text": "ignored" }] }
        }))
        .unwrap();

        assert_eq!(message.body(), &MessageBody::System);
        assert_eq!(message.text(), "Stream starting");
        assert!(message.user().is_none());
    }

    #[test]
    fn test_source_decides_payload_shape() {
        let message = ChatMessage::from_json(json!({
            "id": "tw-3",
            "source": "TW",
            "timestamp": 1,
            "extra": { "runs": [{ "text": "not for twitch" }] }
        }))
        .unwrap();

        match message.body() {
            MessageBody::Twitch { fragments, .. } => assert!(fragments.is_empty()),
            other => panic!("Expected Twitch body, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_source_and_missing_id() {
        let message = ChatMessage::from_json(json!({
            "id": 77, "source": "KICK", "timestamp": 2, "message": "hello"
        }))
        .unwrap();
        assert_eq!(message.id().as_str(), "77");
        assert_eq!(message.source(), None);
        assert_eq!(
            message.body(),
            &MessageBody::Unrecognized { source: "KICK".to_string() }
        );

        assert!(ChatMessage::from_json(json!({ "source": "TW" })).is_none());
        assert!(ChatMessage::from_json(json!("text")).is_none());
    }

    #[test]
    fn test_batch_skips_unidentifiable_payloads() {
        let batch = ChatMessage::batch_from_json(json!([
            { "id": "a", "source": "SYSTEM", "timestamp": 1 },
            { "source": "SYSTEM" },
            { "id": "b", "source": "SYSTEM", "timestamp": 2 }
        ]));
        assert_eq!(batch.len(), 2);
        assert!(ChatMessage::batch_from_json(json!({ "id": "a" })).is_empty());
        assert!(ChatMessage::batch_from_json(Value::Null).is_empty());
    }

    #[test]
    fn test_twitch_emote_url() {
        assert_eq!(
            twitch_emote_url("123"),
            "https://static-cdn.jtvnw.net/emoticons/v2/123/default/dark/3.0"
        );
    }
}
