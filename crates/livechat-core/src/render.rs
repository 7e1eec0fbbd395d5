//! Presentation-neutral normalization of chat messages
//!
//! Turns the three source-specific payload shapes into one flat list of
//! display elements. Consumers decide how elements look; this module only
//! decides which elements exist and in what order.

use serde::Serialize;
use smallvec::SmallVec;

use crate::message::{
    twitch_emote_url, ChatMessage, Fragment, MessageBody, MessageSource, Place, Run,
};
use crate::types::MessageId;

// ----------------------------------------------------------------------------
// Display Types
// ----------------------------------------------------------------------------

/// Marker shown before the author name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Decoration {
    Source(MessageSource),
    Badge { icon_url: String, title: String },
    Moderator,
    Streamer,
    Place(Place),
}

/// Author line of a platform message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    /// Placed authors get emphasized styling
    pub highlighted: bool,
}

/// One displayable unit of a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DisplayElement {
    Text {
        text: String,
        emphasized: bool,
    },
    Image {
        url: String,
        alt: String,
    },
    Cheer {
        image_url: String,
        bits: u64,
        color: Option<String>,
    },
}

/// Normalized form of a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub source: Option<MessageSource>,
    pub decorations: SmallVec<[Decoration; 4]>,
    pub author: Option<Author>,
    pub body: Vec<DisplayElement>,
}

impl RenderedMessage {
    /// Whether nothing at all would be displayed
    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty() && self.author.is_none() && self.body.is_empty()
    }

    /// Flatten the body into a single line, images as `:alt:`
    pub fn plain_text(&self) -> String {
        let mut line = String::new();
        for element in &self.body {
            match element {
                DisplayElement::Text { text, .. } => line.push_str(text),
                DisplayElement::Image { alt, .. } => line.push_str(&format!(":{}:", alt)),
                DisplayElement::Cheer { bits, .. } => line.push_str(&format!("<{} bits>", bits)),
            }
        }
        line
    }
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

/// Normalize a message into display elements
pub fn render(message: &ChatMessage) -> RenderedMessage {
    let mut decorations = SmallVec::new();
    let mut author = None;
    let mut body = Vec::new();

    match message.body() {
        MessageBody::System => {
            decorations.push(Decoration::Source(MessageSource::System));
            body.push(DisplayElement::Text {
                text: message.text().into(),
                emphasized: true,
            });
        }
        MessageBody::Twitch {
            user,
            fragments,
            badges,
        } => {
            decorations.push(Decoration::Source(MessageSource::Twitch));
            if user.is_mod && !user.is_streamer {
                decorations.push(Decoration::Moderator);
            }
            if let Some(place) = user.place {
                decorations.push(Decoration::Place(place));
            }
            decorations.extend(badges.iter().map(|badge| Decoration::Badge {
                icon_url: badge.icon_url.clone(),
                title: badge.title.clone(),
            }));
            author = Some(Author {
                name: user.username.clone(),
                highlighted: user.place.is_some(),
            });
            body.extend(fragments.iter().filter_map(render_fragment));
        }
        MessageBody::YouTube { user, runs } => {
            decorations.push(Decoration::Source(MessageSource::YouTube));
            if user.is_mod && !user.is_streamer {
                decorations.push(Decoration::Moderator);
            }
            if user.is_streamer {
                decorations.push(Decoration::Streamer);
            }
            if let Some(place) = user.place {
                decorations.push(Decoration::Place(place));
            }
            author = Some(Author {
                name: user.username.clone(),
                highlighted: user.place.is_some(),
            });
            body.extend(runs.iter().filter_map(render_run));
        }
        MessageBody::Unrecognized { .. } => {}
    }

    RenderedMessage {
        id: message.id().clone(),
        source: message.source(),
        decorations,
        author,
        body,
    }
}

fn render_fragment(fragment: &Fragment) -> Option<DisplayElement> {
    match fragment {
        Fragment::Text { text } => Some(DisplayElement::Text {
            text: text.clone(),
            emphasized: false,
        }),
        Fragment::Emote { emote_id, text } => Some(DisplayElement::Image {
            url: twitch_emote_url(emote_id),
            alt: text.clone(),
        }),
        Fragment::Cheermote { bits, visual } => visual.as_ref().map(|visual| DisplayElement::Cheer {
            image_url: visual.image_url.clone(),
            bits: *bits,
            color: visual.color.clone(),
        }),
        Fragment::Unknown => None,
    }
}

fn render_run(run: &Run) -> Option<DisplayElement> {
    match run {
        Run::Text { text } => Some(DisplayElement::Text {
            text: text.clone(),
            emphasized: false,
        }),
        Run::Emoji {
            text, image_url, ..
        } => match image_url {
            Some(url) => Some(DisplayElement::Image {
                url: url.clone(),
                alt: text.clone(),
            }),
            // Without an image the alt text is all there is to show
            None if !text.is_empty() => Some(DisplayElement::Text {
                text: text.clone(),
                emphasized: false,
            }),
            None => None,
        },
        Run::Unknown => None,
    }
}
