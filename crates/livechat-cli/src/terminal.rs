//! Terminal formatting for rendered chat messages

use livechat_core::{render, ChatMessage, Decoration, FeedStats, MessageSource, Place};

use crate::config::DisplayConfig;

/// One printable line for a message, `None` when nothing would be shown
pub fn format_message(message: &ChatMessage, display: &DisplayConfig) -> Option<String> {
    let rendered = render(message);
    if rendered.is_empty() {
        return None;
    }

    let mut line = String::new();
    if display.show_timestamps {
        line.push_str(&format_clock(message.timestamp().as_millis()));
        line.push(' ');
    }

    if display.show_decorations {
        for decoration in &rendered.decorations {
            if let Some(marker) = decoration_marker(decoration) {
                line.push_str(&marker);
                line.push(' ');
            }
        }
    }

    if let Some(author) = &rendered.author {
        if author.highlighted {
            line.push_str(&format!("*{}*", author.name));
        } else {
            line.push_str(&author.name);
        }
        line.push_str(": ");
    }

    line.push_str(&rendered.plain_text());
    Some(line)
}

fn decoration_marker(decoration: &Decoration) -> Option<String> {
    let marker = match decoration {
        Decoration::Source(source) => format!("[{}]", source_label(*source)),
        Decoration::Moderator => "(mod)".to_string(),
        Decoration::Streamer => "(streamer)".to_string(),
        Decoration::Place(place) => format!("<{}>", place_label(*place)),
        // Badge icons have no text form worth printing
        Decoration::Badge { .. } => return None,
    };
    Some(marker)
}

fn source_label(source: MessageSource) -> &'static str {
    match source {
        MessageSource::System => "SYS",
        MessageSource::Twitch => "TW",
        MessageSource::YouTube => "YT",
    }
}

fn place_label(place: Place) -> &'static str {
    match place {
        Place::First => "1st",
        Place::Second => "2nd",
        Place::Third => "3rd",
    }
}

/// `HH:MM:SS` of a millisecond timestamp, in UTC
pub fn format_clock(millis: i64) -> String {
    let seconds_of_day = millis.div_euclid(1000).rem_euclid(86_400);
    format!(
        "{:02}:{:02}:{:02}",
        seconds_of_day / 3600,
        (seconds_of_day / 60) % 60,
        seconds_of_day % 60
    )
}

/// Status line for connection changes
pub fn format_status(connected: bool) -> &'static str {
    if connected {
        "-- connected --"
    } else {
        "-- disconnected, waiting to reconnect --"
    }
}

/// Multi-line summary of feed counters
pub fn format_stats(stats: &FeedStats) -> String {
    format!(
        "appended: {}, duplicates dropped: {}, evicted: {}, history replacements: {}",
        stats.appended, stats.duplicates_dropped, stats.evicted, stats.replacements
    )
}
