//! YouTube URL recognition and the `/mediaplayer` text-command parser.

use regex::Regex;
use thiserror::Error;

use crate::protocol::{CommandEvent, MEDIA_TYPE_EMBEDDED};

/// Accepted URL shapes.  A value matching any of these counts as a YouTube
/// URL for validation purposes, even before an id has been extracted.
const URL_SHAPES: &[&str] = &[
    r"youtube\.com/watch\?v=",
    r"youtu\.be/",
    r"youtube\.com/embed/",
];

/// True when `url` matches one of the accepted YouTube URL shapes.
pub fn is_youtube_url(url: &str) -> bool {
    URL_SHAPES.iter().any(|shape| {
        Regex::new(shape)
            .map(|re| re.is_match(url))
            .unwrap_or(false)
    })
}

/// Extract the 11-character video id from a URL, or pass a bare id through.
///
/// Returns `None` when nothing id-shaped can be found — callers treat that as
/// "no preview, no embed conversion", never as an error.
pub fn extract_video_id(url_or_id: &str) -> Option<String> {
    let input = url_or_id.trim();
    if input.is_empty() {
        return None;
    }

    // Already a bare video id.
    if input.len() == 11 {
        if let Ok(re) = Regex::new(r"^[a-zA-Z0-9_-]{11}$") {
            if re.is_match(input) {
                return Some(input.to_string());
            }
        }
    }

    let patterns = [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})",
    ];
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(input) {
                return Some(caps[1].to_string());
            }
        }
    }
    None
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Embeddable player URL for a video id.
pub fn embed_url_for_id(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

/// Convert any accepted YouTube URL to its embed form.
pub fn embed_url(url: &str) -> Option<String> {
    extract_video_id(url).map(|id| embed_url_for_id(&id))
}

/// Static thumbnail URL for a video id.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)
}

// ── /mediaplayer text commands ────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("No valid URL provided")]
    MissingUrl,
    #[error("Unknown mediaplayer command")]
    UnknownCommand,
}

/// Parse an operator chat message (`/mediaplayer play <url>`, `/mediaplayer
/// pause`, `/mediaplayer stop`) into the command event the controller
/// consumes.  YouTube play targets are rewritten to their embed URL so the
/// overlay can load them directly into the frame.
pub fn parse_media_message(message: &str) -> Result<CommandEvent, MessageError> {
    let message = message.trim();
    if let Some(rest) = message.strip_prefix("/mediaplayer play") {
        let url = extract_first_url(rest).ok_or(MessageError::MissingUrl)?;
        if is_youtube_url(&url) {
            if let Some(embed) = embed_url(&url) {
                return Ok(CommandEvent::play(MEDIA_TYPE_EMBEDDED, embed));
            }
        }
        Ok(CommandEvent::play("direct", url))
    } else if message.starts_with("/mediaplayer stop") {
        Ok(CommandEvent::stop())
    } else if message.starts_with("/mediaplayer pause") {
        Ok(CommandEvent::pause())
    } else {
        Err(MessageError::UnknownCommand)
    }
}

fn extract_first_url(text: &str) -> Option<String> {
    Regex::new(r"(https?://\S+)")
        .ok()
        .and_then(|re| re.captures(text).map(|caps| caps[1].to_string()))
}
