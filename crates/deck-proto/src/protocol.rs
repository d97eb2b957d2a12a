use serde::{Deserialize, Serialize};

/// Pause directive posted across the embedded-frame boundary.  The embedded
/// player may honour it or ignore it; no acknowledgment is ever expected.
pub const EMBED_PAUSE_DIRECTIVE: &str = r#"{"event":"command","func":"pauseVideo","args":""}"#;

/// Media type tag that selects the embedded-frame rendering path.
pub const MEDIA_TYPE_EMBEDDED: &str = "youtube";

/// A playback command as pushed over the deck's event channel.
///
/// The wire shape is `{ action, type?, url? }`.  `action` is an open string
/// for forward compatibility — senders may introduce new actions and old
/// receivers must ignore them, so classification happens separately via
/// [`CommandEvent::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub action: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CommandEvent {
    pub fn play(media_type: &str, url: impl Into<String>) -> Self {
        Self {
            action: "play".to_string(),
            media_type: Some(media_type.to_string()),
            url: Some(url.into()),
        }
    }

    pub fn pause() -> Self {
        Self {
            action: "pause".to_string(),
            media_type: None,
            url: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            action: "stop".to_string(),
            media_type: None,
            url: None,
        }
    }

    /// Map the open wire shape onto a concrete player action.
    ///
    /// Any `action` with a "play" prefix is a play request; the media type
    /// selects embedded vs native rendering.  A play request without a URL is
    /// malformed and dropped here.  Unknown actions return `None` — the
    /// controller ignores them without logging.
    pub fn classify(&self) -> Option<PlayerAction> {
        if self.action.starts_with("play") {
            let url = self.url.as_deref()?.trim();
            if url.is_empty() {
                return None;
            }
            return Some(match self.media_type.as_deref() {
                Some(MEDIA_TYPE_EMBEDDED) => PlayerAction::PlayEmbedded(url.to_string()),
                _ => PlayerAction::PlayDirect(url.to_string()),
            });
        }
        match self.action.as_str() {
            "pause" => Some(PlayerAction::Pause),
            "stop" => Some(PlayerAction::Stop),
            _ => None,
        }
    }
}

/// Classified playback command, ready for the controller state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    PlayEmbedded(String),
    PlayDirect(String),
    Pause,
    Stop,
}

// ── search contract ───────────────────────────────────────────────────────────

/// Body of `POST /youtube-search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// One selectable video in a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub author: String,
    pub thumbnail_url: String,
}

/// Search response wire shape.  `success: true` carries `results`;
/// `success: false` carries `message`.  Both sides of the contract live in
/// this workspace, but the shape itself is fixed by the dashboard protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn ok(results: Vec<SearchResult>) -> Self {
        Self {
            success: true,
            results,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_embedded_classification() {
        let evt = CommandEvent::play(MEDIA_TYPE_EMBEDDED, "https://www.youtube.com/embed/abc");
        assert_eq!(
            evt.classify(),
            Some(PlayerAction::PlayEmbedded(
                "https://www.youtube.com/embed/abc".to_string()
            ))
        );
    }

    #[test]
    fn test_play_direct_for_other_types() {
        let evt = CommandEvent::play("direct", "https://cdn.example/clip.mp4");
        assert_eq!(
            evt.classify(),
            Some(PlayerAction::PlayDirect(
                "https://cdn.example/clip.mp4".to_string()
            ))
        );

        // Any non-embedded type falls through to direct playback, including none.
        let evt = CommandEvent {
            action: "play".to_string(),
            media_type: None,
            url: Some("https://cdn.example/clip.mp4".to_string()),
        };
        assert!(matches!(evt.classify(), Some(PlayerAction::PlayDirect(_))));
    }

    #[test]
    fn test_play_prefix_matches() {
        let evt = CommandEvent {
            action: "play_media".to_string(),
            media_type: Some(MEDIA_TYPE_EMBEDDED.to_string()),
            url: Some("https://www.youtube.com/embed/abc".to_string()),
        };
        assert!(matches!(evt.classify(), Some(PlayerAction::PlayEmbedded(_))));
    }

    #[test]
    fn test_play_without_url_is_malformed() {
        let evt = CommandEvent {
            action: "play".to_string(),
            media_type: Some(MEDIA_TYPE_EMBEDDED.to_string()),
            url: None,
        };
        assert_eq!(evt.classify(), None);

        let evt = CommandEvent {
            action: "play".to_string(),
            media_type: None,
            url: Some("   ".to_string()),
        };
        assert_eq!(evt.classify(), None);
    }

    #[test]
    fn test_unknown_action_ignored() {
        let evt = CommandEvent {
            action: "rewind".to_string(),
            media_type: None,
            url: None,
        };
        assert_eq!(evt.classify(), None);
    }

    #[test]
    fn test_command_event_wire_shape() {
        let evt: CommandEvent =
            serde_json::from_str(r#"{"action":"play","type":"youtube","url":"u"}"#).unwrap();
        assert_eq!(evt.media_type.as_deref(), Some("youtube"));
        assert_eq!(evt.url.as_deref(), Some("u"));

        // pause/stop arrive without type or url
        let evt: CommandEvent = serde_json::from_str(r#"{"action":"pause"}"#).unwrap();
        assert_eq!(evt.classify(), Some(PlayerAction::Pause));
    }

    #[test]
    fn test_search_response_round_trip() {
        let ok = SearchResponse::ok(vec![SearchResult {
            url: "u1".to_string(),
            title: "t1".to_string(),
            author: "a1".to_string(),
            thumbnail_url: "th1".to_string(),
        }]);
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains(r#""thumbnail_url":"th1""#));
        let back: SearchResponse = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert_eq!(back.results.len(), 1);

        let fail = SearchResponse::failure("quota exceeded");
        let json = serde_json::to_string(&fail).unwrap();
        let back: SearchResponse = serde_json::from_str(&json).unwrap();
        assert!(!back.success);
        assert_eq!(back.message.as_deref(), Some("quota exceeded"));
        assert!(back.results.is_empty());
    }
}
