//! Playback controller — turns pushed command events into overlay state.
//!
//! Owns the single overlay container and the `PlaybackState` exclusively.
//! Commands are applied one at a time in arrival order; there is no queueing
//! and no in-flight tracking — a new `Play*` simply rebuilds, last write wins.

use deck_proto::protocol::{CommandEvent, PlayerAction, EMBED_PAUSE_DIRECTIVE};
use tracing::{debug, info};

use crate::embed::EmbedSink;
use crate::page::{ElementSpec, NodeId, Page};

/// Well-known attribute values on the overlay subtree.
pub const OVERLAY_DOM_ID: &str = "media-overlay";
pub const ROLE_OVERLAY_CLOSE: &str = "overlay-close";
pub const ROLE_MEDIA_FRAME: &str = "media-frame";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    None,
    Embedded,
    NativeVideo,
}

/// Observable controller state.  Invariant: `render_mode == None` exactly
/// when the overlay is hidden and no source is loaded.
#[derive(Debug)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub paused: bool,
    pub current_source: Option<String>,
    pub render_mode: RenderMode,
}

/// The four externally meaningful controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Hidden,
    PlayingEmbedded,
    PlayingNative,
    Paused,
}

pub struct PlaybackController {
    state: PlaybackState,
    /// Root node of the overlay subtree, when one has been built.
    overlay: Option<NodeId>,
    embed: Box<dyn EmbedSink>,
}

impl PlaybackController {
    pub fn new(embed: Box<dyn EmbedSink>) -> Self {
        Self {
            state: PlaybackState {
                is_playing: false,
                paused: false,
                current_source: None,
                render_mode: RenderMode::None,
            },
            overlay: None,
            embed,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        match self.state.render_mode {
            RenderMode::None => PlayerPhase::Hidden,
            _ if self.state.paused => PlayerPhase::Paused,
            RenderMode::Embedded => PlayerPhase::PlayingEmbedded,
            RenderMode::NativeVideo => PlayerPhase::PlayingNative,
        }
    }

    /// Apply one pushed command.  Unknown or malformed commands fall out of
    /// classification and are dropped without logging (forward compatibility).
    pub fn handle_command(&mut self, evt: &CommandEvent, page: &mut Page) {
        let Some(action) = evt.classify() else {
            debug!("ignoring command action '{}'", evt.action);
            return;
        };
        match action {
            PlayerAction::PlayEmbedded(url) => self.play_embedded(&url, page),
            PlayerAction::PlayDirect(url) => self.play_direct(&url, page),
            PlayerAction::Pause => self.pause(page),
            PlayerAction::Stop => self.stop(page),
        }
    }

    /// Clicks on the overlay's own dismiss control are equivalent to `Stop`.
    pub fn handle_click(&mut self, node: NodeId, page: &mut Page) -> bool {
        if page.attr(node, "role") == Some(ROLE_OVERLAY_CLOSE) {
            info!("overlay dismissed");
            self.stop(page);
            return true;
        }
        false
    }

    fn play_embedded(&mut self, url: &str, page: &mut Page) {
        info!("play embedded: {}", url);
        let frame = self.rebuild_overlay(page);
        page.insert_under(frame, &ElementSpec::new("iframe").attr("src", url));
        self.show(page);
        self.state.is_playing = true;
        self.state.paused = false;
        self.state.current_source = Some(url.to_string());
        self.state.render_mode = RenderMode::Embedded;
    }

    fn play_direct(&mut self, url: &str, page: &mut Page) {
        info!("play direct: {}", url);
        let frame = self.rebuild_overlay(page);
        page.insert_under(
            frame,
            &ElementSpec::new("video")
                .attr("controls", "true")
                .attr("src", url),
        );
        self.show(page);
        self.state.is_playing = true;
        self.state.paused = false;
        self.state.current_source = Some(url.to_string());
        self.state.render_mode = RenderMode::NativeVideo;
    }

    fn pause(&mut self, page: &mut Page) {
        match self.state.render_mode {
            RenderMode::None => {
                // Nothing on screen — guarded no-op.
                debug!("pause with no active playback");
            }
            RenderMode::Embedded => {
                // Best-effort: the embedded player may ignore this.
                self.embed.post(EMBED_PAUSE_DIRECTIVE);
                self.state.paused = true;
            }
            RenderMode::NativeVideo => {
                if let Some(video) = self.find_in_overlay(page, |n| n.tag == "video") {
                    page.set_attr(video, "paused", "true");
                }
                self.state.paused = true;
            }
        }
    }

    fn stop(&mut self, page: &mut Page) {
        if let Some(iframe) = self.find_in_overlay(page, |n| n.tag == "iframe") {
            page.set_attr(iframe, "src", "");
        }
        if let Some(video) = self.find_in_overlay(page, |n| n.tag == "video") {
            page.set_attr(video, "paused", "true");
            page.set_attr(video, "src", "");
        }
        if let Some(overlay) = self.live_overlay(page) {
            page.set_attr(overlay, "display", "none");
        }
        self.state.is_playing = false;
        self.state.paused = false;
        self.state.current_source = None;
        self.state.render_mode = RenderMode::None;
    }

    /// Tear down any pre-existing overlay node and build a fresh, hidden one.
    /// Returns the frame container the caller loads content into.
    fn rebuild_overlay(&mut self, page: &mut Page) -> NodeId {
        // Remove every stale instance, not just the one we remember — at most
        // one overlay node may exist in the page.
        for stale in page.find_all(|n| n.attr("id") == Some(OVERLAY_DOM_ID)) {
            page.remove(stale);
        }
        let root = page.root();
        let overlay = page
            .insert_under(
                root,
                &ElementSpec::new("div")
                    .attr("id", OVERLAY_DOM_ID)
                    .attr("display", "none")
                    .child(
                        ElementSpec::new("div")
                            .attr("role", "overlay-header")
                            .child(ElementSpec::new("span").text("Media Player"))
                            .child(
                                ElementSpec::new("button")
                                    .attr("role", ROLE_OVERLAY_CLOSE)
                                    .text("✕"),
                            ),
                    )
                    .child(ElementSpec::new("div").attr("role", ROLE_MEDIA_FRAME)),
            )
            .expect("page root always exists");
        self.overlay = Some(overlay);
        page.children(overlay)
            .iter()
            .copied()
            .find(|&c| page.attr(c, "role") == Some(ROLE_MEDIA_FRAME))
            .expect("frame container just built")
    }

    fn show(&self, page: &mut Page) {
        if let Some(overlay) = self.overlay {
            page.set_attr(overlay, "display", "block");
        }
    }

    fn live_overlay(&self, page: &Page) -> Option<NodeId> {
        self.overlay.filter(|&id| page.contains(id))
    }

    fn find_in_overlay(&self, page: &Page, pred: impl Fn(&crate::page::Node) -> bool) -> Option<NodeId> {
        let overlay = self.live_overlay(page)?;
        let mut stack: Vec<NodeId> = page.children(overlay).to_vec();
        while let Some(id) = stack.pop() {
            if let Some(node) = page.get(id) {
                if pred(node) {
                    return Some(id);
                }
                stack.extend(page.children(id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::ChannelEmbedSink;
    use deck_proto::protocol::MEDIA_TYPE_EMBEDDED;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn controller() -> (PlaybackController, UnboundedReceiver<String>) {
        let (sink, rx) = ChannelEmbedSink::new();
        (PlaybackController::new(Box::new(sink)), rx)
    }

    fn overlay_count(page: &Page) -> usize {
        page.find_all(|n| n.attr("id") == Some(OVERLAY_DOM_ID)).len()
    }

    fn check_invariant(ctl: &PlaybackController, page: &Page) {
        let hidden = page
            .find_first(|n| n.attr("id") == Some(OVERLAY_DOM_ID))
            .map(|id| page.attr(id, "display") != Some("block"))
            .unwrap_or(true);
        let none = ctl.state().render_mode == RenderMode::None;
        assert_eq!(none, hidden && ctl.state().current_source.is_none());
    }

    #[test]
    fn test_play_embedded_builds_visible_overlay() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(
            &CommandEvent::play(MEDIA_TYPE_EMBEDDED, "https://www.youtube.com/embed/abc"),
            &mut page,
        );
        assert_eq!(ctl.phase(), PlayerPhase::PlayingEmbedded);
        assert!(ctl.state().is_playing);
        assert_eq!(overlay_count(&page), 1);
        let iframe = page.find_first(|n| n.tag == "iframe").unwrap();
        assert_eq!(page.attr(iframe, "src"), Some("https://www.youtube.com/embed/abc"));
        check_invariant(&ctl, &page);
    }

    #[test]
    fn test_repeated_play_keeps_single_overlay_with_last_url() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        for i in 0..5 {
            ctl.handle_command(
                &CommandEvent::play(MEDIA_TYPE_EMBEDDED, format!("https://www.youtube.com/embed/v{i}")),
                &mut page,
            );
        }
        assert_eq!(overlay_count(&page), 1);
        let iframes = page.find_all(|n| n.tag == "iframe");
        assert_eq!(iframes.len(), 1);
        assert_eq!(
            page.attr(iframes[0], "src"),
            Some("https://www.youtube.com/embed/v4")
        );
    }

    #[test]
    fn test_switching_render_modes_leaks_nothing() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(&CommandEvent::play("direct", "https://cdn/a.mp4"), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::PlayingNative);
        ctl.handle_command(
            &CommandEvent::play(MEDIA_TYPE_EMBEDDED, "https://www.youtube.com/embed/abc"),
            &mut page,
        );
        assert_eq!(ctl.phase(), PlayerPhase::PlayingEmbedded);
        assert!(page.find_first(|n| n.tag == "video").is_none());
        assert_eq!(page.find_all(|n| n.tag == "iframe").len(), 1);
    }

    #[test]
    fn test_stop_is_idempotent_terminal_transition() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();

        // Stop from Hidden is a no-op that stays Hidden
        ctl.handle_command(&CommandEvent::stop(), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Hidden);

        for start in ["direct", MEDIA_TYPE_EMBEDDED] {
            ctl.handle_command(&CommandEvent::play(start, "https://src"), &mut page);
            ctl.handle_command(&CommandEvent::stop(), &mut page);
            assert_eq!(ctl.phase(), PlayerPhase::Hidden);
            assert!(!ctl.state().is_playing);
            assert!(ctl.state().current_source.is_none());
            check_invariant(&ctl, &page);
        }

        // Stop from Paused
        ctl.handle_command(&CommandEvent::play("direct", "https://src"), &mut page);
        ctl.handle_command(&CommandEvent::pause(), &mut page);
        ctl.handle_command(&CommandEvent::stop(), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Hidden);
        check_invariant(&ctl, &page);
    }

    #[test]
    fn test_pause_embedded_posts_fire_and_forget_directive() {
        let (mut ctl, mut rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(
            &CommandEvent::play(MEDIA_TYPE_EMBEDDED, "https://www.youtube.com/embed/abc"),
            &mut page,
        );
        ctl.handle_command(&CommandEvent::pause(), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        assert_eq!(rx.try_recv().unwrap(), EMBED_PAUSE_DIRECTIVE);
        // Overlay stays visible — pause has no visible-state change.
        let overlay = page.find_first(|n| n.attr("id") == Some(OVERLAY_DOM_ID)).unwrap();
        assert_eq!(page.attr(overlay, "display"), Some("block"));
    }

    #[test]
    fn test_pause_native_pauses_element() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(&CommandEvent::play("direct", "https://cdn/a.mp4"), &mut page);
        ctl.handle_command(&CommandEvent::pause(), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        let video = page.find_first(|n| n.tag == "video").unwrap();
        assert_eq!(page.attr(video, "paused"), Some("true"));
    }

    #[test]
    fn test_pause_when_hidden_is_noop() {
        let (mut ctl, mut rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(&CommandEvent::pause(), &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Hidden);
        assert!(rx.try_recv().is_err());
        assert_eq!(page.node_count(), 1);
    }

    #[test]
    fn test_unknown_action_leaves_page_untouched() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        let evt = CommandEvent {
            action: "rewind".to_string(),
            media_type: None,
            url: None,
        };
        ctl.handle_command(&evt, &mut page);
        assert_eq!(ctl.phase(), PlayerPhase::Hidden);
        assert_eq!(page.node_count(), 1);
    }

    #[test]
    fn test_close_click_equals_stop() {
        let (mut ctl, _rx) = controller();
        let mut page = Page::new();
        ctl.handle_command(&CommandEvent::play("direct", "https://cdn/a.mp4"), &mut page);
        let close = page
            .find_first(|n| n.attr("role") == Some(ROLE_OVERLAY_CLOSE))
            .unwrap();
        assert!(ctl.handle_click(close, &mut page));
        assert_eq!(ctl.phase(), PlayerPhase::Hidden);
        assert!(!ctl.state().is_playing);
        check_invariant(&ctl, &page);
    }
}
