//! Engine — single-owner event loop for all widget state.
//!
//! Owns the page, the playback controller, and the assistant exclusively.
//! Every input — pushed commands, page mutations, user interaction, async
//! capability completions — arrives as an [`EngineEvent`] on one mpsc queue
//! and is processed strictly in arrival order.  Widgets return [`Effect`]s
//! for the two async capabilities; the engine spawns the work and feeds each
//! completion back in as an ordinary event.
//!
//! After every processed event the engine publishes a JSON snapshot of the
//! page for the HTTP inspection route.

use std::sync::Arc;

use deck_proto::config::Config;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::clipboard::ClipboardSource;
use crate::embed::EmbedSink;
use crate::event::{Effect, EngineEvent};
use crate::page::Page;
use crate::player::PlaybackController;
use crate::search::SearchClient;

pub struct Engine {
    page: Page,
    player: PlaybackController,
    assistant: Assistant,
    clipboard: Arc<dyn ClipboardSource>,
    search: SearchClient,
    /// Completions of spawned capability work re-enter through this sender.
    event_tx: mpsc::Sender<EngineEvent>,
    snapshot_tx: watch::Sender<serde_json::Value>,
}

impl Engine {
    pub fn new(
        config: &Config,
        event_tx: mpsc::Sender<EngineEvent>,
        snapshot_tx: watch::Sender<serde_json::Value>,
        embed: Box<dyn EmbedSink>,
        clipboard: Arc<dyn ClipboardSource>,
    ) -> Self {
        let mut page = Page::new();
        let mut assistant = Assistant::new(&config.assistant);
        assistant.mount(&mut page);
        let engine = Self {
            page,
            player: PlaybackController::new(embed),
            assistant,
            clipboard,
            search: SearchClient::new(config.search.endpoint.clone()),
            event_tx,
            snapshot_tx,
        };
        engine.publish();
        engine
    }

    /// Run until the event channel closes.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<EngineEvent>) {
        info!("engine: starting event loop");
        while let Some(evt) = event_rx.recv().await {
            let effects = self.handle_event(evt);
            for effect in effects {
                self.perform(effect);
            }
            self.publish();
        }
        info!("engine: event channel closed, shutting down");
    }

    fn handle_event(&mut self, evt: EngineEvent) -> Vec<Effect> {
        match evt {
            EngineEvent::Command(cmd) => {
                info!("engine: command {:?}", cmd);
                self.player.handle_command(&cmd, &mut self.page);
                Vec::new()
            }

            EngineEvent::PageInsert { parent, element } => {
                let parent = parent.unwrap_or_else(|| self.page.root());
                if self.page.insert_under(parent, &element).is_none() {
                    warn!("engine: insert under missing node {}", parent);
                }
                self.assistant.on_page_mutated(&mut self.page);
                Vec::new()
            }

            EngineEvent::Click { node } => {
                if !self.page.contains(node) {
                    warn!("engine: click on missing node {}", node);
                    return Vec::new();
                }
                if self.player.handle_click(node, &mut self.page) {
                    return Vec::new();
                }
                self.assistant.handle_click(&mut self.page, node)
            }

            EngineEvent::Input { node, value } => {
                self.assistant
                    .handle_input_changed(&mut self.page, node, &value);
                Vec::new()
            }

            EngineEvent::Submit { node } => self.assistant.handle_submit(&mut self.page, node),

            EngineEvent::Paste { node, text } => {
                self.assistant.handle_paste(&mut self.page, node, &text)
            }

            EngineEvent::ClipboardRead { target, result } => {
                self.assistant.on_clipboard(&mut self.page, target, result);
                Vec::new()
            }

            EngineEvent::SearchResolved { outcome } => {
                self.assistant.on_search_resolved(&mut self.page, outcome);
                Vec::new()
            }
        }
    }

    fn perform(&self, effect: Effect) {
        match effect {
            Effect::ReadClipboard { target } => {
                let clipboard = Arc::clone(&self.clipboard);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let result = tokio::task::spawn_blocking(move || {
                        clipboard.read_text().map_err(|e| e.to_string())
                    })
                    .await
                    .unwrap_or_else(|e| Err(e.to_string()));
                    let _ = tx.send(EngineEvent::ClipboardRead { target, result }).await;
                });
            }
            Effect::Search { query } => {
                let client = self.search.clone();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let outcome = client.search(&query).await;
                    let _ = tx.send(EngineEvent::SearchResolved { outcome }).await;
                });
            }
        }
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.page.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ROLE_PASTE_BUTTON, ROLE_SEARCH_BUTTON};
    use crate::clipboard::StaticClipboard;
    use crate::embed::LogEmbedSink;
    use crate::modal::ModalState;
    use crate::page::{ElementSpec, NodeId};
    use crate::player::{PlayerPhase, OVERLAY_DOM_ID, ROLE_OVERLAY_CLOSE};
    use deck_proto::protocol::{CommandEvent, MEDIA_TYPE_EMBEDDED};
    use std::time::Duration;

    fn test_engine(clipboard: Arc<dyn ClipboardSource>) -> (Engine, mpsc::Receiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (snapshot_tx, _snapshot_rx) = watch::channel(serde_json::Value::Null);
        let mut config = Config::default();
        // Nothing listens here; transport failures are part of the contract.
        config.search.endpoint = "http://127.0.0.1:9/youtube-search".to_string();
        let engine = Engine::new(
            &config,
            event_tx,
            snapshot_tx,
            Box::new(LogEmbedSink),
            clipboard,
        );
        (engine, event_rx)
    }

    fn insert_youtube_input(engine: &mut Engine) -> NodeId {
        engine.handle_event(EngineEvent::PageInsert {
            parent: None,
            element: ElementSpec::new("div")
                .child(ElementSpec::new("input").attr("placeholder", "YouTube URL")),
        });
        engine
            .page
            .find_first(|n| n.tag == "input" && n.attr("placeholder") == Some("YouTube URL"))
            .expect("input just inserted")
    }

    #[test]
    fn test_commands_and_dismiss_click_route_to_player() {
        let (mut engine, _rx) = test_engine(Arc::new(StaticClipboard(String::new())));
        engine.handle_event(EngineEvent::Command(CommandEvent::play(
            MEDIA_TYPE_EMBEDDED,
            "https://www.youtube.com/embed/abc",
        )));
        assert_eq!(engine.player.phase(), PlayerPhase::PlayingEmbedded);

        let close = engine
            .page
            .find_first(|n| n.attr("role") == Some(ROLE_OVERLAY_CLOSE))
            .unwrap();
        engine.handle_event(EngineEvent::Click { node: close });
        assert_eq!(engine.player.phase(), PlayerPhase::Hidden);
    }

    #[test]
    fn test_rapid_plays_leave_single_overlay_with_last_source() {
        let (mut engine, _rx) = test_engine(Arc::new(StaticClipboard(String::new())));
        for i in 0..4 {
            engine.handle_event(EngineEvent::Command(CommandEvent::play(
                MEDIA_TYPE_EMBEDDED,
                format!("https://www.youtube.com/embed/v{i}"),
            )));
        }
        let overlays = engine
            .page
            .find_all(|n| n.attr("id") == Some(OVERLAY_DOM_ID));
        assert_eq!(overlays.len(), 1);
        let iframes = engine.page.find_all(|n| n.tag == "iframe");
        assert_eq!(iframes.len(), 1);
        assert_eq!(
            engine.page.attr(iframes[0], "src"),
            Some("https://www.youtube.com/embed/v3")
        );
    }

    #[test]
    fn test_page_insert_drives_binding() {
        let (mut engine, _rx) = test_engine(Arc::new(StaticClipboard(String::new())));
        let input = insert_youtube_input(&mut engine);
        let buttons = engine
            .page
            .find_all(|n| n.attr("role") == Some(ROLE_SEARCH_BUTTON));
        assert_eq!(buttons.len(), 1);

        // Typed change through the engine validates.
        engine.handle_event(EngineEvent::Input {
            node: input,
            value: "https://youtu.be/dQw4w9WgXcQ".to_string(),
        });
        assert_eq!(engine.page.attr(input, "data-valid"), Some("true"));
    }

    #[tokio::test]
    async fn test_clipboard_capability_round_trip() {
        let (mut engine, mut rx) = test_engine(Arc::new(StaticClipboard(
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
        )));
        let input = insert_youtube_input(&mut engine);
        let paste = engine
            .page
            .find_first(|n| n.attr("role") == Some(ROLE_PASTE_BUTTON))
            .unwrap();

        let effects = engine.handle_event(EngineEvent::Click { node: paste });
        assert_eq!(effects, vec![Effect::ReadClipboard { target: input }]);
        for effect in effects {
            engine.perform(effect);
        }

        let completion = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("clipboard completion")
            .expect("engine sender alive");
        engine.handle_event(completion);
        assert_eq!(
            engine.page.attr(input, "value"),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
        assert_eq!(engine.page.attr(input, "data-valid"), Some("true"));
    }

    #[tokio::test]
    async fn test_unreachable_search_endpoint_surfaces_in_modal() {
        let (mut engine, mut rx) = test_engine(Arc::new(StaticClipboard(String::new())));
        insert_youtube_input(&mut engine);
        let search_btn = engine
            .page
            .find_first(|n| n.attr("role") == Some(ROLE_SEARCH_BUTTON))
            .unwrap();
        engine.handle_event(EngineEvent::Click { node: search_btn });
        let query = engine
            .page
            .find_first(|n| n.attr("role") == Some(crate::modal::ROLE_MODAL_QUERY))
            .unwrap();
        let effects = engine.handle_event(EngineEvent::Paste {
            node: query,
            text: "lofi".to_string(),
        });
        assert_eq!(
            effects,
            vec![Effect::Search {
                query: "lofi".to_string()
            }]
        );
        for effect in effects {
            engine.perform(effect);
        }

        let completion = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("search completion")
            .expect("engine sender alive");
        engine.handle_event(completion);
        assert_eq!(engine.assistant.modal().state(), ModalState::ShowingError);
    }

    #[tokio::test]
    async fn test_run_loop_processes_in_arrival_order() {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (snapshot_tx, mut snapshot_rx) = watch::channel(serde_json::Value::Null);
        let engine = Engine::new(
            &Config::default(),
            event_tx.clone(),
            snapshot_tx,
            Box::new(LogEmbedSink),
            Arc::new(StaticClipboard(String::new())),
        );
        let handle = tokio::spawn(engine.run(event_rx));

        for i in 0..3 {
            event_tx
                .send(EngineEvent::Command(CommandEvent::play(
                    MEDIA_TYPE_EMBEDDED,
                    format!("https://www.youtube.com/embed/v{i}"),
                )))
                .await
                .unwrap();
        }
        event_tx
            .send(EngineEvent::Command(CommandEvent::pause()))
            .await
            .unwrap();

        // Wait until the snapshot shows the final state: one overlay on the
        // last URL.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = snapshot_rx.borrow_and_update().clone();
            if snapshot.to_string().contains("embed/v2") {
                assert!(!snapshot.to_string().contains("embed/v0"));
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "snapshot never settled");
            let _ = tokio::time::timeout(Duration::from_millis(500), snapshot_rx.changed()).await;
        }

        // The engine keeps its own completion sender, so the channel never
        // closes on its own; tear the loop down directly.
        handle.abort();
    }
}
