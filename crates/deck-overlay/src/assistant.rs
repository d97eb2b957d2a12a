//! Input augmentation & search assistant.
//!
//! Discovers YouTube-URL inputs as the page mutates, attaches search/paste
//! affordances next to each, validates values on every change, renders a
//! preview under valid inputs, and runs the modal search workflow.
//!
//! Binding is idempotent per element via a marker attribute on the input
//! itself — the assistant keeps no registry, so an input removed by the host
//! page simply stops being reachable and every later operation on it is a
//! guarded no-op.

use deck_proto::config::AssistantConfig;
use deck_proto::protocol::SearchResponse;
use deck_proto::youtube;
use tracing::{debug, warn};

use crate::event::Effect;
use crate::modal::{ModalState, SearchModal, ROLE_MODAL_CLOSE};
use crate::page::{ElementSpec, MutationWatch, Node, NodeId, Page};
use crate::search::SearchError;

/// Marker set on an input once affordances are attached.
pub const MARKER_ATTR: &str = "data-youtube-search";
pub const ROLE_SEARCH_BUTTON: &str = "search-button";
pub const ROLE_PASTE_BUTTON: &str = "paste-button";
pub const ROLE_VIDEO_PREVIEW: &str = "video-preview";
/// Binary validation marker on the input ("true"/"false").
pub const ATTR_VALID: &str = "data-valid";
const ATTR_TARGET: &str = "data-target";

pub struct Assistant {
    watch: MutationWatch,
    modal: SearchModal,
}

impl Assistant {
    pub fn new(config: &AssistantConfig) -> Self {
        let keyword = config.placeholder_keyword.to_lowercase();
        Self {
            watch: MutationWatch::new(move |node| is_candidate(node, &keyword)),
            modal: SearchModal::new(),
        }
    }

    pub fn modal(&self) -> &SearchModal {
        &self.modal
    }

    /// Build the modal and bind everything already on the page.
    pub fn mount(&mut self, page: &mut Page) {
        self.modal.mount(page);
        for input in self.watch.scan_all(page) {
            self.bind(page, input);
        }
    }

    /// React to host-page insertions.  Cheap no-op for already-bound inputs.
    pub fn on_page_mutated(&mut self, page: &mut Page) {
        for input in self.watch.drain(page) {
            self.bind(page, input);
        }
    }

    fn bind(&mut self, page: &mut Page, input: NodeId) -> bool {
        if page.attr(input, MARKER_ATTR).is_some() {
            return false;
        }
        page.set_attr(input, MARKER_ATTR, "true");
        let target = input.0.to_string();
        page.insert_after(
            input,
            &ElementSpec::new("div")
                .attr("role", "search-affordances")
                .attr(ATTR_TARGET, &target)
                .child(
                    ElementSpec::new("button")
                        .attr("role", ROLE_SEARCH_BUTTON)
                        .attr(ATTR_TARGET, &target)
                        .attr("title", "Search YouTube")
                        .text("🔍"),
                )
                .child(
                    ElementSpec::new("button")
                        .attr("role", ROLE_PASTE_BUTTON)
                        .attr(ATTR_TARGET, &target)
                        .attr("title", "Paste from clipboard")
                        .text("📋"),
                ),
        );
        debug!("bound input {}", input);
        true
    }

    // ── user interaction ─────────────────────────────────────────────────────

    pub fn handle_click(&mut self, page: &mut Page, node: NodeId) -> Vec<Effect> {
        match page.attr(node, "role") {
            Some(ROLE_SEARCH_BUTTON) => {
                if let Some(target) = self.click_target(page, node) {
                    self.modal.open(page, target);
                }
                Vec::new()
            }
            Some(ROLE_PASTE_BUTTON) => match self.click_target(page, node) {
                Some(target) => vec![Effect::ReadClipboard { target }],
                None => Vec::new(),
            },
            Some(ROLE_MODAL_CLOSE) => {
                self.modal.close(page);
                Vec::new()
            }
            _ => {
                if let Some(index) = self.modal.result_index(page, node) {
                    self.select_result(page, index);
                }
                Vec::new()
            }
        }
    }

    /// Typed value change — writes the value and re-validates bound inputs.
    pub fn handle_input_changed(&mut self, page: &mut Page, node: NodeId, value: &str) {
        if !page.contains(node) {
            return;
        }
        page.set_attr(node, "value", value);
        if page.attr(node, MARKER_ATTR).is_some() {
            self.validate_and_preview(page, node);
        }
    }

    /// Enter pressed in a field.  Only the modal's query field submits.
    pub fn handle_submit(&mut self, page: &mut Page, node: NodeId) -> Vec<Effect> {
        if self.modal.is_query_field(page, node) {
            let query = page.attr(node, "value").unwrap_or("").to_string();
            return self.modal.submit(page, &query).into_iter().collect();
        }
        Vec::new()
    }

    /// Text pasted directly into a field.  Pasting into the query field
    /// submits immediately; pasting into a bound input re-validates.
    pub fn handle_paste(&mut self, page: &mut Page, node: NodeId, text: &str) -> Vec<Effect> {
        if !page.contains(node) {
            return Vec::new();
        }
        page.set_attr(node, "value", text);
        if self.modal.is_query_field(page, node) {
            return self.modal.submit(page, text).into_iter().collect();
        }
        if page.attr(node, MARKER_ATTR).is_some() {
            self.validate_and_preview(page, node);
        }
        Vec::new()
    }

    // ── async capability completions ─────────────────────────────────────────

    pub fn on_clipboard(&mut self, page: &mut Page, target: NodeId, result: Result<String, String>) {
        match result {
            Ok(text) => {
                if page.contains(target) {
                    page.set_attr(target, "value", &text);
                    self.validate_and_preview(page, target);
                }
            }
            Err(e) => {
                // Capability failure: logged, invisible to the user.
                warn!("Failed to read clipboard: {}", e);
            }
        }
    }

    pub fn on_search_resolved(
        &mut self,
        page: &mut Page,
        outcome: Result<SearchResponse, SearchError>,
    ) {
        self.modal.resolve(page, outcome);
    }

    // ── validation & preview ─────────────────────────────────────────────────

    /// Validate the current value and, when valid, replace the preview.
    ///
    /// An invalid value flips the marker but leaves any earlier preview in
    /// place; previews are only replaced on the next successful validation.
    fn validate_and_preview(&mut self, page: &mut Page, input: NodeId) {
        let value = page
            .attr(input, "value")
            .unwrap_or("")
            .trim()
            .to_string();
        if value.is_empty() {
            return;
        }

        let valid = youtube::is_youtube_url(&value);
        page.set_attr(input, ATTR_VALID, if valid { "true" } else { "false" });
        if !valid {
            return;
        }

        let target = input.0.to_string();
        for stale in page.find_all(|n| {
            n.attr("role") == Some(ROLE_VIDEO_PREVIEW) && n.attr(ATTR_TARGET) == Some(target.as_str())
        }) {
            page.remove(stale);
        }

        let Some(video_id) = youtube::extract_video_id(&value) else {
            return;
        };
        let Some(parent) = page.parent(input) else {
            return;
        };
        page.insert_under(
            parent,
            &ElementSpec::new("div")
                .attr("role", ROLE_VIDEO_PREVIEW)
                .attr(ATTR_TARGET, &target)
                .child(ElementSpec::new("img").attr("src", youtube::thumbnail_url(&video_id)))
                .child(ElementSpec::new("div").text("✓ Valid YouTube URL detected"))
                .child(
                    ElementSpec::new("div")
                        .attr("role", "preview-video-id")
                        .text(format!("Video ID: {video_id}")),
                ),
        );
    }

    fn select_result(&mut self, page: &mut Page, index: usize) {
        if self.modal.state() != ModalState::ShowingResults {
            return;
        }
        if let Some((target, url)) = self.modal.select(page, index) {
            if page.contains(target) {
                page.set_attr(target, "value", &url);
                self.validate_and_preview(page, target);
            } else {
                warn!("search target input {} no longer on page", target);
            }
        }
    }

    fn click_target(&self, page: &Page, node: NodeId) -> Option<NodeId> {
        let target = page
            .attr(node, ATTR_TARGET)
            .and_then(|s| s.parse::<u64>().ok())
            .map(NodeId)?;
        if page.contains(target) {
            Some(target)
        } else {
            warn!("affordance target input {} no longer on page", target);
            None
        }
    }
}

fn is_candidate(node: &Node, keyword: &str) -> bool {
    if node.tag != "input" {
        return false;
    }
    // Single-line text fields only.
    if !matches!(node.attr("type"), None | Some("text")) {
        return false;
    }
    // Widget-owned chrome carries a role; only host-page inputs qualify.
    // Keeps the modal's own query field from binding itself.
    if node.attr("role").is_some() {
        return false;
    }
    node.attr("placeholder")
        .map(|p| p.to_lowercase().contains(keyword))
        .unwrap_or(false)
}
