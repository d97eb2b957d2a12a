//! Search modal — query entry, result list, selection.
//!
//! The modal subtree is built once, hidden, and owned exclusively by the
//! assistant.  A `SearchSession` exists only while the modal is open; a
//! search completion arriving with no session is dropped.

use deck_proto::protocol::{SearchResponse, SearchResult};
use tracing::{debug, info};

use crate::event::Effect;
use crate::page::{ElementSpec, NodeId, Page};
use crate::search::SearchError;

pub const MODAL_DOM_ID: &str = "youtube-search-modal";
pub const ROLE_MODAL_CLOSE: &str = "modal-close";
pub const ROLE_MODAL_QUERY: &str = "modal-query";
pub const ROLE_MODAL_RESULTS: &str = "modal-results";
pub const ROLE_SEARCH_RESULT: &str = "search-result";

const PROMPT_TEXT: &str = "Search for YouTube videos above...";
const LOADING_TEXT: &str = "Searching...";
const EMPTY_TEXT: &str = "No videos found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    AwaitingQuery,
    Searching,
    ShowingResults,
    ShowingError,
}

/// Live search context — query, received results, and the input the chosen
/// result will be written back into.
#[derive(Debug)]
pub struct SearchSession {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub target: NodeId,
}

pub struct SearchModal {
    state: ModalState,
    session: Option<SearchSession>,
    root: Option<NodeId>,
}

impl SearchModal {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
            session: None,
            root: None,
        }
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn session(&self) -> Option<&SearchSession> {
        self.session.as_ref()
    }

    /// Build the hidden modal subtree.  Idempotent.
    pub fn mount(&mut self, page: &mut Page) {
        if self.root.map(|id| page.contains(id)).unwrap_or(false) {
            return;
        }
        let root = page.root();
        self.root = page.insert_under(
            root,
            &ElementSpec::new("div")
                .attr("id", MODAL_DOM_ID)
                .attr("display", "none")
                .child(
                    ElementSpec::new("div")
                        .attr("role", "modal-content")
                        .child(
                            ElementSpec::new("div")
                                .attr("role", "modal-header")
                                .child(ElementSpec::new("h3").text("YouTube Video Search"))
                                .child(
                                    ElementSpec::new("button")
                                        .attr("role", ROLE_MODAL_CLOSE)
                                        .text("✕"),
                                ),
                        )
                        .child(
                            ElementSpec::new("input")
                                .attr("role", ROLE_MODAL_QUERY)
                                .attr("placeholder", "Search YouTube videos or paste URL..."),
                        )
                        .child(ElementSpec::new("div").attr("role", ROLE_MODAL_RESULTS)),
                ),
        );
    }

    pub fn is_query_field(&self, page: &Page, node: NodeId) -> bool {
        page.attr(node, "role") == Some(ROLE_MODAL_QUERY)
    }

    /// Open for `target`, clearing any previous results display.
    pub fn open(&mut self, page: &mut Page, target: NodeId) {
        info!("search modal opened for input {}", target);
        self.session = Some(SearchSession {
            query: String::new(),
            results: Vec::new(),
            target,
        });
        self.state = ModalState::AwaitingQuery;
        if let Some(root) = self.root {
            page.set_attr(root, "display", "flex");
        }
        self.render_message(page, PROMPT_TEXT);
    }

    /// Dismiss without side effects on the target input.
    pub fn close(&mut self, page: &mut Page) {
        self.session = None;
        self.state = ModalState::Closed;
        if let Some(root) = self.root {
            page.set_attr(root, "display", "none");
        }
    }

    /// Fire one search request.  Every submission fires independently; the
    /// display reflects whichever completion renders last.
    pub fn submit(&mut self, page: &mut Page, query: &str) -> Option<Effect> {
        let session = self.session.as_mut()?;
        session.query = query.to_string();
        self.state = ModalState::Searching;
        self.render_message(page, LOADING_TEXT);
        Some(Effect::Search {
            query: query.to_string(),
        })
    }

    /// Apply a search completion.  The three failure shapes (transport error,
    /// backend `success: false`, empty result set) differ only in message
    /// text.
    pub fn resolve(&mut self, page: &mut Page, outcome: Result<SearchResponse, SearchError>) {
        if self.session.is_none() {
            debug!("dropping search completion, modal closed");
            return;
        }
        match outcome {
            Err(e) => {
                self.state = ModalState::ShowingError;
                self.render_message(page, &format!("Search error: {e}"));
            }
            Ok(response) if !response.success => {
                let message = response.message.unwrap_or_else(|| "unknown".to_string());
                self.state = ModalState::ShowingError;
                self.render_message(page, &format!("Search failed: {message}"));
            }
            Ok(response) if response.results.is_empty() => {
                self.state = ModalState::ShowingError;
                self.render_message(page, EMPTY_TEXT);
            }
            Ok(response) => {
                if let Some(session) = self.session.as_mut() {
                    session.results = response.results;
                }
                self.state = ModalState::ShowingResults;
                self.render_results(page);
            }
        }
    }

    /// Resolve a click anywhere inside a result row to its index.
    pub fn result_index(&self, page: &Page, node: NodeId) -> Option<usize> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if page.attr(id, "role") == Some(ROLE_SEARCH_RESULT) {
                return page.attr(id, "data-index").and_then(|s| s.parse().ok());
            }
            cursor = page.parent(id);
        }
        None
    }

    /// Take the selected result's URL and target input, then close.
    pub fn select(&mut self, page: &mut Page, index: usize) -> Option<(NodeId, String)> {
        let session = self.session.as_ref()?;
        let url = session.results.get(index)?.url.clone();
        let target = session.target;
        self.close(page);
        Some((target, url))
    }

    fn render_message(&self, page: &mut Page, text: &str) {
        if let Some(results) = self.results_container(page) {
            page.clear_children(results);
            page.set_text(results, text);
        }
    }

    fn render_results(&self, page: &mut Page) {
        let Some(container) = self.results_container(page) else {
            return;
        };
        page.clear_children(container);
        page.set_text(container, "");
        let Some(session) = self.session.as_ref() else {
            return;
        };
        // Response order preserved — no re-sorting.
        let rows: Vec<ElementSpec> = session
            .results
            .iter()
            .enumerate()
            .map(|(index, result)| {
                ElementSpec::new("div")
                    .attr("role", ROLE_SEARCH_RESULT)
                    .attr("data-index", index.to_string())
                    .child(ElementSpec::new("img").attr("src", &result.thumbnail_url))
                    .child(
                        ElementSpec::new("div")
                            .attr("role", "result-title")
                            .text(&result.title),
                    )
                    .child(
                        ElementSpec::new("div")
                            .attr("role", "result-author")
                            .text(&result.author),
                    )
            })
            .collect();
        for row in rows {
            page.insert_under(container, &row);
        }
    }

    fn results_container(&self, page: &Page) -> Option<NodeId> {
        let root = self.root.filter(|&id| page.contains(id))?;
        let mut stack: Vec<NodeId> = page.children(root).to_vec();
        while let Some(id) = stack.pop() {
            if page.attr(id, "role") == Some(ROLE_MODAL_RESULTS) {
                return Some(id);
            }
            stack.extend(page.children(id));
        }
        None
    }
}

impl Default for SearchModal {
    fn default() -> Self {
        Self::new()
    }
}
