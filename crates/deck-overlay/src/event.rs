//! Engine event and effect enums — everything that flows through the loop.

use deck_proto::protocol::{CommandEvent, SearchResponse};

use crate::page::{ElementSpec, NodeId};
use crate::search::SearchError;

/// All inputs into the engine loop, processed strictly in arrival order.
#[derive(Debug)]
pub enum EngineEvent {
    // ── pushed playback commands ─────────────────────────────────────────────
    Command(CommandEvent),

    // ── host-page mutation (arbitrary page authors) ──────────────────────────
    PageInsert {
        /// `None` inserts under the page root.
        parent: Option<NodeId>,
        element: ElementSpec,
    },

    // ── user interaction ─────────────────────────────────────────────────────
    Click {
        node: NodeId,
    },
    /// A typed value change in a text field.
    Input {
        node: NodeId,
        value: String,
    },
    /// Enter pressed in a text field.
    Submit {
        node: NodeId,
    },
    /// Text pasted directly into a field (not via the paste affordance).
    Paste {
        node: NodeId,
        text: String,
    },

    // ── async capability completions ─────────────────────────────────────────
    ClipboardRead {
        target: NodeId,
        result: Result<String, String>,
    },
    SearchResolved {
        outcome: Result<SearchResponse, SearchError>,
    },
}

/// Side effects a widget asks the engine to perform.  The engine spawns the
/// work and feeds the completion back in as an ordinary event; the widget
/// never awaits anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ReadClipboard { target: NodeId },
    Search { query: String },
}
