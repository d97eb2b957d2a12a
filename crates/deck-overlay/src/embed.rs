//! Frame-boundary control channel.
//!
//! Directives posted into the embedded player's child context are strictly
//! fire-and-forget: no acknowledgment, no delivery guarantee, failures
//! unobservable to the sender.

use tokio::sync::mpsc;
use tracing::debug;

pub trait EmbedSink: Send {
    fn post(&self, directive: &str);
}

/// Production sink — the child context is not a real browsing context here,
/// so directives are only traced.
pub struct LogEmbedSink;

impl EmbedSink for LogEmbedSink {
    fn post(&self, directive: &str) {
        debug!("embed directive: {}", directive);
    }
}

/// Channel-backed sink for tests and for wiring a real child context later.
pub struct ChannelEmbedSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelEmbedSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EmbedSink for ChannelEmbedSink {
    fn post(&self, directive: &str) {
        // Receiver may be gone; that is indistinguishable from an embedded
        // player that ignores the directive.
        let _ = self.tx.send(directive.to_string());
    }
}
