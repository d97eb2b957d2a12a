//! Clipboard capability — may be denied or unsupported on the host.

use anyhow::Result;

pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Result<String>;
}

/// System clipboard via arboard.  Constructed per read; the handle is not
/// kept alive across events.
pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> Result<String> {
        let mut clipboard = arboard::Clipboard::new()?;
        Ok(clipboard.get_text()?)
    }
}

/// Fixed-content clipboard for tests.
#[cfg(test)]
pub struct StaticClipboard(pub String);

#[cfg(test)]
impl ClipboardSource for StaticClipboard {
    fn read_text(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
