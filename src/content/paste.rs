//! Applying clipboard pastes to the editor's content

use serde::{Deserialize, Serialize};

use super::blocks::{self, Block};
use super::sanitize;

/// Pasted rich text together with its sanitized form and blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDocument {
    raw: String,
    sanitized: String,
    blocks: Vec<Block>,
}

impl ContentDocument {
    /// Build from a raw paste. Rebuild whenever the source text changes.
    pub fn from_paste(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let sanitized = sanitize::sanitize(&raw);
        let blocks = blocks::split(&sanitized);
        Self {
            raw,
            sanitized,
            blocks,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

/// The clipboard flavours offered by a paste event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Clipboard {
    pub html: Option<String>,
    pub text: Option<String>,
}

/// Editor selection, in characters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasteOutcome {
    /// Editor content after the paste
    pub content: String,
    /// Character offset just after the inserted text
    pub cursor: usize,
    /// Present when the HTML flavour was pasted
    pub document: Option<ContentDocument>,
}

/// Replace the selection with the clipboard payload
///
/// The HTML flavour wins and is sanitized; plain text is inserted verbatim.
pub fn apply_paste(current: &str, selection: Selection, clipboard: &Clipboard) -> PasteOutcome {
    let html = clipboard.html.as_deref().filter(|h| !h.is_empty());
    let (inserted, document) = match html {
        Some(html) => {
            let document = ContentDocument::from_paste(html);
            (document.sanitized().to_string(), Some(document))
        }
        None => (clipboard.text.clone().unwrap_or_default(), None),
    };

    let len = current.chars().count();
    let start = selection.start.min(selection.end).min(len);
    let end = selection.start.max(selection.end).min(len);

    let mut content = String::with_capacity(current.len() + inserted.len());
    content.push_str(&current[..byte_offset(current, start)]);
    content.push_str(&inserted);
    content.push_str(&current[byte_offset(current, end)..]);

    PasteOutcome {
        content,
        cursor: start + inserted.chars().count(),
        document,
    }
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(s.len())
}
