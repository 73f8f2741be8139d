//! Paragraph splitter: sanitized markup into displayable blocks

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::dom::Node;
use super::sanitize;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t\r]*\n").unwrap();
}

/// One paragraph-level unit of sanitized article content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    index: usize,
    markup: String,
}

impl Block {
    /// Zero-based position in the article
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

/// Split sanitized markup into blocks
///
/// With paragraphs, headings or lists present, each top-level node is a
/// block; whitespace-only text between them is dropped. Otherwise the content is split on blank lines. Non-empty input always
/// yields at least one block.
pub fn split(sanitized: &str) -> Vec<Block> {
    if sanitized.is_empty() {
        return Vec::new();
    }

    let nodes = sanitize::sanitize_nodes(sanitized);
    let pieces = if nodes.iter().any(Node::contains_structural) {
        top_level_pieces(&nodes)
    } else {
        blank_line_pieces(sanitized)
    };

    let pieces = if pieces.is_empty() {
        vec![sanitized.to_string()]
    } else {
        pieces
    };

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, markup)| Block { index, markup })
        .collect()
}

fn top_level_pieces(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .filter(|node| !matches!(node, Node::Text(text) if text.trim().is_empty()))
        .map(Node::to_html)
        .collect()
}

fn blank_line_pieces(content: &str) -> Vec<String> {
    let pieces: Vec<&str> = BLANK_LINE
        .split(content)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect();

    if pieces.len() <= 1 {
        return vec![content.to_string()];
    }
    pieces.into_iter().map(str::to_string).collect()
}
