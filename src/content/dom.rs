//! A small owned HTML tree for sanitized article markup
//!
//! Parsing goes through html5ever's fragment parser (so malformed markup is
//! repaired the same way a browser would), and the sanitizer lowers the
//! resulting `RcDom` into [`Node`]s. Only allow-listed tags ever reach this
//! tree, which keeps serialization trivial.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, RcDom};

/// Tags that split article content into paragraph-level blocks
const STRUCTURAL_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li",
];

/// A node of sanitized markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An allow-listed element with its normalized formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub formatting: Formatting,
    pub children: Vec<Node>,
}

/// Inline formatting carried over from pasted styles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Formatting {
    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underline)
    }

    /// Render as a `style` attribute value
    pub fn to_style(&self) -> String {
        let mut decls = Vec::new();
        if self.bold {
            decls.push("font-weight: bold;");
        }
        if self.italic {
            decls.push("font-style: italic;");
        }
        if self.underline {
            decls.push("text-decoration: underline;");
        }
        decls.join(" ")
    }
}

impl Element {
    pub fn is_structural(&self) -> bool {
        STRUCTURAL_TAGS.contains(&self.tag.as_str())
    }

    fn is_void(&self) -> bool {
        self.tag == "br"
    }
}

impl Node {
    /// True if this node or any descendant is a paragraph, heading, or list element
    pub fn contains_structural(&self) -> bool {
        match self {
            Node::Element(el) => {
                el.is_structural() || el.children.iter().any(Node::contains_structural)
            }
            Node::Text(_) => false,
        }
    }

    pub fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => escape_text(text, out),
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                if !el.formatting.is_plain() {
                    out.push_str(" style=\"");
                    out.push_str(&el.formatting.to_style());
                    out.push('"');
                }
                out.push('>');
                if el.is_void() {
                    return;
                }
                for child in &el.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }
}

/// Serialize a node list
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_html(&mut out);
    }
    out
}

/// Decoded text of a node list, with block boundaries as spaces
pub fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_text(node, &mut out);
    }
    out
}

fn write_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(el) => {
            for child in &el.children {
                write_text(child, out);
            }
            if el.is_structural() || el.is_void() {
                out.push(' ');
            }
        }
    }
}

/// Append text, merging with a preceding text node
pub fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Parse markup as the contents of a `<body>` element
pub fn parse(markup: &str) -> RcDom {
    parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(markup)
}

/// Top-level nodes of a parsed fragment
///
/// html5ever roots a fragment under a synthetic `<html>` element.
pub fn fragment_children(dom: &RcDom) -> Vec<Handle> {
    let document_children = dom.document.children.borrow();
    match document_children.first() {
        Some(root) => root.children.borrow().clone(),
        None => Vec::new(),
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
