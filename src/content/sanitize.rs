//! Allow-list sanitizer for pasted rich text
//!
//! Pasted content typically comes from a word processor and carries namespace
//! tags (`<o:p>`, `<w:Sdt>`), conditional comments, class soup and inline
//! styles. The sanitizer keeps a fixed set of formatting tags, unwraps every
//! other element in place (its text and any allowed descendants survive), and
//! drops all attributes except a normalized bold/italic/underline style.

use html5ever::{namespace_url, ns};
use markup5ever_rcdom::{Handle, NodeData};

use super::dom::{self, Element, Formatting, Node};

/// Tags that survive sanitization
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "b", "strong", "i", "em", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
    "li", "span",
];

pub fn is_allowed(tag: &str) -> bool {
    ALLOWED_TAGS.contains(&tag)
}

/// Sanitize markup and serialize the result
///
/// Never fails: html5ever repairs unclosed or misnested markup.
pub fn sanitize(raw: &str) -> String {
    dom::to_html(&sanitize_nodes(raw))
}

/// Sanitize markup into a node list
pub fn sanitize_nodes(raw: &str) -> Vec<Node> {
    let parsed = dom::parse(raw);
    let mut out = Vec::new();
    for child in dom::fragment_children(&parsed) {
        clean_into(&child, &mut out);
    }
    out
}

fn clean_into(handle: &Handle, out: &mut Vec<Node>) {
    match handle.data {
        NodeData::Text { ref contents } => dom::push_text(out, &contents.borrow()),
        NodeData::Element {
            ref name,
            ref attrs,
            ref template_contents,
            ..
        } => {
            let tag: &str = &name.local;
            let in_html = name.ns == ns!(html);

            if in_html && is_allowed(tag) {
                let style = attrs
                    .borrow()
                    .iter()
                    .find(|attr| &*attr.name.local == "style")
                    .map(|attr| attr.value.to_string());

                let mut children = Vec::new();
                for child in handle.children.borrow().iter() {
                    clean_into(child, &mut children);
                }

                out.push(Node::Element(Element {
                    tag: tag.to_string(),
                    formatting: formatting_for(tag, style.as_deref()),
                    children,
                }));
            } else {
                if let Some(contents) = template_contents.borrow().as_ref() {
                    for child in contents.children.borrow().iter() {
                        clean_into(child, out);
                    }
                }
                for child in handle.children.borrow().iter() {
                    clean_into(child, out);
                }
            }
        }
        // Comments (conditional directives included), doctypes, PIs
        _ => {}
    }
}

/// Normalized formatting for an allowed element
pub fn formatting_for(tag: &str, style: Option<&str>) -> Formatting {
    let mut formatting = Formatting {
        bold: matches!(tag, "b" | "strong"),
        italic: matches!(tag, "i" | "em"),
        underline: tag == "u",
    };

    for (property, value) in style.map(declarations).unwrap_or_default() {
        match property.as_str() {
            "font-weight" if is_bold_weight(&value) => formatting.bold = true,
            "font-style" if value == "italic" => formatting.italic = true,
            "text-decoration" | "text-decoration-line" if value.contains("underline") => {
                formatting.underline = true
            }
            _ => {}
        }
    }

    formatting
}

/// Split a style attribute into lowercase `(property, value)` pairs
fn declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let value = value.trim().trim_end_matches("!important").trim();
            Some((property.trim().to_lowercase(), value.to_lowercase()))
        })
        .collect()
}

fn is_bold_weight(value: &str) -> bool {
    match value {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u16>().map(|w| w >= 600).unwrap_or(false),
    }
}
