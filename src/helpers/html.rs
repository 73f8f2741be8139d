//! HTML helper functions

use crate::content::dom;
use crate::content::sanitize::sanitize_nodes;

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape text and turn line breaks into `<br>`
pub fn text_to_html(s: &str) -> String {
    html_escape(s).replace("\r\n", "\n").replace('\n', "<br>")
}

/// Truncate a string to a specified length in characters
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");

    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s
            .chars()
            .take(length.saturating_sub(omission.chars().count()))
            .collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

/// Plain-text preview of stored markup, entities decoded
pub fn preview(markup: &str, length: usize) -> String {
    let text = dom::text_content(&sanitize_nodes(markup));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&text, length, None)
}

/// Open Graph meta tags for an article page
pub fn open_graph(
    title: &str,
    description: &str,
    url: &str,
    image: Option<&str>,
    site_name: &str,
) -> String {
    let mut tags = vec![
        r#"<meta property="og:type" content="article">"#.to_string(),
        format!(
            r#"<meta property="og:title" content="{}">"#,
            html_escape(title)
        ),
        format!(r#"<meta property="og:url" content="{}">"#, html_escape(url)),
        format!(
            r#"<meta property="og:site_name" content="{}">"#,
            html_escape(site_name)
        ),
    ];

    if !description.is_empty() {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            html_escape(description)
        ));
    }

    if let Some(img) = image {
        tags.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            html_escape(img)
        ));
    }

    tags.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_text_to_html() {
        assert_eq!(text_to_html("one\ntwo\r\n<three>"), "one<br>two<br>&lt;three&gt;");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello World", 8, None), "Hello...");
        assert_eq!(truncate("Hi", 10, None), "Hi");
        assert_eq!(truncate("Ünïcödé text", 6, Some("…")), "Ünïcö…");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("<p>First</p>\n<p>second   para</p>", 100), "First second para");
        assert_eq!(preview("<h2>Tom &amp; Jerry</h2><p>a&nbsp;b<br>c</p>", 100), "Tom & Jerry a b c");
    }

    #[test]
    fn test_open_graph() {
        let tags = open_graph("A & B", "", "https://x/blog/a", Some("https://x/a.png"), "Site");
        assert!(tags.contains(r#"content="A &amp; B""#));
        assert!(tags.contains("og:image"));
        assert!(!tags.contains("og:description"));
    }
}
