//! Post renderer: composes blocks and interleaved images into an article body

use serde::Serialize;

use super::blocks::{self, Block};
use super::interleave::{interleave, ImageSlot};
use super::{sanitize, Article, ImageRef};
use crate::helpers::html_escape;

/// Alt text used for secondary images that have none
pub const DEFAULT_SECONDARY_ALT: &str = "Additional image for article";

/// A displayable image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Figure {
    pub src: String,
    pub alt: String,
    pub caption: Option<String>,
}

impl Figure {
    /// The primary image: alt falls back to the article title, no caption
    fn primary(image: &ImageRef, title: &str) -> Self {
        Self {
            src: image.url.clone(),
            alt: image.alt.clone().unwrap_or_else(|| title.to_string()),
            caption: None,
        }
    }

    /// A secondary image: captioned with its alt text when there is one
    fn secondary(image: &ImageRef) -> Self {
        Self {
            src: image.url.clone(),
            alt: image
                .alt
                .clone()
                .unwrap_or_else(|| DEFAULT_SECONDARY_ALT.to_string()),
            caption: image.alt.clone(),
        }
    }

    pub fn to_html(&self) -> String {
        let caption = self
            .caption
            .as_ref()
            .map(|c| format!("<figcaption>{}</figcaption>", html_escape(c)))
            .unwrap_or_default();
        format!(
            r#"<figure class="article-image"><img src="{}" alt="{}">{}</figure>"#,
            html_escape(&self.src),
            html_escape(&self.alt),
            caption
        )
    }
}

/// One item of the rendered body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderNode {
    Block { index: usize, markup: String },
    Image(Figure),
}

/// A fully composed article body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArticle {
    /// Primary image, emitted before the body
    pub hero: Option<Figure>,
    pub body: Vec<RenderNode>,
}

impl RenderedArticle {
    pub fn hero_html(&self) -> Option<String> {
        self.hero.as_ref().map(Figure::to_html)
    }

    pub fn body_html(&self) -> String {
        let mut out = String::new();
        for node in &self.body {
            match node {
                RenderNode::Block { markup, .. } => {
                    out.push_str(r#"<div class="block">"#);
                    out.push_str(markup);
                    out.push_str("</div>\n");
                }
                RenderNode::Image(figure) => {
                    out.push_str(&figure.to_html());
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Number of images in the body
    pub fn image_count(&self) -> usize {
        self.body
            .iter()
            .filter(|node| matches!(node, RenderNode::Image(_)))
            .count()
    }
}

/// Emit each block followed by the slots that target it, in slot order
pub fn compose(blocks: &[Block], slots: &[ImageSlot]) -> Vec<RenderNode> {
    let mut body = Vec::with_capacity(blocks.len() + slots.len());
    for block in blocks {
        body.push(RenderNode::Block {
            index: block.index(),
            markup: block.markup().to_string(),
        });
        body.extend(
            slots
                .iter()
                .filter(|slot| slot.target == block.index())
                .map(|slot| RenderNode::Image(Figure::secondary(&slot.image))),
        );
    }
    body
}

/// Run the whole pipeline for an article: sanitize, split, interleave, compose
pub fn render_article(article: &Article) -> RenderedArticle {
    let sanitized = sanitize::sanitize(&article.content);
    let blocks = blocks::split(&sanitized);
    let slots = interleave(blocks.len(), &article.secondary_images);
    tracing::debug!(
        "Rendering {}: {} blocks, {} interleaved images",
        article.id,
        blocks.len(),
        slots.len()
    );

    RenderedArticle {
        hero: article
            .image
            .as_ref()
            .map(|image| Figure::primary(image, &article.title)),
        body: compose(&blocks, &slots),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(content: &str, images: [Option<ImageRef>; 3]) -> Article {
        let now = Utc::now();
        let [primary, second, third] = images;
        Article {
            id: "a".into(),
            title: "Title".into(),
            excerpt: String::new(),
            content: content.into(),
            author: String::new(),
            category: String::new(),
            published: true,
            image: primary,
            secondary_images: [second, third],
            slug: None,
            date: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn image(url: &str, alt: Option<&str>) -> Option<ImageRef> {
        Some(ImageRef {
            url: url.into(),
            alt: alt.map(str::to_string),
        })
    }

    fn layout(rendered: &RenderedArticle) -> Vec<String> {
        rendered
            .body
            .iter()
            .map(|node| match node {
                RenderNode::Block { index, .. } => format!("b{}", index),
                RenderNode::Image(figure) => figure.src.clone(),
            })
            .collect()
    }

    #[test]
    fn test_nine_paragraphs() {
        let content: String = (0..9).map(|i| format!("<p>{}</p>", i)).collect();
        let rendered = render_article(&article(
            &content,
            [None, image("two.png", None), image("three.png", None)],
        ));
        assert_eq!(
            layout(&rendered),
            vec!["b0", "b1", "b2", "two.png", "b3", "b4", "b5", "three.png", "b6", "b7", "b8"]
        );
    }

    #[test]
    fn test_single_block_both_images_in_order() {
        let rendered = render_article(&article(
            "<p>only</p>",
            [
                image("hero.png", None),
                image("two.png", Some("Second")),
                image("three.png", None),
            ],
        ));
        assert_eq!(layout(&rendered), vec!["b0", "two.png", "three.png"]);

        let hero = rendered.hero.as_ref().unwrap();
        assert_eq!(hero.src, "hero.png");
        assert_eq!(hero.alt, "Title");
    }

    #[test]
    fn test_captions_and_default_alt() {
        let rendered = render_article(&article(
            "<p>a</p><p>b</p>",
            [None, image("two.png", Some("A calm lake")), image("three.png", None)],
        ));
        let figures: Vec<&Figure> = rendered
            .body
            .iter()
            .filter_map(|node| match node {
                RenderNode::Image(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(figures[0].caption.as_deref(), Some("A calm lake"));
        assert_eq!(figures[1].caption, None);
        assert_eq!(figures[1].alt, DEFAULT_SECONDARY_ALT);

        let html = rendered.body_html();
        assert!(html.contains("<figcaption>A calm lake</figcaption>"));
        assert_eq!(rendered.image_count(), 2);
    }

    #[test]
    fn test_body_is_sanitized() {
        let rendered = render_article(&article(
            r#"<p onclick="x()">hi</p><script>bad()</script>"#,
            [None, None, None],
        ));
        let html = rendered.body_html();
        assert!(!html.contains("onclick"));
        assert!(!html.contains("<script"));
        assert!(rendered.hero.is_none());
    }

    #[test]
    fn test_empty_content_has_no_images() {
        let rendered = render_article(&article("", [None, image("two.png", None), None]));
        assert!(rendered.body.is_empty());
    }
}
