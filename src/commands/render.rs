//! Render a stored article to HTML

use anyhow::Result;

use crate::content::{render_article, SlugResolver};
use crate::Site;

/// Print the article body (hero image first) for a slug
pub async fn run(site: &Site, slug: &str) -> Result<()> {
    let article = SlugResolver::new(site.backend.store.as_ref())
        .resolve(slug)
        .await?;
    let rendered = render_article(&article);
    tracing::info!(
        "Rendered {} with {} images",
        article.title,
        rendered.image_count()
    );
    if let Some(hero) = rendered.hero_html() {
        println!("{}", hero);
    }
    println!("{}", rendered.body_html());
    Ok(())
}
