//! List site content

use anyhow::Result;

use crate::admin::ArticleEditor;
use crate::content::BlogListing;
use crate::Site;

/// List site content by type
pub async fn run(site: &Site, content_type: &str) -> Result<()> {
    let store = site.backend.store.as_ref();

    match content_type {
        "article" | "articles" | "post" | "posts" => {
            let articles = ArticleEditor::new(store).list().await?;
            println!("Articles ({}):", articles.len());
            for article in articles {
                println!(
                    "  {} - {} [{}]{}",
                    article.date.format("%Y-%m-%d"),
                    article.title,
                    article.path(),
                    if article.published { "" } else { " (draft)" }
                );
            }
        }
        "category" | "categories" => {
            let listing = BlogListing::load(store).await?;
            let mut categories = listing.categories();
            categories.sort_by(|a, b| b.count.cmp(&a.count));
            println!("Categories ({}):", categories.len());
            for category in categories {
                println!("  {} ({}) [{}]", category.name, category.count, category.path());
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: articles, categories",
                content_type
            );
        }
    }

    Ok(())
}
