//! Slug derivation and article lookup by slug

use lazy_static::lazy_static;
use regex::Regex;

use super::Article;
use crate::backend::{rows, Query, Store, Table};
use crate::error::{Result, SiteError};

lazy_static! {
    // ASCII word class, matching slugs derived before the slug column existed
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_\s-]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Derive a slug from a title
///
/// Lowercases, strips everything but word characters, whitespace and hyphens,
/// then turns each whitespace run into a single hyphen.
///
/// # Examples
/// ```
/// assert_eq!(submind::content::derive_slug("PSYCH-K® Basics!"), "psych-k-basics");
/// ```
pub fn derive_slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    WHITESPACE_RUN.replace_all(&stripped, "-").into_owned()
}

/// Whether a slug is URL-safe: lowercase ASCII letters, digits, `_` and `-`
pub fn is_url_safe(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Resolves a requested slug to a published article
pub struct SlugResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> SlugResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Look up by persisted slug first, then by slugs derived from titles
    ///
    /// The second path keeps articles written before slugs were persisted
    /// reachable. The returned article always carries its canonical slug.
    pub async fn resolve(&self, requested: &str) -> Result<Article> {
        if requested.is_empty() {
            return Err(SiteError::not_found("Blog post"));
        }

        let by_slug = Query::new()
            .eq("published", true)
            .eq("slug", requested)
            .limit(1);
        if let Some(article) =
            rows::fetch_one::<Article>(self.store, Table::Articles, &by_slug).await?
        {
            tracing::debug!("Resolved {} by persisted slug", requested);
            return Ok(with_canonical_slug(article));
        }

        let published = Query::new().eq("published", true);
        let candidates: Vec<Article> =
            rows::fetch(self.store, Table::Articles, &published).await?;

        candidates
            .into_iter()
            .find(|article| derive_slug(&article.title) == requested)
            .map(|article| {
                tracing::debug!("Resolved {} by title-derived slug", requested);
                with_canonical_slug(article)
            })
            .ok_or_else(|| SiteError::not_found("Blog post"))
    }
}

fn with_canonical_slug(mut article: Article) -> Article {
    article.slug = Some(article.canonical_slug());
    article
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("PSYCH-K® Basics!"), "psych-k-basics");
        assert_eq!(derive_slug("Hello   World"), "hello-world");
        assert_eq!(derive_slug("What's New in 2024?"), "whats-new-in-2024");
        assert_eq!(derive_slug("Café Society"), "caf-society");
        assert_eq!(derive_slug("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_is_url_safe() {
        assert!(is_url_safe("psych-k-basics"));
        assert!(!is_url_safe("Psych-K"));
        assert!(!is_url_safe("a b"));
        assert!(!is_url_safe(""));
    }

    fn seed(backend: &MemoryBackend) {
        backend.seed(
            Table::Articles,
            json!({
                "id": "1", "title": "PSYCH-K® Basics!", "excerpt": "e", "content": "<p>c</p>",
                "author": "a", "category": "Intro", "published": true, "slug": null,
                "date": "2024-03-01T10:00:00Z"
            }),
        );
        backend.seed(
            Table::Articles,
            json!({
                "id": "2", "title": "Second Post", "excerpt": "e", "content": "<p>c</p>",
                "author": "a", "category": "Intro", "published": true, "slug": "custom-second",
                "date": "2024-03-02T10:00:00Z"
            }),
        );
        backend.seed(
            Table::Articles,
            json!({
                "id": "3", "title": "Draft Post", "excerpt": "e", "content": "<p>c</p>",
                "author": "a", "category": "Intro", "published": false, "slug": "draft-post",
                "date": "2024-03-03T10:00:00Z"
            }),
        );
    }

    #[tokio::test]
    async fn test_resolve_by_persisted_slug() {
        let backend = MemoryBackend::new();
        seed(&backend);
        let article = SlugResolver::new(&backend)
            .resolve("custom-second")
            .await
            .unwrap();
        assert_eq!(article.id, "2");
    }

    #[tokio::test]
    async fn test_resolve_by_derived_slug() {
        let backend = MemoryBackend::new();
        seed(&backend);
        let slug = derive_slug("PSYCH-K® Basics!");
        let article = SlugResolver::new(&backend).resolve(&slug).await.unwrap();
        assert_eq!(article.id, "1");
        assert_eq!(article.slug.as_deref(), Some("psych-k-basics"));
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let backend = MemoryBackend::new();
        seed(&backend);
        let resolver = SlugResolver::new(&backend);
        assert!(resolver.resolve("missing").await.unwrap_err().is_not_found());
        // unpublished articles are never resolved
        assert!(resolver.resolve("draft-post").await.unwrap_err().is_not_found());
        assert!(resolver.resolve("").await.unwrap_err().is_not_found());
    }
}
