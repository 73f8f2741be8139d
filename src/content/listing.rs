//! Public blog listing

use serde::Serialize;

use super::Article;
use crate::backend::{rows, Direction, Query, Store, Table};
use crate::error::Result;

/// Filters for the blog index
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Exact category name
    pub category: Option<String>,
    /// Case-insensitive search term
    pub search: Option<String>,
}

/// A category with its URL slug and article count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

impl Category {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slug: slug::slugify(name),
            count: 0,
        }
    }

    pub fn path(&self) -> String {
        format!("/blog/category/{}", self.slug)
    }
}

/// Published articles, newest first
#[derive(Debug, Clone)]
pub struct BlogListing {
    articles: Vec<Article>,
}

impl BlogListing {
    pub async fn load(store: &dyn Store) -> Result<Self> {
        let query = Query::new()
            .eq("published", true)
            .order_by("date", Direction::Descending);
        let mut articles: Vec<Article> = rows::fetch(store, Table::Articles, &query).await?;
        for article in &mut articles {
            article.slug = Some(article.canonical_slug());
        }
        tracing::debug!("Loaded {} published articles", articles.len());
        Ok(Self { articles })
    }

    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Vec::new();
        for article in &self.articles {
            match categories.iter_mut().find(|c| c.name == article.category) {
                Some(category) => category.count += 1,
                None => {
                    let mut category = Category::new(&article.category);
                    category.count = 1;
                    categories.push(category);
                }
            }
        }
        categories
    }

    /// Find a category by its URL slug
    pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.categories().into_iter().find(|c| c.slug == slug)
    }

    pub fn filter(&self, filter: &ListingFilter) -> Vec<&Article> {
        self.articles
            .iter()
            .filter(|article| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |term| article.matches_search(term))
            })
            .filter(|article| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |category| article.category == category)
            })
            .collect()
    }
}
