//! Article and editor draft models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slug::derive_slug;
use crate::error::{Result, SiteError};
use crate::helpers::encode_path_segment;

/// An image reference: public URL plus optional alt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

impl ImageRef {
    /// Build from nullable persisted fields. A blank URL means no image.
    pub fn from_parts(url: Option<String>, alt: Option<String>) -> Option<Self> {
        let url = url.filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            alt: alt.filter(|a| !a.trim().is_empty()),
        })
    }

    /// Last path segment of the URL (the object name in storage)
    pub fn object_name(&self) -> Option<&str> {
        object_name(&self.url)
    }
}

/// Last path segment of a public storage URL
pub fn object_name(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|name| !name.is_empty())
}

/// A blog article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    /// Stored markup, sanitized again at render time
    pub content: String,
    pub author: String,
    pub category: String,
    pub published: bool,
    /// Primary image shown above the body
    pub image: Option<ImageRef>,
    /// The two images interleaved into the body
    pub secondary_images: [Option<ImageRef>; 2],
    /// Persisted slug. Older articles predate the column and have none.
    pub slug: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// The persisted slug, or one derived from the title
    pub fn canonical_slug(&self) -> String {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => derive_slug(&self.title),
        }
    }

    /// URL path of the article page
    pub fn path(&self) -> String {
        format!("/blog/{}", encode_path_segment(&self.canonical_slug()))
    }

    /// All present images, primary first
    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.image
            .iter()
            .chain(self.secondary_images.iter().flatten())
    }

    /// Case-insensitive match against title, content, excerpt, category and author
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [
            &self.title,
            &self.content,
            &self.excerpt,
            &self.category,
            &self.author,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// The admin editor's in-memory draft of an article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleDraft {
    pub title: String,
    pub author: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub published: bool,
    /// Leave empty to derive from the title on save
    pub slug: String,
    pub image: Option<ImageRef>,
    pub secondary_images: [Option<ImageRef>; 2],
}

impl ArticleDraft {
    /// Start a draft from an existing article
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            author: article.author.clone(),
            category: article.category.clone(),
            excerpt: article.excerpt.clone(),
            content: article.content.clone(),
            published: article.published,
            slug: article.slug.clone().unwrap_or_default(),
            image: article.image.clone(),
            secondary_images: article.secondary_images.clone(),
        }
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("title", &self.title, "Title is required"),
            ("author", &self.author, "Author is required"),
            ("category", &self.category, "Category is required"),
            ("excerpt", &self.excerpt, "Excerpt is required"),
            ("content", &self.content, "Content is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                return Err(SiteError::validation(field, message));
            }
        }
        Ok(())
    }

    /// The slug to persist: the explicit one, or the title-derived one
    pub fn effective_slug(&self) -> String {
        let slug = self.slug.trim();
        if slug.is_empty() {
            derive_slug(self.title.trim())
        } else {
            slug.to_string()
        }
    }
}
