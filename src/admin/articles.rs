//! Article editor: list, load, save and delete articles

use chrono::Utc;
use serde_json::json;

use crate::backend::{rows, Direction, Query, Row, Store, Table};
use crate::backend::rows::FromRow;
use crate::content::{is_url_safe, Article, ArticleDraft};
use crate::error::{Result, SiteError};

pub struct ArticleEditor<'a> {
    store: &'a dyn Store,
}

impl<'a> ArticleEditor<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Every article, drafts included, newest first
    pub async fn list(&self) -> Result<Vec<Article>> {
        let query = Query::new().order_by("date", Direction::Descending);
        rows::fetch(self.store, Table::Articles, &query).await
    }

    pub async fn get(&self, id: &str) -> Result<Article> {
        rows::fetch_one(self.store, Table::Articles, &by_id(id))
            .await?
            .ok_or_else(|| SiteError::not_found("Article"))
    }

    /// Create (no id) or update an article from a draft
    pub async fn save(&self, id: Option<&str>, draft: &ArticleDraft) -> Result<Article> {
        draft.validate()?;
        let slug = draft.effective_slug();
        if !is_url_safe(&slug) {
            return Err(SiteError::validation(
                "slug",
                "Slug may only contain lowercase letters, numbers, hyphens and underscores",
            ));
        }
        self.check_slug_unused(&slug, id).await?;

        let now = Utc::now();
        let mut fields = rows::article_fields(draft, now);
        let row = match id {
            None => {
                fields.insert("date".to_string(), json!(now.to_rfc3339()));
                fields.insert("created_at".to_string(), json!(now.to_rfc3339()));
                let row = self.store.insert(Table::Articles, fields).await?;
                tracing::info!("Created article \"{}\"", draft.title.trim());
                row
            }
            Some(id) => {
                let row = first(self.store.update(Table::Articles, &by_id(id), fields).await?)?;
                tracing::info!("Updated article {}", id);
                row
            }
        };
        Article::from_row(row)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = self.store.delete(Table::Articles, &by_id(id)).await?;
        if removed == 0 {
            return Err(SiteError::not_found("Article"));
        }
        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    async fn check_slug_unused(&self, slug: &str, id: Option<&str>) -> Result<()> {
        let query = Query::new().eq("slug", slug);
        let taken = self
            .store
            .select(Table::Articles, &query)
            .await?
            .iter()
            .any(|row| row_id(row).as_deref() != id);
        if taken {
            return Err(SiteError::validation(
                "slug",
                "Another article already uses this slug",
            ));
        }
        Ok(())
    }
}

fn by_id(id: &str) -> Query {
    Query::new().eq("id", id)
}

fn row_id(row: &Row) -> Option<String> {
    match row.get("id")? {
        serde_json::Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

fn first(rows: Vec<Row>) -> Result<Row> {
    rows.into_iter()
        .next()
        .ok_or_else(|| SiteError::not_found("Article"))
}
