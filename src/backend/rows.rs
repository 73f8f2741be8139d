//! Row adapter: loosely typed store rows to typed records and back
//!
//! Malformed rows are rejected here so the rest of the crate only ever sees
//! well-formed records.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::{Query, Row, Store, Table};
use crate::content::{Article, ArticleDraft, ImageRef};
use crate::error::{Result, Service, SiteError};
use crate::records::{AdminRecord, Appointment, Facilitator, NewsletterSubscription};

/// Conversion from a raw row
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;
}

/// Select rows and convert them, skipping rows that fail to convert
pub async fn fetch<T: FromRow>(store: &dyn Store, table: Table, query: &Query) -> Result<Vec<T>> {
    let rows = store.select(table, query).await?;
    let total = rows.len();
    let records: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match T::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed {} row: {}", table, e);
                None
            }
        })
        .collect();
    if records.len() < total {
        tracing::warn!("{} of {} {} rows were malformed", total - records.len(), total, table);
    }
    Ok(records)
}

/// Select the first matching row. A malformed row is an error here.
pub async fn fetch_one<T: FromRow>(
    store: &dyn Store,
    table: Table,
    query: &Query,
) -> Result<Option<T>> {
    let query = query.clone().limit(1);
    match store.select(table, &query).await?.into_iter().next() {
        Some(row) => T::from_row(row).map(Some),
        None => Ok(None),
    }
}

/// Deserialize a row with serde, reporting failures as store errors
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| SiteError::remote(Service::Store, format!("malformed row: {}", e)))
}

/// Turn a `json!` object into a row
pub fn encode(value: Value) -> Row {
    match value {
        Value::Object(row) => row,
        _ => Row::new(),
    }
}

/// Accept string or numeric primary keys
pub fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

#[derive(Debug, Deserialize)]
struct ArticleRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    title: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    published: bool,
    image_url: Option<String>,
    image_alt: Option<String>,
    image_url_2: Option<String>,
    image_alt_2: Option<String>,
    image_url_3: Option<String>,
    image_alt_3: Option<String>,
    slug: Option<String>,
    date: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl FromRow for Article {
    fn from_row(row: Row) -> Result<Self> {
        let row: ArticleRow = decode(row)?;
        if row.title.trim().is_empty() {
            return Err(SiteError::remote(
                Service::Store,
                format!("article {} has an empty title", row.id),
            ));
        }
        let date = row.date.or(row.created_at).ok_or_else(|| {
            SiteError::remote(Service::Store, format!("article {} has no date", row.id))
        })?;
        let created_at = row.created_at.unwrap_or(date);

        Ok(Article {
            id: row.id,
            title: row.title,
            excerpt: row.excerpt.unwrap_or_default(),
            content: row.content.unwrap_or_default(),
            author: row.author.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            published: row.published,
            image: ImageRef::from_parts(row.image_url, row.image_alt),
            secondary_images: [
                ImageRef::from_parts(row.image_url_2, row.image_alt_2),
                ImageRef::from_parts(row.image_url_3, row.image_alt_3),
            ],
            slug: row.slug.filter(|s| !s.is_empty()),
            date,
            created_at,
            updated_at: row.updated_at.unwrap_or(created_at),
        })
    }
}

fn image_columns(image: Option<&ImageRef>) -> (Value, Value) {
    match image {
        Some(image) => (
            json!(image.url),
            image.alt.as_ref().map_or(Value::Null, |alt| json!(alt)),
        ),
        None => (Value::Null, Value::Null),
    }
}

/// Columns written when an article draft is saved
pub fn article_fields(draft: &ArticleDraft, now: DateTime<Utc>) -> Row {
    let (image_url, image_alt) = image_columns(draft.image.as_ref());
    let (image_url_2, image_alt_2) = image_columns(draft.secondary_images[0].as_ref());
    let (image_url_3, image_alt_3) = image_columns(draft.secondary_images[1].as_ref());
    encode(json!({
        "title": draft.title.trim(),
        "author": draft.author.trim(),
        "category": draft.category.trim(),
        "excerpt": draft.excerpt.trim(),
        "content": draft.content,
        "published": draft.published,
        "slug": draft.effective_slug(),
        "image_url": image_url,
        "image_alt": image_alt,
        "image_url_2": image_url_2,
        "image_alt_2": image_alt_2,
        "image_url_3": image_url_3,
        "image_alt_3": image_alt_3,
        "updated_at": now.to_rfc3339(),
    }))
}

impl FromRow for Facilitator {
    fn from_row(row: Row) -> Result<Self> {
        decode(row)
    }
}

impl FromRow for Appointment {
    fn from_row(row: Row) -> Result<Self> {
        decode(row)
    }
}

impl FromRow for NewsletterSubscription {
    fn from_row(row: Row) -> Result<Self> {
        decode(row)
    }
}

impl FromRow for AdminRecord {
    fn from_row(row: Row) -> Result<Self> {
        decode(row)
    }
}
