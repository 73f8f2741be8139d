//! The facilitator profile singleton

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::backend::rows::{self, FromRow};
use crate::backend::{Query, Store, Table};
use crate::error::{Result, SiteError};
use crate::helpers::require;
use crate::records::Facilitator;

/// The profile bio, generated from the facilitator's name
pub fn generate_bio(name: &str) -> String {
    format!(
        "{name} is a certified PSYCH-K® facilitator dedicated to helping individuals \
         transform their lives through subconscious reprogramming. With extensive training \
         and a passion for personal growth, {name} guides clients to identify and change \
         limiting beliefs that may be holding them back from reaching their full potential.",
        name = name
    )
}

/// Fields the admin edits
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacilitatorDraft {
    pub name: String,
    pub image_url: Option<String>,
}

/// The current profile, if one was ever saved
pub async fn fetch(store: &dyn Store) -> Result<Option<Facilitator>> {
    rows::fetch_one(store, Table::Facilitator, &Query::new().limit(1)).await
}

/// Save the profile, updating the existing record or creating the first one
pub async fn save(store: &dyn Store, draft: &FacilitatorDraft) -> Result<Facilitator> {
    require("name", &draft.name, "Name is required")?;
    let name = draft.name.trim();
    let image_url = draft
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    let fields = rows::encode(json!({
        "name": name,
        "bio": generate_bio(name),
        "image_url": image_url,
        "updated_at": Utc::now().to_rfc3339(),
    }));

    let row = match fetch(store).await? {
        Some(existing) => store
            .update(Table::Facilitator, &Query::new().eq("id", existing.id.as_str()), fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SiteError::not_found("Facilitator"))?,
        None => store.insert(Table::Facilitator, fields).await?,
    };
    tracing::info!("Saved facilitator profile for {}", name);
    Facilitator::from_row(row)
}
