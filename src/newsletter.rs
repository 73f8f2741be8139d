//! Newsletter subscriptions from the public site

use serde::Deserialize;
use serde_json::json;

use crate::backend::rows::{self, FromRow};
use crate::backend::{Store, Table};
use crate::error::{Result, SiteError};
use crate::helpers::is_valid_email;
use crate::records::NewsletterSubscription;

pub const SUBSCRIBED: &str = "Thank you for subscribing to our newsletter!";
pub const SUBSCRIBE_FAILED: &str = "Failed to subscribe. Please try again later.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeForm {
    pub email: String,
}

/// Store a subscription. Invalid addresses never reach the store.
pub async fn subscribe(store: &dyn Store, email: &str) -> Result<NewsletterSubscription> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(SiteError::validation(
            "email",
            "Please enter a valid email address",
        ));
    }
    let row = store
        .insert(
            Table::NewsletterSubscriptions,
            rows::encode(json!({ "email": email })),
        )
        .await?;
    tracing::info!("New newsletter subscription");
    NewsletterSubscription::from_row(row)
}

/// The message shown to a visitor after a sign-up attempt
pub fn outcome_notice(result: &Result<NewsletterSubscription>) -> &str {
    match result {
        Ok(_) => SUBSCRIBED,
        Err(SiteError::Validation { message, .. }) => message,
        Err(_) => SUBSCRIBE_FAILED,
    }
}
