//! Transactional email through the Mailjet send API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Email, Mailbox, Mailer};
use crate::config::MailConfig;
use crate::error::{Result, Service, SiteError};

pub const DEFAULT_API_URL: &str = "https://api.mailjet.com";

#[derive(Debug, Clone)]
pub struct MailjetMailer {
    client: Client,
    api_url: String,
    api_key: String,
    secret_key: String,
}

impl MailjetMailer {
    /// `None` when the API credentials are not configured
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        if config.api_key.is_empty() || config.secret_key.is_empty() {
            return None;
        }
        let api_url = if config.api_url.is_empty() {
            DEFAULT_API_URL
        } else {
            config.api_url.as_str()
        };
        Some(Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

fn mailbox(mailbox: &Mailbox) -> Value {
    json!({ "Email": mailbox.email, "Name": mailbox.name })
}

/// The v3.1 send payload for one message
pub fn payload(email: &Email) -> Value {
    json!({
        "Messages": [{
            "From": mailbox(&email.from),
            "To": email.to.iter().map(mailbox).collect::<Vec<_>>(),
            "Subject": email.subject,
            "TextPart": email.text,
            "HTMLPart": email.html,
        }]
    })
}

#[async_trait]
impl Mailer for MailjetMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/v3.1/send", self.api_url))
            .basic_auth(&self.api_key, Some(&self.secret_key))
            .json(&payload(email))
            .send()
            .await
            .map_err(|e| SiteError::remote(Service::Mail, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SiteError::remote(
                Service::Mail,
                format!("send failed ({}): {}", status.as_u16(), body),
            ));
        }
        tracing::info!("Sent \"{}\" to {} recipient(s)", email.subject, email.to.len());
        Ok(())
    }
}

/// Used when mail is not configured: logs the message and drops it
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        tracing::warn!("Mail is disabled, dropping \"{}\"", email.subject);
        Ok(())
    }
}
