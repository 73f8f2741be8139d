//! Managed backend collaborators
//!
//! The site owns no persistence of its own. Authentication, tables, object
//! storage and outbound mail are hosted services reached through the traits
//! below. [`rest::RestBackend`] speaks the hosted platform's REST API,
//! [`memory::MemoryBackend`] keeps everything in process for tests and
//! offline preview.

pub mod mailjet;
pub mod memory;
pub mod rest;
pub mod rows;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{Session, User};
use crate::config::SiteConfig;
use crate::error::Result;

/// A loosely typed row as returned by the store
pub type Row = serde_json::Map<String, Value>;

/// Tables consumed by the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Admins,
    Articles,
    Facilitator,
    AppointmentRequests,
    NewsletterSubscriptions,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Admins => "admins",
            Table::Articles => "blog_posts",
            Table::Facilitator => "facilitator",
            Table::AppointmentRequests => "appointment_requests",
            Table::NewsletterSubscriptions => "newsletter_subscriptions",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, ordering and limit for a table operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every filter
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
    }
}

/// Table-scoped access to the managed relational store
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>>;

    /// Count matching rows without fetching them
    async fn count(&self, table: Table, query: &Query) -> Result<u64>;

    /// Insert a row, returning it with server-side defaults filled in
    async fn insert(&self, table: Table, row: Row) -> Result<Row>;

    /// Apply a patch to matching rows, returning the updated rows
    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>>;

    /// Delete matching rows, returning how many were removed
    async fn delete(&self, table: Table, query: &Query) -> Result<u64>;
}

/// The managed authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// The user an access token belongs to, `None` if the token is not valid
    async fn user(&self, access_token: &str) -> Result<Option<User>>;
}

/// Managed object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload an object and return its public URL
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()>;
}

/// An email address with display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Transactional email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// The set of collaborators the site runs against
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
}

impl Backend {
    /// Build from configuration
    ///
    /// An empty backend URL selects the in-memory backend. Without mail
    /// credentials notifications are logged instead of sent.
    pub fn from_config(config: &SiteConfig) -> Self {
        let mailer: Arc<dyn Mailer> = match mailjet::MailjetMailer::from_config(&config.mail) {
            Some(mailer) => Arc::new(mailer),
            None => {
                tracing::warn!("Mail credentials are not configured, notifications will not be emailed");
                Arc::new(mailjet::DisabledMailer)
            }
        };

        if config.backend.url.trim().is_empty() {
            tracing::warn!("No backend URL configured, using the in-memory backend");
            return Self::memory(Arc::new(memory::MemoryBackend::new()), mailer);
        }

        let rest = Arc::new(rest::RestBackend::new(&config.backend));
        Self {
            auth: rest.clone(),
            store: rest.clone(),
            storage: rest,
            mailer,
        }
    }

    pub fn memory(backend: Arc<memory::MemoryBackend>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            auth: backend.clone(),
            store: backend.clone(),
            storage: backend,
            mailer,
        }
    }
}
