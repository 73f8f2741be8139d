//! Dashboard statistics and appointment handling

use serde::Serialize;
use serde_json::json;

use crate::backend::rows::{self, FromRow};
use crate::backend::{Direction, Query, Store, Table};
use crate::error::{Result, SiteError};
use crate::records::{Appointment, AppointmentStatus, NewsletterSubscription};

/// How many recent appointments and subscriptions the dashboard shows
pub const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_articles: u64,
    pub published_articles: u64,
    pub has_facilitator: bool,
    pub new_appointments: u64,
    pub recent_appointments: Vec<Appointment>,
    pub recent_subscriptions: Vec<NewsletterSubscription>,
}

impl DashboardStats {
    pub async fn load(store: &dyn Store) -> Result<Self> {
        let newest = Query::new()
            .order_by("created_at", Direction::Descending)
            .limit(RECENT_LIMIT);
        let published = Query::new().eq("published", true);
        let unhandled = Query::new().eq("status", AppointmentStatus::New.as_str());
        let any = Query::new().limit(1);
        let all = Query::new();

        let (
            total_articles,
            published_articles,
            facilitators,
            new_appointments,
            recent_appointments,
            recent_subscriptions,
        ) = tokio::try_join!(
            store.count(Table::Articles, &all),
            store.count(Table::Articles, &published),
            store.count(Table::Facilitator, &any),
            store.count(Table::AppointmentRequests, &unhandled),
            rows::fetch::<Appointment>(store, Table::AppointmentRequests, &newest),
            rows::fetch::<NewsletterSubscription>(store, Table::NewsletterSubscriptions, &newest),
        )?;

        Ok(Self {
            total_articles,
            published_articles,
            has_facilitator: facilitators > 0,
            new_appointments,
            recent_appointments,
            recent_subscriptions,
        })
    }

    pub fn draft_articles(&self) -> u64 {
        self.total_articles.saturating_sub(self.published_articles)
    }
}

/// Move an appointment to a new status if the transition is allowed
pub async fn update_appointment_status(
    store: &dyn Store,
    id: &str,
    next: AppointmentStatus,
) -> Result<Appointment> {
    let query = Query::new().eq("id", id);
    let current: Appointment = rows::fetch_one(store, Table::AppointmentRequests, &query)
        .await?
        .ok_or_else(|| SiteError::not_found("Appointment"))?;
    let next = current.status.transition(next)?;

    let patch = rows::encode(json!({ "status": next.as_str() }));
    let row = store
        .update(Table::AppointmentRequests, &query, patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| SiteError::not_found("Appointment"))?;
    tracing::info!("Appointment {} moved from {} to {}", id, current.status, next);
    Appointment::from_row(row)
}
