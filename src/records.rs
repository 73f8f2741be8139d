//! Typed records for the tables around the blog: facilitator profile,
//! appointment requests, newsletter subscriptions and admin roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::rows::id_string;
use crate::error::{Result, SiteError};

/// The single facilitator profile shown on the public site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facilitator {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    New,
    Contacted,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::New => "new",
            AppointmentStatus::Contacted => "contacted",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(AppointmentStatus::New),
            "contacted" => Some(AppointmentStatus::Contacted),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled requests are final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (*self, next),
            (New, Contacted) | (New | Contacted, Completed) | (New | Contacted, Cancelled)
        )
    }

    /// Check a transition, failing with a validation error when not allowed
    pub fn transition(&self, next: AppointmentStatus) -> Result<AppointmentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SiteError::validation(
                "status",
                format!(
                    "Cannot change status from {} to {}",
                    self.as_str(),
                    next.as_str()
                ),
            ))
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted appointment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub session_type: String,
    #[serde(default)]
    pub message: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSubscription {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An admin role record. Its existence for an account grants admin access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
