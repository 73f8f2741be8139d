//! Appointment-request notifications
//!
//! Validates a request from the public contact form, stores it for the admin
//! dashboard and emails the facilitator. Delivery is best effort: once the
//! request is stored the submission counts as successful.

use serde::Deserialize;
use serde_json::json;

use crate::backend::rows::{self, FromRow};
use crate::backend::{Email, Mailbox, Mailer, Store, Table};
use crate::config::MailConfig;
use crate::error::{Result, Service, SiteError};
use crate::helpers::{html_escape, is_valid_email, text_to_html};
use crate::records::{Appointment, AppointmentStatus};

pub const MISSING_FIELDS: &str = "Missing required fields";
pub const INVALID_EMAIL: &str = "Invalid email address";
pub const SAVE_FAILED: &str = "Failed to save appointment request";
pub const SUCCESS: &str = "Appointment request sent successfully";

/// The JSON body posted by the contact form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub session_type: Option<String>,
    pub message: Option<String>,
}

/// Human-readable session type
pub fn session_label(session_type: &str) -> &'static str {
    if session_type == "personal" {
        "Personal Session"
    } else {
        "Executive Session"
    }
}

/// A request with every field present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub session_type: &'static str,
    pub message: String,
}

impl AppointmentRequest {
    pub fn validate(&self) -> Result<ValidRequest> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let (Some(name), Some(email), Some(phone), Some(session_type), Some(message)) = (
            field(&self.name),
            field(&self.email),
            field(&self.phone),
            field(&self.session_type),
            field(&self.message),
        ) else {
            return Err(SiteError::validation("request", MISSING_FIELDS));
        };
        if !is_valid_email(&email) {
            return Err(SiteError::validation("email", INVALID_EMAIL));
        }
        Ok(ValidRequest {
            name,
            email,
            phone,
            session_type: session_label(&session_type),
            message,
        })
    }
}

/// The notification sent to the facilitator
pub fn notification_email(request: &ValidRequest, config: &MailConfig) -> Email {
    let text = format!(
        "Name: {}\nEmail: {}\nPhone: {}\nSession Type: {}\n\nMessage:\n{}\n",
        request.name, request.email, request.phone, request.session_type, request.message
    );
    let html = format!(
        "<h3>New Session Request</h3>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Phone:</strong> {}</p>\n\
         <p><strong>Session Type:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>\n",
        html_escape(&request.name),
        html_escape(&request.email),
        html_escape(&request.phone),
        request.session_type,
        text_to_html(&request.message)
    );
    Email {
        from: Mailbox {
            email: config.sender_email.clone(),
            name: config.sender_name.clone(),
        },
        to: vec![Mailbox {
            email: config.recipient_email.clone(),
            name: config.recipient_name.clone(),
        }],
        subject: format!("New {} Request from {}", request.session_type, request.name),
        text,
        html,
    }
}

pub struct Notifier<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    config: &'a MailConfig,
}

impl<'a> Notifier<'a> {
    pub fn new(store: &'a dyn Store, mailer: &'a dyn Mailer, config: &'a MailConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Validate, persist, then notify
    pub async fn submit(&self, request: &AppointmentRequest) -> Result<Appointment> {
        let request = request.validate()?;

        let row = rows::encode(json!({
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "session_type": request.session_type,
            "message": request.message,
            "status": AppointmentStatus::New.as_str(),
        }));
        let row = self
            .store
            .insert(Table::AppointmentRequests, row)
            .await
            .map_err(|e| {
                tracing::error!("Error storing appointment request: {}", e);
                SiteError::remote(Service::Store, SAVE_FAILED)
            })?;
        let appointment = Appointment::from_row(row)?;
        tracing::info!(
            "Stored {} request {} from {}",
            request.session_type,
            appointment.id,
            request.name
        );

        self.deliver(&request).await;
        Ok(appointment)
    }

    async fn deliver(&self, request: &ValidRequest) {
        if self.config.recipient_email.trim().is_empty() {
            tracing::warn!("No notification recipient configured, skipping email");
            return;
        }
        let email = notification_email(request, self.config);
        match self.mailer.send(&email).await {
            Ok(()) => tracing::debug!("Notification sent for {}", request.name),
            Err(e) => tracing::error!(
                "Email delivery failed but the appointment was saved: {}",
                e
            ),
        }
    }
}
