//! The `send-appointment` function called by the public contact form

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::AppState;
use crate::error::SiteError;
use crate::notify::{AppointmentRequest, Notifier, SUCCESS};

pub const SEND_APPOINTMENT_PATH: &str = "/functions/v1/send-appointment";

/// Open to any origin, as the contact form may be served from elsewhere
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            SEND_APPOINTMENT_PATH,
            post(send_appointment).options(|| async { StatusCode::OK }),
        )
        .layer(cors())
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn send_appointment(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: AppointmentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Unreadable appointment request: {}", e);
            return error(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let notifier = Notifier::new(
        state.backend.store.as_ref(),
        state.backend.mailer.as_ref(),
        &state.config.mail,
    );
    match notifier.submit(&request).await {
        Ok(_) => Json(json!({ "success": true, "message": SUCCESS })).into_response(),
        Err(SiteError::Validation { message, .. }) => error(StatusCode::BAD_REQUEST, &message),
        Err(e) => {
            tracing::error!("Error in send-appointment: {}", e);
            let message = match &e {
                SiteError::Remote { message, .. } => message.clone(),
                other => other.to_string(),
            };
            error(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
    }
}
