//! HTTP server: public blog pages, the notification function and the admin panel

mod admin;
mod functions;
mod public;

use anyhow::Result;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json, Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::SessionState;
use crate::backend::Backend;
use crate::config::SiteConfig;
use crate::error::SiteError;
use crate::templates::TemplateRenderer;
use crate::Site;

/// Cookie holding the admin access token
pub const SESSION_COOKIE: &str = "submind_session";

/// State shared by every handler
pub struct AppState {
    pub config: SiteConfig,
    pub backend: Backend,
    pub sessions: SessionState,
    pub templates: TemplateRenderer,
}

impl AppState {
    pub fn new(config: SiteConfig, backend: Backend) -> Result<Self> {
        let sessions = SessionState::new(backend.auth.clone(), backend.store.clone());
        let templates = TemplateRenderer::new(&config)?;
        Ok(Self {
            config,
            backend,
            sessions,
            templates,
        })
    }

    /// Turn a page result into a response, rendering the error page on failure
    fn page(&self, result: Result<String>) -> Response {
        match result {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                let status = e
                    .downcast_ref::<SiteError>()
                    .map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for);
                let message = match e.downcast_ref::<SiteError>() {
                    Some(err @ SiteError::NotFound { .. }) => err.to_string(),
                    _ => "Something went wrong".to_string(),
                };
                if status.is_server_error() {
                    tracing::error!("Page failed: {:#}", e);
                } else {
                    tracing::debug!("Page failed: {}", e);
                }
                match self.templates.error_page(status.as_u16(), &message) {
                    Ok(html) => (status, Html(html)).into_response(),
                    Err(e) => {
                        tracing::error!("Failed to render error page: {}", e);
                        (status, message).into_response()
                    }
                }
            }
        }
    }
}

/// HTTP status for an error
pub fn status_for(err: &SiteError) -> StatusCode {
    match err {
        SiteError::Validation { .. } => StatusCode::BAD_REQUEST,
        SiteError::NotFound { .. } => StatusCode::NOT_FOUND,
        SiteError::Authorization { .. } => StatusCode::FORBIDDEN,
        SiteError::Remote { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response for API routes
#[derive(Debug)]
pub struct ApiError(pub SiteError);

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = match &self.0 {
            SiteError::Validation { field, message } => {
                json!({ "error": message, "field": field })
            }
            SiteError::Remote { message, .. } => {
                tracing::error!("{}", self.0);
                json!({ "error": message })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Access token from the `Authorization` header or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
    })
}

/// A redirect target carrying a notice for the login page
pub fn notice_url(to: &str, notice: &str) -> String {
    format!(
        "{}?notice={}",
        to,
        utf8_percent_encode(notice, NON_ALPHANUMERIC)
    )
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(functions::routes())
        .merge(admin::routes(&state.config))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> Response {
    state.page(Err(SiteError::not_found("Page").into()))
}

/// Start the server and run until Ctrl+C
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(site.config.clone(), site.backend.clone())?);
    state.sessions.init().await;

    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if !site.config.has_remote_backend() {
        println!("Using the in-memory backend. Data is lost on exit.");
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sessions.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}
