//! Admin panel routes
//!
//! `/admin` is the login page. Everything else sits behind [`AdminPage`] or
//! [`AdminApi`], which run the session check before the handler.

use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{notice_url, session_token, ApiResult, AppState, SESSION_COOKIE};
use crate::admin::{
    facilitator, update_appointment_status, ArticleEditor, DashboardStats, FacilitatorDraft,
    ImageKind, ImageUpload, ImageUploader,
};
use crate::auth::{Access, AdminSession, LOGIN_PATH};
use crate::config::SiteConfig;
use crate::content::paste::{apply_paste, Clipboard, PasteOutcome, Selection};
use crate::content::{Article, ArticleDraft};
use crate::error::SiteError;
use crate::records::{Appointment, AppointmentStatus, Facilitator};

const DASHBOARD_PATH: &str = "/admin/dashboard";

pub fn routes(config: &SiteConfig) -> Router<Arc<AppState>> {
    // Leave room for the multipart framing around the largest allowed image
    let upload_limit = config.uploads.max_bytes + 64 * 1024;

    Router::new()
        .route(LOGIN_PATH, get(login_page))
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route(DASHBOARD_PATH, get(dashboard))
        .route("/admin/api/articles", get(list_articles).post(create_article))
        .route(
            "/admin/api/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/admin/api/paste", post(paste))
        .route(
            "/admin/api/images",
            post(upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/admin/api/appointments/:id", patch(update_appointment))
        .route(
            "/admin/api/facilitator",
            get(get_facilitator).put(save_facilitator),
        )
}

async fn check(headers: &HeaderMap, state: &AppState) -> Access {
    let token = session_token(headers);
    state.sessions.guard(token.as_deref()).await
}

/// A signed-in admin on an HTML page; others are redirected to the login page
pub struct AdminPage(pub AdminSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminPage {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match check(&parts.headers, state).await {
            Access::Granted(session) => Ok(AdminPage(session)),
            Access::Redirect { to, notice } => {
                Err(Redirect::to(&notice_url(&to, &notice)).into_response())
            }
        }
    }
}

/// A signed-in admin on a JSON route; others get 401 with the login notice
pub struct AdminApi(pub AdminSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminApi {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match check(&parts.headers, state).await {
            Access::Granted(session) => Ok(AdminApi(session)),
            Access::Redirect { to, notice } => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": notice, "redirect": notice_url(&to, &notice) })),
            )
                .into_response()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginQuery {
    notice: Option<String>,
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    // Already signed in as admin
    if let Access::Granted(_) = check(&headers, &state).await {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    state.page(state.templates.login_page(query.notice.as_deref()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    match state.sessions.sign_in(form.email.trim(), &form.password).await {
        Ok(session) => {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, session.access_token
            );
            (
                [(header::SET_COOKIE, cookie)],
                Redirect::to(DASHBOARD_PATH),
            )
                .into_response()
        }
        Err(e) => {
            tracing::info!("Admin login failed: {}", e);
            let notice = match e {
                SiteError::Authorization { message } => message,
                SiteError::Remote { message, .. } => message,
                other => other.to_string(),
            };
            Redirect::to(&notice_url(LOGIN_PATH, &notice)).into_response()
        }
    }
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.sessions.sign_out(&token).await {
            tracing::warn!("Sign out failed: {}", e);
        }
    }
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    ([(header::SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response()
}

async fn dashboard(State(state): State<Arc<AppState>>, AdminPage(admin): AdminPage) -> Response {
    let result = async {
        let store = state.backend.store.as_ref();
        let editor = ArticleEditor::new(store);
        let (stats, articles) = tokio::try_join!(DashboardStats::load(store), editor.list())?;
        let email = admin.session.user.email.clone().unwrap_or_default();
        state.templates.dashboard_page(&email, &stats, &articles)
    }
    .await;
    state.page(result)
}

async fn list_articles(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
) -> ApiResult<Json<Vec<Article>>> {
    let articles = ArticleEditor::new(state.backend.store.as_ref()).list().await?;
    Ok(Json(articles))
}

async fn create_article(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Json(draft): Json<ArticleDraft>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let article = ArticleEditor::new(state.backend.store.as_ref())
        .save(None, &draft)
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn get_article(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Path(id): Path<String>,
) -> ApiResult<Json<Article>> {
    let article = ArticleEditor::new(state.backend.store.as_ref()).get(&id).await?;
    Ok(Json(article))
}

async fn update_article(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Path(id): Path<String>,
    Json(draft): Json<ArticleDraft>,
) -> ApiResult<Json<Article>> {
    let article = ArticleEditor::new(state.backend.store.as_ref())
        .save(Some(&id), &draft)
        .await?;
    Ok(Json(article))
}

async fn delete_article(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    ArticleEditor::new(state.backend.store.as_ref())
        .delete(&id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PasteBody {
    content: String,
    selection: Selection,
    clipboard: Clipboard,
}

async fn paste(_: AdminApi, Json(body): Json<PasteBody>) -> Json<PasteOutcome> {
    Json(apply_paste(&body.content, body.selection, &body.clipboard))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        SiteError::validation("image", format!("Invalid upload: {}", e))
    };

    let mut kind = ImageKind::Article;
    let mut replacing = None;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "kind" => {
                kind = match field.text().await.map_err(invalid)?.trim() {
                    "facilitator" => ImageKind::Facilitator,
                    _ => ImageKind::Article,
                }
            }
            "replacing" => {
                let url = field.text().await.map_err(invalid)?;
                replacing = Some(url).filter(|u| !u.trim().is_empty());
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid)?.to_vec();
                upload = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| SiteError::validation("image", "No image was uploaded"))?;
    let url = ImageUploader::new(state.backend.storage.as_ref(), &state.config.uploads)
        .upload(kind, upload, replacing.as_deref())
        .await?;
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: AppointmentStatus,
}

async fn update_appointment(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Appointment>> {
    let appointment =
        update_appointment_status(state.backend.store.as_ref(), &id, body.status).await?;
    Ok(Json(appointment))
}

async fn get_facilitator(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
) -> ApiResult<Json<Option<Facilitator>>> {
    Ok(Json(facilitator::fetch(state.backend.store.as_ref()).await?))
}

async fn save_facilitator(
    State(state): State<Arc<AppState>>,
    _: AdminApi,
    Json(draft): Json<FacilitatorDraft>,
) -> ApiResult<Json<Facilitator>> {
    Ok(Json(
        facilitator::save(state.backend.store.as_ref(), &draft).await?,
    ))
}
