//! Public pages: the blog, articles, the facilitator profile and newsletter sign-up

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{notice_url, ApiError, AppState};
use crate::admin::facilitator;
use crate::content::{render_article, BlogListing, ListingFilter, SlugResolver};
use crate::error::SiteError;
use crate::newsletter::{self, SubscribeForm};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/blog") }))
        .route("/blog", get(blog_index))
        .route("/blog/category/:slug", get(blog_category))
        .route("/blog/:slug", get(blog_article))
        .route("/facilitator", get(facilitator_profile))
        .route("/api/newsletter", post(subscribe))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlogQuery {
    category: Option<String>,
    q: Option<String>,
    notice: Option<String>,
}

async fn blog_index(State(state): State<Arc<AppState>>, Query(query): Query<BlogQuery>) -> Response {
    let result = async {
        let listing = BlogListing::load(state.backend.store.as_ref()).await?;
        let categories = listing.categories();
        let search = query.q.unwrap_or_default();
        let category = query
            .category
            .filter(|c| !c.is_empty())
            .and_then(|name| categories.iter().find(|c| c.name == name).cloned());
        let filter = ListingFilter {
            category: category.as_ref().map(|c| c.name.clone()),
            search: Some(search.trim().to_string()).filter(|s| !s.is_empty()),
        };
        let articles = listing.filter(&filter);
        state
            .templates
            .blog_index(
                &articles,
                &categories,
                category.as_ref(),
                &search,
                query.notice.as_deref(),
            )
    }
    .await;
    state.page(result)
}

async fn blog_category(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    let result = async {
        let listing = BlogListing::load(state.backend.store.as_ref()).await?;
        let category = listing
            .category_by_slug(&slug)
            .ok_or_else(|| SiteError::not_found("Category"))?;
        let filter = ListingFilter {
            category: Some(category.name.clone()),
            search: None,
        };
        let articles = listing.filter(&filter);
        state
            .templates
            .blog_index(&articles, &listing.categories(), Some(&category), "", None)
    }
    .await;
    state.page(result)
}

async fn blog_article(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    let result = async {
        let article = SlugResolver::new(state.backend.store.as_ref())
            .resolve(&slug)
            .await?;
        let rendered = render_article(&article);
        state.templates.article_page(&article, &rendered)
    }
    .await;
    state.page(result)
}

async fn facilitator_profile(State(state): State<Arc<AppState>>) -> Response {
    let result = async {
        let profile = facilitator::fetch(state.backend.store.as_ref()).await?;
        state.templates.facilitator_page(profile.as_ref())
    }
    .await;
    state.page(result)
}

/// Accepts JSON from scripts and a plain form post from the footer
async fn subscribe(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        let form = match Json::<SubscribeForm>::from_request(request, &state).await {
            Ok(Json(form)) => form,
            Err(rejection) => return rejection.into_response(),
        };
        return match newsletter::subscribe(state.backend.store.as_ref(), &form.email).await {
            Ok(_) => (StatusCode::CREATED, Json(json!({ "success": true }))).into_response(),
            Err(e) => ApiError(e).into_response(),
        };
    }

    let form = match Form::<SubscribeForm>::from_request(request, &state).await {
        Ok(Form(form)) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let result = newsletter::subscribe(state.backend.store.as_ref(), &form.email).await;
    if let Err(e) = &result {
        tracing::warn!("Newsletter sign-up rejected: {}", e);
    }
    Redirect::to(&notice_url("/blog", newsletter::outcome_notice(&result))).into_response()
}
