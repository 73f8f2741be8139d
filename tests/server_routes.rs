use reqwest::{header, redirect::Policy, Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use submind::backend::memory::{MemoryBackend, MemoryMailer};
use submind::backend::{AuthProvider, Backend, Table};
use submind::config::SiteConfig;
use submind::newsletter;
use submind::server::{notice_url, router, AppState};

struct TestSite {
    url: String,
    backend: Arc<MemoryBackend>,
    mailer: Arc<MemoryMailer>,
    client: Client,
}

impl TestSite {
    async fn start() -> Self {
        let mut config = SiteConfig::default();
        config.mail.recipient_email = "owner@example.com".into();

        let backend = Arc::new(MemoryBackend::new());
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(config, Backend::memory(backend.clone(), mailer.clone())).unwrap();
        let app = router(Arc::new(state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder().redirect(Policy::none()).build().unwrap();
        Self {
            url: format!("http://{}", addr),
            backend,
            mailer,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Sign in a fresh account and return its access token
    async fn token(&self, email: &str, admin: bool) -> String {
        let user = self.backend.add_account(email, "secret");
        if admin {
            self.backend.grant_admin(&user);
        }
        self.backend
            .sign_in(email, "secret")
            .await
            .unwrap()
            .access_token
    }

    fn seed_article(&self, title: &str, published: bool) {
        self.backend.seed(
            Table::Articles,
            json!({
                "title": title,
                "excerpt": "A short excerpt",
                "content": "<p>First paragraph</p>\n\n<p>Second paragraph</p>",
                "author": "N.L. Bhattarai",
                "category": "Beliefs",
                "published": published,
                "image_url": "https://cdn.example.com/hero.png",
                "image_alt": "Hero"
            }),
        );
    }
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn appointment() -> Value {
    json!({
        "name": "Ada",
        "email": "ada@example.com",
        "phone": "555-0100",
        "sessionType": "personal",
        "message": "I would like a session"
    })
}

#[tokio::test]
async fn appointment_with_empty_phone_is_rejected() {
    let site = TestSite::start().await;
    let mut body = appointment();
    body["phone"] = json!("");

    let response = site
        .client
        .post(site.url("/functions/v1/send-appointment"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");
    assert!(site.backend.rows(Table::AppointmentRequests).is_empty());
    assert!(site.mailer.sent().is_empty());
}

#[tokio::test]
async fn appointment_is_stored_and_emailed() {
    let site = TestSite::start().await;

    let response = site
        .client
        .post(site.url("/functions/v1/send-appointment"))
        .header(header::ORIGIN, "https://submindmastery.com")
        .json(&appointment())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let rows = site.backend.rows(Table::AppointmentRequests);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["session_type"], "Personal Session");
    assert_eq!(rows[0]["status"], "new");

    let sent = site.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New Personal Session Request from Ada");
}

#[tokio::test]
async fn appointment_with_unreadable_body_is_rejected() {
    let site = TestSite::start().await;
    let response = site
        .client
        .post(site.url("/functions/v1/send-appointment"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn appointment_preflight_allows_any_origin() {
    let site = TestSite::start().await;
    let response = site
        .client
        .request(Method::OPTIONS, site.url("/functions/v1/send-appointment"))
        .header(header::ORIGIN, "https://submindmastery.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "apikey, content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    for name in ["authorization", "x-client-info", "apikey", "content-type"] {
        assert!(allowed.contains(name), "missing {} in {}", name, allowed);
    }
}

#[tokio::test]
async fn dashboard_without_session_redirects_to_login() {
    let site = TestSite::start().await;
    let response = site
        .client
        .get(site.url("/admin/dashboard"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin?notice=Please%20login%20to%20access%20this%20page"
    );
}

#[tokio::test]
async fn dashboard_for_non_admin_redirects_with_notice() {
    let site = TestSite::start().await;
    let token = site.token("reader@example.com", false).await;

    let response = site
        .client
        .get(site.url("/admin/dashboard"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin?notice=You%20do%20not%20have%20admin%20privileges"
    );
}

#[tokio::test]
async fn dashboard_for_admin_is_rendered() {
    let site = TestSite::start().await;
    site.seed_article("Changing Beliefs", false);
    let token = site.token("admin@example.com", true).await;

    let response = site
        .client
        .get(site.url("/admin/dashboard"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Signed in as admin@example.com"));
    assert!(html.contains("Changing Beliefs"));
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let site = TestSite::start().await;
    let user = site.backend.add_account("admin@example.com", "secret");
    site.backend.grant_admin(&user);

    let response = site
        .client
        .post(site.url("/admin/login"))
        .form(&[("email", "admin@example.com"), ("password", "secret")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("submind_session="));

    let session = cookie.split(';').next().unwrap().to_string();
    let response = site
        .client
        .get(site.url("/admin/dashboard"))
        .header(header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_as_non_admin_is_refused() {
    let site = TestSite::start().await;
    site.backend.add_account("reader@example.com", "secret");

    let response = site
        .client
        .post(site.url("/admin/login"))
        .form(&[("email", "reader@example.com"), ("password", "secret")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin?notice=You%20do%20not%20have%20admin%20privileges"
    );
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_page_shows_notice() {
    let site = TestSite::start().await;
    let response = site
        .client
        .get(site.url("/admin?notice=Please%20login%20to%20access%20this%20page"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Please login to access this page"));
}

#[tokio::test]
async fn article_is_served_by_derived_slug() {
    let site = TestSite::start().await;
    site.seed_article("Changing Beliefs", true);

    let response = site
        .client
        .get(site.url("/blog/changing-beliefs"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Changing Beliefs"));
    assert!(html.contains("First paragraph"));
    assert!(html.contains("https://cdn.example.com/hero.png"));
}

#[tokio::test]
async fn unknown_and_draft_articles_are_not_found() {
    let site = TestSite::start().await;
    site.seed_article("Unpublished Thoughts", false);

    for path in ["/blog/no-such-post", "/blog/unpublished-thoughts"] {
        let response = site.client.get(site.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }
}

#[tokio::test]
async fn blog_index_lists_published_articles() {
    let site = TestSite::start().await;
    site.seed_article("Changing Beliefs", true);
    site.seed_article("Unpublished Thoughts", false);

    let response = site.client.get(site.url("/blog")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("/blog/changing-beliefs"));
    assert!(!html.contains("Unpublished Thoughts"));

    let response = site
        .client
        .get(site.url("/blog/category/beliefs"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = site
        .client
        .get(site.url("/blog/category/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_redirects_to_blog() {
    let site = TestSite::start().await;
    let response = site.client.get(site.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/blog");
}

#[tokio::test]
async fn admin_api_requires_admin() {
    let site = TestSite::start().await;
    let response = site
        .client
        .get(site.url("/admin/api/articles"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Please login to access this page");
}

#[tokio::test]
async fn admin_api_creates_and_updates_articles() {
    let site = TestSite::start().await;
    let token = site.token("admin@example.com", true).await;

    let response = site
        .client
        .post(site.url("/admin/api/articles"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "New Habits",
            "excerpt": "Why habits stick",
            "content": "<p>Body</p>",
            "author": "N.L. Bhattarai",
            "category": "Habits",
            "published": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["slug"], "new-habits");
    let id = created["id"].as_str().unwrap().to_string();

    // Invalid slugs are refused
    let response = site
        .client
        .put(site.url(&format!("/admin/api/articles/{}", id)))
        .bearer_auth(&token)
        .json(&json!({
            "title": "New Habits",
            "excerpt": "Why habits stick",
            "content": "<p>Body</p>",
            "author": "N.L. Bhattarai",
            "category": "Habits",
            "slug": "Not Safe!"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = site
        .client
        .get(site.url("/blog/new-habits"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = site
        .client
        .delete(site.url(&format!("/admin/api/articles/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(site.backend.rows(Table::Articles).is_empty());
}

#[tokio::test]
async fn admin_api_pastes_sanitized_html() {
    let site = TestSite::start().await;
    let token = site.token("admin@example.com", true).await;

    let response = site
        .client
        .post(site.url("/admin/api/paste"))
        .bearer_auth(&token)
        .json(&json!({
            "content": "Hello world",
            "selection": { "start": 6, "end": 11 },
            "clipboard": { "html": "<b onclick=\"x()\">there</b><script>bad()</script>" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = response.json().await.unwrap();
    let content = outcome["content"].as_str().unwrap();
    assert!(content.starts_with(r#"Hello <b style="font-weight: bold;">there</b>"#));
    assert!(!content.contains("<script"));
    assert!(!content.contains("onclick"));
}

#[tokio::test]
async fn admin_api_moves_appointment_status() {
    let site = TestSite::start().await;
    let token = site.token("admin@example.com", true).await;
    site.backend.seed(
        Table::AppointmentRequests,
        json!({
            "id": "a1", "name": "Ada", "email": "ada@example.com", "phone": "555",
            "session_type": "Personal Session", "message": "Hi", "status": "completed"
        }),
    );

    let response = site
        .client
        .patch(site.url("/admin/api/appointments/a1"))
        .bearer_auth(&token)
        .json(&json!({ "status": "contacted" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        site.backend.rows(Table::AppointmentRequests)[0]["status"],
        "completed"
    );
}

#[tokio::test]
async fn newsletter_subscription() {
    let site = TestSite::start().await;

    let response = site
        .client
        .post(site.url("/api/newsletter"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = site
        .client
        .post(site.url("/api/newsletter"))
        .json(&json!({ "email": "reader@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = site
        .client
        .post(site.url("/api/newsletter"))
        .form(&[("email", "second@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(site.backend.rows(Table::NewsletterSubscriptions).len(), 2);
    assert_eq!(
        location(&response),
        notice_url("/blog", newsletter::SUBSCRIBED)
    );
}

#[tokio::test]
async fn newsletter_form_shows_validation_notice() {
    let site = TestSite::start().await;

    let response = site
        .client
        .post(site.url("/api/newsletter"))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(site.backend.rows(Table::NewsletterSubscriptions).is_empty());

    let target = location(&response);
    assert!(target.starts_with("/blog?notice="));
    let html = site
        .client
        .get(site.url(&target))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(
        r#"<p class="newsletter-notice" role="status">Please enter a valid email address</p>"#
    ));
}

#[tokio::test]
async fn newsletter_form_reports_store_failure() {
    let site = TestSite::start().await;
    site.backend.fail_writes(Table::NewsletterSubscriptions);

    let response = site
        .client
        .post(site.url("/api/newsletter"))
        .form(&[("email", "reader@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        notice_url("/blog", newsletter::SUBSCRIBE_FAILED)
    );
}
