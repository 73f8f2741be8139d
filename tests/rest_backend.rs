use httpmock::prelude::*;
use httpmock::Method::HEAD;
use serde_json::json;

use submind::backend::mailjet::MailjetMailer;
use submind::backend::rest::RestBackend;
use submind::backend::{
    rows, AuthProvider, Direction, Email, Mailbox, Mailer, ObjectStorage, Query, Store, Table,
};
use submind::config::{BackendConfig, MailConfig};
use submind::content::Article;
use submind::error::SiteError;

fn backend(server: &MockServer) -> RestBackend {
    RestBackend::new(&BackendConfig {
        url: server.base_url(),
        anon_key: "anon-key".into(),
        service_role_key: "service-key".into(),
    })
}

fn article_row(title: &str, slug: Option<&str>) -> serde_json::Value {
    json!({
        "id": 7,
        "title": title,
        "excerpt": "Excerpt",
        "content": "<p>Body</p>",
        "author": "N.L. Bhattarai",
        "category": "Beliefs",
        "published": true,
        "slug": slug,
        "date": "2024-03-05T10:00:00+00:00",
        "created_at": "2024-03-05T10:00:00+00:00"
    })
}

#[tokio::test]
async fn select_sends_filters_and_keys() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/blog_posts")
                .query_param("select", "*")
                .query_param("published", "eq.true")
                .query_param("order", "date.desc")
                .query_param("limit", "5")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer service-key");
            then.status(200)
                .json_body(json!([article_row("Changing Beliefs", Some("changing-beliefs"))]));
        })
        .await;

    let query = Query::new()
        .eq("published", true)
        .order_by("date", Direction::Descending)
        .limit(5);
    let articles: Vec<Article> = rows::fetch(&backend(&server), Table::Articles, &query)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, "7");
    assert_eq!(articles[0].slug.as_deref(), Some("changing-beliefs"));
}

#[tokio::test]
async fn count_reads_content_range() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(HEAD)
                .path("/rest/v1/appointment_requests")
                .query_param("status", "eq.new")
                .header("prefer", "count=exact");
            then.status(200).header("content-range", "0-2/3");
        })
        .await;

    let count = backend(&server)
        .count(Table::AppointmentRequests, &Query::new().eq("status", "new"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(count, 3);
}

#[tokio::test]
async fn insert_returns_the_stored_row() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/newsletter_subscriptions")
                .header("prefer", "return=representation")
                .json_body(json!([{ "email": "reader@example.com" }]));
            then.status(201).json_body(json!([{
                "id": "s1",
                "email": "reader@example.com",
                "created_at": "2024-03-05T10:00:00+00:00"
            }]));
        })
        .await;

    let row = backend(&server)
        .insert(
            Table::NewsletterSubscriptions,
            rows::encode(json!({ "email": "reader@example.com" })),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(row["id"], "s1");
}

#[tokio::test]
async fn server_errors_carry_the_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/appointment_requests");
            then.status(400)
                .json_body(json!({ "message": "null value in column \"phone\"" }));
        })
        .await;

    let err = backend(&server)
        .insert(Table::AppointmentRequests, rows::encode(json!({ "name": "Ada" })))
        .await
        .unwrap_err();

    match err {
        SiteError::Remote { message, .. } => {
            assert_eq!(message, "null value in column \"phone\" (400)")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn delete_counts_returned_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/blog_posts")
                .query_param("id", "eq.7")
                .header("prefer", "return=representation");
            then.status(200)
                .json_body(json!([article_row("Changing Beliefs", None)]));
        })
        .await;

    let removed = backend(&server)
        .delete(Table::Articles, &Query::new().eq("id", "7"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn password_sign_in() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", "anon-key")
                .json_body(json!({ "email": "admin@example.com", "password": "secret" }));
            then.status(200).json_body(json!({
                "access_token": "jwt",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "token_type": "bearer",
                "user": { "id": "u1", "email": "admin@example.com", "role": "authenticated" }
            }));
        })
        .await;

    let session = backend(&server)
        .sign_in("admin@example.com", "secret")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.access_token, "jwt");
    assert_eq!(session.user.id, "u1");
    assert!(!session.is_expired());
}

#[tokio::test]
async fn unknown_token_has_no_user() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer stale");
            then.status(401).json_body(json!({ "msg": "invalid JWT" }));
        })
        .await;

    let user = backend(&server).user("stale").await.unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn storage_upload_returns_public_url() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/storage/v1/object/blog_images/abc.png")
                .header("content-type", "image/png")
                .header("x-upsert", "false");
            then.status(200).json_body(json!({ "Key": "blog_images/abc.png" }));
        })
        .await;

    let url = backend(&server)
        .upload("blog_images", "abc.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/blog_images/abc.png", server.base_url())
    );
}

#[tokio::test]
async fn mailjet_send() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v3.1/send")
                .header("authorization", "Basic a2V5OnNlY3JldA==")
                .body_contains("\"Subject\":\"New Personal Session Request from Ada\"");
            then.status(200)
                .json_body(json!({ "Messages": [{ "Status": "success" }] }));
        })
        .await;

    let mailer = MailjetMailer::from_config(&MailConfig {
        api_url: server.base_url(),
        api_key: "key".into(),
        secret_key: "secret".into(),
        ..MailConfig::default()
    })
    .unwrap();
    let email = Email {
        from: Mailbox {
            email: "noreply@submindmastery.com".into(),
            name: "Mastering Subconscious".into(),
        },
        to: vec![Mailbox {
            email: "owner@example.com".into(),
            name: "Owner".into(),
        }],
        subject: "New Personal Session Request from Ada".into(),
        text: "Name: Ada".into(),
        html: "<p>Ada</p>".into(),
    };

    mailer.send(&email).await.unwrap();
    mock.assert_async().await;
}
