//! REST client for the hosted backend: auth, tables and object storage

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AuthProvider, Direction, ObjectStorage, Query, Row, Store, Table};
use crate::auth::{Session, User};
use crate::config::BackendConfig;
use crate::error::{Result, Service, SiteError};
use crate::helpers::encode_path_segment;

/// Client for the hosted platform's REST endpoints
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    /// Key sent as the bearer token for table and storage calls
    bearer_key: String,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let bearer_key = if config.service_role_key.is_empty() {
            config.anon_key.clone()
        } else {
            config.service_role_key.clone()
        };
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            bearer_key,
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_path_segment(bucket),
            encode_object_path(path)
        )
    }

    /// Public URL of an object in a public bucket
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            encode_path_segment(bucket),
            encode_object_path(path)
        )
    }

    fn headers(&self, bearer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", bearer)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn service(&self, request: RequestBuilder) -> RequestBuilder {
        request.headers(self.headers(&self.bearer_key))
    }

    async fn rows(&self, response: Response) -> Result<Vec<Row>> {
        let response = check(Service::Store, response).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }
}

fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// PostgREST query parameters for a query
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|(column, value)| {
            let filter = match value {
                Value::Null => "is.null".to_string(),
                Value::String(s) => format!("eq.{}", s),
                other => format!("eq.{}", other),
            };
            (column.clone(), filter)
        })
        .collect();
    if let Some((column, direction)) = &query.order {
        let direction = match direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

/// Turn a non-success response into a remote error carrying the server's message
async fn check(service: Service, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(body);
    tracing::debug!("{} responded {}: {}", service, status, message);
    Err(SiteError::remote(
        service,
        format!("{} ({})", message, status.as_u16()),
    ))
}

#[async_trait]
impl Store for RestBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>> {
        let response = self
            .service(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(&query_params(query))
            .send()
            .await?;
        self.rows(response).await
    }

    async fn count(&self, table: Table, query: &Query) -> Result<u64> {
        let response = self
            .service(self.client.head(self.table_url(table)))
            .header("Prefer", "count=exact")
            .query(&[("select", "*")])
            .query(&query_params(query))
            .send()
            .await?;
        let response = check(Service::Store, response).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| SiteError::remote(Service::Store, "missing row count"))
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row> {
        let response = self
            .service(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&vec![Value::Object(row)])
            .send()
            .await?;
        self.rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SiteError::remote(Service::Store, "insert returned no row"))
    }

    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>> {
        let response = self
            .service(self.client.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .json(&Value::Object(patch))
            .send()
            .await?;
        self.rows(response).await
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64> {
        let response = self
            .service(self.client.delete(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .send()
            .await?;
        Ok(self.rows(response).await?.len() as u64)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: User,
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .headers(self.headers(&self.anon_key))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = check(Service::Auth, response).await?.json().await?;
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
            user: token.user,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .headers(self.headers(&session.access_token))
            .send()
            .await?;
        check(Service::Auth, response).await?;
        Ok(())
    }

    async fn user(&self, access_token: &str) -> Result<Option<User>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .headers(self.headers(access_token))
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => {
                let user = check(Service::Auth, response).await?.json().await?;
                Ok(Some(user))
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let response = self
            .service(self.client.post(self.object_url(bucket, path)))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(Service::Storage, response).await?;
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let response = self
            .service(self.client.delete(format!(
                "{}/storage/v1/object/{}",
                self.base_url,
                encode_path_segment(bucket)
            )))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        check(Service::Storage, response).await?;
        Ok(())
    }
}
