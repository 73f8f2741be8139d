//! In-process backend for tests and offline preview

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{AuthProvider, Direction, Email, Mailer, ObjectStorage, Query, Row, Store, Table};
use crate::auth::{Session, User};
use crate::error::{Result, Service, SiteError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Account {
    user: User,
    password: String,
}

/// An uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Tables, accounts and objects held in memory
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    accounts: Mutex<Vec<Account>>,
    tokens: Mutex<HashMap<String, User>>,
    objects: Mutex<HashMap<String, StoredObject>>,
    failing: Mutex<HashSet<Table>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, filling the same defaults as an insert
    pub fn seed(&self, table: Table, value: Value) -> Row {
        let row = with_defaults(table, super::rows::encode(value));
        lock(&self.tables)
            .entry(table)
            .or_default()
            .push(row.clone());
        row
    }

    /// All rows of a table in insertion order
    pub fn rows(&self, table: Table) -> Vec<Row> {
        lock(&self.tables).get(&table).cloned().unwrap_or_default()
    }

    /// Make every write to `table` fail
    pub fn fail_writes(&self, table: Table) {
        lock(&self.failing).insert(table);
    }

    pub fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        lock(&self.accounts).push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// Give an account an admin role record
    pub fn grant_admin(&self, user: &User) {
        self.seed(
            Table::Admins,
            json!({ "id": user.id, "email": user.email }),
        );
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        lock(&self.objects).get(&object_key(bucket, path)).cloned()
    }

    fn check_writable(&self, table: Table) -> Result<()> {
        if lock(&self.failing).contains(&table) {
            return Err(SiteError::remote(
                Service::Store,
                format!("write to {} rejected", table),
            ));
        }
        Ok(())
    }
}

fn object_key(bucket: &str, path: &str) -> String {
    format!("{}/{}", bucket, path)
}

/// Public URL of an in-memory object
pub fn public_url(bucket: &str, path: &str) -> String {
    format!("/storage/v1/object/public/{}/{}", bucket, path)
}

fn is_missing(row: &Row, column: &str) -> bool {
    row.get(column).map_or(true, Value::is_null)
}

fn set_default(row: &mut Row, column: &str, value: Value) {
    if is_missing(row, column) {
        row.insert(column.to_string(), value);
    }
}

/// Column defaults the hosted tables declare
fn with_defaults(table: Table, mut row: Row) -> Row {
    let now = json!(Utc::now().to_rfc3339());
    if table != Table::Admins {
        set_default(&mut row, "id", json!(Uuid::new_v4().to_string()));
    }
    set_default(&mut row, "created_at", now.clone());
    match table {
        Table::Articles => {
            let created = row.get("created_at").cloned().unwrap_or(now);
            set_default(&mut row, "date", created.clone());
            set_default(&mut row, "updated_at", created);
            set_default(&mut row, "published", json!(false));
        }
        Table::Facilitator => {
            let created = row.get("created_at").cloned().unwrap_or(now);
            set_default(&mut row, "updated_at", created);
        }
        Table::AppointmentRequests => set_default(&mut row, "status", json!("new")),
        Table::Admins | Table::NewsletterSubscriptions => {}
    }
    row
}

/// Postgres ordering: nulls sort last ascending and first descending
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl Store for MemoryBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>> {
        let mut rows: Vec<Row> = self
            .rows(table)
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();
        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(column), b.get(column));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, table: Table, query: &Query) -> Result<u64> {
        let tables = lock(&self.tables);
        let count = tables
            .get(&table)
            .map_or(0, |rows| rows.iter().filter(|row| query.matches(row)).count());
        Ok(count as u64)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row> {
        self.check_writable(table)?;
        let row = with_defaults(table, row);
        lock(&self.tables)
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>> {
        self.check_writable(table)?;
        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        for row in tables.entry(table).or_default().iter_mut() {
            if query.matches(row) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64> {
        self.check_writable(table)?;
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        Ok((before - rows.len()) as u64)
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user = lock(&self.accounts)
            .iter()
            .find(|account| {
                account
                    .user
                    .email
                    .as_deref()
                    .map_or(false, |e| e.eq_ignore_ascii_case(email.trim()))
                    && account.password == password
            })
            .map(|account| account.user.clone())
            .ok_or_else(|| SiteError::remote(Service::Auth, "Invalid login credentials"))?;

        let access_token = Uuid::new_v4().to_string();
        lock(&self.tokens).insert(access_token.clone(), user.clone());
        Ok(Session {
            access_token,
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::hours(1)),
            user,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        lock(&self.tokens).remove(&session.access_token);
        Ok(())
    }

    async fn user(&self, access_token: &str) -> Result<Option<User>> {
        Ok(lock(&self.tokens).get(access_token).cloned())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let mut objects = lock(&self.objects);
        let key = object_key(bucket, path);
        if objects.contains_key(&key) {
            return Err(SiteError::remote(
                Service::Storage,
                "The resource already exists",
            ));
        }
        objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let mut objects = lock(&self.objects);
        for path in paths {
            objects.remove(&object_key(bucket, path));
        }
        Ok(())
    }
}

/// A mailer that records messages instead of sending them
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        if self.fail {
            return Err(SiteError::remote(Service::Mail, "delivery failed"));
        }
        lock(&self.sent).push(email.clone());
        Ok(())
    }
}
