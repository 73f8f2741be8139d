//! Admin sessions and the protected-route gate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::backend::{rows, AuthProvider, Query, Store, Table};
use crate::error::{Result, SiteError};
use crate::records::AdminRecord;

/// Notice shown when a protected page is opened without a session
pub const LOGIN_REQUIRED: &str = "Please login to access this page";
/// Notice shown when the signed-in account has no admin role record
pub const NOT_ADMIN: &str = "You do not have admin privileges";
/// Where denied requests are sent
pub const LOGIN_PATH: &str = "/admin";

/// An authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A session issued by the auth provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Utc::now())
    }
}

/// A session together with its admin check
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub session: Session,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut(User),
}

/// Outcome of the protected-route check
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Granted(AdminSession),
    Redirect { to: String, notice: String },
}

impl Access {
    fn redirect(notice: &str) -> Self {
        Access::Redirect {
            to: LOGIN_PATH.to_string(),
            notice: notice.to_string(),
        }
    }
}

type SessionMap = Arc<RwLock<HashMap<String, AdminSession>>>;

/// Session state shared by the server
///
/// Call [`SessionState::init`] once at start-up to subscribe to auth events and
/// [`SessionState::shutdown`] on teardown.
pub struct SessionState {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn Store>,
    sessions: SessionMap,
    events: broadcast::Sender<AuthEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionState {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn Store>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            auth,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            listener: Mutex::new(None),
        }
    }

    /// Subscribe to auth events. Sign-outs drop every cached session of that user.
    pub async fn init(&self) {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return;
        }
        let mut events = self.events.subscribe();
        let sessions = self.sessions.clone();
        *listener = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn(user)) => {
                        tracing::info!("Signed in: {}", user.email.as_deref().unwrap_or(&user.id));
                    }
                    Ok(AuthEvent::SignedOut(user)) => {
                        sessions
                            .write()
                            .await
                            .retain(|_, entry| entry.session.user.id != user.id);
                        tracing::info!("Signed out: {}", user.email.as_deref().unwrap_or(&user.id));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Auth listener skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        tracing::debug!("Session state initialized");
    }

    /// Unsubscribe and forget every session
    pub async fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
        self.sessions.write().await.clear();
        tracing::debug!("Session state shut down");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: AuthEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }

    /// Whether an account has an admin role record
    pub async fn is_admin(&self, user: &User) -> Result<bool> {
        let query = Query::new().eq("id", user.id.as_str());
        let record = rows::fetch_one::<AdminRecord>(self.store.as_ref(), Table::Admins, &query).await?;
        Ok(record.is_some())
    }

    /// Sign in and require an admin role record
    ///
    /// Accounts without one are signed straight back out.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in(email, password).await?;
        if !self.is_admin(&session.user).await? {
            tracing::warn!("Rejected sign-in without admin role: {}", email);
            if let Err(e) = self.auth.sign_out(&session).await {
                tracing::warn!("Failed to sign out rejected session: {}", e);
            }
            return Err(SiteError::unauthorized(NOT_ADMIN));
        }

        self.sessions.write().await.insert(
            session.access_token.clone(),
            AdminSession {
                session: session.clone(),
                is_admin: true,
            },
        );
        self.publish(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let entry = self.sessions.write().await.remove(access_token);
        let Some(entry) = entry else {
            return Ok(());
        };
        self.auth.sign_out(&entry.session).await?;
        self.publish(AuthEvent::SignedOut(entry.session.user));
        Ok(())
    }

    /// Look up a session, asking the auth provider for tokens issued elsewhere
    pub async fn session(&self, access_token: &str) -> Result<Option<AdminSession>> {
        if let Some(entry) = self.sessions.read().await.get(access_token) {
            if !entry.session.is_expired() {
                return Ok(Some(entry.clone()));
            }
        }

        let Some(user) = self.auth.user(access_token).await? else {
            self.sessions.write().await.remove(access_token);
            return Ok(None);
        };
        let entry = AdminSession {
            is_admin: self.is_admin(&user).await?,
            session: Session {
                access_token: access_token.to_string(),
                refresh_token: None,
                expires_at: None,
                user,
            },
        };
        self.sessions
            .write()
            .await
            .insert(access_token.to_string(), entry.clone());
        Ok(Some(entry))
    }

    /// The protected-route check
    pub async fn guard(&self, access_token: Option<&str>) -> Access {
        let Some(token) = access_token.filter(|t| !t.is_empty()) else {
            return Access::redirect(LOGIN_REQUIRED);
        };
        match self.session(token).await {
            Ok(Some(entry)) if entry.is_admin => Access::Granted(entry),
            Ok(Some(_)) => Access::redirect(NOT_ADMIN),
            Ok(None) => Access::redirect(LOGIN_REQUIRED),
            Err(e) => {
                tracing::error!("Session check failed: {}", e);
                Access::redirect(LOGIN_REQUIRED)
            }
        }
    }
}
