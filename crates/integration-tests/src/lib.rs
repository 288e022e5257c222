//! Shared fixtures for the end-to-end suites under `tests/`.
//!
//! Each [`TestApp`] owns a private in-memory SQLite store, a settable clock
//! and a notifier that captures reset tokens instead of mailing them.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use api_adapters::{AppState, Metrics};
use async_trait::async_trait;
use auth_adapters::{Argon2Hasher, JwtCodec};
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeDelta, Utc};
use domains::{AuditEntry, AuditRepo, Clock, ResetNotifier, Result, User};
use serde_json::{json, Value};
use services::{
    AccountService, ArticleService, AuditRecorder, Blocklist, PasswordResetFlow, SettingsLedger,
};
use storage_adapters::SqliteStore;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "chief";
pub const ADMIN_EMAIL: &str = "chief@newsroom.test";
pub const ADMIN_PASSWORD: &str = "chief-password";
pub const STAFF_PASSWORD: &str = "staff-password";
/// Socket peer of every request sent through [`TestApp::send_with`].
pub const PROXY_PEER: &str = "127.0.0.1:40000";
const JWT_SECRET: &[u8] = b"integration-secret-0123456789abcdef";

/// A clock the test moves by hand.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Keeps every reset mail instead of sending it.
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    /// Most recent raw token mailed to `email`.
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ResetNotifier for CapturingNotifier {
    async fn send_reset(&self, user: &User, token: &str, _expires_at: DateTime<Utc>) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((user.email.clone(), token.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: SqliteStore,
    pub clock: Arc<TestClock>,
    pub outbox: Arc<CapturingNotifier>,
    pub admin_token: String,
}

/// A response reduced to what the suites assert on.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.body["error"].as_str()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.migrate().await.unwrap();

        let clock = Arc::new(TestClock::new(Utc::now()));
        let outbox = Arc::new(CapturingNotifier::default());
        let audit = AuditRecorder::new(Arc::new(store.audit()));
        let users = Arc::new(store.users());
        let hasher = Arc::new(Argon2Hasher::with_cost(64, 1).unwrap());
        let tokens = Arc::new(JwtCodec::new(JWT_SECRET, 60));

        let accounts = AccountService::new(users.clone(), hasher.clone(), tokens, audit.clone());
        accounts
            .bootstrap_admin(ADMIN_USERNAME, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        let state = AppState {
            accounts,
            articles: ArticleService::new(Arc::new(store.articles()), audit.clone()),
            settings: SettingsLedger::new(Arc::new(store.settings()), audit.clone()),
            blocklist: Blocklist::new(Arc::new(store.blocklist()), audit.clone()),
            resets: PasswordResetFlow::new(users, hasher, outbox.clone(), clock.clone(), audit.clone()),
            audit,
            health: Arc::new(store.clone()),
            metrics: Arc::new(Metrics::new()),
            trusted_proxies: Arc::from([peer(PROXY_PEER).ip()]),
        };

        let mut app = Self {
            router: api_adapters::router(state),
            store,
            clock,
            outbox,
            admin_token: String::new(),
        };
        app.admin_token = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        app
    }

    pub async fn send_with(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.dispatch(PROXY_PEER, request).await
    }

    /// Anonymous request arriving straight from `from`, not through the proxy.
    pub async fn send_from(&self, from: &str, method: Method, uri: &str, headers: &[(&str, &str)]) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.dispatch(from, builder.body(Body::empty()).unwrap()).await
    }

    async fn dispatch(&self, from: &str, mut request: Request<Body>) -> Reply {
        request.extensions_mut().insert(ConnectInfo(peer(from)));
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        Reply { status, body }
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        self.send_with(method, uri, token, body, &[]).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login failed: {:?}", reply.body);
        reply.body["token"].as_str().unwrap().to_string()
    }

    /// Creates an editor holding `capabilities` and returns a session token for it.
    pub async fn editor(&self, username: &str, capabilities: &[&str]) -> String {
        let reply = self
            .send(
                Method::POST,
                "/users",
                Some(self.admin_token.as_str()),
                Some(json!({
                    "username": username,
                    "email": format!("{username}@newsroom.test"),
                    "password": STAFF_PASSWORD,
                    "role": "editor",
                    "capabilities": capabilities,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        self.login(username, STAFF_PASSWORD).await
    }

    /// Creates an article as admin and returns its id.
    pub async fn article(&self, title: &str, active: bool) -> i64 {
        let reply = self
            .send(
                Method::POST,
                "/articles",
                Some(self.admin_token.as_str()),
                Some(json!({ "title": title, "body": format!("{title}, the full story"), "active": active })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.data()["id"].as_i64().unwrap()
    }

    /// Full audit trail, newest first, read straight from the store.
    pub async fn audit_trail(&self) -> Vec<AuditEntry> {
        self.store.audit().list(200, 0).await.unwrap()
    }
}

fn peer(address: &str) -> SocketAddr {
    address.parse().unwrap()
}

/// Ids found in a listing reply.
pub fn ids(reply: &Reply) -> Vec<i64> {
    reply
        .data()
        .as_array()
        .map(|items| items.iter().filter_map(|a| a["id"].as_i64()).collect())
        .unwrap_or_default()
}
