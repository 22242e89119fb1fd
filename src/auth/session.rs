// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session boundary used by redirecting login flows.
//!
//! The pipeline only needs `get`/`set`/`remove` over JSON values. Hosts with
//! their own session layer implement [`Session`] and insert a
//! [`SessionHandle`] into the request extensions; [`session_middleware`] with
//! a [`SessionStore`] is an in-memory implementation for single-node
//! deployments and tests.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        Extensions, HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::UserProfile;

/// Session key holding the logged-in user's minimal profile.
pub const USER_PROFILE_KEY: &str = "userProfile";

/// Session key holding the path to return to after a login.
pub const RETURN_TO_KEY: &str = "returnTo";

/// Cookie carrying the session ID.
pub const SESSION_COOKIE: &str = "credentials.sid";

/// A per-client key/value session.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str) -> Option<Value>;
}

/// Request extension giving access to the current session.
#[derive(Clone)]
pub struct SessionHandle(Arc<dyn Session>);

impl SessionHandle {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self(session)
    }
}

impl Deref for SessionHandle {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

/// Session values held in memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no value is stored.
    pub fn is_empty(&self) -> bool {
        self.values.read().map(|v| v.is_empty()).unwrap_or(true)
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().ok()?.remove(key)
    }
}

/// Default maximum number of stored sessions.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

/// Default time a session survives without being used.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Stored session + last time it was loaded.
struct StoredSession {
    session: Arc<MemorySession>,
    last_seen: Instant,
}

/// In-memory sessions keyed by session ID.
///
/// Least recently used sessions are evicted past the capacity, and a session
/// idle for longer than the idle TTL is dropped on its next lookup.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<LruCache<String, StoredSession>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_IDLE_TTL)
    }

    /// Create a store holding at most `capacity` sessions.
    pub fn with_limits(capacity: usize, idle_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
            idle_ttl,
        }
    }

    /// Look up an existing session and mark it as used.
    pub fn load(&self, id: &str) -> Option<Arc<MemorySession>> {
        let mut sessions = self.sessions.lock().ok()?;
        let stored = sessions.get_mut(id)?;
        if stored.last_seen.elapsed() >= self.idle_ttl {
            sessions.pop(id);
            debug!("dropped idle session");
            return None;
        }
        stored.last_seen = Instant::now();
        Some(Arc::clone(&stored.session))
    }

    /// Keep `session` under a fresh ID.
    pub fn insert(&self, session: Arc<MemorySession>) -> String {
        let id = Uuid::new_v4().to_string();
        if let Ok(mut sessions) = self.sessions.lock() {
            let stored = StoredSession {
                session,
                last_seen: Instant::now(),
            };
            if let Some((evicted, _)) = sessions.push(id.clone(), stored) {
                if evicted != id {
                    debug!("session store full, evicted least recently used session");
                }
            }
        }
        id
    }

    /// Start a new, empty session.
    pub fn create(&self) -> (String, Arc<MemorySession>) {
        let session = Arc::new(MemorySession::new());
        let id = self.insert(Arc::clone(&session));
        (id, session)
    }

    /// Forget a session.
    pub fn destroy(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.pop(id))
            .is_some()
    }

    /// Number of stored sessions, idle ones included.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Middleware attaching a [`SessionHandle`] backed by `store`.
///
/// Unknown or missing session cookies get a fresh session that is only
/// stored once something was written to it; its ID is then sent back in a
/// `Set-Cookie` header.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = cookie_value(request.headers(), SESSION_COOKIE).and_then(|id| store.load(&id));

    let (fresh, session) = match existing {
        Some(session) => (false, session),
        None => (true, Arc::new(MemorySession::new())),
    };

    request
        .extensions_mut()
        .insert(SessionHandle::new(Arc::clone(&session) as Arc<dyn Session>));

    let mut response = next.run(request).await;

    if fresh && !session.is_empty() {
        let id = store.insert(session);
        debug!(session_id = %id, "started session");
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "failed to encode session cookie"),
        }
    }

    response
}

/// Log the current user out.
///
/// Removes the profile from the request and from the session, if any.
pub fn log_out(extensions: &mut Extensions) {
    extensions.remove::<UserProfile>();
    if let Some(session) = extensions.get::<SessionHandle>() {
        session.remove(USER_PROFILE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn memory_session_get_set_remove() {
        let session = MemorySession::new();
        assert!(session.get("returnTo").is_none());

        session.set("returnTo", json!("/private/data"));
        assert_eq!(session.get("returnTo"), Some(json!("/private/data")));

        assert_eq!(session.remove("returnTo"), Some(json!("/private/data")));
        assert!(session.get("returnTo").is_none());
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; credentials.sid=abc-123; lang=en"),
        );

        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE),
            Some("abc-123".to_string())
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn log_out_clears_request_and_session() {
        let session = Arc::new(MemorySession::new());
        session.set(USER_PROFILE_KEY, json!({"id": "1"}));

        let mut extensions = Extensions::new();
        extensions.insert(UserProfile::new("1", "One", "DummyToken").unwrap());
        extensions.insert(SessionHandle::new(session.clone()));

        log_out(&mut extensions);

        assert!(extensions.get::<UserProfile>().is_none());
        assert!(session.get(USER_PROFILE_KEY).is_none());
    }

    #[test]
    fn store_create_load_destroy() {
        let store = SessionStore::new();
        let (id, session) = store.create();
        session.set("k", json!(1));

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.get("k"), Some(json!(1)));

        assert!(store.destroy(&id));
        assert!(store.load(&id).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let store = SessionStore::with_limits(10, Duration::from_secs(60));
        let (active, _) = store.create();
        let (idle, _) = store.create();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.load(&active).is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.load(&active).is_some());
        assert!(store.load(&idle).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let store = SessionStore::with_limits(2, DEFAULT_SESSION_IDLE_TTL);
        let (first, _) = store.create();
        let (second, _) = store.create();
        assert!(store.load(&first).is_some());

        let (third, _) = store.create();

        assert_eq!(store.len(), 2);
        assert!(store.load(&second).is_none());
        assert!(store.load(&first).is_some());
        assert!(store.load(&third).is_some());
    }

    async fn counter(request: Request) -> String {
        let session = request.extensions().get::<SessionHandle>().unwrap();
        let hits = session.get("hits").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        session.set("hits", json!(hits));
        hits.to_string()
    }

    #[tokio::test]
    async fn middleware_reuses_session_from_cookie() {
        let store = SessionStore::new();
        let app = Router::new()
            .route("/", get(counter))
            .layer(axum::middleware::from_fn_with_state(
                store.clone(),
                session_middleware,
            ));

        let first = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = first.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        assert!(cookie.starts_with("credentials.sid="));

        let second = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(second.headers().get(SET_COOKIE).is_none());

        let body = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"2");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn untouched_sessions_are_not_stored() {
        let store = SessionStore::new();
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                store.clone(),
                session_middleware,
            ));

        for cookie in [None, Some("credentials.sid=unknown")] {
            let mut builder = Request::builder().uri("/");
            if let Some(cookie) = cookie {
                builder = builder.header(COOKIE, cookie);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.headers().get(SET_COOKIE).is_none());
        }

        assert!(store.is_empty());
    }
}
