//! Authentication-context boundary.
//!
//! The gate itself only consumes a [`Principal`] and a [`RequestContext`]
//! from request extensions; this module is the collaborator that puts them
//! there. Credential resolution is a trait so the platform's real identity
//! layer can slot in; the [`TokenDirectory`] implementation backs the demo
//! wiring and the end-to-end tests.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rx_core::types::{Principal, HEADER_LAST_ACTIVITY};
use rx_session::{MemoryRevoker, MemorySessionContainer, RequestContext, SessionContainer};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Resolves the inbound credential headers to an authenticated principal.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Credential string -> principal lookup. Accepts `Authorization: Bearer`
/// tokens and the `rx_session` cookie.
#[derive(Default)]
pub struct TokenDirectory {
    credentials: DashMap<String, Principal>,
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self {
            credentials: DashMap::new(),
        }
    }

    /// Associate a raw credential value with a principal.
    pub fn register(&self, credential: impl Into<String>, principal: Principal) {
        self.credentials.insert(credential.into(), principal);
    }
}

impl PrincipalResolver for TokenDirectory {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        if let Some(token) = bearer_credential(headers) {
            if let Some(principal) = self.credentials.get(&token) {
                return Some(principal.clone());
            }
        }
        if let Some(cookie) = session_cookie(headers) {
            if let Some(principal) = self.credentials.get(&cookie) {
                return Some(principal.clone());
            }
        }
        None
    }
}

fn bearer_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "rx_session").then(|| value.to_string())
    })
}

/// One server-side session container per principal.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<MemorySessionContainer>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// The live container for a principal. A destroyed container is replaced
    /// with a fresh one; a new login after logout starts clean.
    ///
    /// Cookie credential lifetime is owned by the platform's identity layer,
    /// not here: a cookie replayed after an idle expiry authenticates again
    /// and starts a fresh activity window. Only the presented bearer
    /// credential is ever revoked by the teardown.
    pub fn container_for(&self, principal_id: Uuid) -> Arc<MemorySessionContainer> {
        let mut entry = self
            .sessions
            .entry(principal_id)
            .or_insert_with(|| Arc::new(MemorySessionContainer::new()));
        if entry.is_destroyed() {
            *entry = Arc::new(MemorySessionContainer::new());
        }
        entry.clone()
    }

    /// The container only if one exists, destroyed or not.
    pub fn existing(&self, principal_id: Uuid) -> Option<Arc<MemorySessionContainer>> {
        self.sessions.get(&principal_id).map(|e| e.clone())
    }
}

/// State for the context-attaching middleware.
#[derive(Clone)]
pub struct AuthState {
    pub directory: Arc<TokenDirectory>,
    pub registry: Arc<SessionRegistry>,
    pub revoker: Arc<MemoryRevoker>,
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(TokenDirectory::new()),
            registry: Arc::new(SessionRegistry::new()),
            revoker: Arc::new(MemoryRevoker::new()),
        }
    }

    fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let principal = self.directory.resolve(headers)?;
        if let Some(token_id) = principal.channel.bearer_token() {
            if self.revoker.is_revoked(token_id) {
                debug!(principal_id = %principal.id, "Presented credential is revoked");
                return None;
            }
        }
        Some(principal)
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware: attach `Principal` and `RequestContext` extensions for
/// authenticated callers. Anonymous requests pass through untouched.
pub async fn attach_context(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(principal) = auth.resolve(req.headers()) {
        let session = auth.registry.container_for(principal.id);
        let ctx = RequestContext::new(
            session,
            header_last_activity(req.headers()),
            client_ip(req.headers()),
            user_agent(req.headers()),
        );
        req.extensions_mut().insert(principal);
        req.extensions_mut().insert(ctx);
    }
    next.run(req).await
}

fn header_last_activity(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(HEADER_LAST_ACTIVITY)?.to_str().ok()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    raw.split(',').next().map(|ip| ip.trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)?
        .to_str()
        .ok()
        .map(str::to_string)
}
