//! In-process browser session store.
//!
//! Sessions are keyed by a random v4 UUID carried in the `session` cookie.
//! Expired entries are dropped when they are next looked up, and swept from
//! the whole map every `PURGE_EVERY` new sessions so abandoned ones do not pile up.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::db::User;

/// Lifetime of a browser session.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of created sessions between full sweeps of expired entries.
pub const PURGE_EVERY: usize = 64;

/// Principal data stored for a logged-in browser.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal_id: i64,
    pub name: String,
    pub admin: bool,
    expires_at: Instant,
}

impl Session {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    created: Arc<AtomicUsize>,
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a custom lifetime, used to exercise expiry.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Start a new session for a user. Returns the session id.
    pub fn create(&self, user: &User) -> String {
        if (self.created.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY == 0 {
            self.purge_expired();
        }

        let id = Uuid::new_v4().to_string();
        let session = Session {
            principal_id: user.id,
            name: user.display_name(),
            admin: user.is_admin,
            expires_at: Instant::now() + self.ttl.unwrap_or(SESSION_TTL),
        };
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Look up a live session.
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id)?.clone();
        if session.is_expired() {
            self.sessions.remove(id);
            return None;
        }
        Some(session)
    }

    /// Drop every expired session.
    pub fn purge_expired(&self) {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        tracing::debug!(
            purged = before.saturating_sub(self.sessions.len()),
            "Swept expired sessions"
        );
    }

    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Replace any previous session with a freshly minted id so a
    /// pre-login id can never be reused after authentication.
    pub fn renew(&self, previous: Option<&str>, user: &User) -> String {
        if let Some(previous) = previous {
            self.remove(previous);
        }
        self.create(user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
