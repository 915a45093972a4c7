//! Per-user session context.
//!
//! A browser that logs in gets a random session id in a cookie. The id
//! maps to a [`Session`] holding the login flag and that user's
//! [`SubmissionQueue`].
//!
//! Only logged-in sessions are stored. A request without a known cookie
//! gets a detached, logged-out session that is dropped with the request,
//! so anonymous traffic never grows the store. A successful login
//! [`establish`](SessionStore::establish)es the session under a freshly
//! minted id; ids are never carried over from before the login.
//!
//! Every session sits behind its own async mutex. Handlers hold it for the
//! whole action, the remote spreadsheet write included, so two clicks from
//! the same browser run one after the other, never interleaved. Different
//! sessions never share state.
//!
//! A session idle past the configured limit is dropped when its cookie is
//! next seen, and a sweep of the whole store runs at most once per
//! [`SWEEP_INTERVAL`] (or per idle limit, if shorter). Dropping a session
//! discards its queue.

use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::queue::SubmissionQueue;

pub const SESSION_COOKIE: &str = "instamon_session";

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct Session {
    pub logged_in: bool,
    pub queue: SubmissionQueue,
}

struct Entry {
    session: Arc<tokio::sync::Mutex<Session>>,
    last_seen: Instant,
}

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

/// A resolved session for one request.
pub struct SessionHandle {
    /// `None` for a detached session that is not in the store.
    pub id: Option<String>,
    pub session: Arc<tokio::sync::Mutex<Session>>,
}

impl SessionHandle {
    fn detached() -> Self {
        Self {
            id: None,
            session: Arc::new(tokio::sync::Mutex::new(Session::default())),
        }
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }
}

pub struct SessionStore {
    entries: Mutex<Entries>,
    idle: Duration,
    sweep_every: Duration,
}

impl SessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            idle,
            sweep_every: idle.min(SWEEP_INTERVAL),
        }
    }

    /// Find the session named by the request's cookie. Unknown, expired or
    /// missing cookies get a detached session that is not stored.
    pub fn resolve(&self, headers: &HeaderMap) -> SessionHandle {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        self.sweep(&mut entries, now);

        if let Some(id) = cookie_value(headers, SESSION_COOKIE) {
            let expired = entries
                .map
                .get(&id)
                .is_some_and(|e| now.duration_since(e.last_seen) >= self.idle);
            if expired {
                entries.map.remove(&id);
            }
            if let Some(entry) = entries.map.get_mut(&id) {
                entry.last_seen = now;
                return SessionHandle {
                    id: Some(id),
                    session: entry.session.clone(),
                };
            }
        }

        SessionHandle::detached()
    }

    /// Store `handle`'s session under a new id and return that id.
    ///
    /// Any id the handle was stored under before is dropped, so a cookie
    /// value known before the call stops working after it.
    pub fn establish(&self, handle: &SessionHandle) -> String {
        let id = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().unwrap();
        if let Some(old) = &handle.id {
            entries.map.remove(old);
        }
        entries.map.insert(
            id.clone(),
            Entry {
                session: handle.session.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(sessions = entries.map.len(), "established session");
        id
    }

    /// Drop a session and everything it holds.
    pub fn end(&self, id: &str) {
        self.entries.lock().unwrap().map.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, entries: &mut Entries, now: Instant) {
        if now.duration_since(entries.last_sweep) < self.sweep_every {
            return;
        }
        let idle = self.idle;
        entries
            .map
            .retain(|_, e| now.duration_since(e.last_seen) < idle);
        entries.last_sweep = now;
    }
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
