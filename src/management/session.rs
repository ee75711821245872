use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::utils;

pub const SESSION_COOKIE: &str = "euterpe_session";

/// How long a started login may take before its verifier is dropped.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);
/// Lifetime of a visitor session, counted from sign-in.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct Session {
    user_id: String,
    created_at: Instant,
}

struct PendingLogin {
    code_verifier: String,
    started_at: Instant,
}

/// Visitor sessions and in-flight PKCE logins for per-user mode.
///
/// Sessions only map an opaque cookie value to a user id; the credential
/// itself lives in the token store.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    pending: Mutex<HashMap<String, PendingLogin>>,
    session_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_session_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            session_ttl,
        }
    }

    /// Starts a session for `user_id` and returns the cookie value. Expired
    /// sessions are dropped on the way.
    pub fn create(&self, user_id: &str) -> String {
        let session_id = utils::generate_session_id();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| session.created_at.elapsed() < self.session_ttl);
        sessions.insert(
            session_id.clone(),
            Session {
                user_id: user_id.to_string(),
                created_at: Instant::now(),
            },
        );
        session_id
    }

    /// User behind a live session. An expired session is removed and
    /// resolves to nobody.
    pub fn user_for(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(session_id)?;
        if session.created_at.elapsed() >= self.session_ttl {
            sessions.remove(session_id);
            return None;
        }
        Some(session.user_id.clone())
    }

    pub fn end(&self, session_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .map(|session| session.user_id)
    }

    /// Number of sessions currently held, expired or not.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a new login and returns `(state, code_verifier)`.
    pub fn begin_login(&self) -> (String, String) {
        let state = utils::generate_session_id();
        let code_verifier = utils::generate_code_verifier();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, login| login.started_at.elapsed() < PENDING_LOGIN_TTL);
        pending.insert(
            state.clone(),
            PendingLogin {
                code_verifier: code_verifier.clone(),
                started_at: Instant::now(),
            },
        );
        (state, code_verifier)
    }

    /// Takes the verifier of the login identified by `state`. Each state can
    /// be redeemed once.
    pub fn finish_login(&self, state: &str) -> Option<String> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let login = pending.remove(state)?;
        if login.started_at.elapsed() >= PENDING_LOGIN_TTL {
            return None;
        }
        Some(login.code_verifier)
    }
}
