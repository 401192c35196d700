//! Passcode sign-in and bearer token sessions.
//!
//! A [`SessionRegistry`] trades the shared passcode for an opaque token and
//! resolves tokens back into a [`SessionContext`] for each request. When no
//! passcode is configured the registry is *open*: every request resolves to
//! an authenticated session and sign-in is not needed.

use chrono::{DateTime, Duration, Utc};
use packtrack_core::SessionContext;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How long a token stays valid after sign-in.
pub const DEFAULT_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid passcode")]
    InvalidPasscode,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Unknown or expired session")]
    UnknownToken,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Issued on successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Entry {
    context: SessionContext,
    expires_at: DateTime<Utc>,
}

pub struct SessionRegistry {
    passcode: Option<String>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(passcode: Option<String>) -> Self {
        Self {
            passcode: passcode.filter(|p| !p.is_empty()),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// True when no passcode is configured.
    pub fn is_open(&self) -> bool {
        self.passcode.is_none()
    }

    /// Exchange the passcode for a new session token.
    pub fn login(&self, passcode: &str, operator: Option<String>) -> SessionResult<SessionToken> {
        let accepted = match &self.passcode {
            Some(expected) => passcodes_match(expected, passcode),
            None => true,
        };
        if !accepted {
            tracing::warn!("Sign-in rejected: wrong passcode");
            return Err(SessionError::InvalidPasscode);
        }

        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;
        let operator = operator
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        let context = SessionContext::authenticated(token.clone(), operator);
        tracing::info!(operator = %context.actor(), %expires_at, "Session opened");

        let mut sessions = self.sessions.write();
        let now = Utc::now();
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(token.clone(), Entry { context, expires_at });
        Ok(SessionToken { token, expires_at })
    }

    /// Resolve a request's `Authorization` header value.
    ///
    /// In open mode this never fails. Otherwise an absent, malformed, unknown
    /// or expired token is an error.
    pub fn resolve(&self, authorization: Option<&str>) -> SessionResult<SessionContext> {
        if self.is_open() {
            return Ok(SessionContext::open());
        }
        let token = authorization
            .and_then(bearer_token)
            .ok_or(SessionError::MissingToken)?;
        self.lookup(token)
    }

    /// Like [`resolve`](Self::resolve), but failures become an anonymous
    /// session instead of an error.
    pub fn resolve_or_anonymous(&self, authorization: Option<&str>) -> SessionContext {
        self.resolve(authorization)
            .unwrap_or_else(|_| SessionContext::anonymous())
    }

    fn lookup(&self, token: &str) -> SessionResult<SessionContext> {
        let sessions = self.sessions.read();
        match sessions.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(entry.context.clone()),
            _ => Err(SessionError::UnknownToken),
        }
    }

    /// Revoke a token. Returns whether it was known.
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.sessions.write().remove(token).is_some();
        if removed {
            tracing::info!("Session revoked");
        }
        removed
    }

    /// Number of live sessions.
    pub fn active(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// Length-independent comparison so response timing does not leak a prefix match.
fn passcodes_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
