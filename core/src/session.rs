//! Explicit session context.
//!
//! The ingress resolves a [`SessionContext`] for every request and puts it on
//! the [`Bus`](crate::bus::Bus); components that need to know who is acting
//! read it from there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Bearer token the session was resolved from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Display name of the operator, if they gave one when signing in.
    pub operator: Option<String>,
    pub authenticated: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    /// A request that presented no valid session.
    pub fn anonymous() -> Self {
        Self {
            token: None,
            operator: None,
            authenticated: false,
            started_at: Utc::now(),
        }
    }

    /// A signed-in session.
    pub fn authenticated(token: impl Into<String>, operator: Option<String>) -> Self {
        Self {
            token: Some(token.into()),
            operator,
            authenticated: true,
            started_at: Utc::now(),
        }
    }

    /// Session used when no passcode is configured: everyone is trusted.
    pub fn open() -> Self {
        Self {
            token: None,
            operator: None,
            authenticated: true,
            started_at: Utc::now(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Name to record on writes.
    pub fn actor(&self) -> &str {
        match (&self.operator, self.authenticated) {
            (Some(name), _) => name,
            (None, true) => "operator",
            (None, false) => "anonymous",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_names() {
        assert_eq!(SessionContext::anonymous().actor(), "anonymous");
        assert_eq!(SessionContext::open().actor(), "operator");
        let named = SessionContext::authenticated("t", Some("Meera".into()));
        assert_eq!(named.actor(), "Meera");
        assert!(named.is_authenticated());
    }
}
