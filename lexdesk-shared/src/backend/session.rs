/// Auth session types
///
/// These mirror the payloads of a GoTrue-style auth service. The session is
/// an opaque credential bundle owned by the remote service; LexDesk only keeps
/// a copy of the latest value.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Seconds before expiry at which a session is treated as expired
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Authenticated user as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,

    pub email: Option<String>,

    /// Metadata supplied at sign-up (e.g. `full_name`)
    #[serde(default)]
    pub user_metadata: JsonValue,
}

impl AuthUser {
    /// `full_name` from the sign-up metadata
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(JsonValue::as_str)
    }
}

/// Credential bundle for a signed-in user
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    pub refresh_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of the access token in seconds
    pub expires_in: i64,

    /// Absolute expiry as a unix timestamp
    pub expires_at: Option<i64>,

    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Absolute expiry; `None` when the service did not report one
    pub fn expires_at_time(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    /// Whether the access token is expired (or about to be) at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_time() {
            Some(expiry) => now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expiry,
            None => false,
        }
    }

    /// Fills `expires_at` from `expires_in` when missing
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(issued_at.timestamp() + self.expires_in);
        }
        self
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish_non_exhaustive()
    }
}

/// Kind of auth-state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    /// Session restored from storage
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthEventKind::InitialSession => write!(f, "INITIAL_SESSION"),
            AuthEventKind::SignedIn => write!(f, "SIGNED_IN"),
            AuthEventKind::SignedOut => write!(f, "SIGNED_OUT"),
            AuthEventKind::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
            AuthEventKind::UserUpdated => write!(f, "USER_UPDATED"),
        }
    }
}

/// Auth-state change notification carrying the new session value
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        AuthEvent { kind, session }
    }
}

/// Result of a sign-up
///
/// When the project requires email confirmation the service returns the new
/// user without a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

impl SignUpOutcome {
    /// True when the user must confirm their email before signing in
    pub fn needs_confirmation(&self) -> bool {
        self.session.is_none()
    }
}
