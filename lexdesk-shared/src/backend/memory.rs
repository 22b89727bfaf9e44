/// In-memory backend for testing and demos
///
/// This backend keeps every table as a list of JSON rows in process memory
/// and emulates the parts of the hosted service LexDesk relies on:
///
/// - Password accounts with sessions and auth-state notifications
/// - A `profiles` row created for every sign-up (the server-side trigger)
/// - Row-level security: rows carrying an `organization_id` are only visible
///   to, and writable by, members of that organization
/// - Embedded relations and `created_at` ordering
///
/// It also offers hooks the real service does not have: injected per-table
/// failures and artificial latency, so tests can exercise error paths and
/// interleavings deterministically.
///
/// # Example
///
/// ```
/// use lexdesk_shared::backend::{AuthApi, MemoryBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// let user_id = backend.add_user("ana@example.com", "secret123", "Ana Souza");
/// let org_id = backend.add_organization("Souza Advocacia", "souza");
/// backend.add_membership(org_id, user_id, "owner");
///
/// let session = backend
///     .sign_in_with_password("ana@example.com", "secret123")
///     .await
///     .unwrap();
/// assert_eq!(session.user.id, user_id);
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::query::{Filter, Order, Query};
use super::session::{AuthEvent, AuthEventKind, AuthUser, Session, SignUpOutcome};
use super::{AuthApi, AuthError, BackendError, BackendResult, DataApi};
use crate::models::{Organization, OrganizationMembership, Profile};

/// Lifetime of issued access tokens
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Minimum password length accepted on sign-up
const MIN_PASSWORD_LEN: usize = 6;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<JsonValue>>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    failures: HashMap<String, String>,
    latency: Option<Duration>,
    require_confirmation: bool,
}

/// In-process implementation of [`crate::backend::Backend`]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<AuthEvent>,
}

impl MemoryBackend {
    /// Creates an empty backend with no accounts and no rows
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        MemoryBackend {
            state: Mutex::new(MemoryState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        tracing::debug!(event = %kind, "Memory backend auth event");
        // No receivers is fine.
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    /// Registers an account and its profile row, returning the user id
    pub fn add_user(&self, email: &str, password: &str, full_name: &str) -> Uuid {
        let mut state = self.lock();
        state.create_account(email, password, full_name).id
    }

    /// Inserts an organization row, returning its id
    pub fn add_organization(&self, name: &str, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = timestamp(Utc::now());
        self.seed(
            Organization::TABLE,
            json!({
                "id": id,
                "name": name,
                "slug": slug,
                "subscription_plan": "trial",
                "created_at": now,
                "updated_at": now,
            }),
        );
        id
    }

    /// Inserts a membership row, returning its id
    pub fn add_membership(&self, organization_id: Uuid, user_id: Uuid, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed(
            OrganizationMembership::TABLE,
            json!({
                "id": id,
                "organization_id": organization_id,
                "user_id": user_id,
                "role": role,
            }),
        );
        id
    }

    /// Inserts a row bypassing row-level security and returns it as stored
    ///
    /// Missing `id`, `created_at` and `updated_at` are filled in.
    pub fn seed(&self, table: &str, row: JsonValue) -> JsonValue {
        let mut state = self.lock();
        let stored = with_defaults(table, row, Utc::now());
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        stored
    }

    /// Raw rows of a table, ignoring row-level security
    pub fn rows(&self, table: &str) -> Vec<JsonValue> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Makes every subsequent call touching `table` fail with `message`
    pub fn fail_table(&self, table: &str, message: &str) {
        self.lock()
            .failures
            .insert(table.to_string(), message.to_string());
    }

    /// Removes all injected failures
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Delays every data call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// When set, sign-ups return no session until confirmed
    pub fn require_email_confirmation(&self, required: bool) {
        self.lock().require_confirmation = required;
    }

    /// Issues fresh tokens for the current session and emits `TokenRefreshed`
    pub fn refresh_session(&self) -> Option<Session> {
        let refreshed = {
            let mut state = self.lock();
            let user = state.session.as_ref()?.user.clone();
            let session = issue_session(user, Utc::now());
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthEventKind::TokenRefreshed, Some(refreshed.clone()));
        Some(refreshed)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn create_account(&mut self, email: &str, password: &str, full_name: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: json!({ "full_name": full_name }),
        };

        self.accounts.insert(
            email.to_lowercase(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );

        // Profile trigger
        let now = timestamp(Utc::now());
        self.tables
            .entry(Profile::TABLE.to_string())
            .or_default()
            .push(json!({
                "id": user.id,
                "email": email,
                "full_name": full_name,
                "role": "lawyer",
                "created_at": now,
                "updated_at": now,
            }));

        user
    }

    fn check_failure(&self, table: &str) -> BackendResult<()> {
        match self.failures.get(table) {
            Some(message) => Err(BackendError::Api {
                status: 500,
                code: Some("XX000".to_string()),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn current_user(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user.id)
    }

    /// Organization ids the user is a member of
    fn organizations_of(&self, user_id: Uuid) -> HashSet<String> {
        let user = user_id.to_string();
        self.tables
            .get(OrganizationMembership::TABLE)
            .map(|rows| {
                rows.iter()
                    .filter(|row| text_of(row.get("user_id")) == user)
                    .map(|row| text_of(row.get("organization_id")))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_visible(&self, table: &str, row: &JsonValue, user_id: Uuid, orgs: &HashSet<String>) -> bool {
        match table {
            "profiles" => true,
            "organizations" => orgs.contains(&text_of(row.get("id"))),
            "organization_members" => {
                text_of(row.get("user_id")) == user_id.to_string()
                    || orgs.contains(&text_of(row.get("organization_id")))
            }
            _ => match row.get("organization_id") {
                Some(org) => orgs.contains(&text_of(Some(org))),
                None => true,
            },
        }
    }

    fn embed_row(&self, embed_table: &str, key: &JsonValue, user_id: Uuid, orgs: &HashSet<String>) -> JsonValue {
        let key = text_of(Some(key));
        self.tables
            .get(embed_table)
            .and_then(|rows| {
                rows.iter().find(|row| {
                    text_of(row.get("id")) == key && self.is_visible(embed_table, row, user_id, orgs)
                })
            })
            .cloned()
            .unwrap_or(JsonValue::Null)
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        Ok(self.lock().session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = {
            let mut state = self.lock();
            let account = state
                .accounts
                .get(&email.to_lowercase())
                .filter(|account| account.password == password)
                .cloned()
                .ok_or(AuthError::InvalidCredentials)?;

            let session = issue_session(account.user, Utc::now());
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let outcome = {
            let mut state = self.lock();
            if state.accounts.contains_key(&email.to_lowercase()) {
                return Err(AuthError::UserAlreadyExists);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword(format!(
                    "Password should be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }

            let user = state.create_account(email, password, full_name);
            if state.require_confirmation {
                SignUpOutcome { user, session: None }
            } else {
                let session = issue_session(user.clone(), Utc::now());
                state.session = Some(session.clone());
                SignUpOutcome {
                    user,
                    session: Some(session),
                }
            }
        };

        if let Some(session) = &outcome.session {
            self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().session = None;
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataApi for MemoryBackend {
    async fn select(&self, query: &Query) -> BackendResult<Vec<JsonValue>> {
        self.simulate_latency().await;

        let state = self.lock();
        state.check_failure(&query.table)?;
        for embed in &query.embeds {
            state.check_failure(&embed.table)?;
        }

        // Anonymous callers see nothing through row-level security.
        let Some(user_id) = state.current_user() else {
            return Ok(Vec::new());
        };
        let orgs = state.organizations_of(user_id);

        let mut rows: Vec<JsonValue> = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| state.is_visible(&query.table, row, user_id, &orgs))
                    .filter(|row| matches_filters(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(column), b.get(column));
                match direction {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            });
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut out = match &query.columns {
                    Some(columns) => project(&row, columns),
                    None => row.as_object().cloned().unwrap_or_default(),
                };

                for embed in &query.embeds {
                    let embedded = match row.get(&embed.foreign_key) {
                        Some(key) if !key.is_null() => {
                            state.embed_row(&embed.table, key, user_id, &orgs)
                        }
                        _ => JsonValue::Null,
                    };
                    out.insert(embed.alias.clone(), embedded);
                }

                JsonValue::Object(out)
            })
            .collect();

        Ok(rows)
    }

    async fn select_one(&self, query: &Query) -> BackendResult<Option<JsonValue>> {
        Ok(self.select(query).await?.into_iter().next())
    }

    async fn insert(&self, table: &str, row: JsonValue) -> BackendResult<JsonValue> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.check_failure(table)?;

        let user_id = state.current_user().ok_or(BackendError::NotAuthenticated)?;
        if !row.is_object() {
            return Err(BackendError::Api {
                status: 400,
                code: Some("PGRST102".to_string()),
                message: "Row must be a JSON object".to_string(),
            });
        }

        let orgs = state.organizations_of(user_id);
        if !state.is_visible(table, &row, user_id, &orgs) {
            return Err(BackendError::PolicyViolation(table.to_string()));
        }

        let stored = with_defaults(table, row, Utc::now());
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: JsonValue,
    ) -> BackendResult<Vec<JsonValue>> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.check_failure(table)?;

        let user_id = state.current_user().ok_or(BackendError::NotAuthenticated)?;
        let orgs = state.organizations_of(user_id);
        let patch = patch.as_object().cloned().unwrap_or_default();
        let now = timestamp(Utc::now());

        let mut matching = Vec::new();
        if let Some(rows) = state.tables.get(table) {
            for (index, row) in rows.iter().enumerate() {
                if state.is_visible(table, row, user_id, &orgs) && matches_filters(row, filters) {
                    let mut updated = row.clone();
                    if let Some(object) = updated.as_object_mut() {
                        for (key, value) in &patch {
                            object.insert(key.clone(), value.clone());
                        }
                        object.insert("updated_at".to_string(), JsonValue::String(now.clone()));
                    }

                    if !state.is_visible(table, &updated, user_id, &orgs) {
                        return Err(BackendError::PolicyViolation(table.to_string()));
                    }
                    matching.push((index, updated));
                }
            }
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        for (index, updated) in &matching {
            rows[*index] = updated.clone();
        }

        Ok(matching.into_iter().map(|(_, row)| row).collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<u64> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.check_failure(table)?;

        let user_id = state.current_user().ok_or(BackendError::NotAuthenticated)?;
        let orgs = state.organizations_of(user_id);

        let Some(rows) = state.tables.get(table) else {
            return Ok(0);
        };

        let keep: Vec<bool> = rows
            .iter()
            .map(|row| !(state.is_visible(table, row, user_id, &orgs) && matches_filters(row, filters)))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count() as u64;

        if let Some(rows) = state.tables.get_mut(table) {
            let mut flags = keep.into_iter();
            rows.retain(|_| flags.next().unwrap_or(true));
        }

        Ok(removed)
    }
}

fn issue_session(user: AuthUser, now: DateTime<Utc>) -> Session {
    Session {
        access_token: format!("memory-access-{}", Uuid::new_v4()),
        refresh_token: format!("memory-refresh-{}", Uuid::new_v4()),
        token_type: "bearer".to_string(),
        expires_in: TOKEN_LIFETIME_SECS,
        expires_at: Some(now.timestamp() + TOKEN_LIFETIME_SECS),
        user,
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fills the columns the database would default
fn with_defaults(table: &str, row: JsonValue, now: DateTime<Utc>) -> JsonValue {
    let mut object = match row {
        JsonValue::Object(object) => object,
        _ => Map::new(),
    };
    let now = JsonValue::String(timestamp(now));

    object
        .entry("id".to_string())
        .or_insert_with(|| JsonValue::String(Uuid::new_v4().to_string()));

    if table == OrganizationMembership::TABLE {
        object.entry("joined_at".to_string()).or_insert_with(|| now.clone());
    } else {
        object.entry("created_at".to_string()).or_insert_with(|| now.clone());
        object.entry("updated_at".to_string()).or_insert_with(|| now.clone());
    }

    JsonValue::Object(object)
}

/// Text form of a JSON value, as PostgREST would compare it
fn text_of(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => "null".to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn matches_filters(row: &JsonValue, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| text_of(row.get(&filter.column)) == filter.value)
}

fn project(row: &JsonValue, columns: &[String]) -> Map<String, JsonValue> {
    columns
        .iter()
        .map(|column| {
            (
                column.clone(),
                row.get(column).cloned().unwrap_or(JsonValue::Null),
            )
        })
        .collect()
}

/// Orders timestamps chronologically, numbers numerically, and nulls last
fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
