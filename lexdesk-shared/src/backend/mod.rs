/// Remote backend boundary
///
/// LexDesk treats the hosted backend-as-a-service as an external collaborator
/// reached through two traits:
///
/// - [`AuthApi`]: session retrieval, sign-in, sign-up, sign-out and a
///   subscription to auth-state change notifications
/// - [`DataApi`]: table-scoped select / insert / update / delete
///
/// [`Backend`] is the umbrella trait every implementation satisfies.
///
/// # Implementations
///
/// - **Rest**: HTTP client for a GoTrue + PostgREST deployment (production)
/// - **Memory**: In-process tables with row-level security emulation
///   (tests and demos)
///
/// # Example
///
/// ```no_run
/// use lexdesk_shared::backend::{query::Query, select_as, Backend, MemoryBackend};
/// use lexdesk_shared::models::Client;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
/// backend.sign_in_with_password("ana@example.com", "secret123").await?;
///
/// let clients: Vec<Client> = select_as(backend.as_ref(), &Query::table("clients")).await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod query;
pub mod rest;
pub mod session;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

pub use memory::MemoryBackend;
pub use query::{Filter, Order, Query};
pub use rest::RestBackend;
pub use session::{AuthEvent, AuthEventKind, AuthUser, Session, SignUpOutcome};

/// Remote-call errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The service answered with an error status
    #[error("Request failed with status {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never got a response (connection, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A data call was made without a signed-in user
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Row-level security rejected the write
    #[error("Row-level security policy violation on table {0}")]
    PolicyViolation(String),

    /// Session persistence failed
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => BackendError::Api {
                status: status.as_u16(),
                code: None,
                message: err.to_string(),
            },
            None => BackendError::Transport(err.to_string()),
        }
    }
}

/// Backend result type alias
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from sign-in, sign-up and sign-out
///
/// These are returned to the caller as values so a login form can show them.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    UserAlreadyExists,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Password rejected: {0}")]
    WeakPassword(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Auth sub-API of the hosted backend
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Current session, restoring or refreshing it if the implementation
    /// persists sessions
    async fn get_session(&self) -> BackendResult<Option<Session>>;

    /// Password sign-in; emits `SignedIn` on success
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Registers a user with `full_name` metadata; emits `SignedIn` when the
    /// service returns a session right away
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Ends the session; emits `SignedOut`
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribes to auth-state change notifications
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Table-scoped data sub-API of the hosted backend
#[async_trait]
pub trait DataApi: Send + Sync {
    /// Rows matching `query`, as JSON objects
    async fn select(&self, query: &Query) -> BackendResult<Vec<JsonValue>>;

    /// First row matching `query`, if any
    async fn select_one(&self, query: &Query) -> BackendResult<Option<JsonValue>>;

    /// Inserts one row and returns it as stored
    async fn insert(&self, table: &str, row: JsonValue) -> BackendResult<JsonValue>;

    /// Applies `patch` to every row matching `filters`; returns updated rows
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: JsonValue,
    ) -> BackendResult<Vec<JsonValue>>;

    /// Deletes every row matching `filters`; returns how many were removed
    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<u64>;
}

/// Capability-bearing handle to the hosted backend
pub trait Backend: AuthApi + DataApi {}

impl<T: AuthApi + DataApi> Backend for T {}

/// Selects rows and decodes them into `T`
pub async fn select_as<T, D>(data: &D, query: &Query) -> BackendResult<Vec<T>>
where
    T: DeserializeOwned,
    D: DataApi + ?Sized,
{
    let rows = data.select(query).await?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Selects at most one row and decodes it into `T`
pub async fn select_one_as<T, D>(data: &D, query: &Query) -> BackendResult<Option<T>>
where
    T: DeserializeOwned,
    D: DataApi + ?Sized,
{
    match data.select_one(query).await? {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}
