/// REST backend for a GoTrue + PostgREST deployment
///
/// This is the production implementation of the backend boundary. It speaks
/// plain HTTPS via `reqwest`:
///
/// - Auth: `{url}/auth/v1/token`, `/signup`, `/logout`
/// - Data: `{url}/rest/v1/{table}` with PostgREST query parameters
///
/// Every request carries the public key as `apikey`. Data requests are
/// authorized with the session's access token (or the public key when no one
/// is signed in), so row-level security is evaluated for the signed-in user.
///
/// # Session Persistence
///
/// When a session file is configured, the latest session is written there on
/// sign-in and removed on sign-out. `get_session` restores it and refreshes
/// it with the refresh token once the access token has expired, emitting
/// `TokenRefreshed`.
///
/// # Example
///
/// ```no_run
/// use lexdesk_shared::backend::{AuthApi, RestBackend};
/// use lexdesk_shared::config::BackendConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = RestBackend::new(BackendConfig::from_env()?)?;
/// let session = backend.sign_in_with_password("ana@example.com", "secret123").await?;
/// println!("Signed in as {}", session.user.id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use super::query::{Filter, Query};
use super::session::{AuthEvent, AuthEventKind, AuthUser, Session, SignUpOutcome};
use super::{AuthApi, AuthError, BackendError, BackendResult, DataApi};
use crate::config::BackendConfig;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// PostgREST error code for a row-level security violation
const RLS_VIOLATION_CODE: &str = "42501";

/// Error payload shapes of PostgREST and GoTrue
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<JsonValue>,
    error_code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// HTTP implementation of [`crate::backend::Backend`]
pub struct RestBackend {
    http: reqwest::Client,
    config: BackendConfig,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl RestBackend {
    /// Creates a backend client
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let mut headers = HeaderMap::new();
        let apikey = HeaderValue::from_str(&config.anon_key)
            .map_err(|e| BackendError::Transport(format!("Invalid API key header: {}", e)))?;
        headers.insert("apikey", apikey);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(RestBackend {
            http,
            config,
            session: RwLock::new(None),
            events,
        })
    }

    /// PostgREST endpoint of a table
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    /// GoTrue endpoint
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_session(&self, session: Option<Session>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// Token for the `Authorization` header
    fn bearer(&self) -> String {
        self.current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        tracing::debug!(event = %kind, "Auth state changed");
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    /// Stores the session in memory and in the session file
    async fn store_session(&self, session: Option<Session>) {
        if let Some(path) = &self.config.session_file {
            if let Err(e) = persist_session(path, session.as_ref()).await {
                tracing::warn!(error = %e, path = %path.display(), "Failed to persist session");
            }
        }
        self.set_session(session);
    }

    async fn restore_session(&self) -> Option<Session> {
        let path = self.config.session_file.as_ref()?;
        match load_session(path).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Ignoring unreadable session file");
                None
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        let body = send(request).await?;
        let session: Session = serde_json::from_value(body)?;
        Ok(session.with_expiry_from(Utc::now()))
    }

    fn data_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.bearer())
    }
}

#[async_trait]
impl AuthApi for RestBackend {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        let session = match self.current_session() {
            Some(session) => Some(session),
            None => {
                let restored = self.restore_session().await;
                if restored.is_some() {
                    tracing::debug!("Restored persisted session");
                    self.set_session(restored.clone());
                }
                restored
            }
        };

        let Some(session) = session else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                tracing::info!(user_id = %refreshed.user.id, "Session refreshed");
                self.store_session(Some(refreshed.clone())).await;
                self.emit(AuthEventKind::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, signing out locally");
                self.store_session(None).await;
                self.emit(AuthEventKind::SignedOut, None);
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let body = send(request).await.map_err(classify_auth_error)?;
        let session: Session = serde_json::from_value(body).map_err(BackendError::from)?;
        let session = session.with_expiry_from(Utc::now());

        self.store_session(Some(session.clone())).await;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));

        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let request = self.http.post(self.auth_url("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));

        let body = send(request).await.map_err(classify_auth_error)?;
        let outcome = parse_sign_up(body, Utc::now())?;

        if let Some(session) = &outcome.session {
            self.store_session(Some(session.clone())).await;
            self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        }

        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.current_session() {
            Some(session) => {
                let request = self
                    .http
                    .post(self.auth_url("logout"))
                    .bearer_auth(&session.access_token);
                match send(request).await {
                    Ok(_) => Ok(()),
                    // Token already invalid on the server
                    Err(BackendError::Api { status, .. })
                        if status == StatusCode::UNAUTHORIZED.as_u16()
                            || status == StatusCode::FORBIDDEN.as_u16()
                            || status == StatusCode::NOT_FOUND.as_u16() =>
                    {
                        Ok(())
                    }
                    Err(e) => Err(AuthError::Backend(e)),
                }
            }
            None => Ok(()),
        };

        self.store_session(None).await;
        self.emit(AuthEventKind::SignedOut, None);

        result
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataApi for RestBackend {
    async fn select(&self, query: &Query) -> BackendResult<Vec<JsonValue>> {
        let request = self
            .data_request(self.http.get(self.rest_url(&query.table)))
            .query(&query.to_params());

        let body = send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn select_one(&self, query: &Query) -> BackendResult<Option<JsonValue>> {
        let mut params = query.to_params();
        params.push(("limit".to_string(), "1".to_string()));

        let request = self
            .data_request(self.http.get(self.rest_url(&query.table)))
            .query(&params);

        let body = send(request).await?;
        let rows: Vec<JsonValue> = serde_json::from_value(body)?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: JsonValue) -> BackendResult<JsonValue> {
        let request = self
            .data_request(self.http.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(&[row]);

        let body = send(request).await.map_err(|e| policy_error(table, e))?;
        let rows: Vec<JsonValue> = serde_json::from_value(body)?;
        rows.into_iter().next().ok_or_else(|| BackendError::Api {
            status: StatusCode::OK.as_u16(),
            code: None,
            message: format!("Insert into {} returned no row", table),
        })
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: JsonValue,
    ) -> BackendResult<Vec<JsonValue>> {
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        let request = self
            .data_request(self.http.patch(self.rest_url(table)))
            .query(&params)
            .header("Prefer", "return=representation")
            .json(&patch);

        let body = send(request).await.map_err(|e| policy_error(table, e))?;
        Ok(serde_json::from_value(body)?)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<u64> {
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        let request = self
            .data_request(self.http.delete(self.rest_url(table)))
            .query(&params)
            .header("Prefer", "return=representation");

        let body = send(request).await.map_err(|e| policy_error(table, e))?;
        let rows: Vec<JsonValue> = serde_json::from_value(body)?;
        Ok(rows.len() as u64)
    }
}

/// Sends a request and returns its JSON body, mapping error statuses
async fn send(request: RequestBuilder) -> BackendResult<JsonValue> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &text));
    }

    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Builds an `Api` error from an error response body
fn api_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed.error_code.or_else(|| match parsed.code {
        Some(JsonValue::String(code)) => Some(code),
        _ => None,
    });
    let code = code.or(parsed.error.clone());

    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

    BackendError::Api {
        status,
        code,
        message,
    }
}

fn policy_error(table: &str, err: BackendError) -> BackendError {
    match err {
        BackendError::Api { code: Some(code), .. } if code == RLS_VIOLATION_CODE => {
            BackendError::PolicyViolation(table.to_string())
        }
        other => other,
    }
}

/// Maps GoTrue errors onto the auth error kinds a login form can show
fn classify_auth_error(err: BackendError) -> AuthError {
    let (code, message) = match &err {
        BackendError::Api { code, message, .. } => (
            code.clone().unwrap_or_default().to_lowercase(),
            message.to_lowercase(),
        ),
        _ => return AuthError::Backend(err),
    };

    if code == "invalid_credentials"
        || code == "invalid_grant"
        || message.contains("invalid login credentials")
    {
        AuthError::InvalidCredentials
    } else if code == "user_already_exists" || message.contains("already registered") {
        AuthError::UserAlreadyExists
    } else if code == "email_not_confirmed" || message.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if code == "weak_password" || message.contains("password should") {
        match err {
            BackendError::Api { message, .. } => AuthError::WeakPassword(message),
            other => AuthError::Backend(other),
        }
    } else {
        AuthError::Backend(err)
    }
}

/// Interprets a sign-up response: a session when the user is confirmed right
/// away, otherwise the bare user object
fn parse_sign_up(body: JsonValue, issued_at: chrono::DateTime<Utc>) -> Result<SignUpOutcome, AuthError> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body).map_err(BackendError::from)?;
        let session = session.with_expiry_from(issued_at);
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user: AuthUser = match body.get("user") {
        Some(user) if !user.is_null() => serde_json::from_value(user.clone()),
        _ => serde_json::from_value(body),
    }
    .map_err(BackendError::from)?;

    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

fn storage_error(err: std::io::Error) -> BackendError {
    BackendError::Storage(err.to_string())
}

/// Writes `bytes` to `path`, readable by the owner only on unix
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(SESSION_FILE_MODE);

    let mut file = options.open(path).await?;

    // The open mode only applies to new files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))
            .await?;
    }

    file.write_all(bytes).await?;
    file.flush().await
}

async fn load_session(path: &Path) -> BackendResult<Option<Session>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(storage_error(e)),
    }
}

/// Mode of the session file; it holds the refresh token
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

/// Mode of directories created for the session file
#[cfg(unix)]
const SESSION_DIR_MODE: u32 = 0o700;

async fn persist_session(path: &Path, session: Option<&Session>) -> BackendResult<()> {
    match session {
        Some(session) => {
            if let Some(parent) = path.parent() {
                let mut dirs = tokio::fs::DirBuilder::new();
                dirs.recursive(true);
                #[cfg(unix)]
                dirs.mode(SESSION_DIR_MODE);
                dirs.create(parent).await.map_err(storage_error)?;
            }

            let bytes = serde_json::to_vec_pretty(session)?;
            write_private(path, &bytes).await.map_err(storage_error)
        }
        None => match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn backend() -> RestBackend {
        RestBackend::new(BackendConfig::new("https://demo.supabase.co/", "anon-key")).unwrap()
    }

    fn session() -> Session {
        Session {
            access_token: "user-token".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: Some(Utc::now().timestamp() + 3600),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("ana@example.com".to_string()),
                user_metadata: JsonValue::Null,
            },
        }
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(backend.rest_url("cases"), "https://demo.supabase.co/rest/v1/cases");
        assert_eq!(backend.auth_url("signup"), "https://demo.supabase.co/auth/v1/signup");
    }

    #[test]
    fn test_bearer_falls_back_to_anon_key() {
        let backend = backend();
        assert_eq!(backend.bearer(), "anon-key");

        backend.set_session(Some(session()));
        assert_eq!(backend.bearer(), "user-token");
    }

    #[test]
    fn test_api_error_parses_postgrest_body() {
        let err = api_error(
            403,
            r#"{"code":"42501","message":"new row violates row-level security policy","details":null,"hint":null}"#,
        );
        match &err {
            BackendError::Api { status, code, message } => {
                assert_eq!(*status, 403);
                assert_eq!(code.as_deref(), Some("42501"));
                assert!(message.contains("row-level security"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            policy_error("cases", err),
            BackendError::PolicyViolation(table) if table == "cases"
        ));
    }

    #[test]
    fn test_api_error_handles_plain_text() {
        match api_error(502, "Bad Gateway") {
            BackendError::Api { message, code, .. } => {
                assert_eq!(message, "Bad Gateway");
                assert!(code.is_none());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_classify_auth_errors() {
        let invalid = api_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(classify_auth_error(invalid), AuthError::InvalidCredentials));

        let exists = api_error(
            422,
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
        );
        assert!(matches!(classify_auth_error(exists), AuthError::UserAlreadyExists));

        let weak = api_error(
            422,
            r#"{"code":422,"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#,
        );
        assert!(matches!(classify_auth_error(weak), AuthError::WeakPassword(_)));

        let transport = BackendError::Transport("timeout".to_string());
        assert!(matches!(classify_auth_error(transport), AuthError::Backend(_)));
    }

    #[test]
    fn test_parse_sign_up_without_session() {
        let id = Uuid::new_v4();
        let outcome = parse_sign_up(
            json!({"id": id, "email": "bruno@example.com", "user_metadata": {"full_name": "Bruno"}}),
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.needs_confirmation());
        assert_eq!(outcome.user.id, id);
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let id = Uuid::new_v4();
        let issued = Utc::now();
        let outcome = parse_sign_up(
            json!({
                "access_token": "a",
                "refresh_token": "r",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": id, "email": "bruno@example.com"}
            }),
            issued,
        )
        .unwrap();
        let session = outcome.session.unwrap();
        assert_eq!(session.expires_at, Some(issued.timestamp() + 3600));
        assert_eq!(outcome.user.id, id);
    }

    #[tokio::test]
    async fn test_session_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("lexdesk-test-{}", Uuid::new_v4()))
            .join("session.json");

        assert!(load_session(&path).await.unwrap().is_none());

        let original = session();
        persist_session(&path, Some(&original)).await.unwrap();
        let restored = load_session(&path).await.unwrap().unwrap();
        assert_eq!(restored, original);

        persist_session(&path, None).await.unwrap();
        assert!(load_session(&path).await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("lexdesk-test-{}", Uuid::new_v4()));
        let path = dir.join("lexdesk").join("session.json");

        // A pre-existing world-readable file is tightened on write
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"{}").await.unwrap();
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .await
            .unwrap();

        let original = session();
        persist_session(&path, Some(&original)).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_session(&path).await.unwrap(), Some(original));

        let fresh = dir.join("nested").join("session.json");
        persist_session(&fresh, Some(&session())).await.unwrap();
        let file_mode = tokio::fs::metadata(&fresh).await.unwrap().permissions().mode();
        let dir_mode = tokio::fs::metadata(fresh.parent().unwrap())
            .await
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o077, 0);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_session_restores_from_file() {
        let path = std::env::temp_dir()
            .join(format!("lexdesk-test-{}", Uuid::new_v4()))
            .join("session.json");
        let original = session();
        persist_session(&path, Some(&original)).await.unwrap();

        let mut config = BackendConfig::new("https://demo.supabase.co", "anon-key");
        config.session_file = Some(path.clone());
        let backend = RestBackend::new(config).unwrap();

        let restored = backend.get_session().await.unwrap().unwrap();
        assert_eq!(restored.user.id, original.user.id);
        assert_eq!(backend.bearer(), "user-token");

        persist_session(&path, None).await.unwrap();
    }
}
