/// Backend configuration
///
/// This module loads the hosted backend endpoint and public API key from
/// environment variables. Both values are required; a missing value is a
/// fatal startup error for every LexDesk binary.
///
/// # Environment Variables
///
/// - `SUPABASE_URL`: Base URL of the hosted backend (required)
/// - `SUPABASE_ANON_KEY`: Public (anon) API key (required)
/// - `LEXDESK_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 30)
/// - `LEXDESK_SESSION_FILE`: Where the signed-in session is persisted
///   (default: `<config dir>/lexdesk/session.json`)
///
/// # Example
///
/// ```no_run
/// use lexdesk_shared::config::BackendConfig;
///
/// # fn example() -> Result<(), lexdesk_shared::config::ConfigError> {
/// let config = BackendConfig::from_env()?;
/// println!("Backend: {}", config.url);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the backend URL
pub const URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the public API key
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

const TIMEOUT_VAR: &str = "LEXDESK_REQUEST_TIMEOUT_SECS";
const SESSION_FILE_VAR: &str = "LEXDESK_SESSION_FILE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// An environment variable has an unusable value
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Connection settings for the hosted backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,

    /// Public API key sent as `apikey` on every request
    pub anon_key: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Session persistence file; `None` keeps the session in memory only
    pub session_file: Option<PathBuf>,
}

impl BackendConfig {
    /// Creates a configuration with default timeout and no session file
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_file: None,
        }
    }

    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the URL or key is unset or empty and
    /// `ConfigError::Invalid` if a value cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = required(URL_VAR)?;
        let anon_key = required(ANON_KEY_VAR)?;

        let request_timeout_secs = match env::var(TIMEOUT_VAR) {
            Ok(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: TIMEOUT_VAR,
                message: e.to_string(),
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let session_file = env::var(SESSION_FILE_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(default_session_file);

        let config = Self {
            request_timeout_secs,
            session_file,
            ..Self::new(url, anon_key)
        };
        config.validate()?;

        Ok(config)
    }

    /// Checks that the URL is an absolute http(s) URL and the timeout is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                var: URL_VAR,
                message: format!("expected an http(s) URL, got '{}'", self.url),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: TIMEOUT_VAR,
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn default_session_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lexdesk").join("session.json"))
}
