/// Configuration management for the terminal front-end
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `SUPABASE_URL`: Base URL of the hosted backend (required)
/// - `SUPABASE_ANON_KEY`: Public API key (required)
/// - `LEXDESK_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 30)
/// - `LEXDESK_SESSION_FILE`: Persisted session location
/// - `LEXDESK_ORGANIZATION`: Organization to activate after sign-in
///   (id, slug or name; default: the first membership)
/// - `RUST_LOG`: Log filter (default: warn for the lexdesk crates)
///
/// # Example
///
/// ```no_run
/// use lexdesk_cli::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Backend: {}", config.backend.url);
/// # Ok(())
/// # }
/// ```

use lexdesk_shared::config::BackendConfig;
use serde::{Deserialize, Serialize};
use std::env;

const ORGANIZATION_VAR: &str = "LEXDESK_ORGANIZATION";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    pub backend: BackendConfig,

    /// Organization selector applied once the user's memberships are loaded
    pub organization: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `SUPABASE_URL` or `SUPABASE_ANON_KEY` is missing
    /// - A variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let backend = BackendConfig::from_env()?;

        let organization = env::var(ORGANIZATION_VAR)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            backend,
            organization,
        })
    }

    /// Overrides the organization selector (e.g. from `--org`)
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        if organization.is_some() {
            self.organization = organization;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_environment_selector() {
        let config = Config {
            backend: BackendConfig::new("http://localhost:54321", "anon"),
            organization: Some("alpha".to_string()),
        };

        let kept = config.clone().with_organization(None);
        assert_eq!(kept.organization.as_deref(), Some("alpha"));

        let overridden = config.with_organization(Some("beta".to_string()));
        assert_eq!(overridden.organization.as_deref(), Some("beta"));
    }
}
