/// Error handling for the terminal front-end
///
/// This module provides a unified error type for every command. Handlers
/// return `Result<T, CliError>`; the binary prints the error and exits with
/// [`CliError::exit_code`].
///
/// # Example
///
/// ```
/// use lexdesk_cli::error::{CliError, CliResult};
///
/// fn parse_limit(raw: &str) -> CliResult<usize> {
///     raw.parse()
///         .map_err(|_| CliError::BadRequest(format!("Invalid limit '{}'", raw)))
/// }
///
/// assert_eq!(parse_limit("5").unwrap(), 5);
/// assert_eq!(parse_limit("x").unwrap_err().exit_code(), 2);
/// ```

use lexdesk_session::filter::FilterError;
use lexdesk_session::resources::StoreError;
use lexdesk_shared::backend::{AuthError, BackendError};
use lexdesk_shared::config::ConfigError;
use lexdesk_shared::models::CaseInputError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CLI result type alias
pub type CliResult<T> = Result<T, CliError>;

/// Unified CLI error type
#[derive(Debug)]
pub enum CliError {
    /// Unusable arguments (exit 2)
    BadRequest(String),

    /// Not signed in or credentials rejected (exit 3)
    Unauthorized(String),

    /// Rejected by row-level security (exit 3)
    Forbidden(String),

    /// Unknown route, organization or record (exit 4)
    NotFound(String),

    /// Conflict (exit 5) - e.g., email already registered
    Conflict(String),

    /// Input validation errors (exit 6)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Missing or invalid configuration (exit 78)
    Config(String),

    /// Backend unreachable (exit 69)
    ServiceUnavailable(String),

    /// Anything else (exit 1)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error output in `--json` mode
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::BadRequest(_) => 2,
            CliError::Unauthorized(_) | CliError::Forbidden(_) => 3,
            CliError::NotFound(_) => 4,
            CliError::Conflict(_) => 5,
            CliError::ValidationError(_) => 6,
            CliError::ServiceUnavailable(_) => 69,
            CliError::Config(_) => 78,
            CliError::InternalError(_) => 1,
        }
    }

    /// Machine-readable form of the error
    pub fn to_response(&self) -> ErrorResponse {
        let (error_code, message, details) = match self {
            CliError::BadRequest(msg) => ("bad_request", msg.clone(), None),
            CliError::Unauthorized(msg) => ("unauthorized", msg.clone(), None),
            CliError::Forbidden(msg) => ("forbidden", msg.clone(), None),
            CliError::NotFound(msg) => ("not_found", msg.clone(), None),
            CliError::Conflict(msg) => ("conflict", msg.clone(), None),
            CliError::ValidationError(errors) => (
                "validation_error",
                "Input validation failed".to_string(),
                Some(errors.clone()),
            ),
            CliError::Config(msg) => ("config_error", msg.clone(), None),
            CliError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            CliError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            CliError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            CliError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            CliError::NotFound(msg) => write!(f, "Not found: {}", msg),
            CliError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            CliError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            CliError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

/// Flattens validator output into field/message pairs
pub fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();

    // field_errors() is a HashMap
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

impl From<validator::ValidationErrors> for CliError {
    fn from(err: validator::ValidationErrors) -> Self {
        CliError::ValidationError(validation_details(&err))
    }
}

/// Convert backend errors to CLI errors
impl From<BackendError> for CliError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Api {
                status, message, ..
            } => match status {
                400 | 422 => CliError::BadRequest(message),
                401 => CliError::Unauthorized(message),
                403 => CliError::Forbidden(message),
                404 => CliError::NotFound(message),
                409 => CliError::Conflict(message),
                _ => CliError::InternalError(format!("Backend error ({}): {}", status, message)),
            },
            BackendError::Transport(msg) => CliError::ServiceUnavailable(msg),
            BackendError::NotAuthenticated => {
                CliError::Unauthorized("Not signed in".to_string())
            }
            BackendError::PolicyViolation(table) => CliError::Forbidden(format!(
                "Not allowed to modify {} in this organization",
                table
            )),
            BackendError::Decode(e) => {
                CliError::InternalError(format!("Unexpected response: {}", e))
            }
            BackendError::Storage(msg) => CliError::InternalError(msg),
        }
    }
}

/// Convert auth errors to CLI errors
impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                CliError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::EmailNotConfirmed => {
                CliError::Unauthorized("Email not confirmed".to_string())
            }
            AuthError::UserAlreadyExists => {
                CliError::Conflict("Email already registered".to_string())
            }
            AuthError::WeakPassword(msg) => CliError::ValidationError(vec![ValidationErrorDetail {
                field: "password".to_string(),
                message: msg,
            }]),
            AuthError::Backend(e) => e.into(),
        }
    }
}

/// Convert store errors to CLI errors
impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(e) => e.into(),
            StoreError::Validation(e) => e.into(),
            StoreError::Encode(e) => CliError::InternalError(format!("Failed to encode row: {}", e)),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<FilterError> for CliError {
    fn from(err: FilterError) -> Self {
        CliError::BadRequest(err.to_string())
    }
}

impl From<CaseInputError> for CliError {
    fn from(err: CaseInputError) -> Self {
        CliError::ValidationError(vec![ValidationErrorDetail {
            field: "estimated_value".to_string(),
            message: err.to_string(),
        }])
    }
}
