/// Case model
///
/// A case is a legal matter belonging to one client within one organization.
/// List queries embed the client and the responsible lawyer's profile.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cases (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     client_id UUID NOT NULL REFERENCES clients(id),
///     case_number TEXT NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT,
///     case_type TEXT NOT NULL,
///     practice_area TEXT,
///     court_instance TEXT,
///     court_name TEXT,
///     process_number TEXT,
///     status TEXT NOT NULL DEFAULT 'open',
///     priority TEXT NOT NULL DEFAULT 'medium',
///     estimated_value NUMERIC,
///     responsible_lawyer_id UUID REFERENCES profiles(id),
///     assigned_lawyers UUID[],
///     start_date DATE,
///     expected_end_date DATE,
///     actual_end_date DATE,
///     billing_rate NUMERIC,
///     billing_type TEXT NOT NULL DEFAULT 'hourly',
///     created_by UUID REFERENCES profiles(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use lexdesk_shared::models::case::{CasePriority, NewCase};
/// use uuid::Uuid;
///
/// let mut new_case = NewCase::new("Reclamação trabalhista", Uuid::new_v4());
/// new_case.priority = CasePriority::High;
/// new_case.estimated_value = NewCase::parse_estimated_value("15000.50").unwrap();
/// assert_eq!(new_case.estimated_value, Some(15000.50));
/// ```

use chrono::{Datelike, DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{client::Client, profile::Profile};

/// Case lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Pending,
    Closed,
    Archived,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Pending => "pending",
            CaseStatus::Closed => "closed",
            CaseStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(CaseStatus::Open),
            "in_progress" => Some(CaseStatus::InProgress),
            "pending" => Some(CaseStatus::Pending),
            "closed" => Some(CaseStatus::Closed),
            "archived" => Some(CaseStatus::Archived),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            CaseStatus::Open => "Aberto",
            CaseStatus::InProgress => "Em Andamento",
            CaseStatus::Pending => "Pendente",
            CaseStatus::Closed => "Fechado",
            CaseStatus::Archived => "Arquivado",
        }
    }

    /// Open and in-progress cases count as active on the dashboard
    pub fn is_active(&self) -> bool {
        matches!(self, CaseStatus::Open | CaseStatus::InProgress)
    }
}

impl Default for CaseStatus {
    fn default() -> Self {
        CaseStatus::Open
    }
}

/// Case priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl CasePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            CasePriority::Low => "low",
            CasePriority::Medium => "medium",
            CasePriority::High => "high",
            CasePriority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(CasePriority::Low),
            "medium" => Some(CasePriority::Medium),
            "high" => Some(CasePriority::High),
            "urgent" => Some(CasePriority::Urgent),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            CasePriority::Low => "Baixa",
            CasePriority::Medium => "Média",
            CasePriority::High => "Alta",
            CasePriority::Urgent => "Urgente",
        }
    }
}

impl Default for CasePriority {
    fn default() -> Self {
        CasePriority::Medium
    }
}

/// How the case is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingType {
    Hourly,
    Fixed,
    Contingency,
}

impl BillingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingType::Hourly => "hourly",
            BillingType::Fixed => "fixed",
            BillingType::Contingency => "contingency",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "hourly" => Some(BillingType::Hourly),
            "fixed" => Some(BillingType::Fixed),
            "contingency" => Some(BillingType::Contingency),
            _ => None,
        }
    }
}

impl Default for BillingType {
    fn default() -> Self {
        BillingType::Hourly
    }
}

/// Case row, optionally joined with its client and responsible lawyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    pub client_id: Uuid,

    /// Human-facing number, e.g. `CASE-2024-0042`
    pub case_number: String,

    pub title: String,

    pub description: Option<String>,

    /// Area label chosen on creation ("Cível", "Trabalhista", ...)
    pub case_type: String,

    pub practice_area: Option<String>,

    pub court_instance: Option<String>,

    pub court_name: Option<String>,

    /// Court process number (CNJ)
    pub process_number: Option<String>,

    pub status: CaseStatus,

    pub priority: CasePriority,

    pub estimated_value: Option<f64>,

    pub responsible_lawyer_id: Option<Uuid>,

    pub assigned_lawyers: Option<Vec<Uuid>>,

    pub start_date: Option<NaiveDate>,

    pub expected_end_date: Option<NaiveDate>,

    pub actual_end_date: Option<NaiveDate>,

    pub billing_rate: Option<f64>,

    pub billing_type: BillingType,

    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Embedded `clients` row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,

    /// Embedded `profiles` row of the responsible lawyer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_lawyer: Option<Profile>,
}

impl Case {
    /// Remote table name
    pub const TABLE: &'static str = "cases";

    /// Name of the embedded client, if it was loaded
    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.name.as_str())
    }
}

/// Errors from parsing case form input
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaseInputError {
    #[error("Invalid estimated value '{0}': expected a decimal number")]
    InvalidValue(String),

    #[error("Estimated value must not be negative")]
    NegativeValue,
}

/// Input for creating a case
///
/// `organization_id` is absent: it is always taken from the
/// active membership at insert time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCase {
    pub client_id: Uuid,

    pub case_number: String,

    #[validate(length(min = 1, max = 300, message = "Title must be between 1 and 300 characters"))]
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub case_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_area: Option<String>,

    pub status: CaseStatus,

    pub priority: CasePriority,

    #[validate(range(min = 0.0, message = "Estimated value must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,

    pub billing_type: BillingType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_lawyer_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
}

impl NewCase {
    /// Case with the creation-form defaults: open, medium priority, hourly
    /// billing and a freshly generated case number
    pub fn new(title: impl Into<String>, client_id: Uuid) -> Self {
        Self {
            client_id,
            case_number: generate_case_number(Utc::now().year(), &mut rand::thread_rng()),
            title: title.into(),
            description: None,
            case_type: String::new(),
            practice_area: None,
            status: CaseStatus::default(),
            priority: CasePriority::default(),
            estimated_value: None,
            billing_type: BillingType::default(),
            responsible_lawyer_id: None,
            start_date: None,
            created_by: None,
        }
    }

    /// Parses the free-text estimated value field
    ///
    /// Empty input means "no value". A comma is accepted as decimal separator.
    pub fn parse_estimated_value(input: &str) -> Result<Option<f64>, CaseInputError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value = trimmed
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| CaseInputError::InvalidValue(trimmed.to_string()))?;

        if !value.is_finite() {
            return Err(CaseInputError::InvalidValue(trimmed.to_string()));
        }
        if value < 0.0 {
            return Err(CaseInputError::NegativeValue);
        }

        Ok(Some(value))
    }
}

/// Generates a case number `CASE-{year}-{NNNN}` with a random four digit suffix
pub fn generate_case_number<R: Rng>(year: i32, rng: &mut R) -> String {
    let suffix: u32 = rng.gen_range(0..10_000);
    format!("CASE-{}-{:04}", year, suffix)
}

/// Partial update for a case; only `Some` fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CasePatch {
    #[validate(length(min = 1, max = 300, message = "Title must be between 1 and 300 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<CasePriority>,

    #[validate(range(min = 0.0, message = "Estimated value must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_lawyer_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_end_date: Option<NaiveDate>,
}

impl CasePatch {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.case_type.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.estimated_value.is_none()
            && self.responsible_lawyer_id.is_none()
            && self.actual_end_date.is_none()
    }
}
