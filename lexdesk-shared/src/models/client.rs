/// Client model
///
/// Clients are tenant-scoped contact records, either individuals or
/// companies. Every row carries the id of the organization it belongs to;
/// the session stores stamp it on insert.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     type TEXT NOT NULL CHECK (type IN ('individual', 'company')),
///     name TEXT NOT NULL,
///     email TEXT,
///     phone TEXT,
///     document_number TEXT,
///     address JSONB,
///     notes TEXT,
///     status TEXT NOT NULL DEFAULT 'active'
///         CHECK (status IN ('active', 'inactive', 'archived')),
///     created_by UUID REFERENCES profiles(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

/// Individual person or company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Individual,
    Company,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Individual => "individual",
            ClientType::Company => "company",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(ClientType::Individual),
            "company" => Some(ClientType::Company),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ClientType::Individual => "Pessoa Física",
            ClientType::Company => "Pessoa Jurídica",
        }
    }
}

/// Lifecycle status of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    Archived,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ClientStatus::Active),
            "inactive" => Some(ClientStatus::Inactive),
            "archived" => Some(ClientStatus::Archived),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::Active => "Ativo",
            ClientStatus::Inactive => "Inativo",
            ClientStatus::Archived => "Arquivado",
        }
    }
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Active
    }
}

/// Client row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    #[serde(rename = "type")]
    pub client_type: ClientType,

    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    /// CPF / CNPJ
    pub document_number: Option<String>,

    /// Structured address (free-form JSON)
    pub address: Option<JsonValue>,

    pub notes: Option<String>,

    pub status: ClientStatus,

    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Remote table name
    pub const TABLE: &'static str = "clients";
}

/// Input for creating a client
///
/// `organization_id` is absent: it is always taken from the
/// active membership at insert time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewClient {
    #[serde(rename = "type")]
    pub client_type: ClientType,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: ClientStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
}

impl NewClient {
    /// Minimal active client of the given type
    pub fn new(client_type: ClientType, name: impl Into<String>) -> Self {
        Self {
            client_type,
            name: name.into(),
            email: None,
            phone: None,
            document_number: None,
            address: None,
            notes: None,
            status: ClientStatus::Active,
            created_by: None,
        }
    }
}

/// Partial update for a client; only `Some` fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ClientPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ClientType>,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
}

impl ClientPatch {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.client_type.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.document_number.is_none()
            && self.notes.is_none()
            && self.status.is_none()
    }
}
