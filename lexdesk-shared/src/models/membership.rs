/// Organization membership model
///
/// A membership links a user to an organization with a role. The signed-in
/// user's membership list is loaded right after authentication, joined with
/// the organization it points to.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organization_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     role TEXT NOT NULL DEFAULT 'lawyer',
///     permissions TEXT[],
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (organization_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: Firm owner
/// - **admin**: Manages members and settings
/// - **lawyer**: Works cases
/// - **assistant**: Paralegal / support staff
///
/// Roles are stored as free text, so unknown values are kept verbatim and
/// [`OrganizationMembership::role_kind`] returns `None` for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{organization::Organization, profile::Profile};

/// Known membership roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Lawyer,
    Assistant,
}

impl MemberRole {
    /// Converts role to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Lawyer => "lawyer",
            MemberRole::Assistant => "assistant",
        }
    }

    /// Parses role from its stored string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MemberRole::Owner),
            "admin" => Some(MemberRole::Admin),
            "lawyer" => Some(MemberRole::Lawyer),
            "assistant" => Some(MemberRole::Assistant),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            MemberRole::Owner => "Proprietário",
            MemberRole::Admin => "Administrador",
            MemberRole::Lawyer => "Advogado",
            MemberRole::Assistant => "Assistente",
        }
    }
}

/// Membership row, optionally joined with its organization and profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub user_id: Uuid,

    /// Role as stored (see [`MemberRole`])
    pub role: String,

    pub permissions: Option<Vec<String>>,

    pub joined_at: DateTime<Utc>,

    /// Embedded `organizations` row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,

    /// Embedded `profiles` row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl OrganizationMembership {
    /// Remote table name
    pub const TABLE: &'static str = "organization_members";

    /// Parsed role, if it is one of the known roles
    pub fn role_kind(&self) -> Option<MemberRole> {
        MemberRole::from_str(&self.role)
    }

    /// Organization name, falling back to the organization id when the
    /// organization was not embedded
    pub fn organization_name(&self) -> String {
        self.organization
            .as_ref()
            .map(|o| o.name.clone())
            .unwrap_or_else(|| self.organization_id.to_string())
    }

    /// Whether this membership matches a user-supplied selector: the
    /// organization id, its slug, or its name (case-insensitive)
    pub fn matches_selector(&self, selector: &str) -> bool {
        if self.organization_id.to_string() == selector {
            return true;
        }

        match &self.organization {
            Some(org) => org.slug == selector || org.name.eq_ignore_ascii_case(selector),
            None => false,
        }
    }
}
