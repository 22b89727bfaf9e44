/// Organization (tenant) model
///
/// Organizations are the scoping boundary for all client and case data.
/// LexDesk never creates or mutates them; they arrive embedded in the
/// membership list of the signed-in user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A law firm or practice using LexDesk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,

    pub name: String,

    /// URL-friendly unique name
    pub slug: String,

    pub description: Option<String>,

    pub logo_url: Option<String>,

    /// Billing plan name as stored by the backend
    pub subscription_plan: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Remote table name
    pub const TABLE: &'static str = "organizations";
}
