/// Case document model
///
/// Documents are attached to a case and scoped to its organization. LexDesk
/// does not upload or render them; the dashboard only counts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: Uuid,

    pub case_id: Uuid,

    pub organization_id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// Storage object path
    pub file_path: Option<String>,

    /// Size in bytes
    pub file_size: Option<i64>,

    /// MIME type
    pub file_type: Option<String>,

    pub document_type: Option<String>,

    pub is_confidential: bool,

    pub tags: Option<Vec<String>>,

    pub uploaded_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl CaseDocument {
    /// Remote table name
    pub const TABLE: &'static str = "case_documents";
}
