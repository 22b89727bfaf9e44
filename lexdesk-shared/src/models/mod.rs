/// Row types for the hosted LexDesk tables
///
/// Every type here mirrors one remote table (or a projection of it). Rows are
/// read and written as JSON through the [`crate::backend`] boundary; nothing in
/// this module talks to the network itself.
///
/// # Models
///
/// - `profile`: One record per authenticated user (read-only here)
/// - `organization`: Tenants (read-only here)
/// - `membership`: User-organization links with a role
/// - `client`: Tenant-scoped contacts
/// - `case`: Tenant-scoped legal matters
/// - `case_document`: Documents attached to cases (only counted)
///
/// # Example
///
/// ```
/// use lexdesk_shared::models::case::{CaseStatus, NewCase};
/// use uuid::Uuid;
///
/// let new_case = NewCase::new("Ação de cobrança", Uuid::new_v4());
/// assert_eq!(new_case.status, CaseStatus::Open);
/// assert!(new_case.case_number.starts_with("CASE-"));
/// ```

pub mod case;
pub mod case_document;
pub mod client;
pub mod membership;
pub mod organization;
pub mod profile;

pub use case::{BillingType, Case, CaseInputError, CasePatch, CasePriority, CaseStatus, NewCase};
pub use case_document::CaseDocument;
pub use client::{Client, ClientPatch, ClientStatus, ClientType, NewClient};
pub use membership::{MemberRole, OrganizationMembership};
pub use organization::Organization;
pub use profile::Profile;
