/// List search and filters
///
/// Searches are case-insensitive substring matches. An empty search matches
/// everything; a `None` status or type filter stands for "all".

use lexdesk_shared::models::{Case, CaseStatus, Client, ClientType};

/// Filter argument errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error("Unknown case status '{0}'")]
    UnknownStatus(String),

    #[error("Unknown client type '{0}'")]
    UnknownType(String),
}

/// Parses a status filter argument; `all` means no filter
pub fn parse_status_filter(value: &str) -> Result<Option<CaseStatus>, FilterError> {
    let value = value.trim().to_lowercase();
    if value == "all" {
        return Ok(None);
    }
    CaseStatus::from_str(&value)
        .map(Some)
        .ok_or(FilterError::UnknownStatus(value))
}

/// Parses a client type filter argument; `all` means no filter
pub fn parse_type_filter(value: &str) -> Result<Option<ClientType>, FilterError> {
    let value = value.trim().to_lowercase();
    if value == "all" {
        return Ok(None);
    }
    ClientType::from_str(&value)
        .map(Some)
        .ok_or(FilterError::UnknownType(value))
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Case list filter: title, client name or case number, plus status
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub search: String,
    pub status: Option<CaseStatus>,
}

impl CaseFilter {
    pub fn new(search: impl Into<String>, status: Option<CaseStatus>) -> Self {
        CaseFilter {
            search: search.into(),
            status,
        }
    }

    pub fn matches(&self, case: &Case) -> bool {
        let needle = self.search.trim().to_lowercase();

        let text_match = needle.is_empty()
            || contains(Some(case.title.as_str()), &needle)
            || contains(case.client_name(), &needle)
            || contains(Some(case.case_number.as_str()), &needle);

        let status_match = self.status.map_or(true, |status| case.status == status);

        text_match && status_match
    }

    pub fn apply<'a>(&self, cases: &'a [Case]) -> Vec<&'a Case> {
        cases.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Client list filter: name, email or document number, plus type
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub search: String,
    pub client_type: Option<ClientType>,
}

impl ClientFilter {
    pub fn new(search: impl Into<String>, client_type: Option<ClientType>) -> Self {
        ClientFilter {
            search: search.into(),
            client_type,
        }
    }

    pub fn matches(&self, client: &Client) -> bool {
        let needle = self.search.trim().to_lowercase();

        let text_match = needle.is_empty()
            || contains(Some(client.name.as_str()), &needle)
            || contains(client.email.as_deref(), &needle)
            || contains(client.document_number.as_deref(), &needle);

        let type_match = self.client_type.map_or(true, |t| client.client_type == t);

        text_match && type_match
    }

    pub fn apply<'a>(&self, clients: &'a [Client]) -> Vec<&'a Client> {
        clients.iter().filter(|c| self.matches(c)).collect()
    }
}
