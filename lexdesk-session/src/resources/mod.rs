/// Organization-scoped resource stores
///
/// Each store holds one collection of the active organization plus its
/// loading flag and last error. Mutations never merge locally: after a
/// successful create, update or delete the whole collection is fetched again.
///
/// Every operation is a no-op while no organization is active.
///
/// # Stores
///
/// - [`CaseStore`]: cases with their client and responsible lawyer embedded
/// - [`ClientStore`]: clients
/// - [`StatsStore`]: dashboard statistics

pub mod cases;
pub mod clients;
pub mod stats;

pub use cases::CaseStore;
pub use clients::ClientStore;
pub use stats::{DashboardStats, StatsStore};

use crate::controller::AuthController;
use lexdesk_shared::backend::{select_as, BackendError, DataApi, Filter, Query};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;
use validator::Validate;

/// Store operation errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Input rejected before reaching the backend
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Row type living in an organization-scoped table
pub trait TenantResource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Creation input; must not carry `organization_id`
    type New: Serialize + Validate + Send + Sync;

    /// Partial update input
    type Patch: Serialize + Validate + Send + Sync;

    /// Remote table name
    const TABLE: &'static str;

    /// Query listing every row of `organization_id`
    fn list_query(organization_id: Uuid) -> Query;

    fn id(&self) -> Uuid;
}

/// Snapshot of a store
#[derive(Debug, Clone)]
pub struct ResourceState<R> {
    pub items: Vec<R>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<R> Default for ResourceState<R> {
    fn default() -> Self {
        ResourceState {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Store for one organization-scoped collection
pub struct Collection<R: TenantResource> {
    auth: Arc<AuthController>,
    state: RwLock<ResourceState<R>>,
}

impl<R: TenantResource> Collection<R> {
    pub fn new(auth: Arc<AuthController>) -> Self {
        Collection {
            auth,
            state: RwLock::new(ResourceState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ResourceState<R>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResourceState<R>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_error(&self, operation: &str, err: &BackendError) {
        tracing::error!(table = R::TABLE, operation, error = %err, "Resource operation failed");
        self.write().error = Some(err.to_string());
    }

    /// Replaces the collection with the active organization's rows
    ///
    /// Failures are recorded in [`Collection::error`]; the previous items
    /// are kept.
    pub async fn fetch_all(&self) {
        let Some(organization_id) = self.auth.active_organization_id() else {
            tracing::debug!(table = R::TABLE, "No active organization, skipping fetch");
            return;
        };

        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
        }

        let backend = self.auth.backend();
        let result = select_as::<R, _>(backend.as_ref(), &R::list_query(organization_id)).await;

        match result {
            Ok(items) => {
                tracing::debug!(table = R::TABLE, count = items.len(), "Fetched collection");
                let mut state = self.write();
                state.items = items;
                state.loading = false;
            }
            Err(e) => {
                self.record_error("fetch", &e);
                self.write().loading = false;
            }
        }
    }

    /// Inserts a row into the active organization and refetches
    ///
    /// Returns `Ok(None)` without doing anything when no organization is
    /// active.
    pub async fn create(&self, new: R::New) -> Result<Option<R>, StoreError> {
        let Some(organization_id) = self.auth.active_organization_id() else {
            return Ok(None);
        };

        new.validate()?;

        let mut row = serde_json::to_value(&new)?;
        if let JsonValue::Object(object) = &mut row {
            object.insert(
                "organization_id".to_string(),
                JsonValue::String(organization_id.to_string()),
            );
        }

        let stored = match self.auth.backend().insert(R::TABLE, row).await {
            Ok(stored) => stored,
            Err(e) => {
                self.record_error("create", &e);
                return Err(e.into());
            }
        };
        let created: R = serde_json::from_value(stored).map_err(BackendError::from)?;

        tracing::info!(table = R::TABLE, id = %created.id(), "Created row");
        self.fetch_all().await;

        Ok(Some(created))
    }

    /// Applies `patch` to row `id` of the active organization and refetches
    pub async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let Some(organization_id) = self.auth.active_organization_id() else {
            return Ok(None);
        };

        patch.validate()?;

        let filters = scoped_filters(id, organization_id);
        let patch = serde_json::to_value(&patch)?;

        let rows = match self.auth.backend().update(R::TABLE, &filters, patch).await {
            Ok(rows) => rows,
            Err(e) => {
                self.record_error("update", &e);
                return Err(e.into());
            }
        };
        let updated = rows
            .into_iter()
            .next()
            .map(serde_json::from_value::<R>)
            .transpose()
            .map_err(BackendError::from)?;

        tracing::info!(table = R::TABLE, id = %id, found = updated.is_some(), "Updated row");
        self.fetch_all().await;

        Ok(updated)
    }

    /// Deletes row `id` of the active organization and refetches
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let Some(organization_id) = self.auth.active_organization_id() else {
            return Ok(());
        };

        let filters = scoped_filters(id, organization_id);

        match self.auth.backend().delete(R::TABLE, &filters).await {
            Ok(removed) => {
                tracing::info!(table = R::TABLE, id = %id, removed, "Deleted row");
            }
            Err(e) => {
                self.record_error("delete", &e);
                return Err(e.into());
            }
        }

        self.fetch_all().await;
        Ok(())
    }

    /// Items from the last successful fetch
    pub fn items(&self) -> Vec<R> {
        self.read().items.clone()
    }

    pub fn find(&self, id: Uuid) -> Option<R> {
        self.read().items.iter().find(|item| item.id() == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Message of the last failed operation
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn snapshot(&self) -> ResourceState<R> {
        self.read().clone()
    }
}

/// Row filter pinned to the active organization
fn scoped_filters(id: Uuid, organization_id: Uuid) -> Vec<Filter> {
    vec![
        Filter::eq("id", id),
        Filter::eq("organization_id", organization_id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_filters() {
        let id = Uuid::new_v4();
        let org = Uuid::new_v4();
        let filters = scoped_filters(id, org);
        assert_eq!(filters[0], Filter::eq("id", id));
        assert_eq!(filters[1], Filter::eq("organization_id", org));
    }

    #[test]
    fn test_default_state() {
        let state: ResourceState<String> = ResourceState::default();
        assert!(state.items.is_empty());
        assert!(!state.loading);
        assert!(state.error.is_none());
    }
}
