/// Dashboard statistics
///
/// Three light-weight queries (cases, clients, case documents) are run
/// concurrently for the active organization and reduced into
/// [`DashboardStats`].
///
/// # Figures
///
/// - **active_cases**: cases whose status is `open` or `in_progress`
/// - **monthly_revenue**: sum of `estimated_value` over cases that are not
///   `closed` and carry a non-zero value
/// - **\*_change**: rows created after the same calendar day one month ago
///
/// The revenue change has no data source yet and is reported as
/// [`PLACEHOLDER_REVENUE_CHANGE`].

use crate::controller::AuthController;
use chrono::{DateTime, Months, TimeZone, Utc};
use lexdesk_shared::backend::{select_as, BackendError, Query};
use lexdesk_shared::models::{Case, CaseDocument, CaseStatus, Client};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Revenue change shown until revenue history exists
pub const PLACEHOLDER_REVENUE_CHANGE: f64 = 15.0;

/// Case columns the statistics need
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaseFigures {
    pub status: CaseStatus,
    pub estimated_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Creation time of a client or document row
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Created {
    pub created_at: DateTime<Utc>,
}

/// Figures shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_cases: usize,
    pub active_cases: usize,
    pub total_clients: usize,
    pub total_documents: usize,
    pub monthly_revenue: f64,
    pub cases_change: usize,
    pub clients_change: usize,
    pub documents_change: usize,
    pub revenue_change: f64,
}

impl DashboardStats {
    /// Reduces the fetched rows into dashboard figures as of `now`
    pub fn compute(
        cases: &[CaseFigures],
        clients: &[Created],
        documents: &[Created],
        now: DateTime<Utc>,
    ) -> Self {
        let since = one_month_before(now);
        let recent = |created_at: DateTime<Utc>| created_at > since;

        let monthly_revenue: f64 = cases
            .iter()
            .filter(|c| c.status != CaseStatus::Closed)
            .filter_map(|c| c.estimated_value)
            .filter(|value| *value != 0.0)
            .sum();

        DashboardStats {
            total_cases: cases.len(),
            active_cases: cases.iter().filter(|c| c.status.is_active()).count(),
            total_clients: clients.len(),
            total_documents: documents.len(),
            monthly_revenue,
            cases_change: cases.iter().filter(|c| recent(c.created_at)).count(),
            clients_change: clients.iter().filter(|c| recent(c.created_at)).count(),
            documents_change: documents.iter().filter(|d| recent(d.created_at)).count(),
            revenue_change: PLACEHOLDER_REVENUE_CHANGE,
        }
    }
}

/// Midnight UTC of the same day one month before `now`
///
/// The day is clamped to the length of the previous month (31 March gives
/// 28 or 29 February).
pub fn one_month_before(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let day = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    day.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}

#[derive(Debug, Default)]
struct StatsState {
    stats: DashboardStats,
    loading: bool,
    error: Option<String>,
}

/// Dashboard statistics of the active organization
pub struct StatsStore {
    auth: Arc<AuthController>,
    state: RwLock<StatsState>,
}

impl StatsStore {
    pub fn new(auth: Arc<AuthController>) -> Self {
        StatsStore {
            auth,
            state: RwLock::new(StatsState::default()),
        }
    }

    /// Recomputes the statistics
    ///
    /// Does nothing without an active organization. Failures are recorded in
    /// [`StatsStore::error`] and the previous figures are kept.
    pub async fn fetch(&self) {
        let Some(organization_id) = self.auth.active_organization_id() else {
            tracing::debug!("No active organization, skipping stats");
            return;
        };

        self.update(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.load(organization_id).await {
            Ok(stats) => {
                tracing::debug!(
                    organization_id = %organization_id,
                    total_cases = stats.total_cases,
                    active_cases = stats.active_cases,
                    "Computed dashboard stats"
                );
                self.update(|s| {
                    s.stats = stats;
                    s.loading = false;
                });
            }
            Err(e) => {
                tracing::error!(organization_id = %organization_id, error = %e, "Failed to load stats");
                self.update(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }
    }

    async fn load(&self, organization_id: Uuid) -> Result<DashboardStats, BackendError> {
        let backend = self.auth.backend();

        let cases_query = Query::table(Case::TABLE)
            .columns(&["status", "estimated_value", "created_at"])
            .eq("organization_id", organization_id);
        let clients_query = Query::table(Client::TABLE)
            .columns(&["created_at"])
            .eq("organization_id", organization_id);
        let documents_query = Query::table(CaseDocument::TABLE)
            .columns(&["created_at"])
            .eq("organization_id", organization_id);

        let (cases, clients, documents) = futures::try_join!(
            select_as::<CaseFigures, _>(backend.as_ref(), &cases_query),
            select_as::<Created, _>(backend.as_ref(), &clients_query),
            select_as::<Created, _>(backend.as_ref(), &documents_query),
        )?;

        Ok(DashboardStats::compute(&cases, &clients, &documents, Utc::now()))
    }

    fn update<F: FnOnce(&mut StatsState)>(&self, modify: F) {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        modify(&mut state);
    }

    pub fn stats(&self) -> DashboardStats {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stats
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .loading
    }

    pub fn error(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .error
            .clone()
    }
}
