/// Dashboard page
///
/// Statistics of the active organization plus its five most recent cases.

use crate::app::{AppState, Route};
use crate::error::{CliError, CliResult};
use crate::routes::{format_brl, header, View};
use lexdesk_session::resources::DashboardStats;
use lexdesk_session::AuthSnapshot;
use lexdesk_shared::models::Case;
use serde_json::json;

/// Number of cases listed under "Casos Recentes"
pub const RECENT_CASES: usize = 5;

/// Fetches stats and cases, then renders the dashboard
pub async fn show(state: &AppState) -> CliResult<View> {
    tokio::join!(state.stats.fetch(), state.cases.fetch_all());

    if let Some(error) = state.stats.error().or_else(|| state.cases.error()) {
        tracing::warn!(error = %error, "Dashboard data unavailable");
        return Err(CliError::ServiceUnavailable(error));
    }

    let snapshot = state.auth.snapshot();
    let stats = state.stats.stats();
    let cases = state.cases.items();

    Ok(render(&snapshot, &stats, &cases))
}

/// Renders the dashboard from already loaded data
pub fn render(snapshot: &AuthSnapshot, stats: &DashboardStats, cases: &[Case]) -> View {
    let mut text = header(snapshot, Route::Dashboard.title());

    let first_name = snapshot
        .profile
        .as_ref()
        .and_then(|p| p.full_name.split_whitespace().next())
        .unwrap_or_default();
    text.push_str(&format!("\nBem-vindo, {}!\n", first_name));

    if let Some(membership) = &snapshot.active_membership {
        text.push_str(&format!(
            "Aqui está um resumo das atividades do {}\n",
            membership.organization_name()
        ));
    }

    text.push('\n');
    let cards = [
        ("Casos Ativos", stats.active_cases.to_string(), format!("+{}", stats.cases_change)),
        ("Clientes", stats.total_clients.to_string(), format!("+{}", stats.clients_change)),
        ("Documentos", stats.total_documents.to_string(), format!("+{}", stats.documents_change)),
        (
            "Receita Estimada",
            format_brl(stats.monthly_revenue, false),
            format!("+{}%", stats.revenue_change),
        ),
    ];
    for (name, value, change) in &cards {
        text.push_str(&format!("  {:<18} {:>14}  {}\n", name, value, change));
    }

    text.push_str("\nCasos Recentes\n");
    let recent: Vec<&Case> = cases.iter().take(RECENT_CASES).collect();
    if recent.is_empty() {
        text.push_str("  Nenhum caso encontrado\n");
        text.push_str("  Criar primeiro caso: lexdesk cases new --title <título> --client <cliente>\n");
    }
    for case in &recent {
        text.push_str(&format!(
            "  {:<40} Número: {:<16} {:<14} {}\n",
            case.title,
            case.case_number,
            case.status.label(),
            case.priority.label()
        ));
    }

    View::new(
        text,
        json!({
            "stats": stats,
            "recent_cases": recent,
        }),
    )
}
