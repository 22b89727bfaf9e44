/// Case page and case actions
///
/// Mutations go through the case store, which refetches the collection
/// afterwards; the handlers render from the refreshed store.

use crate::app::{AppState, Route};
use crate::cli::{NewCaseArgs, UpdateCaseArgs};
use crate::error::{CliError, CliResult};
use crate::routes::{format_brl, format_date, header, View};
use lexdesk_session::filter::{parse_status_filter, CaseFilter};
use lexdesk_session::AuthSnapshot;
use lexdesk_shared::models::{
    BillingType, Case, CasePatch, CasePriority, CaseStatus, Client, NewCase,
};
use serde_json::json;
use uuid::Uuid;

/// Lists the active organization's cases matching `search` and `status`
pub async fn list(state: &AppState, search: &str, status: &str) -> CliResult<View> {
    let filter = CaseFilter::new(search, parse_status_filter(status)?);

    state.cases.fetch_all().await;
    if let Some(error) = state.cases.error() {
        return Err(CliError::ServiceUnavailable(error));
    }

    let cases = state.cases.items();
    Ok(render(&state.auth.snapshot(), &filter, &cases))
}

/// Renders the case list
pub fn render(snapshot: &AuthSnapshot, filter: &CaseFilter, cases: &[Case]) -> View {
    let visible = filter.apply(cases);

    let mut text = header(snapshot, Route::Cases.title());
    text.push_str("\nCasos\nGerencie todos os casos jurídicos\n\n");

    if visible.is_empty() {
        text.push_str("Nenhum caso encontrado\n");
        let filtered = !filter.search.trim().is_empty() || filter.status.is_some();
        text.push_str(if filtered {
            "Tente ajustar os filtros de busca\n"
        } else {
            "Crie seu primeiro caso para começar\n"
        });
    }

    for case in &visible {
        text.push_str(&card(case));
        text.push('\n');
    }

    View::with_data(text, &visible)
}

fn card(case: &Case) -> String {
    let mut lines = vec![
        format!("{}  {}  [{}]", case.case_number, case.case_type, case.id),
        format!("  {}", case.title),
        format!("  Cliente:      {}", case.client_name().unwrap_or("-")),
        format!(
            "  Início:       {}",
            case.start_date
                .map(format_date)
                .unwrap_or_else(|| "Não definido".to_string())
        ),
    ];

    if let Some(lawyer) = &case.responsible_lawyer {
        lines.push(format!("  Responsável:  {}", lawyer.full_name));
    }
    if let Some(value) = case.estimated_value {
        lines.push(format!("  Valor:        {}", format_brl(value, true)));
    }
    lines.push(format!(
        "  {} · {}",
        case.status.label(),
        case.priority.label()
    ));

    lines.join("\n") + "\n"
}

/// Opens a case for an existing client of the active organization
pub async fn create(state: &AppState, args: &NewCaseArgs) -> CliResult<View> {
    let client = resolve_client(state, &args.client).await?;

    let mut new_case = NewCase::new(args.title.trim(), client.id);
    new_case.case_type = args.case_type.clone();
    new_case.description = args.description.clone();
    new_case.practice_area = args.practice_area.clone();
    new_case.priority = parse_priority(&args.priority)?;
    new_case.billing_type = BillingType::from_str(&args.billing)
        .ok_or_else(|| CliError::BadRequest(format!("Unknown billing type '{}'", args.billing)))?;
    new_case.estimated_value = NewCase::parse_estimated_value(&args.value)?;

    new_case.created_by = state.auth.snapshot().user_id();

    let created = state
        .cases
        .create(new_case)
        .await?
        .ok_or_else(no_organization)?;

    let text = format!("Caso {} criado: {}\n", created.case_number, created.title);
    Ok(View::with_data(text, &created))
}

/// Applies the given fields to a case
pub async fn update(state: &AppState, args: &UpdateCaseArgs) -> CliResult<View> {
    let patch = CasePatch {
        title: args.title.clone(),
        description: args.description.clone(),
        status: args.status.as_deref().map(parse_status).transpose()?,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        estimated_value: match args.value.as_deref() {
            Some(raw) => NewCase::parse_estimated_value(raw)?,
            None => None,
        },
        ..CasePatch::default()
    };

    if patch.is_empty() {
        return Err(CliError::BadRequest("Nothing to update".to_string()));
    }

    if state.auth.active_organization_id().is_none() {
        return Err(no_organization());
    }

    let updated = state
        .cases
        .update(args.id, patch)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("Case {} not found", args.id)))?;

    let text = format!("Caso {} atualizado\n", updated.case_number);
    Ok(View::with_data(text, &updated))
}

/// Deletes a case of the active organization
pub async fn delete(state: &AppState, id: Uuid) -> CliResult<View> {
    if state.auth.active_organization_id().is_none() {
        return Err(no_organization());
    }

    state.cases.delete(id).await?;

    Ok(View::new(
        format!("Caso {} excluído\n", id),
        json!({ "deleted": id }),
    ))
}

/// Finds a client by id or exact name (case-insensitive)
async fn resolve_client(state: &AppState, selector: &str) -> CliResult<Client> {
    if state.auth.active_organization_id().is_none() {
        return Err(no_organization());
    }

    state.clients.fetch_all().await;
    if let Some(error) = state.clients.error() {
        return Err(CliError::ServiceUnavailable(error));
    }

    let selector = selector.trim();
    let clients = state.clients.items();

    if let Ok(id) = Uuid::parse_str(selector) {
        return clients
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CliError::NotFound(format!("Client {} not found", id)));
    }

    let mut matches: Vec<Client> = clients
        .into_iter()
        .filter(|c| c.name.to_lowercase() == selector.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(CliError::NotFound(format!("Client '{}' not found", selector))),
        1 => Ok(matches.remove(0)),
        n => Err(CliError::BadRequest(format!(
            "{} clients are named '{}'; use the client id",
            n, selector
        ))),
    }
}

fn parse_status(raw: &str) -> CliResult<CaseStatus> {
    CaseStatus::from_str(&raw.trim().to_lowercase())
        .ok_or_else(|| CliError::BadRequest(format!("Unknown case status '{}'", raw)))
}

fn parse_priority(raw: &str) -> CliResult<CasePriority> {
    CasePriority::from_str(&raw.trim().to_lowercase())
        .ok_or_else(|| CliError::BadRequest(format!("Unknown priority '{}'", raw)))
}

fn no_organization() -> CliError {
    CliError::BadRequest("No active organization: lexdesk orgs".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_and_priority() {
        assert_eq!(parse_status("In_Progress").unwrap(), CaseStatus::InProgress);
        assert!(parse_status("done").is_err());
        assert_eq!(parse_priority("URGENT").unwrap(), CasePriority::Urgent);
    }

    #[test]
    fn test_empty_list_hints() {
        let snapshot = AuthSnapshot::default();

        let unfiltered = render(&snapshot, &CaseFilter::default(), &[]);
        assert!(unfiltered.text.contains("Crie seu primeiro caso para começar"));

        let filtered = render(&snapshot, &CaseFilter::new("despejo", None), &[]);
        assert!(filtered.text.contains("Tente ajustar os filtros de busca"));
        assert_eq!(filtered.json, json!([]));
    }
}
