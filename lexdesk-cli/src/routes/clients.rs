/// Client page and client actions

use crate::app::{AppState, Route};
use crate::cli::{NewClientArgs, UpdateClientArgs};
use crate::error::{CliError, CliResult};
use crate::routes::{header, truncate, View};
use lexdesk_session::filter::{parse_type_filter, ClientFilter};
use lexdesk_session::AuthSnapshot;
use lexdesk_shared::models::{Client, ClientPatch, ClientStatus, ClientType, NewClient};
use serde_json::json;
use uuid::Uuid;

/// Notes longer than this are shortened in the list
const NOTES_PREVIEW: usize = 100;

/// Lists the active organization's clients matching `search` and `client_type`
pub async fn list(state: &AppState, search: &str, client_type: &str) -> CliResult<View> {
    let filter = ClientFilter::new(search, parse_type_filter(client_type)?);

    state.clients.fetch_all().await;
    if let Some(error) = state.clients.error() {
        return Err(CliError::ServiceUnavailable(error));
    }

    let clients = state.clients.items();
    Ok(render(&state.auth.snapshot(), &filter, &clients))
}

/// Renders the client list
pub fn render(snapshot: &AuthSnapshot, filter: &ClientFilter, clients: &[Client]) -> View {
    let visible = filter.apply(clients);

    let mut text = header(snapshot, Route::Clients.title());
    text.push_str("\nClientes\nGerencie todos os seus clientes\n\n");

    if visible.is_empty() {
        text.push_str("Nenhum cliente encontrado\n");
        let filtered = !filter.search.trim().is_empty() || filter.client_type.is_some();
        text.push_str(if filtered {
            "Tente ajustar os filtros de busca\n"
        } else {
            "Cadastre seu primeiro cliente para começar\n"
        });
    }

    for client in &visible {
        text.push_str(&card(client));
        text.push('\n');
    }

    View::with_data(text, &visible)
}

fn card(client: &Client) -> String {
    let mut lines = vec![
        format!("{}  [{}]", client.name, client.id),
        format!("  {}", client.client_type.label()),
    ];

    if let Some(email) = &client.email {
        lines.push(format!("  Email:     {}", email));
    }
    if let Some(phone) = &client.phone {
        lines.push(format!("  Telefone:  {}", phone));
    }
    if let Some(document) = &client.document_number {
        let kind = match client.client_type {
            ClientType::Company => "CNPJ",
            ClientType::Individual => "CPF",
        };
        lines.push(format!("  {}:       {}", kind, document));
    }
    if let Some(notes) = &client.notes {
        lines.push(format!("  {}", truncate(notes, NOTES_PREVIEW)));
    }
    lines.push(format!(
        "  {} · desde {}",
        client.status.label(),
        client.created_at.format("%d/%m/%Y")
    ));

    lines.join("\n") + "\n"
}

/// Registers a client in the active organization
pub async fn create(state: &AppState, args: &NewClientArgs) -> CliResult<View> {
    let client_type = parse_type(&args.client_type)?;

    let mut new_client = NewClient::new(client_type, args.name.trim());
    new_client.email = non_empty(&args.email);
    new_client.phone = non_empty(&args.phone);
    new_client.document_number = non_empty(&args.document);
    new_client.notes = non_empty(&args.notes);
    new_client.created_by = state.auth.snapshot().user_id();

    let created = state
        .clients
        .create(new_client)
        .await?
        .ok_or_else(no_organization)?;

    let text = format!("Cliente {} cadastrado\n", created.name);
    Ok(View::with_data(text, &created))
}

/// Applies the given fields to a client
pub async fn update(state: &AppState, args: &UpdateClientArgs) -> CliResult<View> {
    let status = match args.status.as_deref() {
        Some(raw) => Some(
            ClientStatus::from_str(&raw.trim().to_lowercase())
                .ok_or_else(|| CliError::BadRequest(format!("Unknown client status '{}'", raw)))?,
        ),
        None => None,
    };

    let patch = ClientPatch {
        name: args.name.clone(),
        email: args.email.clone(),
        phone: args.phone.clone(),
        document_number: args.document.clone(),
        notes: args.notes.clone(),
        status,
        ..ClientPatch::default()
    };

    if patch.is_empty() {
        return Err(CliError::BadRequest("Nothing to update".to_string()));
    }

    if state.auth.active_organization_id().is_none() {
        return Err(no_organization());
    }

    let updated = state
        .clients
        .update(args.id, patch)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("Client {} not found", args.id)))?;

    let text = format!("Cliente {} atualizado\n", updated.name);
    Ok(View::with_data(text, &updated))
}

/// Deletes a client of the active organization
pub async fn delete(state: &AppState, id: Uuid) -> CliResult<View> {
    if state.auth.active_organization_id().is_none() {
        return Err(no_organization());
    }

    state.clients.delete(id).await?;

    Ok(View::new(
        format!("Cliente {} excluído\n", id),
        json!({ "deleted": id }),
    ))
}

fn parse_type(raw: &str) -> CliResult<ClientType> {
    ClientType::from_str(&raw.trim().to_lowercase())
        .ok_or_else(|| CliError::BadRequest(format!("Unknown client type '{}'", raw)))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn no_organization() -> CliError {
    CliError::BadRequest("No active organization: lexdesk orgs".to_string())
}
