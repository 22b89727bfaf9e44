/// Seeded in-memory backend
///
/// `--demo` runs every command against a [`MemoryBackend`] holding two law
/// firms, a handful of clients and cases, and the demo user already signed
/// in. Nothing is persisted between runs.

use chrono::{Duration, SecondsFormat, Utc};
use lexdesk_shared::backend::{AuthApi, AuthError, MemoryBackend};
use lexdesk_shared::models::{Case, CaseDocument, Client};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

pub const DEMO_EMAIL: &str = "demo@lexdesk.dev";
pub const DEMO_PASSWORD: &str = "demo1234";

/// Seeds the backend without signing anyone in
pub fn seeded() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());

    let user = backend.add_user(DEMO_EMAIL, DEMO_PASSWORD, "Helena Duarte");
    let silva = backend.add_organization("Silva & Associados", "silva");
    let costa = backend.add_organization("Costa Advocacia", "costa");
    backend.add_membership(silva, user, "owner");
    backend.add_membership(costa, user, "lawyer");

    let maria = client(&backend, silva, "individual", "Maria Lima", "maria.lima@example.com", "123.456.789-00", 40);
    let prado = client(&backend, silva, "company", "Prado Comércio Ltda", "contato@prado.example.com", "12.345.678/0001-90", 12);
    let jorge = client(&backend, costa, "individual", "Jorge Alves", "jorge@example.com", "987.654.321-00", 3);

    let despejo = case(&backend, silva, maria, user, "Ação de despejo por falta de pagamento", "Cível", "in_progress", "high", Some(18_000.0), 35);
    case(&backend, silva, prado, user, "Reclamação trabalhista de ex-funcionário", "Trabalhista", "open", "medium", Some(42_500.0), 5);
    case(&backend, silva, prado, user, "Execução de título extrajudicial", "Cível", "closed", "low", Some(9_000.0), 120);
    case(&backend, costa, jorge, user, "Inventário de bens", "Família", "pending", "urgent", None, 2);

    document(&backend, silva, despejo, "Petição inicial.pdf", 45);
    document(&backend, silva, despejo, "Contrato de locação.pdf", 2);

    backend
}

/// Seeds the backend and signs the demo user in
pub async fn signed_in() -> Result<Arc<MemoryBackend>, AuthError> {
    let backend = seeded();
    backend
        .sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD)
        .await?;
    Ok(backend)
}

fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn dated(mut row: JsonValue, days: i64) -> JsonValue {
    row["created_at"] = json!(days_ago(days));
    row["updated_at"] = json!(days_ago(days));
    row
}

fn id_of(row: &JsonValue) -> Uuid {
    row["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_default()
}

fn client(
    backend: &MemoryBackend,
    organization_id: Uuid,
    kind: &str,
    name: &str,
    email: &str,
    document: &str,
    days: i64,
) -> Uuid {
    let row = backend.seed(
        Client::TABLE,
        dated(
            json!({
                "organization_id": organization_id,
                "type": kind,
                "name": name,
                "email": email,
                "document_number": document,
                "status": "active",
            }),
            days,
        ),
    );
    id_of(&row)
}

#[allow(clippy::too_many_arguments)]
fn case(
    backend: &MemoryBackend,
    organization_id: Uuid,
    client_id: Uuid,
    lawyer_id: Uuid,
    title: &str,
    case_type: &str,
    status: &str,
    priority: &str,
    estimated_value: Option<f64>,
    days: i64,
) -> Uuid {
    let number = backend.rows(Case::TABLE).len() + 1;
    let row = backend.seed(
        Case::TABLE,
        dated(
            json!({
                "organization_id": organization_id,
                "client_id": client_id,
                "case_number": format!("CASE-{}-{:04}", Utc::now().format("%Y"), number),
                "title": title,
                "case_type": case_type,
                "status": status,
                "priority": priority,
                "billing_type": "hourly",
                "estimated_value": estimated_value,
                "responsible_lawyer_id": lawyer_id,
            }),
            days,
        ),
    );
    id_of(&row)
}

fn document(backend: &MemoryBackend, organization_id: Uuid, case_id: Uuid, name: &str, days: i64) {
    backend.seed(
        CaseDocument::TABLE,
        dated(
            json!({
                "organization_id": organization_id,
                "case_id": case_id,
                "name": name,
                "is_confidential": false,
            }),
            days,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rows() {
        let backend = seeded();
        assert_eq!(backend.rows(Client::TABLE).len(), 3);
        assert_eq!(backend.rows(Case::TABLE).len(), 4);
        assert_eq!(backend.rows(CaseDocument::TABLE).len(), 2);
        assert!(backend.rows(Case::TABLE)[0]["case_number"]
            .as_str()
            .unwrap()
            .ends_with("-0001"));
    }
}
