//! Common test utilities for integration tests
//!
//! Every test gets a fresh in-memory backend seeded with:
//! - One user who belongs to two organizations (Alpha first, then Beta)
//! - A second user who only belongs to Beta
//! - A running auth controller

#![allow(dead_code)]

use lexdesk_session::controller::{AuthController, AuthSnapshot};
use lexdesk_shared::backend::{Backend, MemoryBackend};
use lexdesk_shared::models::{Case, CaseDocument, Client};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "secret123";

pub const OTHER_EMAIL: &str = "bruno@example.com";
pub const OTHER_PASSWORD: &str = "hunter22";

/// Test context containing the backend, the controller and seeded ids
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub auth: Arc<AuthController>,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
    pub alpha: Uuid,
    pub beta: Uuid,
}

impl TestContext {
    /// Seeds the backend and starts the controller signed out
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());

        let user_id = backend.add_user(EMAIL, PASSWORD, "Ana Souza");
        let other_user_id = backend.add_user(OTHER_EMAIL, OTHER_PASSWORD, "Bruno Reis");

        let alpha = backend.add_organization("Alpha Advocacia", "alpha");
        let beta = backend.add_organization("Beta Advogados", "beta");

        backend.add_membership(alpha, user_id, "owner");
        backend.add_membership(beta, user_id, "lawyer");
        backend.add_membership(beta, other_user_id, "owner");

        let auth = AuthController::new(backend.clone() as Arc<dyn Backend>);
        auth.start().await;

        TestContext {
            backend,
            auth,
            user_id,
            other_user_id,
            alpha,
            beta,
        }
    }

    /// Seeds the backend, starts the controller and signs the first user in
    pub async fn signed_in() -> Self {
        let ctx = Self::new().await;
        ctx.sign_in(EMAIL, PASSWORD).await;
        ctx
    }

    /// Signs in and waits until the dependent records are loaded
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthSnapshot {
        self.auth
            .sign_in(email, password)
            .await
            .expect("sign in should succeed");

        let user = email.to_string();
        self.auth
            .wait_for(move |s| {
                s.is_authenticated()
                    && s.user.as_ref().and_then(|u| u.email.as_deref()) == Some(user.as_str())
            })
            .await
    }

    pub fn seed_client(&self, organization_id: Uuid, name: &str) -> Uuid {
        let row = self.backend.seed(
            Client::TABLE,
            json!({
                "organization_id": organization_id,
                "type": "individual",
                "name": name,
                "status": "active",
            }),
        );
        id_of(&row)
    }

    pub fn seed_case(
        &self,
        organization_id: Uuid,
        client_id: Uuid,
        title: &str,
        status: &str,
        estimated_value: Option<f64>,
    ) -> Uuid {
        let row = self.backend.seed(
            Case::TABLE,
            json!({
                "organization_id": organization_id,
                "client_id": client_id,
                "case_number": format!("CASE-2024-{:04}", self.backend.rows(Case::TABLE).len()),
                "title": title,
                "case_type": "Cível",
                "status": status,
                "priority": "medium",
                "billing_type": "hourly",
                "estimated_value": estimated_value,
                "responsible_lawyer_id": self.user_id,
            }),
        );
        id_of(&row)
    }

    /// Seeds a row with an explicit creation time
    pub fn seed_dated(&self, table: &str, mut row: JsonValue, created_at: &str) -> Uuid {
        row["created_at"] = json!(created_at);
        row["updated_at"] = json!(created_at);
        let row = self.backend.seed(table, row);
        id_of(&row)
    }

    pub fn seed_document(&self, organization_id: Uuid, case_id: Uuid, name: &str) -> Uuid {
        let row = self.backend.seed(
            CaseDocument::TABLE,
            json!({
                "organization_id": organization_id,
                "case_id": case_id,
                "name": name,
                "is_confidential": false,
            }),
        );
        id_of(&row)
    }
}

pub fn id_of(row: &JsonValue) -> Uuid {
    row["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("seeded row should have a uuid id")
}
