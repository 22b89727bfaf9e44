/// Authentication handlers
///
/// Sign-in, sign-up and sign-out are delegated to the auth controller; the
/// handlers then wait until the controller has published the resulting
/// state so the output reflects the loaded profile and memberships.

use crate::app::AppState;
use crate::error::CliResult;
use crate::routes::View;
use lexdesk_session::AuthSnapshot;
use lexdesk_shared::models::MemberRole;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Sign-in input
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Sign-up input
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub full_name: String,
}

/// `/login`: how to sign in, or who is signed in already
pub fn login_page(snapshot: &AuthSnapshot) -> View {
    if let Some(user) = snapshot.user.as_ref().filter(|_| snapshot.is_authenticated()) {
        let email = user.email.clone().unwrap_or_default();
        return View::new(
            format!("Conectado como {}\n", email),
            json!({ "signed_in": true, "email": email }),
        );
    }

    View::new(
        "Entrar no LexDesk\n\n  lexdesk login <email> --password <senha>\n  lexdesk signup <email> --full-name <nome> --password <senha>\n",
        json!({ "signed_in": false }),
    )
}

/// Signs in and waits for the user's records
pub async fn login(state: &AppState, email: &str, password: &str) -> CliResult<View> {
    let req = LoginRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    req.validate()?;

    let session = state.auth.sign_in(&req.email, &req.password).await?;
    tracing::info!(user_id = %session.user.id, "Signed in");

    wait_for_user(state, session.user.id).await;
    state.apply_organization()?;

    Ok(welcome(&state.auth.snapshot()))
}

/// Registers a user; signs them in unless email confirmation is required
pub async fn signup(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: &str,
) -> CliResult<View> {
    let req = SignupRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
        full_name: full_name.trim().to_string(),
    };
    req.validate()?;

    let outcome = state
        .auth
        .sign_up(&req.email, &req.password, &req.full_name)
        .await?;
    tracing::info!(user_id = %outcome.user.id, "Signed up");

    if outcome.needs_confirmation() {
        return Ok(View::new(
            format!(
                "Conta criada. Confirme o email enviado para {} antes de entrar.\n",
                req.email
            ),
            json!({ "user_id": outcome.user.id, "confirmation_required": true }),
        ));
    }

    wait_for_user(state, outcome.user.id).await;
    state.apply_organization()?;

    let mut view = welcome(&state.auth.snapshot());
    view.text = format!("Conta criada.\n{}", view.text);
    Ok(view)
}

/// Signs out; the stored session is forgotten even if the service call fails
pub async fn logout(state: &AppState) -> CliResult<View> {
    let result = state.auth.sign_out().await;
    state
        .auth
        .wait_for(|s| !s.is_loading() && s.user.is_none())
        .await;
    result?;

    Ok(View::new("Sessão encerrada.\n", json!({ "signed_in": false })))
}

/// Signed-in user, profile and active organization
pub fn whoami(snapshot: &AuthSnapshot) -> View {
    let mut text = String::new();

    if let Some(profile) = &snapshot.profile {
        text.push_str(&format!("Nome:         {}\n", profile.full_name));
        text.push_str(&format!("Email:        {}\n", profile.email));
        if let Some(oab) = &profile.oab_number {
            text.push_str(&format!("OAB:          {}\n", oab));
        }
    } else if let Some(email) = snapshot.user.as_ref().and_then(|u| u.email.as_deref()) {
        text.push_str(&format!("Email:        {}\n", email));
    }

    match &snapshot.active_membership {
        Some(membership) => text.push_str(&format!(
            "Organização:  {} ({})\n",
            membership.organization_name(),
            role_label(&membership.role)
        )),
        None => text.push_str("Organização:  nenhuma\n"),
    }

    View::new(
        text,
        json!({
            "user": snapshot.user,
            "profile": snapshot.profile,
            "active_organization_id": snapshot.active_organization_id(),
        }),
    )
}

/// Memberships of the signed-in user; the active one is marked with `*`
pub fn organizations(snapshot: &AuthSnapshot) -> View {
    let active = snapshot.active_organization_id();

    if snapshot.memberships.is_empty() {
        return View::new("Nenhuma organização.\n", json!([]));
    }

    let mut text = String::new();
    let mut rows = Vec::new();

    for membership in &snapshot.memberships {
        let is_active = Some(membership.organization_id) == active;
        let slug = membership
            .organization
            .as_ref()
            .map(|o| o.slug.as_str())
            .unwrap_or("-");

        text.push_str(&format!(
            "{} {:<32} {:<16} {}\n",
            if is_active { "*" } else { " " },
            membership.organization_name(),
            slug,
            role_label(&membership.role)
        ));
        rows.push(json!({
            "organization_id": membership.organization_id,
            "name": membership.organization_name(),
            "slug": slug,
            "role": membership.role,
            "active": is_active,
        }));
    }

    View::new(text, json!(rows))
}

fn role_label(role: &str) -> String {
    MemberRole::from_str(role)
        .map(|r| r.label().to_string())
        .unwrap_or_else(|| role.to_string())
}

fn welcome(snapshot: &AuthSnapshot) -> View {
    let first_name = snapshot
        .profile
        .as_ref()
        .and_then(|p| p.full_name.split_whitespace().next().map(str::to_string))
        .or_else(|| snapshot.user.as_ref().and_then(|u| u.email.clone()))
        .unwrap_or_default();

    let organization = snapshot
        .active_membership
        .as_ref()
        .map(|m| m.organization_name());

    let text = match &organization {
        Some(name) => format!("Bem-vindo, {}!\nOrganização ativa: {}\n", first_name, name),
        None => format!("Bem-vindo, {}!\nVocê ainda não faz parte de nenhuma organização.\n", first_name),
    };

    View::new(
        text,
        json!({
            "user_id": snapshot.user_id(),
            "active_organization_id": snapshot.active_organization_id(),
            "organization": organization,
        }),
    )
}

async fn wait_for_user(state: &AppState, user_id: Uuid) {
    state
        .auth
        .wait_for(move |s| !s.is_loading() && s.user_id() == Some(user_id))
        .await;
}
