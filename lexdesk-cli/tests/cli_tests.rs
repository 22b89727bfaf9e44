mod common;

use common::TestContext;
use lexdesk_cli::error::CliError;
use lexdesk_cli::demo::{DEMO_EMAIL, DEMO_PASSWORD};

#[tokio::test]
async fn test_protected_page_requires_sign_in() {
    let ctx = TestContext::new().await;

    let err = ctx.run(&["dashboard"]).await.unwrap_err();
    assert!(matches!(err, CliError::Unauthorized(_)));
    assert_eq!(err.exit_code(), 3);

    let err = ctx.run(&["open", "/settings"]).await.unwrap_err();
    assert!(matches!(err, CliError::Unauthorized(_)));
}

#[tokio::test]
async fn test_login_page_is_public() {
    let ctx = TestContext::new().await;

    let text = ctx.text(&["open", "/login"]).await;
    assert!(text.contains("lexdesk login <email>"));
}

#[tokio::test]
async fn test_login_activates_first_organization() {
    let ctx = TestContext::new().await;

    let text = ctx
        .text(&["login", DEMO_EMAIL, "--password", DEMO_PASSWORD])
        .await;

    assert!(text.contains("Bem-vindo, Helena!"));
    assert!(text.contains("Organização ativa: Silva & Associados"));
}

#[tokio::test]
async fn test_login_errors() {
    let ctx = TestContext::new().await;

    let wrong = ctx
        .run(&["login", DEMO_EMAIL, "--password", "wrong"])
        .await
        .unwrap_err();
    assert!(matches!(wrong, CliError::Unauthorized(_)));

    let malformed = ctx
        .run(&["login", "not-an-email", "--password", DEMO_PASSWORD])
        .await
        .unwrap_err();
    match malformed {
        CliError::ValidationError(details) => assert_eq!(details[0].field, "email"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_organization_selector_applies_on_login() {
    let ctx = TestContext::with_organization(Some("costa")).await;
    ctx.run(&["login", DEMO_EMAIL, "--password", DEMO_PASSWORD])
        .await
        .unwrap();

    let text = ctx.text(&["cases"]).await;
    assert!(text.contains("Inventário de bens"));
    assert!(!text.contains("Ação de despejo"));
}

#[tokio::test]
async fn test_unknown_organization_selector() {
    let ctx = TestContext::with_organization(Some("gamma")).await;

    let err = ctx
        .run(&["login", DEMO_EMAIL, "--password", DEMO_PASSWORD])
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NotFound(_)));
}

#[tokio::test]
async fn test_whoami_and_orgs() {
    let ctx = TestContext::signed_in().await;

    let whoami = ctx.text(&["whoami"]).await;
    assert!(whoami.contains("Helena Duarte"));
    assert!(whoami.contains("Silva & Associados (Proprietário)"));

    let orgs = ctx.run(&["orgs"]).await.unwrap();
    assert!(orgs.text.lines().next().unwrap().starts_with("* Silva & Associados"));
    assert_eq!(orgs.json.as_array().map(|a| a.len()), Some(2));
    assert_eq!(orgs.json[1]["slug"], "costa");
    assert_eq!(orgs.json[1]["active"], false);
}

#[tokio::test]
async fn test_dashboard_figures() {
    let ctx = TestContext::signed_in().await;

    let view = ctx.run(&["dashboard"]).await.unwrap();

    assert_eq!(view.json["stats"]["active_cases"], 2);
    assert_eq!(view.json["stats"]["total_clients"], 2);
    assert_eq!(view.json["stats"]["total_documents"], 2);
    assert_eq!(view.json["stats"]["monthly_revenue"], 60500.0);
    assert_eq!(view.json["stats"]["cases_change"], 1);
    assert_eq!(view.json["recent_cases"].as_array().map(|a| a.len()), Some(3));

    assert!(view.text.contains("Bem-vindo, Helena!"));
    assert!(view.text.contains("R$ 60.500"));
    assert!(view.text.contains("Casos Recentes"));
}

#[tokio::test]
async fn test_dashboard_reports_backend_failure() {
    let ctx = TestContext::signed_in().await;

    ctx.backend.fail_table("cases", "connection reset");
    let err = ctx.run(&["dashboard"]).await.unwrap_err();
    assert!(matches!(err, CliError::ServiceUnavailable(_)));
    assert_eq!(err.exit_code(), 69);
    assert!(err.to_string().contains("connection reset"));

    // Only the stats queries touch documents
    ctx.backend.clear_failures();
    ctx.backend.fail_table("case_documents", "timeout");
    let err = ctx.run(&["open", "/dashboard"]).await.unwrap_err();
    assert!(matches!(err, CliError::ServiceUnavailable(_)));

    ctx.backend.clear_failures();
    let view = ctx.run(&["dashboard"]).await.unwrap();
    assert_eq!(view.json["stats"]["active_cases"], 2);
}

#[tokio::test]
async fn test_root_redirects_to_dashboard() {
    let ctx = TestContext::signed_in().await;

    let text = ctx.text(&["open", "/"]).await;
    assert!(text.contains("Casos Recentes"));
}

#[tokio::test]
async fn test_unknown_route() {
    let ctx = TestContext::signed_in().await;

    let err = ctx.run(&["open", "/cases/123"]).await.unwrap_err();
    assert!(matches!(err, CliError::NotFound(_)));
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_placeholder_pages() {
    let ctx = TestContext::signed_in().await;

    assert!(ctx
        .text(&["documents"])
        .await
        .contains("Página de Documentos em desenvolvimento"));
    assert!(ctx
        .text(&["open", "/reports"])
        .await
        .contains("Página de Relatórios em desenvolvimento"));
}

#[tokio::test]
async fn test_case_list_filters() {
    let ctx = TestContext::signed_in().await;

    let all = ctx.run(&["cases"]).await.unwrap();
    assert_eq!(all.json.as_array().map(|a| a.len()), Some(3));
    // Newest first
    assert_eq!(all.json[0]["title"], "Reclamação trabalhista de ex-funcionário");

    let closed = ctx.run(&["cases", "--status", "closed"]).await.unwrap();
    assert_eq!(closed.json.as_array().map(|a| a.len()), Some(1));
    assert!(closed.text.contains("Fechado"));

    let by_client = ctx.run(&["cases", "--search", "PRADO"]).await.unwrap();
    assert_eq!(by_client.json.as_array().map(|a| a.len()), Some(2));

    let none = ctx.text(&["cases", "--search", "nada disso"]).await;
    assert!(none.contains("Tente ajustar os filtros de busca"));

    let err = ctx.run(&["cases", "--status", "done"]).await.unwrap_err();
    assert!(matches!(err, CliError::BadRequest(_)));
}

#[tokio::test]
async fn test_create_case_for_named_client() {
    let ctx = TestContext::signed_in().await;

    let created = ctx
        .run(&[
            "cases",
            "new",
            "--title",
            "Ação revisional de aluguel",
            "--client",
            "maria lima",
            "--value",
            "2500,75",
        ])
        .await
        .unwrap();

    assert!(created.json["case_number"].as_str().unwrap().starts_with("CASE-"));
    assert_eq!(created.json["status"], "open");
    assert_eq!(created.json["priority"], "medium");
    assert_eq!(created.json["billing_type"], "hourly");
    assert_eq!(created.json["estimated_value"], 2500.75);

    let list = ctx.run(&["cases", "--search", "revisional"]).await.unwrap();
    assert_eq!(list.json.as_array().map(|a| a.len()), Some(1));
    assert_eq!(list.json[0]["client"]["name"], "Maria Lima");
}

#[tokio::test]
async fn test_create_case_input_errors() {
    let ctx = TestContext::signed_in().await;

    let unknown = ctx
        .run(&["cases", "new", "--title", "X", "--client", "Ninguém"])
        .await
        .unwrap_err();
    assert!(matches!(unknown, CliError::NotFound(_)));

    let bad_value = ctx
        .run(&["cases", "new", "--title", "X", "--client", "Maria Lima", "--value", "abc"])
        .await
        .unwrap_err();
    match bad_value {
        CliError::ValidationError(details) => assert_eq!(details[0].field, "estimated_value"),
        other => panic!("unexpected error: {:?}", other),
    }

    // A client of the other organization is not visible
    let foreign = ctx
        .run(&["cases", "new", "--title", "X", "--client", "Jorge Alves"])
        .await
        .unwrap_err();
    assert!(matches!(foreign, CliError::NotFound(_)));
}

#[tokio::test]
async fn test_update_and_delete_case() {
    let ctx = TestContext::signed_in().await;

    let list = ctx.run(&["cases", "--status", "open"]).await.unwrap();
    let id = list.json[0]["id"].as_str().unwrap().to_string();

    let updated = ctx
        .run(&["cases", "update", &id, "--status", "closed", "--priority", "high"])
        .await
        .unwrap();
    assert_eq!(updated.json["status"], "closed");
    assert_eq!(updated.json["priority"], "high");

    let empty = ctx.run(&["cases", "update", &id]).await.unwrap_err();
    assert!(matches!(empty, CliError::BadRequest(_)));

    ctx.run(&["cases", "delete", &id]).await.unwrap();
    let remaining = ctx.run(&["cases"]).await.unwrap();
    assert_eq!(remaining.json.as_array().map(|a| a.len()), Some(2));
    assert!(remaining
        .json
        .as_array()
        .unwrap()
        .iter()
        .all(|c| c["id"] != id.as_str()));
}

#[tokio::test]
async fn test_client_list_and_create() {
    let ctx = TestContext::signed_in().await;

    let companies = ctx.run(&["clients", "--type", "company"]).await.unwrap();
    assert_eq!(companies.json.as_array().map(|a| a.len()), Some(1));
    assert!(companies.text.contains("CNPJ:"));

    let err = ctx.run(&["clients", "--type", "robot"]).await.unwrap_err();
    assert!(matches!(err, CliError::BadRequest(_)));

    let created = ctx
        .run(&[
            "clients",
            "new",
            "--name",
            "Beatriz Rocha",
            "--email",
            "beatriz@example.com",
            "--document",
            "111.222.333-44",
        ])
        .await
        .unwrap();
    assert_eq!(created.json["type"], "individual");
    assert_eq!(created.json["status"], "active");

    let found = ctx.run(&["clients", "--search", "111.222"]).await.unwrap();
    assert_eq!(found.json[0]["name"], "Beatriz Rocha");
}

#[tokio::test]
async fn test_client_validation_errors() {
    let ctx = TestContext::signed_in().await;

    let err = ctx
        .run(&["clients", "new", "--name", "Beatriz", "--email", "not-an-email"])
        .await
        .unwrap_err();
    match err {
        CliError::ValidationError(details) => {
            assert_eq!(details[0].field, "email");
            assert_eq!(details[0].message, "Invalid email format");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_and_delete_client() {
    let ctx = TestContext::signed_in().await;

    let list = ctx.run(&["clients", "--search", "Maria"]).await.unwrap();
    let id = list.json[0]["id"].as_str().unwrap().to_string();

    let updated = ctx
        .run(&["clients", "update", &id, "--phone", "(11) 99999-0000", "--status", "inactive"])
        .await
        .unwrap();
    assert_eq!(updated.json["phone"], "(11) 99999-0000");
    assert_eq!(updated.json["status"], "inactive");

    ctx.run(&["clients", "delete", &id]).await.unwrap();
    let remaining = ctx.run(&["clients"]).await.unwrap();
    assert_eq!(remaining.json.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn test_signup_without_organization() {
    let ctx = TestContext::new().await;

    let text = ctx
        .text(&[
            "signup",
            "carla@example.com",
            "--password",
            "secret99",
            "--full-name",
            "Carla Nunes",
        ])
        .await;
    assert!(text.contains("Conta criada."));
    assert!(text.contains("Bem-vindo, Carla!"));
    assert!(text.contains("nenhuma organização"));

    // Stores are no-ops without an organization
    let cases = ctx.text(&["cases"]).await;
    assert!(cases.contains("Nenhum caso encontrado"));

    let err = ctx
        .run(&["cases", "new", "--title", "X", "--client", "Maria Lima"])
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::BadRequest(_)));
}

#[tokio::test]
async fn test_signup_validation_and_conflict() {
    let ctx = TestContext::new().await;

    let short = ctx
        .run(&["signup", "carla@example.com", "--password", "123", "--full-name", "Carla"])
        .await
        .unwrap_err();
    assert!(matches!(short, CliError::ValidationError(_)));

    let taken = ctx
        .run(&["signup", DEMO_EMAIL, "--password", "secret99", "--full-name", "Helena"])
        .await
        .unwrap_err();
    assert!(matches!(taken, CliError::Conflict(_)));
}

#[tokio::test]
async fn test_logout_then_protected_command() {
    let ctx = TestContext::signed_in().await;

    let text = ctx.text(&["logout"]).await;
    assert!(text.contains("Sessão encerrada."));

    let err = ctx.run(&["whoami"]).await.unwrap_err();
    assert!(matches!(err, CliError::Unauthorized(_)));
}

#[tokio::test]
async fn test_remote_sign_out_is_observed() {
    let ctx = TestContext::signed_in().await;

    ctx.sign_out_remotely().await;
    ctx.state
        .auth
        .wait_for(|s| !s.is_loading() && s.user.is_none())
        .await;

    let err = ctx.run(&["cases"]).await.unwrap_err();
    assert!(matches!(err, CliError::Unauthorized(_)));
}
