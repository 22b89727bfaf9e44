mod common;

use common::{TestContext, EMAIL, OTHER_EMAIL, OTHER_PASSWORD, PASSWORD};
use lexdesk_session::controller::{AuthController, AuthSnapshot, AuthStatus};
use lexdesk_shared::backend::{AuthApi, AuthError, Backend};
use lexdesk_shared::models::Profile;
use std::sync::Arc;
use std::time::Duration;

/// Collects published snapshots until none arrives for a while
async fn drain(rx: &mut tokio::sync::watch::Receiver<AuthSnapshot>) -> Vec<AuthSnapshot> {
    let mut seen = Vec::new();
    while let Ok(Ok(())) = tokio::time::timeout(Duration::from_millis(200), rx.changed()).await {
        seen.push(rx.borrow_and_update().clone());
    }
    seen
}

#[tokio::test]
async fn test_starts_unauthenticated_without_session() {
    let ctx = TestContext::new().await;

    let snapshot = ctx.auth.snapshot();
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert!(snapshot.user.is_none());
    assert!(snapshot.profile.is_none());
    assert!(snapshot.memberships.is_empty());
    assert!(snapshot.active_organization_id().is_none());
}

#[tokio::test]
async fn test_sign_in_loads_profile_and_memberships() {
    let ctx = TestContext::new().await;

    let snapshot = ctx.sign_in(EMAIL, PASSWORD).await;

    assert!(snapshot.session.is_some());
    assert_eq!(snapshot.user_id(), Some(ctx.user_id));

    let profile = snapshot.profile.clone().expect("profile should load");
    assert_eq!(profile.full_name, "Ana Souza");

    assert_eq!(snapshot.memberships.len(), 2);
    assert_eq!(snapshot.active_organization_id(), Some(ctx.alpha));
    assert_eq!(
        snapshot.memberships[0].organization_name(),
        "Alpha Advocacia"
    );
}

#[tokio::test]
async fn test_start_with_existing_session() {
    let ctx = TestContext::signed_in().await;

    let second = AuthController::new(ctx.backend.clone() as Arc<dyn Backend>);
    second.start().await;

    let snapshot = second.snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.active_organization_id(), Some(ctx.alpha));

    second.shutdown().await;
}

#[tokio::test]
async fn test_invalid_credentials_are_returned() {
    let ctx = TestContext::new().await;

    let result = ctx.auth.sign_in(EMAIL, "wrong-password").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ctx.auth.status(), AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_sign_out_clears_state() {
    let ctx = TestContext::signed_in().await;

    ctx.auth.sign_out().await.unwrap();
    let snapshot = ctx
        .auth
        .wait_for(|s| s.status == AuthStatus::Unauthenticated)
        .await;

    assert!(snapshot.session.is_none());
    assert!(snapshot.profile.is_none());
    assert!(snapshot.memberships.is_empty());
    assert!(snapshot.active_membership.is_none());
}

#[tokio::test]
async fn test_switching_user_replaces_memberships() {
    let ctx = TestContext::signed_in().await;

    let snapshot = ctx.sign_in(OTHER_EMAIL, OTHER_PASSWORD).await;

    assert_eq!(snapshot.user_id(), Some(ctx.other_user_id));
    assert_eq!(snapshot.memberships.len(), 1);
    assert_eq!(snapshot.active_organization_id(), Some(ctx.beta));
}

#[tokio::test]
async fn test_select_organization() {
    let ctx = TestContext::signed_in().await;

    let selected = ctx.auth.select_organization("beta").expect("beta membership");
    assert_eq!(selected.organization_id, ctx.beta);
    assert_eq!(ctx.auth.active_organization_id(), Some(ctx.beta));

    assert!(ctx.auth.select_organization("gamma").is_none());
    assert_eq!(ctx.auth.active_organization_id(), Some(ctx.beta));

    let alpha = ctx.auth.select_organization("ALPHA ADVOCACIA").unwrap();
    assert_eq!(alpha.organization_id, ctx.alpha);
}

#[tokio::test]
async fn test_token_refresh_stays_authenticated() {
    let ctx = TestContext::signed_in().await;
    ctx.auth.select_organization("beta").unwrap();

    let mut rx = ctx.auth.subscribe();
    rx.borrow_and_update();

    let refreshed = ctx.backend.refresh_session().expect("active session");
    let seen = drain(&mut rx).await;

    assert!(!seen.is_empty());
    assert!(seen.iter().all(|s| s.is_authenticated()));

    let last = ctx.auth.snapshot();
    assert_eq!(
        last.session.clone().map(|s| s.access_token),
        Some(refreshed.access_token)
    );
    // Active membership survives the reload
    assert_eq!(last.active_organization_id(), Some(ctx.beta));
}

#[tokio::test]
async fn test_sign_up_signs_in_new_user() {
    let ctx = TestContext::new().await;

    let outcome = ctx
        .auth
        .sign_up("carla@example.com", "secret99", "Carla Nunes")
        .await
        .unwrap();
    assert!(!outcome.needs_confirmation());

    let snapshot = ctx
        .auth
        .wait_for(|s| s.is_authenticated())
        .await;

    assert_eq!(snapshot.user_id(), Some(outcome.user.id));
    assert_eq!(
        snapshot.profile.map(|p: Profile| p.full_name),
        Some("Carla Nunes".to_string())
    );
    assert!(snapshot.memberships.is_empty());
    assert!(snapshot.active_membership.is_none());
}

#[tokio::test]
async fn test_sign_up_with_confirmation_stays_signed_out() {
    let ctx = TestContext::new().await;
    ctx.backend.require_email_confirmation(true);

    let outcome = ctx
        .auth
        .sign_up("carla@example.com", "secret99", "Carla Nunes")
        .await
        .unwrap();
    assert!(outcome.needs_confirmation());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ctx.auth.status(), AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_sign_up_errors_are_returned() {
    let ctx = TestContext::new().await;

    let existing = ctx.auth.sign_up(EMAIL, "secret99", "Ana").await;
    assert!(matches!(existing, Err(AuthError::UserAlreadyExists)));

    let weak = ctx.auth.sign_up("new@example.com", "123", "New").await;
    assert!(matches!(weak, Err(AuthError::WeakPassword(_))));
}

#[tokio::test]
async fn test_profile_error_is_swallowed() {
    let ctx = TestContext::new().await;
    ctx.backend.fail_table("profiles", "profiles unavailable");

    let snapshot = ctx.sign_in(EMAIL, PASSWORD).await;

    assert!(snapshot.profile.is_none());
    assert_eq!(snapshot.memberships.len(), 2);
    assert_eq!(snapshot.active_organization_id(), Some(ctx.alpha));
}

#[tokio::test]
async fn test_membership_error_is_swallowed() {
    let ctx = TestContext::new().await;
    ctx.backend.fail_table("organization_members", "members unavailable");

    let snapshot = ctx.sign_in(EMAIL, PASSWORD).await;

    assert!(snapshot.profile.is_some());
    assert!(snapshot.memberships.is_empty());
    assert!(snapshot.active_membership.is_none());
}

#[tokio::test]
async fn test_superseded_load_is_discarded() {
    let ctx = TestContext::signed_in().await;
    ctx.backend.set_latency(Some(Duration::from_millis(50)));

    // Start a slow reload, then sign out while it is loading.
    let auth = ctx.auth.clone();
    let reload = tokio::spawn(async move { auth.reload().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    ctx.backend.sign_out().await.unwrap();
    reload.await.unwrap();

    ctx.auth
        .wait_for(|s| s.status == AuthStatus::Unauthenticated)
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = ctx.auth.snapshot();
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert!(snapshot.profile.is_none());
    assert!(snapshot.memberships.is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_listening() {
    let ctx = TestContext::new().await;
    ctx.auth.shutdown().await;

    ctx.backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(ctx.auth.status(), AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_restart_after_shutdown_follows_events() {
    let ctx = TestContext::new().await;
    ctx.auth.shutdown().await;
    ctx.auth.start().await;

    ctx.backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    let snapshot = tokio::time::timeout(
        Duration::from_secs(2),
        ctx.auth.wait_for(|s| s.is_authenticated()),
    )
    .await
    .expect("restarted controller should observe the sign-in");
    assert_eq!(snapshot.user_id(), Some(ctx.user_id));

    ctx.auth.shutdown().await;
}
