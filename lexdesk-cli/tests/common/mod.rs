//! Common test utilities for integration tests
//!
//! Every test gets the seeded demo backend and application state built on
//! top of it. Commands are parsed with the real argument parser and run
//! against that state.

#![allow(dead_code)]

use clap::Parser;
use lexdesk_cli::app::{run, AppState};
use lexdesk_cli::cli::Cli;
use lexdesk_cli::demo::{self, DEMO_EMAIL, DEMO_PASSWORD};
use lexdesk_cli::error::CliResult;
use lexdesk_cli::routes::View;
use lexdesk_shared::backend::{AuthApi, MemoryBackend};
use std::sync::Arc;

/// Test context containing the backend and the started application state
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub state: AppState,
}

impl TestContext {
    /// Seeded backend, nobody signed in
    pub async fn new() -> Self {
        Self::with_organization(None).await
    }

    /// Seeded backend with an organization selector
    pub async fn with_organization(organization: Option<&str>) -> Self {
        let backend = demo::seeded();
        let state = AppState::new(backend.clone()).with_organization(organization.map(str::to_string));
        state.start().await.expect("state should start");

        TestContext { backend, state }
    }

    /// Seeded backend with the demo user signed in
    pub async fn signed_in() -> Self {
        let ctx = Self::new().await;
        ctx.run(&["login", DEMO_EMAIL, "--password", DEMO_PASSWORD])
            .await
            .expect("demo sign-in should succeed");
        ctx
    }

    /// Parses `args` as a `lexdesk` command line and runs it
    pub async fn run(&self, args: &[&str]) -> CliResult<View> {
        let cli = Cli::try_parse_from(std::iter::once("lexdesk").chain(args.iter().copied()))
            .expect("arguments should parse");
        run(&self.state, &cli).await
    }

    /// Runs a command that must succeed and returns its text output
    pub async fn text(&self, args: &[&str]) -> String {
        match self.run(args).await {
            Ok(view) => view.text,
            Err(e) => panic!("`lexdesk {}` failed: {}", args.join(" "), e),
        }
    }

    /// Signs the backend out behind the application's back
    pub async fn sign_out_remotely(&self) {
        self.backend.sign_out().await.expect("sign out");
    }
}
