//! # LexDesk
//!
//! Terminal front-end for LexDesk: sign in, pick an organization and work
//! with its cases and clients.
//!
//! ## Usage
//!
//! ```bash
//! lexdesk login ana@example.com --password secret123
//! lexdesk --org silva cases --status open
//! lexdesk open /dashboard
//! lexdesk --demo dashboard
//! ```

use clap::Parser;
use lexdesk_cli::app::{run, AppState};
use lexdesk_cli::cli::Cli;
use lexdesk_cli::config::Config;
use lexdesk_cli::demo;
use lexdesk_cli::error::CliError;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing; logs go to stderr so stdout stays clean for output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexdesk_cli=warn,lexdesk_session=warn,lexdesk_shared=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::debug!("LexDesk v{} starting...", env!("CARGO_PKG_VERSION"));

    let state = match build_state(&cli).await {
        Ok(state) => state,
        Err(e) => return report(&CliError::Config(format!("{:#}", e)), cli.json),
    };

    let outcome = match state.start().await {
        Ok(()) => run(&state, &cli).await,
        Err(e) => Err(e),
    };
    state.shutdown().await;

    match outcome {
        Ok(view) => {
            println!("{}", view.render(cli.json));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e, cli.json),
    }
}

async fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    if cli.demo {
        let backend = demo::signed_in().await?;
        return Ok(AppState::new(backend).with_organization(cli.org.clone()));
    }

    let config = Config::from_env()?.with_organization(cli.org.clone());
    tracing::debug!(url = %config.backend.url, "Loaded configuration");

    AppState::from_config(&config)
}

fn report(err: &CliError, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(&err.to_response()) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("{}", err),
        }
    } else {
        eprintln!("error: {}", err);
        if let CliError::ValidationError(details) = err {
            for detail in details {
                eprintln!("  {}: {}", detail.field, detail.message);
            }
        }
    }

    ExitCode::from(err.exit_code())
}
