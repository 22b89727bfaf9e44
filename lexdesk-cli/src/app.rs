/// Application state, route table and command dispatch
///
/// # Routes
///
/// ```text
/// /login        public
/// /             redirects to /dashboard
/// /dashboard    protected
/// /cases        protected
/// /clients      protected
/// /documents    protected, under construction
/// /calendar     protected, under construction
/// /reports      protected, under construction
/// /settings     protected, under construction
/// ```
///
/// Protected routes go through [`guard`]: while the session is still being
/// resolved a loading view is shown, without a user the request is sent to
/// `/login`, otherwise the page renders.
///
/// # Example
///
/// ```no_run
/// use lexdesk_cli::{app::AppState, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::from_config(&config)?;
/// state.start().await?;
/// # Ok(())
/// # }
/// ```

use crate::cli::{CaseAction, Cli, ClientAction, Command};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::routes::{self, View};
use lexdesk_session::resources::{CaseStore, ClientStore, StatsStore};
use lexdesk_session::{AuthController, AuthSnapshot};
use lexdesk_shared::backend::{Backend, RestBackend};
use std::sync::Arc;

/// Shared application state
///
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Session and organization context
    pub auth: Arc<AuthController>,

    pub cases: Arc<CaseStore>,

    pub clients: Arc<ClientStore>,

    pub stats: Arc<StatsStore>,

    /// Organization selector applied whenever a user is signed in
    pub organization: Option<String>,
}

impl AppState {
    /// Creates the controller and the stores on top of `backend`
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let auth = AuthController::new(backend);

        Self {
            cases: Arc::new(CaseStore::new(auth.clone())),
            clients: Arc::new(ClientStore::new(auth.clone())),
            stats: Arc::new(StatsStore::new(auth.clone())),
            auth,
            organization: None,
        }
    }

    /// Sets the organization selector (id, slug or name)
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    /// Creates application state backed by the hosted REST backend
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend = RestBackend::new(config.backend.clone())?;
        Ok(Self::new(Arc::new(backend)).with_organization(config.organization.clone()))
    }

    /// Resolves the current session, then applies the organization selector
    ///
    /// # Errors
    ///
    /// Returns `CliError::NotFound` when the signed-in user has no
    /// membership matching the selector.
    pub async fn start(&self) -> CliResult<()> {
        self.auth.start().await;
        let snapshot = self.auth.wait_for(|s| !s.is_loading()).await;

        if snapshot.is_authenticated() {
            self.apply_organization()?;
        }

        Ok(())
    }

    /// Activates the membership matching the configured selector, if any
    pub fn apply_organization(&self) -> CliResult<()> {
        let Some(selector) = self.organization.as_deref() else {
            return Ok(());
        };

        self.auth
            .select_organization(selector)
            .map(|_| ())
            .ok_or_else(|| {
                CliError::NotFound(format!("No membership in organization '{}'", selector))
            })
    }

    /// Stops the auth listener
    pub async fn shutdown(&self) {
        self.auth.shutdown().await;
    }
}

/// Application routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Cases,
    Clients,
    Documents,
    Calendar,
    Reports,
    Settings,
    /// Any other path below the protected layout
    Unknown(String),
}

impl Route {
    /// Sidebar order
    pub const NAVIGATION: [Route; 7] = [
        Route::Dashboard,
        Route::Cases,
        Route::Clients,
        Route::Documents,
        Route::Calendar,
        Route::Reports,
        Route::Settings,
    ];

    /// Resolves a path; `/` and the empty path redirect to the dashboard
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim();
        let normalized = trimmed.trim_end_matches('/');

        match normalized {
            "" => Route::Dashboard,
            "/login" => Route::Login,
            "/dashboard" => Route::Dashboard,
            "/cases" => Route::Cases,
            "/clients" => Route::Clients,
            "/documents" => Route::Documents,
            "/calendar" => Route::Calendar,
            "/reports" => Route::Reports,
            "/settings" => Route::Settings,
            _ => Route::Unknown(trimmed.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Cases => "/cases",
            Route::Clients => "/clients",
            Route::Documents => "/documents",
            Route::Calendar => "/calendar",
            Route::Reports => "/reports",
            Route::Settings => "/settings",
            Route::Unknown(path) => path,
        }
    }

    /// Navigation label
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Entrar",
            Route::Dashboard => "Dashboard",
            Route::Cases => "Casos",
            Route::Clients => "Clientes",
            Route::Documents => "Documentos",
            Route::Calendar => "Agenda",
            Route::Reports => "Relatórios",
            Route::Settings => "Configurações",
            Route::Unknown(_) => "",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }
}

/// Outcome of the protected-route check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Session still resolving
    Loading,
    /// No user; go to `/login`
    RedirectToLogin,
    Render,
}

/// Decides whether `route` may render for `snapshot`
pub fn guard(snapshot: &AuthSnapshot, route: &Route) -> Guard {
    if route.is_public() {
        return Guard::Render;
    }

    if snapshot.is_loading() {
        Guard::Loading
    } else if snapshot.user.is_none() {
        Guard::RedirectToLogin
    } else {
        Guard::Render
    }
}

/// Renders `route` after applying the guard
pub async fn navigate(state: &AppState, route: Route) -> CliResult<View> {
    let snapshot = state.auth.snapshot();

    match guard(&snapshot, &route) {
        Guard::Loading => return Ok(routes::loading()),
        Guard::RedirectToLogin => {
            tracing::debug!(route = route.path(), "Redirecting to /login");
            return Err(CliError::Unauthorized(format!(
                "Sign in to open {}: lexdesk login <email>",
                route.path()
            )));
        }
        Guard::Render => {}
    }

    match route {
        Route::Login => Ok(routes::auth::login_page(&snapshot)),
        Route::Dashboard => routes::dashboard::show(state).await,
        Route::Cases => routes::cases::list(state, "", "all").await,
        Route::Clients => routes::clients::list(state, "", "all").await,
        Route::Documents | Route::Calendar | Route::Reports | Route::Settings => {
            Ok(routes::placeholder::show(&snapshot, &route))
        }
        Route::Unknown(path) => Err(CliError::NotFound(format!("No route for {}", path))),
    }
}

/// Runs one command against started application state
pub async fn run(state: &AppState, cli: &Cli) -> CliResult<View> {
    match &cli.command {
        Command::Login { email, password } => routes::auth::login(state, email, password).await,
        Command::Signup {
            email,
            password,
            full_name,
        } => routes::auth::signup(state, email, password, full_name).await,
        Command::Logout => routes::auth::logout(state).await,
        Command::Whoami => {
            require_user(state)?;
            Ok(routes::auth::whoami(&state.auth.snapshot()))
        }
        Command::Orgs => {
            require_user(state)?;
            Ok(routes::auth::organizations(&state.auth.snapshot()))
        }
        Command::Open { path } => navigate(state, Route::parse(path)).await,
        Command::Dashboard => navigate(state, Route::Dashboard).await,
        Command::Cases(args) => {
            require_user(state)?;
            match &args.action {
                None => routes::cases::list(state, &args.search, &args.status).await,
                Some(CaseAction::New(new)) => routes::cases::create(state, new).await,
                Some(CaseAction::Update(update)) => routes::cases::update(state, update).await,
                Some(CaseAction::Delete { id }) => routes::cases::delete(state, *id).await,
            }
        }
        Command::Clients(args) => {
            require_user(state)?;
            match &args.action {
                None => routes::clients::list(state, &args.search, &args.client_type).await,
                Some(ClientAction::New(new)) => routes::clients::create(state, new).await,
                Some(ClientAction::Update(update)) => routes::clients::update(state, update).await,
                Some(ClientAction::Delete { id }) => routes::clients::delete(state, *id).await,
            }
        }
        Command::Documents => navigate(state, Route::Documents).await,
        Command::Calendar => navigate(state, Route::Calendar).await,
        Command::Reports => navigate(state, Route::Reports).await,
        Command::Settings => navigate(state, Route::Settings).await,
    }
}

/// Applies the guard for commands that take arguments beyond a route
fn require_user(state: &AppState) -> CliResult<()> {
    match guard(&state.auth.snapshot(), &Route::Dashboard) {
        Guard::Render => Ok(()),
        Guard::Loading => Err(CliError::ServiceUnavailable(
            "Session is still loading".to_string(),
        )),
        Guard::RedirectToLogin => Err(CliError::Unauthorized(
            "Not signed in: lexdesk login <email>".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdesk_session::AuthStatus;
    use lexdesk_shared::backend::AuthUser;
    use uuid::Uuid;

    fn snapshot(status: AuthStatus, signed_in: bool) -> AuthSnapshot {
        let user = signed_in.then(|| AuthUser {
            id: Uuid::new_v4(),
            email: Some("ana@example.com".to_string()),
            user_metadata: serde_json::json!({}),
        });

        AuthSnapshot {
            status,
            user,
            ..AuthSnapshot::default()
        }
    }

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/"), Route::Dashboard);
        assert_eq!(Route::parse(""), Route::Dashboard);
        assert_eq!(Route::parse("/cases/"), Route::Cases);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/settings"), Route::Settings);
        assert_eq!(
            Route::parse("/cases/123"),
            Route::Unknown("/cases/123".to_string())
        );
    }

    #[test]
    fn test_navigation_titles() {
        let titles: Vec<&str> = Route::NAVIGATION.iter().map(|r| r.title()).collect();
        assert_eq!(
            titles,
            vec![
                "Dashboard",
                "Casos",
                "Clientes",
                "Documentos",
                "Agenda",
                "Relatórios",
                "Configurações"
            ]
        );
        assert_eq!(Route::Reports.path(), "/reports");
    }

    #[test]
    fn test_guard_loading() {
        let loading = snapshot(AuthStatus::Loading, false);
        assert_eq!(guard(&loading, &Route::Cases), Guard::Loading);
        assert_eq!(guard(&loading, &Route::Login), Guard::Render);
    }

    #[test]
    fn test_guard_redirects_without_user() {
        let signed_out = snapshot(AuthStatus::Unauthenticated, false);
        assert_eq!(guard(&signed_out, &Route::Dashboard), Guard::RedirectToLogin);
        assert_eq!(
            guard(&signed_out, &Route::Unknown("/x".to_string())),
            Guard::RedirectToLogin
        );
        assert_eq!(guard(&signed_out, &Route::Login), Guard::Render);
    }

    #[test]
    fn test_guard_renders_for_user() {
        let signed_in = snapshot(AuthStatus::Authenticated, true);
        assert_eq!(guard(&signed_in, &Route::Clients), Guard::Render);
    }
}
