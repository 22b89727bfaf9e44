/// Command-line arguments
///
/// Every page of the application is a subcommand; `open <path>` reaches the
/// same pages by route path.

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "lexdesk")]
#[command(about = "Case and client management for law practices")]
#[command(version)]
#[command(
    after_help = "Environment:\n  SUPABASE_URL          Backend URL\n  SUPABASE_ANON_KEY     Public API key\n  LEXDESK_ORGANIZATION  Organization to activate\n  RUST_LOG              Log filter"
)]
pub struct Cli {
    /// Organization to activate (id, slug or name)
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Use a seeded in-memory backend with the demo user signed in
    #[arg(long, global = true, default_value_t = false)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "LEXDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "LEXDESK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user and active organization
    Whoami,

    /// List organization memberships
    Orgs,

    /// Render a page by route path, e.g. `/cases`
    Open { path: String },

    Dashboard,

    Cases(CasesArgs),

    Clients(ClientsArgs),

    Documents,

    Calendar,

    Reports,

    Settings,
}

#[derive(Debug, Args)]
pub struct CasesArgs {
    /// Match title, client name or case number
    #[arg(long, default_value = "")]
    pub search: String,

    /// `all` or a case status
    #[arg(long, default_value = "all")]
    pub status: String,

    #[command(subcommand)]
    pub action: Option<CaseAction>,
}

#[derive(Debug, Subcommand)]
pub enum CaseAction {
    /// Open a new case
    New(NewCaseArgs),

    /// Change fields of a case
    Update(UpdateCaseArgs),

    /// Delete a case
    Delete { id: Uuid },
}

#[derive(Debug, Args)]
pub struct NewCaseArgs {
    #[arg(long)]
    pub title: String,

    /// Client id or exact client name
    #[arg(long)]
    pub client: String,

    /// Area label, e.g. "Cível" or "Trabalhista"
    #[arg(long = "type", default_value = "Cível")]
    pub case_type: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub practice_area: Option<String>,

    #[arg(long, default_value = "medium")]
    pub priority: String,

    #[arg(long, default_value = "hourly")]
    pub billing: String,

    /// Estimated value; a comma is accepted as decimal separator
    #[arg(long, default_value = "")]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct UpdateCaseArgs {
    pub id: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Match name, email or document number
    #[arg(long, default_value = "")]
    pub search: String,

    /// `all`, `individual` or `company`
    #[arg(long = "type", default_value = "all")]
    pub client_type: String,

    #[command(subcommand)]
    pub action: Option<ClientAction>,
}

#[derive(Debug, Subcommand)]
pub enum ClientAction {
    /// Register a client
    New(NewClientArgs),

    /// Change fields of a client
    Update(UpdateClientArgs),

    /// Delete a client
    Delete { id: Uuid },
}

#[derive(Debug, Args)]
pub struct NewClientArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long = "type", default_value = "individual")]
    pub client_type: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// CPF or CNPJ
    #[arg(long)]
    pub document: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateClientArgs {
    pub id: Uuid,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub document: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[arg(long)]
    pub status: Option<String>,
}
