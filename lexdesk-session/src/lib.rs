//! # LexDesk Session Library
//!
//! This library holds the stateful side of the LexDesk client: who is signed
//! in, which organization is active, and the organization-scoped collections
//! the views render.
//!
//! ## Modules
//!
//! - `controller`: Session/auth controller and its published snapshots
//! - `resources`: Organization-scoped stores for cases, clients and stats
//! - `filter`: Search and filter helpers for the case and client lists
//!
//! ## Example
//!
//! ```no_run
//! use lexdesk_session::controller::AuthController;
//! use lexdesk_session::resources::CaseStore;
//! use lexdesk_shared::backend::{Backend, MemoryBackend};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
//! let auth = AuthController::new(backend);
//! auth.start().await;
//!
//! let cases = CaseStore::new(auth.clone());
//! cases.fetch_all().await;
//! println!("{} cases", cases.items().len());
//!
//! auth.shutdown().await;
//! # }
//! ```

pub mod controller;
pub mod filter;
pub mod resources;

pub use controller::{AuthController, AuthSnapshot, AuthStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
