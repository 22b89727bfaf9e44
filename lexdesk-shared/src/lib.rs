//! # LexDesk Shared Library
//!
//! This crate contains the types and the remote backend boundary shared by the
//! LexDesk session runtime and the terminal front-end.
//!
//! ## Module Organization
//!
//! - `models`: Row types for the hosted tables (profiles, organizations,
//!   memberships, clients, cases, case documents)
//! - `backend`: Auth and data API traits plus the REST and in-memory backends
//! - `config`: Backend configuration from environment variables

pub mod backend;
pub mod config;
pub mod models;

/// Current version of the LexDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
