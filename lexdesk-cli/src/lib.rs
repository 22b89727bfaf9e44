//! # LexDesk Terminal Front-End
//!
//! This library provides the route table, views and command dispatch of the
//! `lexdesk` binary.
//!
//! ## Modules
//!
//! - `app`: Application state, route table and the protected-route guard
//! - `cli`: Command-line arguments
//! - `config`: Configuration management
//! - `demo`: Seeded in-memory backend for trying the front-end offline
//! - `error`: Error handling and exit-code mapping
//! - `routes`: View and action handlers, one module per page

pub mod app;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod routes;

pub use app::{run, AppState};
