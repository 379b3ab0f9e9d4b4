//! fisc core library
//!
//! Storage, domain models, and service clients for the fisc budget
//! transparency application:
//!
//! - [`db`]: SQLite layer: entity CRUD, ownership-chain authorization,
//!   and the atomic bulk-import reconciler
//! - [`import`]: CSV/spreadsheet upload parsing and validation
//! - [`auth`]: password hashing and session tokens
//! - [`ai`]: AI microservice gateway with safe-fallback containment
//! - [`models`]: shared domain types

pub mod ai;
pub mod auth;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

pub use error::{Error, Result};
