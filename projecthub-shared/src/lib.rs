//! # ProjectHub Shared Library
//!
//! Core of the ProjectHub backend: token lifecycle, project authorization and
//! the audit trail, independent of the HTTP layer.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT codec, refresh fingerprints, role guards
//! - `db`: PostgreSQL pool and migrations
//! - `models`: Database models and data structures
//! - `store`: Transactional store abstraction (PostgreSQL and in-memory)
//! - `services`: `TokenService` and `ProjectService`

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the ProjectHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
