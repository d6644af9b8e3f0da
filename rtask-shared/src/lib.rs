//! # RTask Shared Library
//!
//! Domain types, storage and business logic for the RTask API server.
//!
//! ## Module Organization
//!
//! - `models`: Persisted records and their PostgreSQL operations
//! - `store`: Storage traits with PostgreSQL and in-memory implementations
//! - `services`: Task and account operations over injected stores
//! - `auth`: Bearer tokens, password hashing and reset tokens
//! - `mail`: Transactional email delivery
//! - `identity`: Google ID token verification
//! - `avatar`: Avatar file storage
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod avatar;
pub mod db;
pub mod identity;
pub mod mail;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the RTask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
