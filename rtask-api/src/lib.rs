//! # RTask API Server Library
//!
//! HTTP layer for RTask: configuration, routing, error envelopes and the
//! client wire format. Business logic lives in `rtask-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `wire`: Client JSON shapes and decoding

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod wire;
