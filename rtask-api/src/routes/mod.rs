/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `user`: Accounts, passwords, Google sign-in and avatars
/// - `tasks`: Owner-scoped task CRUD

pub mod health;
pub mod tasks;
pub mod user;
