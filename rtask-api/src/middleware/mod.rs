/// Middleware for the API server
///
/// - `security`: Security response headers

pub mod security;
