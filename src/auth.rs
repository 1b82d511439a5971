//! Session authentication: password hashing, signed session tokens carried in
//! an HttpOnly cookie, and the extractor that resolves the current user.

pub mod config;
pub mod middleware;
pub mod models;
pub mod password;
pub mod session;
