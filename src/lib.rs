//! authgate backend library
//!
//! Credential hashing, stateless session tokens and the request-time
//! authorization chain, plus the HTTP surface built on them.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
