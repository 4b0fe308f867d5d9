//! shortkey - a URL shortener with secret admin keys.
//!
//! Each shortened link gets two independent random keys: a public one that
//! redirects to the target URL, and a secret one that unlocks the admin view.

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;
