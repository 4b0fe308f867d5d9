use crate::config::Config;
use crate::db::UrlStore;
use crate::services::LinkService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Built once at startup and handed to the router wrapped in `Arc`; handlers
/// reach the store only through it.
#[derive(Clone)]
pub struct AppState {
    /// Link creation, lookup and deactivation over the configured store
    pub links: LinkService,

    /// Base URL for constructing public and admin URLs (e.g., "http://localhost:3000")
    pub base_url: String,
}

impl AppState {
    pub fn new(store: Arc<dyn UrlStore>, config: &Config) -> Self {
        Self {
            links: LinkService::new(store, &config.keys, &config.url),
            base_url: config.url.base_url.clone(),
        }
    }
}
