use anyhow::Result;
use std::sync::Arc;

use crate::archive::{Archiver, DegradedResponse};
use crate::auth::token_manager::TokenManager;
use crate::config::Config;
use crate::gmail::GmailApi;
use crate::http::fixture::FixtureClient;
use crate::http::live::{LiveClient, StaticToken, TokenSource};
use crate::http::{HttpClient, OfflineClient};
use crate::logging::ComponentLogger;
use crate::store::repo::KeyValueStore;

/// Bypasses the OAuth dance when set.
pub const ACCESS_TOKEN_ENV: &str = "GMAIL_ACCESS_TOKEN";

/// Pick the HTTP client once, at startup.
pub fn build_http_client(cfg: &Config, mock: bool) -> Result<Arc<dyn HttpClient>> {
    let static_token = std::env::var(ACCESS_TOKEN_ENV).ok();

    if mock {
        // fixtures answer every Gmail call; only stray URLs reach the inner client
        let inner: Box<dyn HttpClient> = match static_token {
            Some(t) => Box::new(LiveClient::new(
                Arc::new(StaticToken(t)),
                ComponentLogger::new("LiveClient"),
            )?),
            None => Box::new(OfflineClient),
        };
        return Ok(Arc::new(FixtureClient::install(
            inner,
            ComponentLogger::new("MockAPI"),
        )));
    }

    let tokens: Arc<dyn TokenSource> = match static_token {
        Some(t) => Arc::new(StaticToken(t)),
        None => Arc::new(TokenManager::from_config(cfg, ComponentLogger::new("Auth"))?),
    };
    Ok(Arc::new(LiveClient::new(tokens, ComponentLogger::new("LiveClient"))?))
}

pub fn build_archiver(cfg: &Config, http: Arc<dyn HttpClient>, store: Arc<dyn KeyValueStore>) -> Archiver {
    Archiver::new(
        GmailApi::new(http, cfg.api_base.clone(), cfg.unread_query.clone()),
        store,
        DegradedResponse::new(cfg.fallback_delay()),
        ComponentLogger::new("Archiver"),
    )
}
