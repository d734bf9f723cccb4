use anyhow::{Result, anyhow};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{oauth, token_store, tokens_file};
use crate::config::Config;
use crate::http::live::TokenSource;
use crate::logging::ComponentLogger;

// when the provider omits expires_in
const DEFAULT_LIFETIME_SECS: i64 = 3500;

pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub user_email: String,
    // timer and manual passes may both need a token at once
    refresh_lock: Mutex<()>,
    log: ComponentLogger,
}

impl TokenManager {
    pub fn from_config(cfg: &Config, log: ComponentLogger) -> Result<Self> {
        let client_id = cfg.client_id.clone();
        let user_email = cfg
            .user_email
            .clone()
            .ok_or_else(|| anyhow!("user_email not set in config"))?;
        let redirect_uri = cfg
            .redirect_uri
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:8080/callback".to_string());

        let client_secret = token_store::load_client_secret(&client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            user_email,
            refresh_lock: Mutex::new(()),
            log,
        })
    }

    fn persist(&self, t: oauth::Tokens, now: i64) -> Result<String> {
        if let Some(rt) = &t.refresh_token
            && let Err(e) = token_store::save_refresh_token(&self.user_email, rt)
        {
            self.log
                .warn("Could not store refresh token in keyring", &[("error", &e)]);
        }
        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + DEFAULT_LIFETIME_SECS);
        tokens_file::save_tokens(Some(&t.access_token), Some(exp))?;
        Ok(t.access_token)
    }

    /// Returns a valid access token; refreshes or runs PKCE if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let _guard = self
            .refresh_lock
            .lock()
            .map_err(|_| anyhow!("token lock poisoned"))?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        // 1) cached & not expired
        if let Some(tf) = tokens_file::load_tokens()?
            && let Some(at) = tf.valid_at(now)
        {
            return Ok(at.to_string());
        }

        // 2) refresh if possible
        if let Some(rt) = token_store::load_refresh_token(&self.user_email)? {
            self.log.info("Refreshing access token", &[("user", &self.user_email)]);
            match oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt) {
                Ok(t) => return self.persist(t, now),
                Err(e) => self.log.warn(
                    "Refresh failed, falling back to interactive auth",
                    &[("error", &e)],
                ),
            }
        }

        // 3) otherwise PKCE
        self.log.info("Running interactive PKCE auth flow", &[]);
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            &self.log,
        )?;
        self.persist(t, now)
    }
}

impl TokenSource for TokenManager {
    fn access_token(&self) -> Result<String> {
        self.get_access_token()
    }
}
