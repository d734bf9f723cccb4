use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::gmail::{DEFAULT_API_BASE, DEFAULT_UNREAD_QUERY};

pub const APP_DIR: &str = "rs_mail_archiver";

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_unread_query() -> String {
    DEFAULT_UNREAD_QUERY.to_string()
}

/// One week. Longer periods are rejected rather than left to overflow.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

fn default_interval_minutes() -> u64 {
    60
}

fn default_fallback_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub client_id: String,
    pub user_email: Option<String>,
    pub redirect_uri: Option<String>,
    pub db_path: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_unread_query")]
    pub unread_query: String,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    /// Answer Gmail calls from built-in fixtures instead of the network.
    #[serde(default)]
    pub mock: bool,
}

impl Config {
    pub fn interval(&self) -> Duration {
        let minutes = self.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES);
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(anyhow::anyhow!(
                "interval_minutes = {} exceeds the maximum of {MAX_INTERVAL_MINUTES}",
                self.interval_minutes
            ));
        }
        Ok(())
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    fn template() -> Self {
        Self {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            user_email: Some("you@example.com".to_string()),
            redirect_uri: Some("http://127.0.0.1:8080/callback".to_string()),
            db_path: None,
            api_base: default_api_base(),
            unread_query: default_unread_query(),
            interval_minutes: default_interval_minutes(),
            fallback_delay_ms: default_fallback_delay_ms(),
            mock: false,
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let p = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join(APP_DIR);
    fs::create_dir_all(&p)?;
    Ok(p)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("archive.db"))
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let tom = toml::to_string_pretty(&Config::template())?;
        fs::write(&path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}, edit it and run again",
            path.display()
        ));
    }
    parse_config(&fs::read_to_string(path)?)
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse_config(r#"client_id = "abc""#).unwrap();
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.unread_query, "is:unread");
        assert_eq!(cfg.interval(), Duration::from_secs(3600));
        assert_eq!(cfg.fallback_delay(), Duration::from_millis(1000));
        assert!(!cfg.mock);
        assert_eq!(cfg.user_email, None);
    }

    #[test]
    fn template_round_trips() {
        let text = toml::to_string_pretty(&Config::template()).unwrap();
        assert_eq!(parse_config(&text).unwrap(), Config::template());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cfg = parse_config("client_id = \"abc\"\ninterval_minutes = 0\n").unwrap();
        assert_eq!(cfg.interval(), Duration::from_secs(60));
    }

    #[test]
    fn interval_upper_bound() {
        let at_max = format!("client_id = \"abc\"\ninterval_minutes = {MAX_INTERVAL_MINUTES}\n");
        assert_eq!(
            parse_config(&at_max).unwrap().interval(),
            Duration::from_secs(MAX_INTERVAL_MINUTES * 60)
        );

        let huge = "client_id = \"abc\"\ninterval_minutes = 9223372036854775807\n";
        let err = parse_config(huge).unwrap_err();
        assert!(err.to_string().contains("interval_minutes"));
    }

    #[test]
    fn overridden_interval_never_overflows() {
        let mut cfg = parse_config(r#"client_id = "abc""#).unwrap();
        cfg.interval_minutes = u64::MAX;
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.interval(), Duration::from_secs(MAX_INTERVAL_MINUTES * 60));
    }
}
