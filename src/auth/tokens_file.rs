use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;

/// Non-secret token metadata kept next to the config.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TokensFile {
    pub access_token: Option<String>,
    pub expires_at_epoch: Option<i64>, // epoch seconds
}

impl TokensFile {
    /// Cached access token, if it is still valid at `now`.
    pub fn valid_at(&self, now: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at_epoch) {
            (Some(at), Some(exp)) if now < exp => Some(at.as_str()),
            _ => None,
        }
    }
}

pub fn tokens_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("tokens.json"))
}

pub fn save_tokens_at(path: &Path, tf: &TokensFile) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(tf)?)?;
    Ok(())
}

pub fn load_tokens_at(path: &Path) -> Result<Option<TokensFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&s)?))
}

pub fn save_tokens(access_token: Option<&str>, expires_at_epoch: Option<i64>) -> Result<()> {
    let tf = TokensFile {
        access_token: access_token.map(|s| s.to_string()),
        expires_at_epoch,
    };
    save_tokens_at(&tokens_path()?, &tf)
}

pub fn load_tokens() -> Result<Option<TokensFile>> {
    load_tokens_at(&tokens_path()?)
}
