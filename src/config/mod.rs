// src/config/mod.rs
//! Startup configuration. Read once, then passed around as an immutable
//! [`AppConfig`].
//!
//! Lookup order for every key: process environment (after `.env` via
//! dotenvy), then the TOML secrets file (`$SECRETS_PATH`, default
//! `config/secrets.toml`). Blank values count as unset.

pub mod db;
pub mod mail;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_TTL;

pub use db::DbConfig;
pub use mail::MailConfig;

pub const ENV_SECRETS_PATH: &str = "SECRETS_PATH";
pub const DEFAULT_SECRETS_PATH: &str = "config/secrets.toml";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8501";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("cannot read secrets file {path}: {reason}")]
    Secrets { path: String, reason: String },
}

/// Key/value view over the environment and the optional secrets file.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    env: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl Settings {
    pub fn new(env: HashMap<String, String>, secrets: HashMap<String, String>) -> Self {
        Self { env, secrets }
    }

    /// Snapshot of the process environment plus the secrets file, if any.
    /// A missing default secrets file is fine; an explicit `SECRETS_PATH`
    /// that cannot be read is an error.
    pub fn from_process() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let secrets = match env.get(ENV_SECRETS_PATH).filter(|p| !p.trim().is_empty()) {
            Some(p) => load_secrets(Path::new(p.trim()))?,
            None => {
                let p = Path::new(DEFAULT_SECRETS_PATH);
                if p.exists() {
                    load_secrets(p)?
                } else {
                    HashMap::new()
                }
            }
        };
        Ok(Self { env, secrets })
    }

    /// Trimmed value, environment first. Blank counts as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let pick = |m: &HashMap<String, String>| {
            m.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        pick(&self.env).or_else(|| pick(&self.secrets))
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// Parse a flat TOML table (`KEY = "value"` or `KEY = 6543`).
pub fn load_secrets(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let err = |reason: String| ConfigError::Secrets {
        path: path.display().to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
    parse_secrets(&content).map_err(err)
}

fn parse_secrets(content: &str) -> Result<HashMap<String, String>, String> {
    let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut out = HashMap::with_capacity(table.len());
    for (k, v) in table {
        let s = match v {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            // Nested sections are not settings.
            _ => continue,
        };
        out.insert(k, s);
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub bind_addr: SocketAddr,
    pub cache_ttl: Duration,
    pub report_dir: PathBuf,
    /// `None` when mail credentials/addresses are incomplete (emailing skipped).
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_settings(&Settings::from_process()?)
    }

    pub fn from_settings(s: &Settings) -> Result<Self, ConfigError> {
        let db = DbConfig::from_settings(s)?;

        let bind_raw = s.get_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            reason: format!("'{bind_raw}' is not a socket address"),
        })?;

        let cache_ttl = match s.get("QUERY_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| ConfigError::Invalid {
                key: "QUERY_CACHE_TTL_SECS",
                reason: format!("'{raw}' is not a whole number of seconds"),
            })?),
            None => DEFAULT_TTL,
        };

        let report_dir = PathBuf::from(s.get_or("REPORT_OUTPUT_DIR", "."));
        let mail = MailConfig::from_settings(s)?;

        Ok(Self {
            db,
            bind_addr,
            cache_ttl,
            report_dir,
            mail,
        })
    }
}

#[cfg(test)]
pub(crate) fn settings_from(pairs: &[(&str, &str)]) -> Settings {
    let env = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::new(env, HashMap::new())
}
