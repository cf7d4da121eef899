//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the file named by `ESCALAS_CONFIG`), then applies
//! `ESCALAS_BACKEND_URL`, `ESCALAS_SESSION_DIR` and `ESCALAS_LOG_LEVEL`.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Fully-resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin without the `/api` prefix, e.g. `http://localhost:8001`.
    pub backend_url: String,
    /// Directory holding the persisted session keys (already expanded, no `~`).
    pub session_dir: PathBuf,
    pub log_level: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// call-site name -> fallback label overrides (from `[messages]`).
    pub messages: HashMap<String, String>,
}

impl Config {
    /// Base URL every API path is resolved against.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.backend_url.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Values that replace their TOML counterparts when present.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub session_dir: Option<String>,
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            backend_url: env::var("ESCALAS_BACKEND_URL").ok(),
            session_dir: env::var("ESCALAS_SESSION_DIR").ok(),
            log_level: env::var("ESCALAS_LOG_LEVEL").ok(),
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    client: RawClient,
    #[serde(default)]
    messages: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RawClient {
    #[serde(default = "default_backend_url")]
    backend_url: String,
    #[serde(default = "default_session_dir")]
    session_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawClient {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            session_dir: default_session_dir(),
            log_level: default_log_level(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_backend_url() -> String { "http://localhost:8001".to_string() }
fn default_session_dir() -> String { "~/.escalas/session".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_timeout_seconds() -> u64 { 30 }

/// Load config from `ESCALAS_CONFIG` or `config/default.toml`, then apply env overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("ESCALAS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(Path::new(&path), &Overrides::from_env())
}

/// Internal loader. Accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let c = parsed.client;

    let backend_url = overrides.backend_url.clone().unwrap_or(c.backend_url);
    if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
        return Err(AppError::Config(format!(
            "backend_url must start with http:// or https://, got '{backend_url}'"
        )));
    }
    let session_dir = expand_home(overrides.session_dir.as_deref().unwrap_or(&c.session_dir));
    let log_level = overrides.log_level.clone().unwrap_or(c.log_level);

    Ok(Config {
        backend_url,
        session_dir,
        log_level,
        timeout_seconds: c.timeout_seconds,
        messages: parsed.messages,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

#[cfg(test)]
impl Config {
    pub fn test_default(session_dir: &Path) -> Self {
        Self {
            backend_url: "http://127.0.0.1:0".into(),
            session_dir: session_dir.to_path_buf(),
            log_level: "info".into(),
            timeout_seconds: 1,
            messages: HashMap::new(),
        }
    }
}
