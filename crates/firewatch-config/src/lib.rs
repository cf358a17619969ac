//! Configuration for the firewatch gateway.
//!
//! Layered loading (built-in defaults, then a TOML file, then
//! `FIREWATCH_` environment variables), validation, API token resolution
//! (env + keyring + plaintext), and translation to
//! `firewatch_core::EngineConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use firewatch_core::{EngineConfig, TlsVerification};

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `FIREWATCH_SERVER__LISTEN`.
pub const ENV_PREFIX: &str = "FIREWATCH_";

const KEYRING_SERVICE: &str = "firewatch";
const KEYRING_TOKEN_ENTRY: &str = "api-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[server]`: the dashboard-facing listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    /// Bind address, e.g. `127.0.0.1:8080`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Mount point of the REST routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// WebSocket upgrade path.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Capacity of each client's outbound queue.
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,

    /// Seconds between WebSocket pings.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Allow any origin (development dashboards on another port).
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_prefix: default_api_prefix(),
            ws_path: default_ws_path(),
            send_queue: default_send_queue(),
            heartbeat_secs: default_heartbeat_secs(),
            cors_permissive: false,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_api_prefix() -> String {
    "/api".into()
}
fn default_ws_path() -> String {
    "/ws".into()
}
fn default_send_queue() -> usize {
    64
}
fn default_heartbeat_secs() -> u64 {
    30
}

/// `[engine]`: how to reach the firewall engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    /// Engine control URL.
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Bounded wait for each control call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept any TLS certificate.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            timeout_secs: default_timeout_secs(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_engine_url() -> String {
    "http://127.0.0.1:50051".into()
}
fn default_timeout_secs() -> u64 {
    10
}

/// `[auth]`: the optional bearer-token gate.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthSection {
    /// Token in plaintext (prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Name of an environment variable holding the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_env: Option<String>,
}

/// `[logging]`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "firewatch", "firewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("firewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Build the layered figment without extracting it.
pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "config file");

    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate the config. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        let server = &self.server;
        if !server.api_prefix.starts_with('/') {
            return Err(invalid("server.api_prefix", "must start with '/'"));
        }
        if !server.ws_path.starts_with('/') || server.ws_path.len() < 2 {
            return Err(invalid("server.ws_path", "must be a path like '/ws'"));
        }
        if server.send_queue == 0 {
            return Err(invalid("server.send_queue", "must be at least 1"));
        }
        if server.heartbeat_secs == 0 {
            return Err(invalid("server.heartbeat_secs", "must be at least 1"));
        }
        if self.engine.timeout_secs == 0 {
            return Err(invalid("engine.timeout_secs", "must be at least 1"));
        }
        self.engine_url()?;
        Ok(())
    }

    /// Parsed `server.listen`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen
            .parse()
            .map_err(|_| invalid("server.listen", format!("not a socket address: {}", self.server.listen)))
    }

    fn engine_url(&self) -> Result<url::Url, ConfigError> {
        let url: url::Url = self
            .engine
            .url
            .parse()
            .map_err(|_| invalid("engine.url", format!("invalid URL: {}", self.engine.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "engine.url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    /// Translate `[engine]` into the core runtime config.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let url = self.engine_url()?;

        let tls = if self.engine.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.engine.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(EngineConfig {
            url,
            tls,
            timeout: Duration::from_secs(self.engine.timeout_secs),
        })
    }

    /// Render as TOML with any plaintext token masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.auth.api_token.is_some() {
            shown.auth.api_token = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the gateway API token.
///
/// Order: `auth.api_token_env` → system keyring → plaintext
/// `auth.api_token`. `None` means the gate stays open.
pub fn resolve_api_token(auth: &AuthSection) -> Option<SecretString> {
    // 1. Named env var
    if let Some(ref env_name) = auth.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_ENTRY) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    auth.api_token
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.clone()))
}
