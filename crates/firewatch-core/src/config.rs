// ── Runtime engine configuration ──
//
// Describes how to reach the firewall engine. Never touches disk:
// `firewatch-config` loads files and hands an `EngineConfig` in.

use std::path::PathBuf;
use std::time::Duration;

use firewatch_api::transport::{TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy for the engine connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed engine certificates).
    DangerAcceptInvalid,
}

/// Connection settings for the firewall engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine root URL (e.g., `http://127.0.0.1:50051`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Bounded wait applied to every control call.
    pub timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Translate into the api crate's transport settings.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig::default()
            .with_timeout(self.timeout)
            .with_tls(tls)
    }
}
