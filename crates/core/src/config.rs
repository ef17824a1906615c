//! Configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::{default_base_url, CoreError, CoreResult, ServiceName};

/// Default environment prefix, e.g. `PRICE_PROXY_SOURCE_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "PRICE_PROXY";

/// Provider secrets. Read-only once loaded.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub birdeye_api_key: Option<String>,
    pub codex_api_key: Option<String>,
}

impl Credentials {
    /// Key for a credentialed service. Blank keys count as missing.
    pub fn key_for(&self, service: ServiceName) -> Option<&str> {
        let key = match service {
            ServiceName::Birdeye => self.birdeye_api_key.as_deref(),
            ServiceName::Codex => self.codex_api_key.as_deref(),
            _ => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("birdeye_api_key", &redact(&self.birdeye_api_key))
            .field("codex_api_key", &redact(&self.codex_api_key))
            .finish()
    }
}

/// Upstream API roots, overridable for staging or tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub birdeye: String,
    pub codex: String,
    pub defillama: String,
    pub dexscreener: String,
    pub geckoterminal: String,
}

impl Endpoints {
    /// Route every service to the same root
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            birdeye: base_url.clone(),
            codex: base_url.clone(),
            defillama: base_url.clone(),
            dexscreener: base_url.clone(),
            geckoterminal: base_url,
        }
    }

    pub fn base_url(&self, service: ServiceName) -> &str {
        let url = match service {
            ServiceName::Birdeye => &self.birdeye,
            ServiceName::Codex => &self.codex,
            ServiceName::DefiLlama => &self.defillama,
            ServiceName::Dexscreener => &self.dexscreener,
            ServiceName::GeckoTerminal => &self.geckoterminal,
        };
        url.trim_end_matches('/')
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            birdeye: default_base_url(ServiceName::Birdeye).to_string(),
            codex: default_base_url(ServiceName::Codex).to_string(),
            defillama: default_base_url(ServiceName::DefiLlama).to_string(),
            dexscreener: default_base_url(ServiceName::Dexscreener).to_string(),
            geckoterminal: default_base_url(ServiceName::GeckoTerminal).to_string(),
        }
    }
}

/// Complete proxy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub credentials: Credentials,
    /// Per-source deadline; an overrun becomes that source's error result
    pub source_timeout_ms: u64,
    pub endpoints: Endpoints,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            source_timeout_ms: 5_000,
            endpoints: Endpoints::default(),
        }
    }
}

impl ProxyConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Load from `.env` and the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::from_env_prefix(ENV_PREFIX)?;
        config.apply_legacy_keys(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Read `{prefix}_*` variables; `__` separates nested keys
    pub fn from_env_prefix(prefix: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<ProxyConfig>()?;

        debug!(?config, "Loaded configuration from {}_* variables", prefix);
        Ok(config)
    }

    /// Fill missing keys from the bare `BIRDEYE_API` / `CODEX_API` variables
    pub fn apply_legacy_keys(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.credentials.birdeye_api_key.is_none() {
            self.credentials.birdeye_api_key = lookup("BIRDEYE_API");
        }
        if self.credentials.codex_api_key.is_none() {
            self.credentials.codex_api_key = lookup("CODEX_API");
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.source_timeout_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "source_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for service in ServiceName::ALL {
            let url = self.endpoints.base_url(service);
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CoreError::InvalidConfig(format!(
                    "{service} endpoint must be an http(s) URL, got {url:?}"
                )));
            }
        }

        Ok(())
    }
}
