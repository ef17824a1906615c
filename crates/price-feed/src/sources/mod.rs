//! Upstream price source implementations

pub mod birdeye;
pub mod codex;
pub mod defillama;
pub mod dexscreener;
pub mod geckoterminal;

mod http;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use pricing_core::{ChainId, Credentials, Endpoints, PriceQuery, PriceResult, ServiceName, SourceDescriptor};

pub use birdeye::BirdeyeSource;
pub use codex::CodexSource;
pub use defillama::DefiLlamaSource;
pub use dexscreener::DexscreenerSource;
pub use geckoterminal::GeckoTerminalSource;

/// A single upstream price API.
///
/// `fetch` never fails: unsupported chains, HTTP errors and transport
/// problems all come back as a `PriceResult` with `error` set, so the
/// aggregator can treat every source the same way.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> ServiceName;

    fn descriptor(&self) -> SourceDescriptor;

    /// `credentials` is only passed to sources whose descriptor asks for it
    async fn fetch(
        &self,
        token_address: &str,
        chain: &ChainId,
        credentials: Option<&Credentials>,
        query: &PriceQuery,
    ) -> PriceResult;
}

/// Capability flags of each built-in service
pub fn descriptor_for(service: ServiceName) -> SourceDescriptor {
    match service {
        ServiceName::Birdeye => SourceDescriptor {
            supports_historical: false,
            requires_credential: true,
            serves_solana: true,
        },
        ServiceName::Codex => SourceDescriptor {
            supports_historical: true,
            requires_credential: true,
            serves_solana: false,
        },
        ServiceName::DefiLlama => SourceDescriptor {
            supports_historical: true,
            requires_credential: false,
            serves_solana: false,
        },
        ServiceName::Dexscreener | ServiceName::GeckoTerminal => SourceDescriptor {
            supports_historical: false,
            requires_credential: false,
            serves_solana: false,
        },
    }
}

/// Shared HTTP client for all sources
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("price-proxy/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Every built-in source, in registry order
pub fn default_sources(client: Client, endpoints: &Endpoints) -> Vec<Arc<dyn PriceSource>> {
    ServiceName::ALL
        .into_iter()
        .map(|service| source_for(service, client.clone(), endpoints.base_url(service)))
        .collect()
}

pub fn source_for(service: ServiceName, client: Client, base_url: &str) -> Arc<dyn PriceSource> {
    match service {
        ServiceName::Birdeye => Arc::new(BirdeyeSource::new(client, base_url)),
        ServiceName::Codex => Arc::new(CodexSource::new(client, base_url)),
        ServiceName::DefiLlama => Arc::new(DefiLlamaSource::new(client, base_url)),
        ServiceName::Dexscreener => Arc::new(DexscreenerSource::new(client, base_url)),
        ServiceName::GeckoTerminal => Arc::new(GeckoTerminalSource::new(client, base_url)),
    }
}
