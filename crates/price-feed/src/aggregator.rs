//! Price aggregator - fans one request out to every eligible source

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use pricing_core::{
    check_address, is_supported, AggregateResult, ChainFamily, ChainId, CoreError,
    Credentials, PriceQuery, PriceRequest, PriceResult, ProxyConfig, ServiceName,
};

use crate::sources::{build_client, default_sources, PriceSource};
use crate::stats::SourceStats;

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Deadline for each source call; the others keep running
    pub source_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(5),
        }
    }
}

/// Main price aggregator
pub struct PriceAggregator {
    config: AggregatorConfig,
    sources: Vec<Arc<dyn PriceSource>>,
    credentials: Arc<Credentials>,
    stats: Arc<SourceStats>,
}

impl PriceAggregator {
    pub fn new(
        config: AggregatorConfig,
        sources: Vec<Arc<dyn PriceSource>>,
        credentials: Credentials,
    ) -> Self {
        Self {
            config,
            sources,
            credentials: Arc::new(credentials),
            stats: Arc::new(SourceStats::new()),
        }
    }

    /// Built-in sources wired to the configured endpoints
    pub fn from_config(config: &ProxyConfig) -> Self {
        // The client deadline sits above the per-source one so the aggregator's
        // timeout is the one that fires
        let client = build_client(config.source_timeout() + Duration::from_secs(1));
        let sources = default_sources(client, &config.endpoints);

        Self::new(
            AggregatorConfig {
                source_timeout: config.source_timeout(),
            },
            sources,
            config.credentials.clone(),
        )
    }

    /// Share a stats store across aggregators
    pub fn with_stats(mut self, stats: Arc<SourceStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Get shared stats reference
    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }

    pub fn sources(&self) -> &[Arc<dyn PriceSource>] {
        &self.sources
    }

    /// Sources that will be queried for this chain, family and query, in
    /// registry order
    pub fn eligible_sources(
        &self,
        chain: &ChainId,
        family: ChainFamily,
        query: &PriceQuery,
    ) -> Vec<Arc<dyn PriceSource>> {
        self.sources
            .iter()
            .filter(|source| {
                let descriptor = source.descriptor();
                is_supported(chain, source.name())
                    && (!query.is_historical() || descriptor.supports_historical)
                    && (family == ChainFamily::Evm || descriptor.serves_solana)
            })
            .cloned()
            .collect()
    }

    /// Fetch with the configured credentials
    pub async fn fetch_prices(&self, request: &PriceRequest) -> AggregateResult {
        self.fetch_prices_with(request, Arc::clone(&self.credentials)).await
    }

    /// Validate, fan out, collect and aggregate.
    ///
    /// Only a malformed address or an empty eligible set yields
    /// `success: false`; source failures stay in their own slot.
    pub async fn fetch_prices_with(
        &self,
        request: &PriceRequest,
        credentials: Arc<Credentials>,
    ) -> AggregateResult {
        self.stats.record_request();

        let family = match check_address(&request.token_address, &request.chain_id) {
            Ok(family) => family,
            Err(e) => {
                warn!("Rejected {} on chain {}: {}", request.token_address, request.chain_id, e);
                return AggregateResult::failure(&e);
            }
        };

        let query = request.query();
        let eligible = self.eligible_sources(&request.chain_id, family, &query);
        if eligible.is_empty() {
            let e = CoreError::NoEligibleProviders(request.chain_id.clone());
            warn!("{}", e);
            return AggregateResult::failure(&e);
        }

        let start = Instant::now();
        info!(
            "Fetching {} on chain {} from {} sources{}",
            request.token_address,
            request.chain_id,
            eligible.len(),
            query
                .timestamp
                .map(|ts| format!(" at {ts}"))
                .unwrap_or_default()
        );

        let (names, handles): (Vec<ServiceName>, Vec<JoinHandle<PriceResult>>) = eligible
            .into_iter()
            .map(|source| {
                let name = source.name();
                (name, self.dispatch(source, request, &query, &credentials))
            })
            .unzip();

        let outcomes = join_all(handles).await;

        let mut prices = BTreeMap::new();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            let result = outcome.unwrap_or_else(|e| {
                let reason = describe_join_error(e);
                error!("{} task failed: {}", name, reason);
                PriceResult::failed(CoreError::ServiceDispatchFailure(reason), 0)
            });
            self.stats.record(name, &result);
            prices.insert(name.key().to_string(), result);
        }

        let aggregated_price = upper_median(prices.values().filter_map(|r| r.price).collect());

        debug!(
            "Aggregated {:?} from {} results in {:?}",
            aggregated_price,
            prices.len(),
            start.elapsed()
        );

        AggregateResult {
            success: true,
            prices,
            aggregated_price,
        }
    }

    /// Run one source on its own task under the source deadline
    fn dispatch(
        &self,
        source: Arc<dyn PriceSource>,
        request: &PriceRequest,
        query: &PriceQuery,
        credentials: &Arc<Credentials>,
    ) -> JoinHandle<PriceResult> {
        let token_address = request.token_address.clone();
        let chain = request.chain_id.clone();
        let query = query.clone();
        let credentials = source
            .descriptor()
            .requires_credential
            .then(|| Arc::clone(credentials));
        let timeout = self.config.source_timeout;

        tokio::spawn(async move {
            let call = source.fetch(&token_address, &chain, credentials.as_deref(), &query);

            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} timed out after {:?}", source.name(), timeout);
                    PriceResult::failed(
                        CoreError::UpstreamTransport(format!(
                            "request timed out after {}ms",
                            timeout.as_millis()
                        )),
                        timeout.as_millis().min(u64::MAX as u128) as u64,
                    )
                }
            }
        })
    }
}

/// Upper median: the element at index `len / 2` of the ascending sort.
/// For an even count this is the higher of the two middle values.
pub fn upper_median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }

    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string()),
        Err(err) => err.to_string(),
    }
}
