//! Core type definitions

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::CoreError;

/// Reserved chain id that selects the Solana network family
pub const SOLANA_CHAIN_ID: &str = "1399811149";

/// Canonical chain identifier.
///
/// Callers send either a number (`1`) or a string (`"1"`); both name the same
/// chain, so the id is stored in its textual form. Numeric strings are
/// canonicalized (`"01"`, `"+1"` become `"1"`) so that family checks and the
/// chain tables always agree on the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.trim();
        match id.parse::<u64>() {
            Ok(n) => Self(n.to_string()),
            Err(_) => Self(id.to_string()),
        }
    }

    pub fn solana() -> Self {
        Self(SOLANA_CHAIN_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, if the id is a plain unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn is_solana(&self) -> bool {
        self.0 == SOLANA_CHAIN_ID
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ChainId::from(n),
            Raw::Text(s) => ChainId::from(s),
        })
    }
}

/// Upstream price services, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Birdeye,
    Codex,
    DefiLlama,
    Dexscreener,
    GeckoTerminal,
}

impl ServiceName {
    pub const ALL: [ServiceName; 5] = [
        ServiceName::Birdeye,
        ServiceName::Codex,
        ServiceName::DefiLlama,
        ServiceName::Dexscreener,
        ServiceName::GeckoTerminal,
    ];

    /// Key used in result maps and configuration
    pub fn key(&self) -> &'static str {
        match self {
            ServiceName::Birdeye => "birdeye",
            ServiceName::Codex => "codex",
            ServiceName::DefiLlama => "defillama",
            ServiceName::Dexscreener => "dexscreener",
            ServiceName::GeckoTerminal => "geckoterminal",
        }
    }

    /// Human-facing name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceName::Birdeye => "Birdeye",
            ServiceName::Codex => "Codex",
            ServiceName::DefiLlama => "DefiLlama",
            ServiceName::Dexscreener => "Dexscreener",
            ServiceName::GeckoTerminal => "GeckoTerminal",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ServiceName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceName::ALL
            .into_iter()
            .find(|service| service.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidConfig(format!("unknown service: {s}")))
    }
}

/// Capability flags of one price source, checked before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceDescriptor {
    pub supports_historical: bool,
    pub requires_credential: bool,
    /// Only sources with this flag are queried for Solana-family chains
    pub serves_solana: bool,
}

/// Keep only positive finite prices
pub fn normalize_price(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Milliseconds elapsed since `start`
pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis().min(u64::MAX as u128) as u64
}

/// Normalized outcome of one provider query.
///
/// `price: None` with no `error` means the provider answered but had no data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl PriceResult {
    pub fn from_price(price: Option<f64>, latency_ms: u64) -> Self {
        Self {
            price: price.and_then(normalize_price),
            latency: latency_ms,
            ..Default::default()
        }
    }

    pub fn empty(latency_ms: u64) -> Self {
        Self::from_price(None, latency_ms)
    }

    pub fn failed(error: impl fmt::Display, latency_ms: u64) -> Self {
        Self {
            price: None,
            error: Some(error.to_string()),
            latency: latency_ms,
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence.filter(|c| c.is_finite());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Combined result of one fan-out request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub success: bool,
    pub prices: BTreeMap<String, PriceResult>,
    pub aggregated_price: Option<f64>,
}

impl AggregateResult {
    /// Request-level failure: a single synthetic `"error"` entry
    pub fn failure(error: &CoreError) -> Self {
        let mut prices = BTreeMap::new();
        prices.insert("error".to_string(), PriceResult::failed(error, 0));

        Self {
            success: false,
            prices,
            aggregated_price: None,
        }
    }

    /// Message of the request-level failure, if any
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.prices.get("error").and_then(|r| r.error.as_deref())
    }
}

/// Query parameters forwarded to every source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceQuery {
    /// Unix seconds for a historical lookup
    pub timestamp: Option<i64>,
    /// Historical search window, e.g. `"4h"`
    pub search_width: Option<String>,
}

impl PriceQuery {
    /// Only a positive timestamp selects a historical lookup
    pub fn is_historical(&self) -> bool {
        self.timestamp.is_some_and(|ts| ts > 0)
    }
}

/// A price lookup as received from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub token_address: String,
    pub chain_id: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_width: Option<String>,
}

impl PriceRequest {
    pub fn new(token_address: impl Into<String>, chain_id: impl Into<ChainId>) -> Self {
        Self {
            token_address: token_address.into(),
            chain_id: chain_id.into(),
            timestamp: None,
            search_width: None,
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn search_width(mut self, width: impl Into<String>) -> Self {
        self.search_width = Some(width.into());
        self
    }

    /// Query forwarded to sources; a zero or negative timestamp means "now"
    pub fn query(&self) -> PriceQuery {
        PriceQuery {
            timestamp: self.timestamp.filter(|ts| *ts > 0),
            search_width: self.search_width.clone(),
        }
    }
}
