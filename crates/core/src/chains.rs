//! Per-service chain support table
//!
//! Services list their chains in one of two shapes:
//! - `(id, name)` pairs, matched on the canonical chain id
//! - bare service-specific names, reached through `CHAIN_ID_TO_NAME`
//!
//! Both shapes answer the same two questions: is a chain supported, and what
//! does the service call it.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::{ChainId, ServiceName};

/// Chains a single service accepts
#[derive(Debug, Clone, Copy)]
pub enum ChainList {
    Ids(&'static [(u64, &'static str)]),
    Names(&'static [&'static str]),
}

const BIRDEYE_CHAINS: &[&str] = &[
    "solana", "ethereum", "arbitrum", "avalanche", "bsc", "optimism", "polygon", "base", "zksync",
];

const CODEX_CHAINS: &[(u64, &str)] = &[(1088, "Metis"), (5000, "Mantle"), (1, "Ethereum")];

const DEFILLAMA_CHAINS: &[&str] = &[
    "ethereum", "arbitrum", "avalanche", "bsc", "optimism", "polygon", "base", "zksync",
];

const DEXSCREENER_CHAINS: &[(u64, &str)] = &[
    (1, "Ethereum"),
    (42161, "Arbitrum"),
    (43114, "Avalanche"),
    (56, "BSC"),
    (10, "Optimism"),
    (137, "Polygon"),
];

const GECKOTERMINAL_CHAINS: &[(u64, &str)] = &[
    (1, "eth"),
    (42161, "arbitrum"),
    (43114, "avalanche"),
    (56, "bsc"),
    (10, "optimism"),
    (137, "polygon"),
    (1399811149, "solana"),
];

/// Chain id to service-specific name, for services configured by name
pub static CHAIN_ID_TO_NAME: LazyLock<HashMap<&'static str, HashMap<ServiceName, &'static str>>> =
    LazyLock::new(|| {
        let mut chains = HashMap::new();

        chains.insert(
            "1",
            HashMap::from([
                (ServiceName::DefiLlama, "ethereum"),
                (ServiceName::Birdeye, "ethereum"),
                (ServiceName::GeckoTerminal, "eth"),
            ]),
        );
        chains.insert(
            "56",
            HashMap::from([
                (ServiceName::DefiLlama, "binance"),
                (ServiceName::Birdeye, "bsc"),
                (ServiceName::GeckoTerminal, "bsc"),
            ]),
        );
        chains.insert(
            "1399811149",
            HashMap::from([
                (ServiceName::DefiLlama, "solana"),
                (ServiceName::Birdeye, "solana"),
                (ServiceName::GeckoTerminal, "solana"),
            ]),
        );

        chains
    });

/// Chain list declared for a service
pub fn supported_chains(service: ServiceName) -> ChainList {
    match service {
        ServiceName::Birdeye => ChainList::Names(BIRDEYE_CHAINS),
        ServiceName::Codex => ChainList::Ids(CODEX_CHAINS),
        ServiceName::DefiLlama => ChainList::Names(DEFILLAMA_CHAINS),
        ServiceName::Dexscreener => ChainList::Ids(DEXSCREENER_CHAINS),
        ServiceName::GeckoTerminal => ChainList::Ids(GECKOTERMINAL_CHAINS),
    }
}

/// Default public API root of each service
pub fn default_base_url(service: ServiceName) -> &'static str {
    match service {
        ServiceName::Birdeye => "https://public-api.birdeye.so",
        ServiceName::Codex => "https://graph.codex.io",
        ServiceName::DefiLlama => "https://coins.llama.fi",
        ServiceName::Dexscreener => "https://api.dexscreener.com/latest/dex",
        ServiceName::GeckoTerminal => "https://api.geckoterminal.com/api/v2",
    }
}

fn mapped_name(chain: &ChainId, service: ServiceName) -> Option<&'static str> {
    CHAIN_ID_TO_NAME
        .get(chain.as_str())
        .and_then(|names| names.get(&service))
        .copied()
}

/// Whether `service` accepts `chain`
pub fn is_supported(chain: &ChainId, service: ServiceName) -> bool {
    match supported_chains(service) {
        ChainList::Ids(pairs) => chain
            .as_u64()
            .is_some_and(|id| pairs.iter().any(|(known, _)| *known == id)),
        ChainList::Names(names) => {
            mapped_name(chain, service).is_some_and(|name| names.contains(&name))
        }
    }
}

/// The name `service` expects for `chain`, if it has one
pub fn provider_chain_name(chain: &ChainId, service: ServiceName) -> Option<&'static str> {
    match supported_chains(service) {
        ChainList::Ids(pairs) => {
            let id = chain.as_u64()?;
            pairs.iter().find(|(known, _)| *known == id).map(|(_, name)| *name)
        }
        ChainList::Names(_) => mapped_name(chain, service),
    }
}

/// Chain names per service, for display
pub fn support_table() -> Vec<(ServiceName, Vec<String>)> {
    ServiceName::ALL
        .into_iter()
        .map(|service| {
            let chains = match supported_chains(service) {
                ChainList::Ids(pairs) => pairs
                    .iter()
                    .map(|(id, name)| format!("{name} ({id})"))
                    .collect(),
                ChainList::Names(names) => names.iter().map(|n| n.to_string()).collect(),
            };
            (service, chains)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethereum_support() {
        let eth = ChainId::from(1u64);
        for service in ServiceName::ALL {
            assert!(is_supported(&eth, service), "{service} should support chain 1");
        }
        assert!(is_supported(&ChainId::from("1"), ServiceName::DefiLlama));
    }

    #[test]
    fn test_solana_support() {
        let sol = ChainId::solana();
        assert!(is_supported(&sol, ServiceName::Birdeye));
        assert!(is_supported(&sol, ServiceName::GeckoTerminal));
        // Named in the chain map, but not in DefiLlama's list
        assert!(!is_supported(&sol, ServiceName::DefiLlama));
        assert!(!is_supported(&sol, ServiceName::Codex));
    }

    #[test]
    fn test_unsupported_chain() {
        let unknown = ChainId::from(999999u64);
        for service in ServiceName::ALL {
            assert!(!is_supported(&unknown, service));
            assert!(provider_chain_name(&unknown, service).is_none());
        }
        assert!(!is_supported(&ChainId::from("not-a-chain"), ServiceName::Codex));
    }

    #[test]
    fn test_chain_names_by_service() {
        assert_eq!(provider_chain_name(&ChainId::from(1u64), ServiceName::Birdeye), Some("ethereum"));
        assert_eq!(provider_chain_name(&ChainId::from("56"), ServiceName::Birdeye), Some("bsc"));
        assert_eq!(provider_chain_name(&ChainId::solana(), ServiceName::GeckoTerminal), Some("solana"));
        assert_eq!(provider_chain_name(&ChainId::from(1u64), ServiceName::GeckoTerminal), Some("eth"));
        assert_eq!(provider_chain_name(&ChainId::from(5000u64), ServiceName::Codex), Some("Mantle"));
    }

    #[test]
    fn test_bsc_defillama_name_is_not_listed() {
        let bsc = ChainId::from(56u64);
        assert_eq!(provider_chain_name(&bsc, ServiceName::DefiLlama), Some("binance"));
        assert!(!is_supported(&bsc, ServiceName::DefiLlama));
    }

    #[test]
    fn test_support_table_covers_every_service() {
        let table = support_table();
        assert_eq!(table.len(), ServiceName::ALL.len());
        assert!(table
            .iter()
            .any(|(s, chains)| *s == ServiceName::Codex && chains.contains(&"Ethereum (1)".to_string())));
    }
}
