//! Network family classification and address syntax checks
//!
//! Validation is purely lexical and runs before any upstream call, so a
//! malformed address never leaves the process.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::{ChainId, CoreError, CoreResult};

static EVM_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid EVM address pattern"));

// Base58 alphabet: no 0, O, I or l
static SOLANA_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid Solana address pattern")
});

/// Network families with distinct address syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainFamily {
    Evm,
    Svm,
}

impl ChainFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "EVM",
            ChainFamily::Svm => "Solana",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a chain. Only the Solana sentinel id is SVM.
pub fn chain_family(chain: &ChainId) -> ChainFamily {
    if chain.is_solana() {
        ChainFamily::Svm
    } else {
        ChainFamily::Evm
    }
}

/// Check `address` against the lexical pattern of `family`
pub fn validate_address(address: &str, family: ChainFamily) -> CoreResult<()> {
    let valid = match family {
        ChainFamily::Evm => EVM_ADDRESS.is_match(address),
        ChainFamily::Svm => SOLANA_ADDRESS.is_match(address),
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidAddressFormat(family))
    }
}

/// Classify the chain and validate the address in one step
pub fn check_address(address: &str, chain: &ChainId) -> CoreResult<ChainFamily> {
    let family = chain_family(chain);
    validate_address(address, family)?;
    Ok(family)
}
