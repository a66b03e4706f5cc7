//! # Gasroute Dataplane
//!
//! Supplies the market inputs the decision engine consumes: the supported
//! chain registry, immutable market data snapshots, the provider interface
//! for gas / price / bridge data, and the concurrent snapshot collector.

pub mod collector;
pub mod error;
pub mod feeds;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use collector::SnapshotCollector;
pub use error::{DataplaneError, Result};
pub use feeds::{HttpMarketDataFeed, MarketDataProvider, StaticMarketDataFeed};
pub use types::*;

/// Current version of the dataplane
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Supported blockchain networks
///
/// Serialized as the numeric EVM chain id. Ordering follows the chain id,
/// which is what deterministic tie-breaks rely on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub enum Chain {
    Ethereum,
    Optimism,
    Polygon,
    Base,
    Arbitrum,
}

impl Chain {
    /// All supported chains, in chain id order
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Optimism,
        Chain::Polygon,
        Chain::Base,
        Chain::Arbitrum,
    ];

    /// Get the chain ID for this network
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Polygon => 137,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
        }
    }

    /// Look a chain up by its numeric id
    pub fn from_chain_id(id: u64) -> Result<Self> {
        Chain::ALL
            .iter()
            .copied()
            .find(|c| c.chain_id() == id)
            .ok_or_else(|| DataplaneError::InvalidChain(id.to_string()))
    }

    /// Get the human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Optimism => "Optimism",
            Chain::Polygon => "Polygon",
            Chain::Base => "Base",
            Chain::Arbitrum => "Arbitrum",
        }
    }

    /// Symbol of the token gas is paid in
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Polygon => "MATIC",
            _ => "ETH",
        }
    }

    /// Whether this is an L2 rollup settling on Ethereum
    pub fn is_l2(&self) -> bool {
        matches!(self, Chain::Optimism | Chain::Base | Chain::Arbitrum)
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Chain {
    type Err = DataplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" | "1" => Ok(Chain::Ethereum),
            "optimism" | "op" | "10" => Ok(Chain::Optimism),
            "polygon" | "matic" | "137" => Ok(Chain::Polygon),
            "base" | "8453" => Ok(Chain::Base),
            "arbitrum" | "arb" | "42161" => Ok(Chain::Arbitrum),
            _ => Err(DataplaneError::InvalidChain(s.to_string())),
        }
    }
}

impl TryFrom<u64> for Chain {
    type Error = DataplaneError;

    fn try_from(id: u64) -> Result<Self> {
        Chain::from_chain_id(id)
    }
}

impl From<Chain> for u64 {
    fn from(chain: Chain) -> u64 {
        chain.chain_id()
    }
}

/// Static metadata for one supported chain
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChainInfo {
    pub chain: Chain,
    pub name: String,
    pub native_symbol: String,
    pub is_l2: bool,
}

impl From<Chain> for ChainInfo {
    fn from(chain: Chain) -> Self {
        Self {
            chain,
            name: chain.name().to_string(),
            native_symbol: chain.native_symbol().to_string(),
            is_l2: chain.is_l2(),
        }
    }
}

/// The set of chains the engine is allowed to compare
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainInfo>,
}

impl ChainRegistry {
    /// Registry over the given chains, deduplicated and in chain id order
    pub fn new(chains: impl IntoIterator<Item = Chain>) -> Self {
        let mut chains: Vec<Chain> = chains.into_iter().collect();
        chains.sort();
        chains.dedup();
        Self {
            chains: chains.into_iter().map(ChainInfo::from).collect(),
        }
    }

    pub fn chains(&self) -> Vec<Chain> {
        self.chains.iter().map(|info| info.chain).collect()
    }

    pub fn info(&self, chain: Chain) -> Option<&ChainInfo> {
        self.chains.iter().find(|info| info.chain == chain)
    }

    pub fn contains(&self, chain: Chain) -> bool {
        self.info(chain).is_some()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(Chain::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_round_trip() {
        for chain in Chain::ALL {
            assert_eq!(Chain::from_chain_id(chain.chain_id()).unwrap(), chain);
        }
        assert!(Chain::from_chain_id(56).is_err());
    }

    #[test]
    fn test_chain_serializes_as_id() {
        let json = serde_json::to_string(&Chain::Arbitrum).unwrap();
        assert_eq!(json, "42161");

        let chain: Chain = serde_json::from_str("8453").unwrap();
        assert_eq!(chain, Chain::Base);

        assert!(serde_json::from_str::<Chain>("999").is_err());
    }

    #[test]
    fn test_chain_ordering_follows_id() {
        let mut chains = vec![Chain::Arbitrum, Chain::Base, Chain::Ethereum, Chain::Optimism];
        chains.sort();
        assert_eq!(
            chains,
            vec![Chain::Ethereum, Chain::Optimism, Chain::Base, Chain::Arbitrum]
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("ARB".parse::<Chain>().unwrap(), Chain::Arbitrum);
        assert_eq!("mainnet".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn test_registry_dedups_and_sorts() {
        let registry = ChainRegistry::new([Chain::Base, Chain::Ethereum, Chain::Base]);
        assert_eq!(registry.chains(), vec![Chain::Ethereum, Chain::Base]);
        assert_eq!(registry.info(Chain::Base).unwrap().native_symbol, "ETH");
        assert!(!registry.contains(Chain::Polygon));
    }
}
