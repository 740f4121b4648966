use alloy::primitives::{Address, ChainId, TxHash, map::HashMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::constants::BRIDGE_CONTRACT_KEY;

/// Immutable description of a supported chain, built once from configuration
/// and shared read-only by every component touching that chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Numeric chain id.
    pub chain_id: ChainId,
    /// Human readable chain name.
    pub name: String,
    /// JSON-RPC endpoint.
    pub endpoint: Url,
    /// Optional websocket endpoint for subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_endpoint: Option<Url>,
    /// Symbol of the native currency.
    pub native_symbol: String,
    /// Decimals of the native currency.
    pub native_decimals: u8,
    /// Base URL of the block explorer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<Url>,
    /// Deployed contract addresses, keyed by name.
    #[serde(default)]
    pub contracts: HashMap<String, Address>,
}

impl ChainDescriptor {
    /// Returns the deployed bridge contract of this chain, if configured.
    pub fn bridge_contract(&self) -> Option<Address> {
        self.contracts.get(BRIDGE_CONTRACT_KEY).copied()
    }

    /// Returns the explorer link for a transaction, if an explorer is
    /// configured.
    pub fn tx_url(&self, tx_hash: TxHash) -> Option<String> {
        self.explorer_url.as_ref().map(|base| {
            format!("{}/tx/{tx_hash}", base.as_str().trim_end_matches('/'))
        })
    }
}

/// Capability tags a chain advertises.
///
/// Callers use these to decide whether chain-specific enhancements apply, e.g.
/// whether a payload can be parked on a data-availability chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFeature {
    /// Sub-block preconfirmations ("shreds").
    Shreds,
    /// Parallel transaction execution.
    ParallelExecution,
    /// Gigagas-class block gas throughput.
    Gigagas,
    /// Block times well under a second.
    UltraFastBlocks,
    /// Optimistic rollup settlement.
    OptimisticRollup,
    /// Native account-abstraction wallet support.
    AgwWallet,
    /// Zk-rollup stack.
    ZkStack,
    /// On-chain social primitives.
    SocialPrimitives,
    /// Tuned for consumer applications.
    ConsumerApps,
    /// Data-availability layer.
    DataAvailability,
    /// Accepts unusually large calldata payloads.
    LargePayloadStorage,
    /// Tuned for AI workloads.
    AiOptimized,
    /// Tuned for gaming workloads.
    GamingOptimized,
    /// IceDB-backed state access.
    IceDb,
    /// High sustained transactions per second.
    HighTps,
    /// Fully Ethereum-equivalent semantics.
    EthereumCompatibility,
    /// Long-lived, stable testnet.
    StableTestnet,
    /// Deep testnet liquidity.
    HighLiquidity,
    /// Acts as the bridge routing hub.
    BridgeHub,
    /// Public faucet available.
    FaucetAvailable,
}

impl ChainFeature {
    /// Snake-case tag of the feature, as exposed to callers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Shreds => "shreds",
            Self::ParallelExecution => "parallel_execution",
            Self::Gigagas => "gigagas",
            Self::UltraFastBlocks => "ultra_fast_blocks",
            Self::OptimisticRollup => "optimistic_rollup",
            Self::AgwWallet => "agw_wallet",
            Self::ZkStack => "zk_stack",
            Self::SocialPrimitives => "social_primitives",
            Self::ConsumerApps => "consumer_apps",
            Self::DataAvailability => "data_availability",
            Self::LargePayloadStorage => "large_payload_storage",
            Self::AiOptimized => "ai_optimized",
            Self::GamingOptimized => "gaming_optimized",
            Self::IceDb => "icedb",
            Self::HighTps => "high_tps",
            Self::EthereumCompatibility => "ethereum_compatibility",
            Self::StableTestnet => "stable_testnet",
            Self::HighLiquidity => "high_liquidity",
            Self::BridgeHub => "bridge_hub",
            Self::FaucetAvailable => "faucet_available",
        }
    }
}

impl fmt::Display for ChainFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached result of the latest health probe of a chain adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHealth {
    /// Whether the last probe succeeded within the latency threshold.
    pub healthy: bool,
    /// Round-trip latency of the last probe in milliseconds, if it completed.
    pub latency_ms: Option<u64>,
    /// When the last probe ran.
    pub checked_at: DateTime<Utc>,
}

impl ChainHealth {
    /// Health state before the first probe has run.
    pub fn unknown() -> Self {
        Self { healthy: false, latency_ms: None, checked_at: DateTime::<Utc>::MIN_UTC }
    }
}

impl Default for ChainHealth {
    fn default() -> Self {
        Self::unknown()
    }
}
