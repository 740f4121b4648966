//! Trestle configuration.
use crate::{
    adapters::{ChainPolicy, DataPolicy, GamingPolicy, RisePolicy, StandardPolicy, ZkPolicy},
    constants::{
        self, DEFAULT_GAS_BUMP_PERCENT, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_RETAINED_RESULTS,
        DEFAULT_REORG_DEPTH,
    },
    types::ChainDescriptor,
};
use alloy::primitives::{Address, ChainId, U256, map::HashMap};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use url::Url;

/// Trestle configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrestleConfig {
    /// Chain configurations.
    pub chains: Vec<ChainConfig>,
    /// Transaction executor configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Bridge orchestration configuration.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Health checking configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// Address to serve Prometheus metrics on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<SocketAddr>,
}

impl TrestleConfig {
    /// Adds a chain.
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chains.push(chain);
        self
    }

    /// Sets the executor configuration.
    pub fn with_executor_config(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Sets the bridge configuration.
    pub fn with_bridge_config(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    /// Sets the health checking configuration.
    pub fn with_health_config(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    /// Sets the metrics address.
    pub fn with_metrics_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.metrics_addr = addr;
        self
    }

    /// Returns the configuration for a chain, if present.
    pub fn chain(&self, id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.id == id)
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration for a single chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id.
    pub id: ChainId,
    /// Human readable chain name.
    pub name: String,
    /// HTTP RPC endpoint.
    pub endpoint: Url,
    /// Websocket RPC endpoint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_endpoint: Option<Url>,
    /// Symbol of the native asset.
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Decimals of the native asset.
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    /// Block explorer base URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<Url>,
    /// Known contract addresses by well-known name.
    #[serde(default)]
    pub contracts: HashMap<String, Address>,
    /// Private key used to sign transactions on this chain.
    ///
    /// Without one the chain is read-only and submissions are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key: Option<String>,
    /// Gas and validation policy for this chain.
    #[serde(default)]
    pub policy: ChainProfile,
    /// Bridge fee charged on transfers leaving this chain.
    #[serde(default)]
    pub fee: BridgeFeeConfig,
    /// Override for the estimated confirmation time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_confirmation_secs: Option<u64>,
}

impl ChainConfig {
    /// Creates a chain config with defaults for the given id, name and
    /// endpoint.
    pub fn new(id: ChainId, name: impl Into<String>, endpoint: Url) -> Self {
        Self {
            id,
            name: name.into(),
            endpoint,
            ws_endpoint: None,
            native_symbol: default_native_symbol(),
            native_decimals: default_native_decimals(),
            explorer_url: None,
            contracts: HashMap::default(),
            signer_key: None,
            policy: ChainProfile::default(),
            fee: BridgeFeeConfig::default(),
            estimated_confirmation_secs: None,
        }
    }

    /// Sets the gas and validation policy.
    pub fn with_policy(mut self, policy: ChainProfile) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the signer key.
    pub fn with_signer_key(mut self, key: impl Into<String>) -> Self {
        self.signer_key = Some(key.into());
        self
    }

    /// Registers a contract address under a well-known name.
    pub fn with_contract(mut self, name: impl Into<String>, address: Address) -> Self {
        self.contracts.insert(name.into(), address);
        self
    }

    /// The static chain description derived from this configuration.
    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: self.id,
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            ws_endpoint: self.ws_endpoint.clone(),
            native_symbol: self.native_symbol.clone(),
            native_decimals: self.native_decimals,
            explorer_url: self.explorer_url.clone(),
            contracts: self.contracts.clone(),
        }
    }

    /// Estimated time for a transaction to confirm on this chain.
    pub fn estimated_confirmation(&self) -> Duration {
        Duration::from_secs(
            self.estimated_confirmation_secs
                .unwrap_or_else(|| constants::estimated_confirmation_secs(self.id)),
        )
    }
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

const fn default_native_decimals() -> u8 {
    18
}

/// Gas and validation policy selection (mutually exclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainProfile {
    /// High-throughput rollups with heavily discounted gas.
    Rise(RisePolicy),
    /// Zk-stack chains that batch-settle to an L1.
    Zk(ZkPolicy),
    /// Storage chains accepting large data payloads.
    Data(DataPolicy),
    /// Gaming chains with congestion-sensitive pricing.
    Gaming(GamingPolicy),
    /// Plain EVM chains with a conservative safety buffer.
    Standard(StandardPolicy),
}

impl ChainProfile {
    /// Builds the policy object for this profile.
    pub fn build(&self) -> Box<dyn ChainPolicy> {
        match self {
            Self::Rise(policy) => Box::new(*policy),
            Self::Zk(policy) => Box::new(*policy),
            Self::Data(policy) => Box::new(*policy),
            Self::Gaming(policy) => Box::new(*policy),
            Self::Standard(policy) => Box::new(*policy),
        }
    }

    /// Name of the profile, as it appears in configuration.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rise(_) => "rise",
            Self::Zk(_) => "zk",
            Self::Data(_) => "data",
            Self::Gaming(_) => "gaming",
            Self::Standard(_) => "standard",
        }
    }
}

impl Default for ChainProfile {
    fn default() -> Self {
        Self::Standard(StandardPolicy::default())
    }
}

/// Bridge fee schedule for a source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeFeeConfig {
    /// Fee in basis points of the bridged amount.
    pub bps: u32,
    /// Smallest fee charged regardless of amount.
    pub minimum: U256,
}

impl BridgeFeeConfig {
    /// The fee charged for bridging `amount`.
    pub fn fee_for(&self, amount: U256) -> U256 {
        (amount * U256::from(self.bps) / U256::from(10_000)).max(self.minimum)
    }
}

impl Default for BridgeFeeConfig {
    fn default() -> Self {
        Self { bps: 30, minimum: U256::ZERO }
    }
}

/// Configuration for the transaction executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Confirmations to wait for before a submission counts as landed.
    pub confirmations: u64,
    /// Timeout after which we consider a submission as failed.
    #[serde(with = "crate::serde::duration")]
    pub confirmation_timeout: Duration,
    /// Completed results retained before the oldest are pruned.
    pub max_retained_results: usize,
    /// Percentage the gas price is bumped by on retry.
    pub gas_bump_percent: u64,
    /// Interval for expiring requests whose deadline has passed.
    #[serde(with = "crate::serde::duration")]
    pub deadline_check_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            confirmation_timeout: Duration::from_secs(60),
            max_retained_results: DEFAULT_MAX_RETAINED_RESULTS,
            gas_bump_percent: DEFAULT_GAS_BUMP_PERCENT,
            deadline_check_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration for bridge orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Confirmations required on the source chain before a bridge moves out
    /// of pending.
    pub confirmations: u64,
    /// Timeout for the initial source confirmation wait.
    #[serde(with = "crate::serde::duration")]
    pub confirmation_timeout: Duration,
    /// Extra confirmations required on top of [`Self::confirmations`] before
    /// a source leg counts as reorg-safe.
    pub reorg_depth: u64,
    /// Timeout for the reorg-defense confirmation wait.
    #[serde(with = "crate::serde::duration")]
    pub reorg_timeout: Duration,
    /// Grace added to the quoted completion time before the settlement wait
    /// gives up.
    #[serde(with = "crate::serde::duration")]
    pub relay_grace: Duration,
    /// Interval between settlement scans on the target chain.
    #[serde(with = "crate::serde::duration")]
    pub settlement_poll_interval: Duration,
    /// How many blocks back each settlement scan looks.
    pub settlement_lookback_blocks: u64,
    /// Smallest bridgeable amount. Zero disables the check.
    pub min_amount: U256,
    /// Largest bridgeable amount. [`U256::MAX`] disables the check.
    pub max_amount: U256,
    /// Slippage tolerance in percent applied when the caller does not set one.
    pub default_slippage: f64,
    /// Most recent entries returned by a history query.
    pub history_limit: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            confirmation_timeout: Duration::from_secs(120),
            reorg_depth: DEFAULT_REORG_DEPTH,
            reorg_timeout: Duration::from_secs(300),
            relay_grace: Duration::from_secs(30),
            settlement_poll_interval: Duration::from_secs(5),
            settlement_lookback_blocks: 1000,
            min_amount: U256::ZERO,
            max_amount: U256::MAX,
            default_slippage: 5.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Configuration for periodic chain health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Interval between probes.
    #[serde(with = "crate::serde::duration")]
    pub interval: Duration,
    /// Probes slower than this mark the chain unhealthy.
    #[serde(with = "crate::serde::duration")]
    pub latency_threshold: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(30), latency_threshold: Duration::from_secs(5) }
    }
}
