//! Policy for plain EVM testnets in the Sepolia mold.
//!
//! No exotic pricing, just a reliability buffer on top of whatever the node
//! reports and conservative validation limits.

use super::{ChainPolicy, NetworkSignal};
use crate::types::{ChainFeature, ExecutionRequest};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// [`ChainPolicy`] for plain EVM chains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardPolicy {
    /// Reliability buffer applied to the reported price, in percent.
    pub buffer_percent: u64,
    /// Price assumed when the node reports zero, in wei.
    pub default_gas_price: u128,
    /// Price assumed when the node cannot be read, in wei.
    pub fallback_gas_price: u128,
    /// Largest gas limit accepted for a single transaction.
    pub max_gas_limit: u64,
    /// Transfer value above which a warning is logged.
    pub large_value_warning: U256,
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self {
            buffer_percent: 10,
            default_gas_price: 20_000_000_000,
            fallback_gas_price: 25_000_000_000,
            max_gas_limit: 10_000_000,
            large_value_warning: U256::from(10u128 * 10u128.pow(18)),
        }
    }
}

impl ChainPolicy for StandardPolicy {
    fn gas_price(&self, signal: &NetworkSignal) -> u128 {
        let base = if signal.base_gas_price == 0 {
            self.default_gas_price
        } else {
            signal.base_gas_price
        };
        base.saturating_mul(100 + self.buffer_percent as u128) / 100
    }

    fn fallback_gas_price(&self) -> u128 {
        self.fallback_gas_price
    }

    fn validate(&self, request: &ExecutionRequest) -> Result<(), String> {
        if let Some(limit) = request.gas_limit
            && limit > self.max_gas_limit
        {
            return Err(format!("gas limit {limit} exceeds the {} cap", self.max_gas_limit));
        }
        if request.value > self.large_value_warning {
            warn!(
                request_id = %request.id,
                value = %request.value,
                "unusually large transfer value for a testnet"
            );
        }
        Ok(())
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![
            ChainFeature::EthereumCompatibility,
            ChainFeature::StableTestnet,
            ChainFeature::HighLiquidity,
            ChainFeature::BridgeHub,
            ChainFeature::FaucetAvailable,
        ]
    }
}
