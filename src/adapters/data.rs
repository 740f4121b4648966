//! Policy for data-availability chains in the 0G mold.
//!
//! Pricing follows the node with two configured reduction factors, and
//! validation admits much larger calldata payloads than a plain EVM chain.

use super::{ChainPolicy, NetworkSignal};
use crate::types::ChainFeature;
use serde::{Deserialize, Serialize};

/// [`ChainPolicy`] for data-availability chains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPolicy {
    /// Pattern-derived multiplier applied to the reported price, in percent.
    pub pattern_multiplier_percent: u64,
    /// Data-availability layer factor, in percent.
    pub da_factor_percent: u64,
    /// Floor for the adjusted price, in wei.
    pub min_gas_price: u128,
    /// Price assumed when the node cannot be read, in wei.
    pub fallback_gas_price: u128,
    /// Largest calldata payload accepted, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for DataPolicy {
    fn default() -> Self {
        Self {
            pattern_multiplier_percent: 90,
            da_factor_percent: 95,
            min_gas_price: 50_000,
            fallback_gas_price: 50_000,
            max_payload_bytes: 1024 * 1024,
        }
    }
}

impl ChainPolicy for DataPolicy {
    fn gas_price(&self, signal: &NetworkSignal) -> u128 {
        let adjusted = signal.base_gas_price.saturating_mul(self.pattern_multiplier_percent as u128)
            / 100
            * self.da_factor_percent as u128
            / 100;
        adjusted.max(self.min_gas_price)
    }

    fn fallback_gas_price(&self) -> u128 {
        self.fallback_gas_price
    }

    fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![
            ChainFeature::DataAvailability,
            ChainFeature::LargePayloadStorage,
            ChainFeature::AiOptimized,
        ]
    }
}
