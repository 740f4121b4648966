//! Policy for zk-stack chains in the Abstract mold.
//!
//! Settlement is batched to an L1, which amortizes cost across the batch,
//! and the gateway grants a further reduction that shrinks as the network
//! gets busier.

use super::{ChainPolicy, NetworkSignal};
use crate::types::ChainFeature;
use serde::{Deserialize, Serialize};

/// [`ChainPolicy`] for zk-stack chains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkPolicy {
    /// Divisor reflecting batch amortization on the L1.
    pub batch_divisor: u128,
    /// Gateway multiplier during low congestion, in percent.
    pub low_congestion_multiplier: u64,
    /// Gateway multiplier outside the watermarks, in percent.
    pub default_multiplier: u64,
    /// Gateway multiplier during high congestion, in percent.
    pub high_congestion_multiplier: u64,
    /// Utilization below which the low multiplier applies.
    pub low_watermark: f64,
    /// Utilization above which the high multiplier applies.
    pub high_watermark: f64,
    /// Floor for the adjusted price, in wei.
    pub min_gas_price: u128,
    /// Price assumed when the node cannot be read, in wei.
    pub fallback_gas_price: u128,
}

impl Default for ZkPolicy {
    fn default() -> Self {
        Self {
            batch_divisor: 10,
            low_congestion_multiplier: 70,
            default_multiplier: 80,
            high_congestion_multiplier: 95,
            low_watermark: 0.3,
            high_watermark: 0.8,
            min_gas_price: 100_000,
            fallback_gas_price: 100_000_000,
        }
    }
}

impl ZkPolicy {
    /// Gateway multiplier for the observed utilization, in percent.
    fn gateway_multiplier(&self, utilization: Option<f64>) -> u64 {
        match utilization {
            Some(utilization) if utilization < self.low_watermark => {
                self.low_congestion_multiplier
            }
            Some(utilization) if utilization > self.high_watermark => {
                self.high_congestion_multiplier
            }
            _ => self.default_multiplier,
        }
    }
}

impl ChainPolicy for ZkPolicy {
    fn gas_price(&self, signal: &NetworkSignal) -> u128 {
        let amortized = signal.base_gas_price / self.batch_divisor.max(1);
        let multiplier = self.gateway_multiplier(signal.block_utilization);
        (amortized.saturating_mul(multiplier as u128) / 100).max(self.min_gas_price)
    }

    fn fallback_gas_price(&self) -> u128 {
        self.fallback_gas_price
    }

    fn wants_utilization(&self) -> bool {
        true
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![
            ChainFeature::ZkStack,
            ChainFeature::AgwWallet,
            ChainFeature::SocialPrimitives,
            ChainFeature::ConsumerApps,
        ]
    }
}
