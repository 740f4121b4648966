//! Policy for high-throughput rollups in the Rise mold.
//!
//! These chains settle sub-second and price gas far below the base fee a
//! node reports, so the policy discounts the reported price and accepts
//! much larger gas limits than a plain EVM chain would.

use super::{ChainPolicy, NetworkSignal};
use crate::types::{ChainFeature, ExecutionRequest};
use serde::{Deserialize, Serialize};

/// [`ChainPolicy`] for high-throughput rollups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RisePolicy {
    /// Discount applied to the reported price, in permille.
    pub discount_permille: u128,
    /// Floor for the adjusted price, in wei.
    pub min_gas_price: u128,
    /// Price assumed when the node cannot be read, in wei.
    pub fallback_gas_price: u128,
    /// Largest gas limit accepted for a single transaction.
    pub max_gas_limit: u64,
}

impl Default for RisePolicy {
    fn default() -> Self {
        Self {
            discount_permille: 100,
            min_gas_price: 100_000,
            fallback_gas_price: 500_000,
            max_gas_limit: 50_000_000,
        }
    }
}

impl ChainPolicy for RisePolicy {
    fn gas_price(&self, signal: &NetworkSignal) -> u128 {
        let discount = self.discount_permille.min(1000);
        let discounted =
            signal.base_gas_price.saturating_mul(1000 - discount) / 1000;
        discounted.max(self.min_gas_price)
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
        Ok(())
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![
            ChainFeature::Shreds,
            ChainFeature::ParallelExecution,
            ChainFeature::Gigagas,
            ChainFeature::UltraFastBlocks,
            ChainFeature::OptimisticRollup,
        ]
    }
}
