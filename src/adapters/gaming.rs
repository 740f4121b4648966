//! Policy for gaming chains in the Somnia mold.
//!
//! Gaming traffic pays a priority surcharge so moves land inside the next
//! block. The surcharge is flat when the network is quiet or unreadable and
//! scales with block utilization once the chain congests.

use super::{ChainPolicy, NetworkSignal};
use crate::types::ChainFeature;
use serde::{Deserialize, Serialize};

/// [`ChainPolicy`] for gaming chains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamingPolicy {
    /// Largest priority surcharge, in percent.
    pub max_surcharge_percent: u64,
    /// Utilization above which the surcharge starts scaling.
    pub congestion_threshold: f64,
    /// Floor for the adjusted price, in wei.
    pub min_gas_price: u128,
    /// Price assumed when the node cannot be read, in wei.
    pub fallback_gas_price: u128,
}

impl Default for GamingPolicy {
    fn default() -> Self {
        Self {
            max_surcharge_percent: 50,
            congestion_threshold: 0.5,
            min_gas_price: 100_000,
            fallback_gas_price: 1_000_000_000,
        }
    }
}

impl ChainPolicy for GamingPolicy {
    fn gas_price(&self, signal: &NetworkSignal) -> u128 {
        let surcharge_percent = match signal.block_utilization {
            // Without a reading, assume the worst and pay full priority.
            None => self.max_surcharge_percent as f64,
            Some(utilization) => {
                let over = ((utilization - self.congestion_threshold)
                    / (1.0 - self.congestion_threshold).max(f64::EPSILON))
                .clamp(0.0, 1.0);
                self.max_surcharge_percent as f64 * over
            }
        };
        let bump = (signal.base_gas_price as f64 * surcharge_percent / 100.0) as u128;
        signal.base_gas_price.saturating_add(bump).max(self.min_gas_price)
    }

    fn fallback_gas_price(&self) -> u128 {
        self.fallback_gas_price
    }

    fn wants_utilization(&self) -> bool {
        true
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![ChainFeature::GamingOptimized, ChainFeature::IceDb, ChainFeature::HighTps]
    }
}
