//! Target-chain settlement observation.
//!
//! A bridge is only complete once the counterpart contract on the target
//! chain has paid the transfer out. The [`SettlementWatcher`] resolves that
//! moment; the log-backed implementation polls the target chain's settlement
//! event, keyed by the source transaction hash, until a deadline.

use crate::{
    error::InvalidParams,
    registry::ChainRegistry,
    types::{BridgeId, BridgeTransaction, SettlementProof},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{trace, warn};

/// Errors raised while waiting for target-chain settlement.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// No settlement was observed before the deadline.
    #[error("settlement timeout for bridge {bridge_id} after {waited:?}")]
    Timeout {
        /// The bridge that was being watched.
        bridge_id: BridgeId,
        /// How long the watcher waited.
        waited: Duration,
    },
    /// The record carries no source transaction hash to correlate by.
    #[error("bridge {0} has no source transaction hash to correlate settlement")]
    MissingSourceHash(BridgeId),
    /// The target chain is not registered.
    #[error(transparent)]
    UnsupportedChain(#[from] InvalidParams),
}

/// Observes the completion of bridges on their target chains.
#[async_trait]
pub trait SettlementWatcher: fmt::Debug + Send + Sync {
    /// Resolves once the transfer has been paid out on the target chain.
    ///
    /// Fails with [`SettlementError::Timeout`] when no settlement shows up
    /// before `deadline`. At least one scan happens even for a deadline in
    /// the past, so transfers that already settled are still picked up.
    async fn wait_for_settlement(
        &self,
        tx: &BridgeTransaction,
        deadline: DateTime<Utc>,
    ) -> Result<SettlementProof, SettlementError>;
}

/// Polls the target chain's bridge contract logs for the settlement event.
#[derive(Debug)]
pub struct LogSettlementWatcher {
    registry: Arc<ChainRegistry>,
    poll_interval: Duration,
    lookback_blocks: u64,
}

impl LogSettlementWatcher {
    /// Creates a watcher scanning the trailing `lookback_blocks` every
    /// `poll_interval`.
    pub fn new(
        registry: Arc<ChainRegistry>,
        poll_interval: Duration,
        lookback_blocks: u64,
    ) -> Self {
        Self { registry, poll_interval, lookback_blocks }
    }
}

#[async_trait]
impl SettlementWatcher for LogSettlementWatcher {
    async fn wait_for_settlement(
        &self,
        tx: &BridgeTransaction,
        deadline: DateTime<Utc>,
    ) -> Result<SettlementProof, SettlementError> {
        let source_tx = tx.source_tx_hash.ok_or(SettlementError::MissingSourceHash(tx.id))?;
        let adapter = self.registry.require(tx.to_chain)?;

        let started = Utc::now();
        loop {
            match adapter.find_settlement(source_tx, self.lookback_blocks).await {
                Ok(Some(proof)) => return Ok(proof),
                Ok(None) => {
                    trace!(bridge_id = %tx.id, chain_id = tx.to_chain, "no settlement yet");
                }
                // Transient scan failures are tolerated; the deadline bounds
                // the loop either way.
                Err(err) => {
                    warn!(bridge_id = %tx.id, chain_id = tx.to_chain, %err, "settlement scan failed");
                }
            }

            let now = Utc::now();
            if now >= deadline {
                return Err(SettlementError::Timeout {
                    bridge_id: tx.id,
                    waited: (now - started).to_std().unwrap_or_default(),
                });
            }
            let remaining = (deadline - now).to_std().unwrap_or_default();
            tokio::time::sleep(remaining.min(self.poll_interval)).await;
        }
    }
}
