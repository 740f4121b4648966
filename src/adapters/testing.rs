//! Scriptable in-memory [`ChainAdapter`] shared by unit tests.

use super::{AdapterError, ChainAdapter, Result};
use crate::{
    config::BridgeFeeConfig,
    constants::BRIDGE_CONTRACT_KEY,
    types::{ChainDescriptor, ChainFeature, ChainHealth, ExecutionRequest, SettlementProof},
};
use alloy::{
    consensus::{Receipt, ReceiptEnvelope, ReceiptWithBloom},
    primitives::{Address, B256, Bloom, ChainId, TxHash, U256},
    rpc::types::TransactionReceipt,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    sync::{
        Mutex, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// Builds a legacy receipt the way a node would report it.
fn receipt(tx_hash: TxHash, success: bool, gas_used: u64, gas_price: u128) -> TransactionReceipt {
    TransactionReceipt {
        inner: ReceiptEnvelope::Legacy(ReceiptWithBloom {
            receipt: Receipt {
                status: success.into(),
                cumulative_gas_used: gas_used,
                logs: vec![],
            },
            logs_bloom: Bloom::default(),
        }),
        transaction_hash: tx_hash,
        transaction_index: Some(0),
        block_hash: None,
        block_number: Some(1),
        gas_used,
        effective_gas_price: gas_price,
        blob_gas_used: None,
        blob_gas_price: None,
        from: Address::ZERO,
        to: None,
        contract_address: None,
    }
}

/// When a scripted settlement becomes observable.
#[derive(Debug, Default)]
struct SettlementScript {
    /// Scans returning nothing before `proof` shows up.
    polls_until_visible: u64,
    proof: Option<SettlementProof>,
}

/// A [`ChainAdapter`] whose behavior is scripted up front.
///
/// Named `chain-<id>` so name lookups are predictable. Every RPC-shaped
/// operation bumps [`Self::rpc_calls`], which lets tests assert that a code
/// path never touched the network.
#[derive(Debug)]
pub(crate) struct MockChain {
    descriptor: ChainDescriptor,
    fee: BridgeFeeConfig,
    estimated_confirmation: Duration,
    gas_price: u128,
    gas_estimate: u64,
    unreachable: bool,
    validation_rejection: bool,
    submit_failure: bool,
    confirmation_timeout: bool,
    reverted: bool,
    confirmation_delay: Duration,
    settlement: Mutex<SettlementScript>,
    rpc_calls: AtomicU64,
    submissions: Mutex<Vec<ExecutionRequest>>,
    health: RwLock<ChainHealth>,
}

impl MockChain {
    pub(crate) fn new(chain_id: ChainId) -> Self {
        Self {
            descriptor: ChainDescriptor {
                chain_id,
                name: format!("chain-{chain_id}"),
                endpoint: "http://localhost:8545".parse().unwrap(),
                ws_endpoint: None,
                native_symbol: "ETH".into(),
                native_decimals: 18,
                explorer_url: None,
                contracts: [(BRIDGE_CONTRACT_KEY.to_string(), Address::repeat_byte(0xbb))]
                    .into_iter()
                    .collect(),
            },
            fee: BridgeFeeConfig::default(),
            estimated_confirmation: Duration::from_secs(1),
            gas_price: 2_000_000,
            gas_estimate: 21_000,
            unreachable: false,
            validation_rejection: false,
            submit_failure: false,
            confirmation_timeout: false,
            reverted: false,
            confirmation_delay: Duration::ZERO,
            settlement: Mutex::new(SettlementScript::default()),
            rpc_calls: AtomicU64::new(0),
            submissions: Mutex::new(Vec::new()),
            health: RwLock::new(ChainHealth::unknown()),
        }
    }

    /// Fails [`ChainAdapter::init`] and health probes.
    pub(crate) fn with_init_failure(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Reported gas price in wei.
    pub(crate) fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Makes [`ChainAdapter::validate`] refuse every request.
    pub(crate) fn with_validation_rejection(mut self) -> Self {
        self.validation_rejection = true;
        self
    }

    /// Makes [`ChainAdapter::submit`] fail.
    pub(crate) fn with_submit_failure(mut self) -> Self {
        self.submit_failure = true;
        self
    }

    /// Makes every confirmation wait time out.
    pub(crate) fn with_confirmation_timeout(mut self) -> Self {
        self.confirmation_timeout = true;
        self
    }

    /// Confirms transactions with a reverted receipt.
    pub(crate) fn with_reverted_receipt(mut self) -> Self {
        self.reverted = true;
        self
    }

    /// Delay before a confirmation wait resolves.
    pub(crate) fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Confirmation estimate reported by the chain.
    pub(crate) fn with_estimated_confirmation(mut self, estimate: Duration) -> Self {
        self.estimated_confirmation = estimate;
        self
    }

    /// A settlement that is immediately observable.
    pub(crate) fn with_settlement(self, proof: SettlementProof) -> Self {
        self.with_settlement_after(0, proof)
    }

    /// A settlement that shows up only after `polls` empty scans.
    pub(crate) fn with_settlement_after(self, polls: u64, proof: SettlementProof) -> Self {
        *self.settlement.lock().unwrap() =
            SettlementScript { polls_until_visible: polls, proof: Some(proof) };
        self
    }

    /// Number of RPC-shaped calls made against this chain.
    pub(crate) fn rpc_calls(&self) -> u64 {
        self.rpc_calls.load(Ordering::Relaxed)
    }

    /// Requests submitted through this chain, in order.
    pub(crate) fn submissions(&self) -> Vec<ExecutionRequest> {
        self.submissions.lock().unwrap().clone()
    }

    fn rpc(&self) -> u64 {
        self.rpc_calls.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl ChainAdapter for MockChain {
    fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    fn features(&self) -> Vec<ChainFeature> {
        vec![]
    }

    fn signer_address(&self) -> Option<Address> {
        Some(Address::repeat_byte(0x11))
    }

    fn estimated_confirmation(&self) -> Duration {
        self.estimated_confirmation
    }

    fn bridge_fee(&self, amount: U256) -> U256 {
        self.fee.fee_for(amount)
    }

    fn health(&self) -> ChainHealth {
        *self.health.read().unwrap()
    }

    async fn init(&self) -> Result<()> {
        self.rpc();
        if self.unreachable {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }
        Ok(())
    }

    async fn shutdown(&self) {}

    async fn block_number(&self) -> Result<u64> {
        self.rpc();
        if self.unreachable {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }
        Ok(100)
    }

    async fn balance(&self, _address: Address) -> Result<U256> {
        self.rpc();
        Ok(U256::from(10).pow(U256::from(24)))
    }

    async fn gas_price(&self) -> u128 {
        self.rpc();
        self.gas_price
    }

    async fn estimate_gas(&self, _request: &ExecutionRequest) -> Result<u64> {
        self.rpc();
        Ok(self.gas_estimate)
    }

    async fn validate(&self, _request: &ExecutionRequest) -> Result<bool> {
        Ok(!self.validation_rejection)
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<TxHash> {
        self.rpc();
        if self.submit_failure {
            return Err(AdapterError::NoSigner(self.chain_id()));
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(request.clone());
        Ok(B256::from(U256::from(submissions.len())))
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TransactionReceipt> {
        self.rpc();
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        if self.confirmation_timeout {
            return Err(AdapterError::ConfirmationTimeout { tx_hash, confirmations, timeout });
        }
        Ok(receipt(tx_hash, !self.reverted, self.gas_estimate, self.gas_price))
    }

    async fn find_settlement(
        &self,
        _source_tx_hash: TxHash,
        _lookback_blocks: u64,
    ) -> Result<Option<SettlementProof>> {
        self.rpc();
        let mut script = self.settlement.lock().unwrap();
        if script.polls_until_visible > 0 {
            script.polls_until_visible -= 1;
            return Ok(None);
        }
        Ok(script.proof)
    }

    async fn check_health(&self) -> ChainHealth {
        self.rpc();
        let health = ChainHealth {
            healthy: !self.unreachable,
            latency_ms: (!self.unreachable).then_some(5),
            checked_at: Utc::now(),
        };
        *self.health.write().unwrap() = health;
        health
    }
}
