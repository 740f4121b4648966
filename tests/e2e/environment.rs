//! Shared environment for the end-to-end cases.
//!
//! [`Environment::setup`] assembles the same stack `spawn::try_spawn` builds
//! in production, with [`ScriptedChain`] adapters standing in for real
//! endpoints. Periodic health probes stay off so that per-chain call counters
//! only move when a case drives them.

use crate::constants::SCRIPTED_GAS_PRICE;
use alloy::{
    consensus::{Receipt, ReceiptEnvelope, ReceiptWithBloom},
    primitives::{Address, B256, Bloom, ChainId, TxHash, U256, keccak256, map::HashMap},
    rpc::types::TransactionReceipt,
};
use async_trait::async_trait;
use chrono::Utc;
use eyre::Result;
use std::{
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use trestle::{
    adapters::{AdapterError, ChainAdapter, Result as AdapterResult},
    config::{BridgeConfig, BridgeFeeConfig, ExecutorConfig},
    constants::{
        ABSTRACT_TESTNET, BRIDGE_CONTRACT_KEY, RISE_TESTNET, SEPOLIA, SOMNIA_TESTNET,
        ZEROG_TESTNET,
    },
    executor::TransactionExecutor,
    notify::BroadcastSink,
    orchestrator::{BridgeOrchestrator, LogSettlementWatcher},
    registry::ChainRegistry,
    spawn::TrestleHandle,
    storage::TrestleStorage,
    types::{
        BridgeId, BridgeStatusView, ChainDescriptor, ChainFeature, ChainHealth, ExecutionRequest,
        SettlementProof,
    },
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

/// Display name the production configuration would use for a chain id.
fn chain_name(chain_id: ChainId) -> String {
    match chain_id {
        RISE_TESTNET => "Rise Testnet".into(),
        ABSTRACT_TESTNET => "Abstract Testnet".into(),
        ZEROG_TESTNET => "0G Galileo".into(),
        SOMNIA_TESTNET => "Somnia Shannon".into(),
        SEPOLIA => "Sepolia".into(),
        other => format!("chain-{other}"),
    }
}

/// A [`ChainAdapter`] whose behavior is scripted up front.
///
/// Submissions are recorded in order, every RPC-shaped call bumps
/// [`Self::rpc_calls`], and any settlement scan finds a payout whose hash is
/// derived from the source transaction, so completed bridges get target
/// hashes a case can predict.
#[derive(Debug)]
pub struct ScriptedChain {
    descriptor: ChainDescriptor,
    fee: BridgeFeeConfig,
    estimated_confirmation: Duration,
    gas_price: u128,
    gas_estimate: u64,
    confirmation_delay: Duration,
    confirmation_timeout: bool,
    reverted: bool,
    settles: bool,
    submit_delay: Duration,
    rpc_calls: AtomicU64,
    submissions: Mutex<Vec<ExecutionRequest>>,
    submitting: AtomicBool,
    overlapped: AtomicBool,
    health: RwLock<ChainHealth>,
}

impl ScriptedChain {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            descriptor: ChainDescriptor {
                chain_id,
                name: chain_name(chain_id),
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
            gas_price: SCRIPTED_GAS_PRICE,
            gas_estimate: 21_000,
            confirmation_delay: Duration::ZERO,
            confirmation_timeout: false,
            reverted: false,
            settles: true,
            submit_delay: Duration::ZERO,
            rpc_calls: AtomicU64::new(0),
            submissions: Mutex::new(Vec::new()),
            submitting: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            health: RwLock::new(ChainHealth::unknown()),
        }
    }

    /// Reported gas price in wei.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Delay before a confirmation wait resolves.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Makes every confirmation wait time out.
    pub fn with_confirmation_timeout(mut self) -> Self {
        self.confirmation_timeout = true;
        self
    }

    /// Confirms transactions with a reverted receipt.
    pub fn with_reverted_receipt(mut self) -> Self {
        self.reverted = true;
        self
    }

    /// Settlement scans on this chain never find a payout.
    pub fn without_settlement(mut self) -> Self {
        self.settles = false;
        self
    }

    /// Time each submission spends in flight, widening the window in which
    /// overlapping submissions would be caught.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Number of RPC-shaped calls made against this chain.
    pub fn rpc_calls(&self) -> u64 {
        self.rpc_calls.load(Ordering::Relaxed)
    }

    /// Requests submitted through this chain, in order.
    pub fn submissions(&self) -> Vec<ExecutionRequest> {
        self.submissions.lock().unwrap().clone()
    }

    /// Whether two submissions were ever in flight at the same time.
    pub fn saw_overlapping_submissions(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn rpc(&self) {
        self.rpc_calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl ChainAdapter for ScriptedChain {
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

    async fn init(&self) -> AdapterResult<()> {
        self.rpc();
        self.check_health().await;
        Ok(())
    }

    async fn shutdown(&self) {}

    async fn block_number(&self) -> AdapterResult<u64> {
        self.rpc();
        Ok(100)
    }

    async fn balance(&self, _address: Address) -> AdapterResult<U256> {
        self.rpc();
        Ok(U256::from(10).pow(U256::from(24)))
    }

    async fn gas_price(&self) -> u128 {
        self.rpc();
        self.gas_price
    }

    async fn estimate_gas(&self, _request: &ExecutionRequest) -> AdapterResult<u64> {
        self.rpc();
        Ok(self.gas_estimate)
    }

    async fn validate(&self, _request: &ExecutionRequest) -> AdapterResult<bool> {
        Ok(true)
    }

    async fn submit(&self, request: &ExecutionRequest) -> AdapterResult<TxHash> {
        self.rpc();
        if self.submitting.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submissions.lock().unwrap().push(request.clone());
        self.submitting.store(false, Ordering::SeqCst);
        Ok(B256::random())
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> AdapterResult<TransactionReceipt> {
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
        source_tx_hash: TxHash,
        _lookback_blocks: u64,
    ) -> AdapterResult<Option<SettlementProof>> {
        self.rpc();
        if !self.settles {
            return Ok(None);
        }
        // The scripted payout carries only the correlated hash; amount and
        // recipient are not persisted anywhere a case could observe them.
        Ok(Some(SettlementProof {
            tx_hash: keccak256(source_tx_hash),
            block_number: 64,
            recipient: Address::ZERO,
            amount: U256::ZERO,
        }))
    }

    async fn check_health(&self) -> ChainHealth {
        self.rpc();
        let health = ChainHealth { healthy: true, latency_ms: Some(2), checked_at: Utc::now() };
        *self.health.write().unwrap() = health;
        health
    }
}

/// Bridge timings tightened so cases finish quickly.
pub fn fast_bridge_config() -> BridgeConfig {
    BridgeConfig {
        confirmation_timeout: Duration::from_secs(5),
        reorg_timeout: Duration::from_secs(5),
        relay_grace: Duration::from_secs(5),
        settlement_poll_interval: Duration::from_millis(10),
        ..BridgeConfig::default()
    }
}

/// The orchestration stack wired over scripted chains.
pub struct Environment {
    pub handle: TrestleHandle,
    chains: HashMap<ChainId, Arc<ScriptedChain>>,
}

impl Environment {
    /// Brings up registry, executors and the orchestration service over the
    /// given chains, with [`fast_bridge_config`] timings.
    pub async fn setup(chains: Vec<ScriptedChain>) -> Result<Self> {
        Self::setup_with(chains, fast_bridge_config()).await
    }

    /// Same as [`Self::setup`] with an explicit bridge configuration.
    pub async fn setup_with(chains: Vec<ScriptedChain>, bridge: BridgeConfig) -> Result<Self> {
        let storage = TrestleStorage::in_memory();

        let mut registry = ChainRegistry::new();
        let mut scripted = HashMap::default();
        for chain in chains {
            let chain = Arc::new(chain);
            scripted.insert(chain.chain_id(), chain.clone());
            registry.register(chain);
        }
        let registry = Arc::new(registry);
        registry.initialize_all().await;

        let mut executors = HashMap::default();
        for adapter in registry.adapters() {
            let executor =
                Arc::new(TransactionExecutor::new(adapter.clone(), ExecutorConfig::default()));
            executor.start_deadline_sweep();
            executors.insert(adapter.chain_id(), executor);
        }

        let events = Arc::new(BroadcastSink::default());
        let settlement = Arc::new(LogSettlementWatcher::new(
            registry.clone(),
            bridge.settlement_poll_interval,
            bridge.settlement_lookback_blocks,
        ));

        let (service, orchestrator) = BridgeOrchestrator::new(
            registry.clone(),
            executors.clone(),
            storage.clone(),
            events.clone(),
            settlement,
            bridge,
        )
        .await?;
        tokio::spawn(service);

        let handle = TrestleHandle { orchestrator, registry, executors, storage, events };
        Ok(Self { handle, chains: scripted })
    }

    /// The scripted chain registered under `chain_id`.
    pub fn chain(&self, chain_id: ChainId) -> &Arc<ScriptedChain> {
        self.chains.get(&chain_id).expect("chain is not part of this environment")
    }

    /// The executor submitting through `chain_id`.
    pub fn executor(&self, chain_id: ChainId) -> &Arc<TransactionExecutor> {
        self.handle.executors.get(&chain_id).expect("chain is not part of this environment")
    }

    /// Polls a bridge until it reaches a terminal status.
    pub async fn wait_for_final(&self, id: BridgeId) -> Result<BridgeStatusView> {
        for _ in 0..1000 {
            let view = self.handle.orchestrator.status(id).await?;
            if view.transaction.status.is_final() {
                return Ok(view);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        eyre::bail!("bridge {id} did not reach a terminal status in time")
    }
}
