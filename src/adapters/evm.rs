//! EVM chain adapter.

use super::{AdapterError, ChainAdapter, ChainPolicy, NetworkSignal, Result};
use crate::{
    config::{BridgeFeeConfig, ChainConfig, HealthConfig},
    metrics::AdapterMetrics,
    signers::DynSigner,
    types::{
        ChainDescriptor, ChainFeature, ChainHealth, ExecutionRequest, ITokenBridge,
        SettlementProof,
    },
};
use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::BlockId,
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionConfig, Provider, ProviderBuilder},
    rpc::{
        client::ClientBuilder,
        types::{Filter, TransactionReceipt, TransactionRequest},
    },
    sol_types::SolEvent,
    transports::layers::RetryBackoffLayer,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    sync::RwLock,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// [`RetryBackoffLayer`] used for chain providers.
///
/// We are allowing max 10 retries with a backoff of 800ms. The CU/s is set to max value to avoid
/// any throttling.
const RETRY_LAYER: RetryBackoffLayer = RetryBackoffLayer::new(10, 800, u64::MAX);

/// [`ChainAdapter`] over a JSON-RPC EVM endpoint.
///
/// Chain-specific behavior is delegated to the configured [`ChainPolicy`];
/// everything else is uniform across chains. Submissions are serialized per
/// chain through the nonce lock.
#[derive(Debug)]
pub struct EvmChain {
    descriptor: ChainDescriptor,
    provider: DynProvider,
    signer: Option<DynSigner>,
    policy: Box<dyn ChainPolicy>,
    fee: BridgeFeeConfig,
    estimated_confirmation: Duration,
    latency_threshold: Duration,
    /// Next nonce to use. `None` forces a resync from the chain.
    nonce: Mutex<Option<u64>>,
    health: RwLock<ChainHealth>,
    metrics: AdapterMetrics,
}

impl EvmChain {
    /// Creates an adapter from a chain configuration.
    pub fn new(config: &ChainConfig, health: &HealthConfig) -> eyre::Result<Self> {
        let client = ClientBuilder::default().layer(RETRY_LAYER).http(config.endpoint.clone());
        let provider = ProviderBuilder::new().connect_client(client).erased();

        let signer =
            config.signer_key.as_deref().map(DynSigner::from_signing_key).transpose()?;

        Ok(Self {
            descriptor: config.descriptor(),
            provider,
            signer,
            policy: config.policy.build(),
            fee: config.fee,
            estimated_confirmation: config.estimated_confirmation(),
            latency_threshold: health.latency_threshold,
            nonce: Mutex::new(None),
            health: RwLock::new(ChainHealth::unknown()),
            metrics: AdapterMetrics::for_chain(&config.name),
        })
    }

    /// Collects the pricing signal the policy asked for.
    async fn signal(&self) -> Result<NetworkSignal> {
        let base_gas_price = self.provider.get_gas_price().await?;
        let block_utilization =
            if self.policy.wants_utilization() { self.block_utilization().await } else { None };
        Ok(NetworkSignal { base_gas_price, block_utilization })
    }

    /// Gas used over gas limit of the latest block.
    async fn block_utilization(&self) -> Option<f64> {
        match self.provider.get_block(BlockId::latest()).await {
            Ok(Some(block)) if block.header.gas_limit > 0 => {
                Some(block.header.gas_used as f64 / block.header.gas_limit as f64)
            }
            Ok(_) => None,
            Err(err) => {
                debug!(chain_id = self.chain_id(), %err, "could not read block utilization");
                None
            }
        }
    }

    /// Builds the RPC request used for gas estimation.
    fn estimation_request(&self, request: &ExecutionRequest) -> TransactionRequest {
        let mut tx = TransactionRequest::default().to(request.to).value(request.value);
        if let Some(data) = &request.data {
            tx = tx.input(data.clone().into());
        }
        if let Some(signer) = &self.signer {
            tx = tx.from(signer.address());
        }
        tx
    }
}

#[async_trait]
impl ChainAdapter for EvmChain {
    fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    fn features(&self) -> Vec<ChainFeature> {
        self.policy.features()
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
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
        let block = self.provider.get_block_number().await?;
        match &self.signer {
            Some(signer) => info!(
                chain_id = self.chain_id(),
                chain = %self.descriptor.name,
                block,
                signer = %signer.address(),
                "connected to chain"
            ),
            None => warn!(
                chain_id = self.chain_id(),
                chain = %self.descriptor.name,
                block,
                "connected to chain without a signer, submissions will be rejected"
            ),
        }
        self.check_health().await;
        Ok(())
    }

    async fn shutdown(&self) {
        info!(chain_id = self.chain_id(), chain = %self.descriptor.name, "chain adapter shut down");
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn gas_price(&self) -> u128 {
        match self.signal().await {
            Ok(signal) => self.policy.gas_price(&signal),
            Err(err) => {
                let fallback = self.policy.fallback_gas_price();
                warn!(
                    chain_id = self.chain_id(),
                    %err,
                    fallback,
                    "gas price fetch failed, using policy fallback"
                );
                fallback
            }
        }
    }

    async fn estimate_gas(&self, request: &ExecutionRequest) -> Result<u64> {
        Ok(self.provider.estimate_gas(self.estimation_request(request)).await?)
    }

    async fn validate(&self, request: &ExecutionRequest) -> Result<bool> {
        if request.to.is_zero() {
            warn!(
                chain_id = self.chain_id(),
                request_id = %request.id,
                "rejecting transaction to the zero address"
            );
            return Ok(false);
        }
        if let Some(data) = &request.data
            && data.len() > self.policy.max_payload_bytes()
        {
            warn!(
                chain_id = self.chain_id(),
                request_id = %request.id,
                payload_bytes = data.len(),
                ceiling = self.policy.max_payload_bytes(),
                "rejecting transaction with oversized payload"
            );
            return Ok(false);
        }
        if let Err(reason) = self.policy.validate(request) {
            warn!(
                chain_id = self.chain_id(),
                request_id = %request.id,
                %reason,
                "transaction rejected by chain policy"
            );
            return Ok(false);
        }
        Ok(true)
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<TxHash> {
        let signer = self.signer.as_ref().ok_or(AdapterError::NoSigner(self.chain_id()))?;

        let gas_price = match request.gas_price {
            Some(price) => price,
            None => self.gas_price().await,
        };
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => self.estimate_gas(request).await?,
        };

        let balance = self.provider.get_balance(signer.address()).await?;
        let required = request.value + U256::from(gas_price) * U256::from(gas_limit);
        if balance < required {
            self.metrics.submit_failures.increment(1);
            return Err(AdapterError::InsufficientBalance {
                chain_id: self.chain_id(),
                required,
                available: balance,
            });
        }

        // The lock is held across send so concurrent submissions on the same
        // chain cannot race on a nonce.
        let mut next_nonce = self.nonce.lock().await;
        let nonce = match *next_nonce {
            Some(nonce) => nonce,
            None => self.provider.get_transaction_count(signer.address()).await?,
        };

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id()),
            nonce,
            gas_price,
            gas_limit,
            to: request.to.into(),
            value: request.value,
            input: request.data.clone().unwrap_or_default(),
        };
        let signature = signer.sign_transaction(&mut tx).await?;
        let tx = TxEnvelope::Legacy(tx.into_signed(signature));

        match self.provider.send_tx_envelope(tx).await {
            Ok(pending) => {
                *next_nonce = Some(nonce + 1);
                let tx_hash = *pending.tx_hash();
                self.metrics.submitted.increment(1);
                info!(
                    chain_id = self.chain_id(),
                    request_id = %request.id,
                    %tx_hash,
                    nonce,
                    gas_price,
                    gas_limit,
                    "submitted transaction"
                );
                Ok(tx_hash)
            }
            Err(err) => {
                // Resync from the chain on the next submission since we do
                // not know whether this nonce was consumed.
                *next_nonce = None;
                self.metrics.submit_failures.increment(1);
                Err(err.into())
            }
        }
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TransactionReceipt> {
        let config = PendingTransactionConfig::new(tx_hash)
            .with_required_confirmations(confirmations)
            .with_timeout(Some(timeout));

        let watcher = self.provider.watch_pending_transaction(config).await?;
        if watcher.await.is_err() {
            self.metrics.confirmation_timeouts.increment(1);
            return Err(AdapterError::ConfirmationTimeout { tx_hash, confirmations, timeout });
        }

        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await?
            .ok_or(AdapterError::ReceiptNotFound(tx_hash))?;
        self.metrics.confirmed.increment(1);
        Ok(receipt)
    }

    async fn find_settlement(
        &self,
        source_tx_hash: TxHash,
        lookback_blocks: u64,
    ) -> Result<Option<SettlementProof>> {
        let Some(contract) = self.descriptor.bridge_contract() else {
            debug!(chain_id = self.chain_id(), "no bridge contract, cannot scan for settlement");
            return Ok(None);
        };

        let head = self.provider.get_block_number().await?;
        let filter = Filter::new()
            .address(contract)
            .event_signature(ITokenBridge::BridgeSettled::SIGNATURE_HASH)
            .topic1(source_tx_hash)
            .from_block(head.saturating_sub(lookback_blocks));

        let logs = self.provider.get_logs(&filter).await?;
        for log in logs.iter().rev() {
            let (Some(tx_hash), Some(block_number)) = (log.transaction_hash, log.block_number)
            else {
                continue;
            };
            match log.log_decode::<ITokenBridge::BridgeSettled>() {
                Ok(decoded) => {
                    let event = decoded.inner.data;
                    return Ok(Some(SettlementProof {
                        tx_hash,
                        block_number,
                        recipient: event.recipient,
                        amount: event.amount,
                    }));
                }
                Err(err) => {
                    warn!(chain_id = self.chain_id(), %tx_hash, %err, "undecodable settlement log");
                }
            }
        }
        Ok(None)
    }

    async fn check_health(&self) -> ChainHealth {
        let started = Instant::now();
        let result = self.provider.get_block_number().await;
        let latency = started.elapsed();

        let health = match result {
            Ok(_) => {
                let healthy = latency <= self.latency_threshold;
                if !healthy {
                    warn!(
                        chain_id = self.chain_id(),
                        latency_ms = latency.as_millis() as u64,
                        "chain responding slowly"
                    );
                }
                ChainHealth {
                    healthy,
                    latency_ms: Some(latency.as_millis() as u64),
                    checked_at: Utc::now(),
                }
            }
            Err(err) => {
                warn!(chain_id = self.chain_id(), %err, "health check failed");
                ChainHealth { healthy: false, latency_ms: None, checked_at: Utc::now() }
            }
        };

        self.metrics.probe_latency.record(latency.as_secs_f64());
        *self.health.write().unwrap() = health;
        health
    }
}
