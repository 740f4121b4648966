//! Bridge orchestration service.
//!
//! The [`BridgeOrchestrator`] owns the lifecycle of every accepted bridge:
//! `pending → confirming → bridging → completed`, with any non-terminal
//! status able to drop to `failed`. Submission happens synchronously in
//! [`BridgeOrchestratorHandle::execute`]; everything after the broadcast is
//! driven by a monitor task spawned per bridge from the service's poll loop.

use crate::{
    config::BridgeConfig,
    constants::{BRIDGE_HUB, DEFAULT_BRIDGE_GAS_LIMIT, DIRECT_BRIDGE_PAIRS},
    error::{InvalidParams, TrestleError},
    executor::TransactionExecutor,
    metrics::BridgeMetrics,
    notify::NotificationSink,
    registry::ChainRegistry,
    storage::{StorageApi, TrestleStorage},
    types::{
        BridgeEvent, BridgeId, BridgeParams, BridgeQuote, BridgeStats, BridgeStatus,
        BridgeStatusView, BridgeTransaction, BridgeUpdate, BridgeVolume, ChainDescriptor,
        ExecutionRequest, ExecutionResult, FeeEstimate, ITokenBridge, Priority, VolumeWindow,
    },
};
use alloy::{
    primitives::{Address, Bytes, ChainId, TxHash, U256, map::HashMap},
    sol_types::SolCall,
};
use chrono::{DateTime, Utc};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

mod settlement;
pub use settlement::{LogSettlementWatcher, SettlementError, SettlementWatcher};

/// Errors raised while driving a bridge through its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge id is unknown.
    #[error("bridge {0} not found")]
    NotFound(BridgeId),
    /// The source-leg transaction could not be broadcast.
    #[error("source leg submission failed: {0}")]
    SourceSubmission(String),
    /// The source-leg transaction reverted.
    #[error("source transaction {0} reverted on chain")]
    SourceReverted(TxHash),
    /// A status transition the state machine does not allow.
    #[error("invalid bridge status transition from {from} to {to}")]
    InvalidStateTransition {
        /// Status the record is in.
        from: BridgeStatus,
        /// Status that was requested.
        to: BridgeStatus,
    },
    /// The record carries no source transaction hash to monitor.
    #[error("bridge {0} has no source transaction to monitor")]
    MissingSourceHash(BridgeId),
    /// The chain has no bridge contract configured.
    #[error("no bridge contract configured for chain {0}")]
    ContractMissing(ChainId),
    /// A chain lookup failed while monitoring.
    #[error(transparent)]
    InvalidParams(#[from] InvalidParams),
    /// An adapter fault while monitoring.
    #[error(transparent)]
    Adapter(#[from] crate::adapters::AdapterError),
    /// The settlement wait gave up.
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    /// A storage fault.
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

/// Messages accepted by the [`BridgeOrchestrator`].
#[derive(Debug)]
pub enum OrchestratorMessage {
    /// Start monitoring a bridge from its current status.
    Watch(Box<BridgeTransaction>),
}

/// Handle to communicate with the [`BridgeOrchestrator`].
#[derive(Debug, Clone)]
pub struct BridgeOrchestratorHandle {
    command_tx: mpsc::UnboundedSender<OrchestratorMessage>,
    inner: Arc<OrchestratorInner>,
}

impl BridgeOrchestratorHandle {
    /// Quotes a prospective bridge.
    ///
    /// Purely local: validation, fee, gas budget and timing all derive from
    /// configuration, so no network traffic happens even for rejections.
    pub fn quote(&self, params: &BridgeParams) -> Result<BridgeQuote, TrestleError> {
        let quote = self.inner.quote(params)?;
        self.inner.metrics.quotes.increment(1);
        Ok(quote)
    }

    /// Estimates the full source-leg cost of a prospective bridge.
    pub async fn estimate_fee(&self, params: &BridgeParams) -> Result<FeeEstimate, TrestleError> {
        self.inner.estimate_fee(params).await
    }

    /// Accepts a bridge: persists it, broadcasts the source leg and hands the
    /// record to the service for monitoring.
    ///
    /// Returns as soon as the source transaction is broadcast. Everything
    /// after that, starting with the source confirmation wait, happens on the
    /// bridge's monitor task.
    pub async fn execute(&self, params: BridgeParams) -> Result<BridgeId, TrestleError> {
        let tx = self.inner.submit_bridge(params).await?;
        let id = tx.id;
        self.watch(tx);
        Ok(id)
    }

    /// Reports the current status of a bridge.
    pub async fn status(&self, id: BridgeId) -> Result<BridgeStatusView, TrestleError> {
        self.inner.status(id).await
    }

    /// Bridge history of a user, newest first.
    pub async fn history(
        &self,
        user: Address,
        limit: Option<usize>,
    ) -> Result<Vec<BridgeTransaction>, TrestleError> {
        self.inner.history(user, limit).await
    }

    /// Aggregate statistics over all recorded bridges.
    pub async fn stats(&self) -> Result<BridgeStats, TrestleError> {
        self.inner.stats().await
    }

    /// Completed volume over the standard trailing windows.
    pub async fn volume(&self) -> Result<BridgeVolume, TrestleError> {
        self.inner.volume().await
    }

    /// Pauses the bridge contract on a chain.
    ///
    /// Submitted at high priority and confirmed before returning. In-flight
    /// monitors are not touched; their transfers run against the paused
    /// contract on their own merits.
    pub async fn pause(&self, chain_id: ChainId) -> Result<ExecutionResult, TrestleError> {
        info!(chain_id, "pausing bridge contract");
        self.inner.admin_call(chain_id, ITokenBridge::pauseCall {}.abi_encode().into()).await
    }

    /// Lifts the pause on the bridge contract of a chain.
    pub async fn resume(&self, chain_id: ChainId) -> Result<ExecutionResult, TrestleError> {
        info!(chain_id, "resuming bridge contract");
        self.inner.admin_call(chain_id, ITokenBridge::unpauseCall {}.abi_encode().into()).await
    }

    /// Descriptions of all chains bridges can run between.
    pub fn supported_chains(&self) -> Vec<ChainDescriptor> {
        self.inner.registry.descriptors()
    }

    fn watch(&self, tx: BridgeTransaction) {
        let _ = self.command_tx.send(OrchestratorMessage::Watch(Box::new(tx)));
    }
}

#[derive(Debug)]
struct OrchestratorInner {
    registry: Arc<ChainRegistry>,
    executors: HashMap<ChainId, Arc<TransactionExecutor>>,
    storage: TrestleStorage,
    sink: Arc<dyn NotificationSink>,
    settlement: Arc<dyn SettlementWatcher>,
    config: BridgeConfig,
    metrics: BridgeMetrics,
}

impl OrchestratorInner {
    fn quote(&self, params: &BridgeParams) -> Result<BridgeQuote, InvalidParams> {
        if params.amount.is_zero() {
            return Err(InvalidParams::ZeroAmount);
        }
        if params.from_chain == params.to_chain {
            return Err(InvalidParams::SameChain);
        }
        let source = self.registry.require(params.from_chain)?;
        let target = self.registry.require(params.to_chain)?;
        if params.amount < self.config.min_amount {
            return Err(InvalidParams::BelowMinimum {
                amount: params.amount,
                minimum: self.config.min_amount,
            });
        }
        if params.amount > self.config.max_amount {
            return Err(InvalidParams::AboveMaximum {
                amount: params.amount,
                maximum: self.config.max_amount,
            });
        }

        let fee = source.bridge_fee(params.amount);
        Ok(BridgeQuote {
            from_chain: params.from_chain,
            to_chain: params.to_chain,
            from_token: params.from_token,
            to_token: params.to_token,
            amount: params.amount,
            fee,
            gas_estimate: DEFAULT_BRIDGE_GAS_LIMIT,
            estimated_time: source.estimated_confirmation() + target.estimated_confirmation(),
            exchange_rate: 1.0,
            estimated_output: params.amount.saturating_sub(fee),
            min_amount: self.config.min_amount,
            max_amount: self.config.max_amount,
            route: route(params.from_chain, params.to_chain),
        })
    }

    async fn estimate_fee(&self, params: &BridgeParams) -> Result<FeeEstimate, TrestleError> {
        let quote = self.quote(params)?;
        let gas_price = match params.gas_price {
            Some(price) => price,
            None => self.registry.require(params.from_chain)?.gas_price().await,
        };
        Ok(FeeEstimate {
            fee: quote.fee,
            gas: quote.gas_estimate,
            gas_price,
            total_cost: quote.fee + U256::from(quote.gas_estimate) * U256::from(gas_price),
        })
    }

    /// Persists a new bridge and broadcasts its source leg.
    ///
    /// A failed broadcast still leaves a record behind, marked failed, so
    /// the attempt shows up in history and stats.
    async fn submit_bridge(&self, params: BridgeParams) -> Result<BridgeTransaction, TrestleError> {
        let quote = self.quote(&params)?;
        let executor = self.executor(params.from_chain)?;

        let mut tx = BridgeTransaction::new(&params, &quote, self.config.default_slippage);
        self.storage.create_bridge(&tx).await?;
        self.sink.publish(&BridgeEvent::for_transaction(&tx));
        self.metrics.started.increment(1);
        info!(
            bridge_id = %tx.id,
            from_chain = params.from_chain,
            to_chain = params.to_chain,
            amount = %params.amount,
            "bridge accepted"
        );

        let broadcast = match self.source_request(&params, &quote) {
            Ok(request) => executor.submit(request).await.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match broadcast {
            Ok(tx_hash) => {
                info!(bridge_id = %tx.id, %tx_hash, "source leg broadcast");
                Ok(self
                    .storage
                    .update_bridge_status(
                        tx.id,
                        BridgeStatus::Pending,
                        BridgeUpdate::source_tx(tx_hash),
                    )
                    .await?)
            }
            Err(err) => {
                self.fail(&mut tx, &err).await;
                Err(BridgeError::SourceSubmission(err).into())
            }
        }
    }

    /// Builds the source-leg call into the bridge contract.
    ///
    /// The fee always travels as transaction value; bridging the native asset
    /// adds the bridged amount on top.
    fn source_request(
        &self,
        params: &BridgeParams,
        quote: &BridgeQuote,
    ) -> Result<ExecutionRequest, BridgeError> {
        let source = self.registry.require(params.from_chain)?;
        let contract = source
            .descriptor()
            .bridge_contract()
            .ok_or(BridgeError::ContractMissing(params.from_chain))?;

        let call = ITokenBridge::bridgeTokensCall {
            token: params.from_token,
            amount: params.amount,
            toChainId: U256::from(params.to_chain),
            recipient: params.recipient(),
        };
        let value = if params.from_token.is_zero() {
            params.amount + quote.fee
        } else {
            quote.fee
        };

        let mut request = ExecutionRequest::new(contract)
            .with_value(value)
            .with_data(call.abi_encode().into())
            .with_gas_limit(params.gas_limit.unwrap_or(quote.gas_estimate));
        request.gas_price = params.gas_price;
        Ok(request)
    }

    async fn status(&self, id: BridgeId) -> Result<BridgeStatusView, TrestleError> {
        let tx = self.storage.bridge_by_id(id).await?.ok_or(BridgeError::NotFound(id))?;
        Ok(tx.into())
    }

    async fn history(
        &self,
        user: Address,
        limit: Option<usize>,
    ) -> Result<Vec<BridgeTransaction>, TrestleError> {
        let limit = limit.unwrap_or(self.config.history_limit);
        Ok(self.storage.bridges_by_user(user, limit).await?)
    }

    async fn stats(&self) -> Result<BridgeStats, TrestleError> {
        let bridges = self.storage.bridges().await?;
        let mut stats = BridgeStats { total: bridges.len() as u64, ..Default::default() };
        let mut completion_secs = 0u64;
        let mut timed = 0u64;
        for tx in &bridges {
            match tx.status {
                BridgeStatus::Completed => {
                    stats.successful += 1;
                    stats.total_volume += tx.amount;
                    if let Some(took) = tx.completion_time() {
                        completion_secs += took.as_secs();
                        timed += 1;
                    }
                }
                BridgeStatus::Failed => stats.failed += 1,
                _ => {}
            }
        }
        if timed > 0 {
            stats.average_completion_secs = Some(completion_secs / timed);
        }
        Ok(stats)
    }

    async fn volume(&self) -> Result<BridgeVolume, TrestleError> {
        let bridges = self.storage.bridges().await?;
        let now = Utc::now();
        Ok(BridgeVolume {
            last_24h: volume_window(&bridges, now - chrono::Duration::hours(24)),
            last_7d: volume_window(&bridges, now - chrono::Duration::days(7)),
            last_30d: volume_window(&bridges, now - chrono::Duration::days(30)),
        })
    }

    /// Submits an administrative call to a chain's bridge contract and waits
    /// for its confirmation.
    async fn admin_call(
        &self,
        chain_id: ChainId,
        calldata: Bytes,
    ) -> Result<ExecutionResult, TrestleError> {
        let executor = self.executor(chain_id)?;
        let contract = executor
            .adapter()
            .descriptor()
            .bridge_contract()
            .ok_or(BridgeError::ContractMissing(chain_id))?;

        let request = ExecutionRequest::new(contract)
            .with_data(calldata)
            .with_priority(Priority::High);
        let result = executor.execute(request).await;
        if !result.success {
            warn!(chain_id, error = result.error.as_deref(), "bridge admin call failed");
        }
        Ok(result)
    }

    fn executor(&self, chain_id: ChainId) -> Result<&Arc<TransactionExecutor>, InvalidParams> {
        self.executors.get(&chain_id).ok_or(InvalidParams::UnsupportedChain(chain_id))
    }

    /// Drives one bridge from its current status to a terminal one.
    ///
    /// Every failure is absorbed into the record: the bridge is marked failed
    /// with the error persisted in its metadata, and nothing propagates past
    /// this task.
    #[instrument(skip(self, tx), fields(bridge_id = %tx.id, from_chain = tx.from_chain, to_chain = tx.to_chain))]
    async fn monitor_bridge(&self, mut tx: BridgeTransaction) {
        self.metrics.active.increment(1.0);
        loop {
            let step = match tx.status {
                BridgeStatus::Pending => self.on_pending(&mut tx).await,
                BridgeStatus::Confirming => self.on_confirming(&mut tx).await,
                BridgeStatus::Bridging => self.on_bridging(&mut tx).await,
                BridgeStatus::Completed | BridgeStatus::Failed => break,
            };
            if let Err(err) = step {
                self.fail(&mut tx, &err.to_string()).await;
                break;
            }
        }
        self.metrics.active.decrement(1.0);
    }

    /// Waits out the configured source confirmation depth.
    ///
    /// Transitions to: [`BridgeStatus::Confirming`]
    async fn on_pending(&self, tx: &mut BridgeTransaction) -> Result<(), BridgeError> {
        let source_tx = tx.source_tx_hash.ok_or(BridgeError::MissingSourceHash(tx.id))?;
        let source = self.registry.require(tx.from_chain)?;

        let receipt = source
            .wait_for_confirmation(
                source_tx,
                self.config.confirmations,
                self.config.confirmation_timeout,
            )
            .await?;
        if !receipt.status() {
            return Err(BridgeError::SourceReverted(source_tx));
        }
        self.update_status(tx, BridgeStatus::Confirming, BridgeUpdate::default()).await
    }

    /// Waits for the additional reorg-defense depth on the source chain.
    ///
    /// Transitions to: [`BridgeStatus::Bridging`]
    async fn on_confirming(&self, tx: &mut BridgeTransaction) -> Result<(), BridgeError> {
        let source_tx = tx.source_tx_hash.ok_or(BridgeError::MissingSourceHash(tx.id))?;
        let source = self.registry.require(tx.from_chain)?;

        let depth = self.config.confirmations + self.config.reorg_depth;
        let receipt = source
            .wait_for_confirmation(source_tx, depth, self.config.reorg_timeout)
            .await?;
        // A reorg can replace the transaction under us; what matters is the
        // receipt that ended up canonical.
        if !receipt.status() {
            return Err(BridgeError::SourceReverted(source_tx));
        }
        self.update_status(tx, BridgeStatus::Bridging, BridgeUpdate::default()).await
    }

    /// Waits for the transfer to settle on the target chain.
    ///
    /// Transitions to: [`BridgeStatus::Completed`]
    async fn on_bridging(&self, tx: &mut BridgeTransaction) -> Result<(), BridgeError> {
        let deadline = tx.estimated_completion.unwrap_or_else(Utc::now)
            + chrono::Duration::from_std(self.config.relay_grace).unwrap_or_default();

        let proof = self.settlement.wait_for_settlement(tx, deadline).await?;
        info!(target_tx = %proof.tx_hash, block_number = proof.block_number, "observed settlement");

        self.update_status(tx, BridgeStatus::Completed, BridgeUpdate::settled(proof.tx_hash))
            .await?;
        self.metrics.completed.increment(1);
        if let Some(took) = tx.completion_time() {
            self.metrics.completion_time.record(took.as_secs_f64());
        }
        Ok(())
    }

    /// Moves a bridge to `status`, persisting the change and publishing the
    /// matching event.
    #[instrument(skip(self, tx, update), fields(bridge_id = %tx.id, from = %tx.status, to = %status))]
    async fn update_status(
        &self,
        tx: &mut BridgeTransaction,
        status: BridgeStatus,
        update: BridgeUpdate,
    ) -> Result<(), BridgeError> {
        if !tx.status.can_transition_to(&status) {
            return Err(BridgeError::InvalidStateTransition { from: tx.status, to: status });
        }
        *tx = self.storage.update_bridge_status(tx.id, status, update).await?;
        self.sink.publish(&BridgeEvent::for_transaction(tx));
        info!("bridge status updated");
        Ok(())
    }

    /// Best-effort move to failed. Terminal records are left as they are.
    async fn fail(&self, tx: &mut BridgeTransaction, error: &str) {
        warn!(bridge_id = %tx.id, error, "bridge failed");
        match self.update_status(tx, BridgeStatus::Failed, BridgeUpdate::failure(error)).await {
            Ok(()) => self.metrics.failed.increment(1),
            Err(err) => error!(bridge_id = %tx.id, %err, "could not record bridge failure"),
        }
    }
}

/// Chains a transfer hops through, source first.
fn route(from_chain: ChainId, to_chain: ChainId) -> Vec<ChainId> {
    let direct = DIRECT_BRIDGE_PAIRS
        .iter()
        .any(|&(a, b)| (a, b) == (from_chain, to_chain) || (b, a) == (from_chain, to_chain));
    if direct || from_chain == BRIDGE_HUB || to_chain == BRIDGE_HUB {
        vec![from_chain, to_chain]
    } else {
        vec![from_chain, BRIDGE_HUB, to_chain]
    }
}

/// Aggregates completed volume newer than `cutoff`.
fn volume_window(bridges: &[BridgeTransaction], cutoff: DateTime<Utc>) -> VolumeWindow {
    let mut window = VolumeWindow::default();
    for tx in bridges {
        if tx.status == BridgeStatus::Completed
            && tx.completed_at.is_some_and(|done| done >= cutoff)
        {
            window.total_volume += tx.amount;
            window.transaction_count += 1;
        }
    }
    if window.transaction_count > 0 {
        window.average_size = window.total_volume / U256::from(window.transaction_count);
    }
    window
}

/// Bridge orchestration service.
///
/// Listens for [`OrchestratorMessage`]s and spawns one monitor task per
/// bridge. The future never resolves; drop it or abort its task to shut the
/// service down.
#[derive(Debug)]
pub struct BridgeOrchestrator {
    inner: Arc<OrchestratorInner>,
    command_rx: mpsc::UnboundedReceiver<OrchestratorMessage>,
}

impl BridgeOrchestrator {
    /// Creates the service and its handle, resuming monitors for every bridge
    /// that was in flight when the process last stopped.
    pub async fn new(
        registry: Arc<ChainRegistry>,
        executors: HashMap<ChainId, Arc<TransactionExecutor>>,
        storage: TrestleStorage,
        sink: Arc<dyn NotificationSink>,
        settlement: Arc<dyn SettlementWatcher>,
        config: BridgeConfig,
    ) -> eyre::Result<(Self, BridgeOrchestratorHandle)> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(OrchestratorInner {
            registry,
            executors,
            storage,
            sink,
            settlement,
            config,
            metrics: BridgeMetrics::default(),
        });
        let service = Self { inner: inner.clone(), command_rx };
        let handle = BridgeOrchestratorHandle { command_tx, inner };

        let active = handle.inner.storage.active_bridges().await?;
        if !active.is_empty() {
            info!(count = active.len(), "resuming in-flight bridge monitors");
        }
        for tx in active {
            handle.watch(tx);
        }

        Ok((service, handle))
    }
}

impl Future for BridgeOrchestrator {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        while let Poll::Ready(Some(message)) = this.command_rx.poll_recv(cx) {
            match message {
                OrchestratorMessage::Watch(tx) => {
                    let inner = this.inner.clone();
                    tokio::spawn(async move {
                        inner.monitor_bridge(*tx).await;
                    });
                }
            }
        }

        Poll::Pending
    }
}
