//! Transaction execution.
//!
//! A [`TransactionExecutor`] drives requests through validation, pricing,
//! submission and the confirmation wait on one chain. Failures are classified
//! into the returned [`ExecutionResult`] instead of propagated, so a batch
//! always yields one result per request.

use crate::{
    adapters::{AdapterError, ChainAdapter},
    config::ExecutorConfig,
    metrics::ExecutorMetrics,
    types::{CostEstimate, ExecutionRequest, ExecutionResult, ExecutorStats, Priority, RequestId},
};
use alloy::primitives::{TxHash, U256};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::{
    cmp::Reverse,
    sync::{Arc, Mutex},
    time::Instant,
};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Failure description recorded when a request outlives its deadline.
const DEADLINE_EXCEEDED: &str = "transaction deadline exceeded";

/// Failure description recorded when chain validation refuses a request.
const VALIDATION_REJECTED: &str = "transaction rejected by chain validation";

/// Errors returned by [`TransactionExecutor`] bookkeeping operations.
///
/// Execution itself never errors, see [`TransactionExecutor::execute`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The request id is not tracked by this executor.
    #[error("unknown request {0}")]
    UnknownRequest(RequestId),
    /// Only failed or still-pending requests can be retried.
    #[error("request {0} already succeeded and cannot be retried")]
    AlreadySucceeded(RequestId),
    /// The chain refused the request during validation.
    #[error("{}", VALIDATION_REJECTED)]
    ValidationRejected,
    /// An adapter fault during estimation.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Submits transactions through one chain adapter and tracks their outcomes.
///
/// Submissions through the same signer are serialized by the adapter's nonce
/// lock; [`Self::execute_batch`] is additionally strictly sequential so a
/// batch can never interleave with itself.
#[derive(Debug)]
pub struct TransactionExecutor {
    adapter: Arc<dyn ChainAdapter>,
    config: ExecutorConfig,
    /// Requests accepted and not yet completed.
    pending: DashMap<RequestId, ExecutionRequest>,
    /// Every tracked request with its resolved gas price, for retries.
    requests: DashMap<RequestId, ExecutionRequest>,
    /// Completed results, bounded by [`ExecutorConfig::max_retained_results`].
    results: DashMap<RequestId, ExecutionResult>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
    metrics: ExecutorMetrics,
}

impl TransactionExecutor {
    /// Creates an executor over the given adapter.
    pub fn new(adapter: Arc<dyn ChainAdapter>, config: ExecutorConfig) -> Self {
        let metrics = ExecutorMetrics::for_chain(&adapter.descriptor().name);
        Self {
            adapter,
            config,
            pending: DashMap::new(),
            requests: DashMap::new(),
            results: DashMap::new(),
            sweep_task: Mutex::new(None),
            metrics,
        }
    }

    /// The adapter this executor submits through.
    pub fn adapter(&self) -> &Arc<dyn ChainAdapter> {
        &self.adapter
    }

    /// Launches the periodic task expiring requests whose deadline passed,
    /// replacing an already running sweep.
    pub fn start_deadline_sweep(self: &Arc<Self>) {
        let executor = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(executor.config.deadline_check_interval);
            loop {
                ticker.tick().await;
                executor.expire_deadlines();
            }
        });
        if let Some(previous) = self.sweep_task.lock().unwrap().replace(task) {
            previous.abort();
        }
    }

    /// Stops the periodic deadline sweep.
    pub fn stop_deadline_sweep(&self) {
        if let Some(task) = self.sweep_task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Runs a request to completion.
    ///
    /// Never returns an error: validation rejections, submission faults,
    /// confirmation timeouts and reverts all classify into a failure
    /// [`ExecutionResult`] with a readable error string.
    #[instrument(skip_all, fields(chain_id = self.adapter.chain_id(), request_id = %request.id))]
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let id = request.id;
        self.pending.insert(id, request.clone());
        self.requests.insert(id, request.clone());
        self.metrics.pending.increment(1.0);

        let result = self.run(request).await;

        if self.pending.remove(&id).is_some() {
            self.metrics.pending.decrement(1.0);
        }
        if result.success {
            self.metrics.executed.increment(1);
        } else {
            info!(error = result.error.as_deref(), "request failed");
            self.metrics.failed.increment(1);
        }
        self.results.insert(id, result.clone());
        self.prune_results();
        result
    }

    async fn run(&self, mut request: ExecutionRequest) -> ExecutionResult {
        let id = request.id;

        if let Some(deadline) = request.deadline
            && deadline <= Utc::now()
        {
            return ExecutionResult::failure(id, DEADLINE_EXCEEDED);
        }

        match self.adapter.validate(&request).await {
            Ok(true) => {}
            Ok(false) => return ExecutionResult::failure(id, VALIDATION_REJECTED),
            Err(err) => return ExecutionResult::failure(id, err.to_string()),
        }

        if request.gas_price.is_none() {
            request.gas_price = Some(self.adapter.gas_price().await);
            // Keep the resolved price so a retry bumps what was actually
            // offered, not a fresh quote.
            self.requests.insert(id, request.clone());
        }

        let submitted = Instant::now();
        let tx_hash = match self.adapter.submit(&request).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                if matches!(
                    err,
                    AdapterError::NoSigner(_) | AdapterError::InsufficientBalance { .. }
                ) {
                    error!(%err, "submission refused by operator setup");
                }
                return ExecutionResult::failure(id, err.to_string());
            }
        };

        let receipt = match self
            .adapter
            .wait_for_confirmation(
                tx_hash,
                self.config.confirmations,
                self.config.confirmation_timeout,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => return ExecutionResult::failure_with_hash(id, tx_hash, err.to_string()),
        };
        self.metrics.confirmation_time.record(submitted.elapsed().as_secs_f64());

        let success = receipt.status();
        ExecutionResult {
            request_id: id,
            success,
            tx_hash: Some(tx_hash),
            gas_used: Some(receipt.gas_used),
            effective_gas_price: Some(receipt.effective_gas_price),
            confirmations: self.config.confirmations,
            error: (!success).then(|| "transaction reverted on chain".to_string()),
            completed_at: Utc::now(),
        }
    }

    /// Executes a batch ordered by priority tier, high first.
    ///
    /// The sort is stable, so same-tier requests keep their submission order,
    /// and execution is strictly sequential to keep one batch from racing
    /// itself on the signer nonce.
    pub async fn execute_batch(&self, mut requests: Vec<ExecutionRequest>) -> Vec<ExecutionResult> {
        requests.sort_by_key(|request| Reverse(request.priority));
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.execute(request).await);
        }
        results
    }

    /// Validates, prices and broadcasts a request without waiting for any
    /// confirmation.
    ///
    /// For submissions whose confirmation is tracked elsewhere. The request
    /// is recorded with its resolved price so it stays retryable, but no
    /// [`ExecutionResult`] is produced for it.
    pub async fn submit(&self, mut request: ExecutionRequest) -> Result<TxHash, ExecutorError> {
        if !self.adapter.validate(&request).await? {
            return Err(ExecutorError::ValidationRejected);
        }
        if request.gas_price.is_none() {
            request.gas_price = Some(self.adapter.gas_price().await);
        }
        self.requests.insert(request.id, request.clone());
        Ok(self.adapter.submit(&request).await?)
    }

    /// Estimates what a request would cost without submitting it.
    pub async fn estimate_cost(
        &self,
        request: &ExecutionRequest,
    ) -> Result<CostEstimate, ExecutorError> {
        let gas = match request.gas_limit {
            Some(limit) => limit,
            None => self.adapter.estimate_gas(request).await?,
        };
        let gas_price = match request.gas_price {
            Some(price) => price,
            None => self.adapter.gas_price().await,
        };
        Ok(CostEstimate {
            gas,
            gas_price,
            total_cost: request.value + U256::from(gas) * U256::from(gas_price),
        })
    }

    /// Re-submits a previously failed or still-pending request under a fresh
    /// id, with the gas price raised by the configured bump and priority
    /// forced to high.
    ///
    /// The original request's result is left untouched.
    pub async fn retry(&self, request_id: RequestId) -> Result<ExecutionResult, ExecutorError> {
        let original = self
            .requests
            .get(&request_id)
            .map(|entry| entry.clone())
            .ok_or(ExecutorError::UnknownRequest(request_id))?;
        if let Some(result) = self.results.get(&request_id)
            && result.success
        {
            return Err(ExecutorError::AlreadySucceeded(request_id));
        }

        let gas_price = match original.gas_price {
            Some(price) => price,
            None => self.adapter.gas_price().await,
        };
        let bumped = gas_price * (100 + self.config.gas_bump_percent as u128) / 100;

        let retry = ExecutionRequest {
            id: RequestId::random(),
            gas_price: Some(bumped),
            priority: Priority::High,
            retry_of: Some(request_id),
            ..original
        };
        info!(
            chain_id = self.adapter.chain_id(),
            original = %request_id,
            retry = %retry.id,
            gas_price = bumped,
            "retrying request with bumped gas price"
        );
        self.metrics.retried.increment(1);
        Ok(self.execute(retry).await)
    }

    /// Fails every tracked in-flight request whose deadline has passed and
    /// returns their ids.
    ///
    /// The underlying task is not cancelled; when it finishes on its own its
    /// classification replaces the expired placeholder result.
    pub fn expire_deadlines(&self) -> Vec<RequestId> {
        let now = Utc::now();
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|entry| entry.deadline.is_some_and(|deadline| deadline <= now))
            .map(|entry| *entry.key())
            .collect();

        for id in &expired {
            if self.pending.remove(id).is_some() {
                self.metrics.pending.decrement(1.0);
                self.metrics.expired.increment(1);
                self.results.insert(*id, ExecutionResult::failure(*id, DEADLINE_EXCEEDED));
                warn!(
                    chain_id = self.adapter.chain_id(),
                    request_id = %id,
                    "request expired past its deadline"
                );
            }
        }
        expired
    }

    /// The retained result of a request, if any.
    pub fn result(&self, request_id: RequestId) -> Option<ExecutionResult> {
        self.results.get(&request_id).map(|entry| entry.clone())
    }

    /// Counters over the executor's bookkeeping maps.
    pub fn stats(&self) -> ExecutorStats {
        let completed = self.results.len();
        let successful = self.results.iter().filter(|entry| entry.success).count();
        ExecutorStats {
            pending: self.pending.len(),
            completed,
            successful,
            failed: completed - successful,
        }
    }

    /// Prunes retained results down to half the cap, oldest first, once the
    /// cap is exceeded. Pruned requests lose retryability.
    fn prune_results(&self) {
        if self.results.len() <= self.config.max_retained_results {
            return;
        }

        let mut completed: Vec<(RequestId, DateTime<Utc>)> =
            self.results.iter().map(|entry| (*entry.key(), entry.completed_at)).collect();
        completed.sort_by_key(|(_, completed_at)| *completed_at);

        let keep = self.config.max_retained_results / 2;
        let drop = completed.len().saturating_sub(keep);
        for (id, _) in completed.into_iter().take(drop) {
            self.results.remove(&id);
            self.requests.remove(&id);
        }
    }
}
