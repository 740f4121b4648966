use alloy::primitives::{Address, Bytes, TxHash, U256, wrap_fixed_bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wrap_fixed_bytes! {
    /// Idempotency id of an execution request.
    ///
    /// Supplied by the caller (or generated) when a request enters the
    /// executor; retries get a fresh id and keep a link to the original.
    pub struct RequestId<32>;
}

/// Priority tier of an execution request.
///
/// Batches are executed highest tier first; retries are always resubmitted at
/// [`Priority::High`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Not time sensitive.
    Low,
    /// Default tier.
    #[default]
    Medium,
    /// Front of the batch queue.
    High,
}

/// A transaction to be submitted through a chain adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Idempotency id.
    pub id: RequestId,
    /// Destination address.
    pub to: Address,
    /// Native value to attach.
    pub value: U256,
    /// Calldata, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    /// Explicit gas limit override. Estimated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Explicit gas price override in wei. Resolved through the adapter's
    /// optimized price when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
    /// Priority tier.
    #[serde(default)]
    pub priority: Priority,
    /// Deadline after which the request should not be submitted anymore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// The request this one retries, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<RequestId>,
}

impl ExecutionRequest {
    /// Creates a request to `to` with a fresh id and default settings.
    pub fn new(to: Address) -> Self {
        Self {
            id: RequestId::random(),
            to,
            value: U256::ZERO,
            data: None,
            gas_limit: None,
            gas_price: None,
            priority: Priority::default(),
            deadline: None,
            retry_of: None,
        }
    }

    /// Sets the native value.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the calldata.
    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets an explicit gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Sets an explicit gas price.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Sets the priority tier.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the submission deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Classified outcome of an execution request.
///
/// The executor returns these instead of propagating errors so batch callers
/// always get one result per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Id of the request this result belongs to.
    pub request_id: RequestId,
    /// Whether the transaction was mined with a success status.
    pub success: bool,
    /// Hash of the submitted transaction, when submission got that far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Gas consumed, from the receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Effective gas price paid, from the receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_gas_price: Option<u128>,
    /// Confirmations observed before the result was produced.
    pub confirmations: u64,
    /// Human readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the result was produced.
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// A failure result with the given description.
    pub fn failure(request_id: RequestId, error: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            tx_hash: None,
            gas_used: None,
            effective_gas_price: None,
            confirmations: 0,
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }

    /// A failure result that still carries the submitted transaction hash.
    pub fn failure_with_hash(
        request_id: RequestId,
        tx_hash: TxHash,
        error: impl Into<String>,
    ) -> Self {
        Self { tx_hash: Some(tx_hash), ..Self::failure(request_id, error) }
    }
}

/// A cost estimate for an execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Estimated gas units.
    pub gas: u64,
    /// Gas price the estimate was computed with, in wei.
    pub gas_price: u128,
    /// Total cost in native units: gas times price, plus the attached value.
    pub total_cost: U256,
}

/// Counters over the executor's bookkeeping maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Requests currently in flight.
    pub pending: usize,
    /// Results retained in memory.
    pub completed: usize,
    /// Retained results that succeeded.
    pub successful: usize,
    /// Retained results that failed.
    pub failed: usize,
}
