//! Chain adapters.
//!
//! One [`ChainAdapter`] wraps one chain's RPC endpoint behind a uniform set of
//! balance, gas and transaction primitives. Chain-specific pricing and
//! validation behavior lives in a [`ChainPolicy`] so that a single
//! [`EvmChain`] implementation serves every supported chain.

use crate::types::{ChainDescriptor, ChainFeature, ChainHealth, ExecutionRequest, SettlementProof};
use alloy::{
    primitives::{Address, ChainId, TxHash, U256},
    providers::PendingTransactionError,
    rpc::types::TransactionReceipt,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use std::{fmt, time::Duration};

mod data;
pub use data::DataPolicy;
mod evm;
pub use evm::EvmChain;
mod gaming;
pub use gaming::GamingPolicy;
mod rise;
pub use rise::RisePolicy;
mod standard;
pub use standard::StandardPolicy;
#[cfg(test)]
pub(crate) mod testing;
mod zk;
pub use zk::ZkPolicy;

/// Type alias for `Result<T, AdapterError>`
pub type Result<T> = core::result::Result<T, AdapterError>;

/// Errors returned by a [`ChainAdapter`].
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No signer is configured for the chain.
    #[error("no signer configured for chain {0}")]
    NoSigner(ChainId),
    /// The signer balance cannot cover the transaction.
    #[error(
        "insufficient balance on chain {chain_id}: required {required}, available {available}"
    )]
    InsufficientBalance {
        /// Chain the submission was attempted on.
        chain_id: ChainId,
        /// Value plus worst-case gas cost.
        required: U256,
        /// Signer balance at submission time.
        available: U256,
    },
    /// The transaction did not reach the requested depth within the timeout.
    #[error("timeout waiting for {confirmations} confirmation(s) of {tx_hash} after {timeout:?}")]
    ConfirmationTimeout {
        /// The transaction being watched.
        tx_hash: TxHash,
        /// Requested confirmation depth.
        confirmations: u64,
        /// How long the watcher waited.
        timeout: Duration,
    },
    /// The node confirmed the transaction but did not return a receipt.
    #[error("no receipt found for confirmed transaction {0}")]
    ReceiptNotFound(TxHash),
    /// An error occurred talking to RPC.
    #[error(transparent)]
    Rpc(#[from] alloy::transports::RpcError<TransportErrorKind>),
    /// An error occurred while signing.
    #[error(transparent)]
    Signer(#[from] alloy::signers::Error),
    /// Other errors.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<PendingTransactionError> for AdapterError {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            PendingTransactionError::TransportError(err) => Self::Rpc(err),
            err => Self::Other(Box::new(err)),
        }
    }
}

/// Observed pricing inputs handed to a [`ChainPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkSignal {
    /// Gas price reported by the node, in wei.
    pub base_gas_price: u128,
    /// Fraction of the latest block's gas limit that was used, 0.0 to 1.0.
    ///
    /// Only collected when the policy asks for it, see
    /// [`ChainPolicy::wants_utilization`].
    pub block_utilization: Option<f64>,
}

/// Chain-specific gas pricing and validation.
///
/// Policies are pure: they turn an observed [`NetworkSignal`] into a price
/// and pass judgement on requests, but never talk to the network themselves.
pub trait ChainPolicy: fmt::Debug + Send + Sync {
    /// Adjusted gas price in wei for the observed signal.
    fn gas_price(&self, signal: &NetworkSignal) -> u128;

    /// Price assumed when the node cannot be read.
    fn fallback_gas_price(&self) -> u128;

    /// Whether [`Self::gas_price`] prices off block utilization.
    fn wants_utilization(&self) -> bool {
        false
    }

    /// Largest calldata payload accepted, in bytes.
    fn max_payload_bytes(&self) -> usize {
        crate::constants::DEFAULT_MAX_PAYLOAD_BYTES
    }

    /// Policy judgement on a request, with the rejection reason on refusal.
    fn validate(&self, request: &ExecutionRequest) -> core::result::Result<(), String> {
        let _ = request;
        Ok(())
    }

    /// Feature tags advertised for chains running this policy.
    fn features(&self) -> Vec<ChainFeature>;
}

/// Uniform interface to one chain.
#[async_trait]
pub trait ChainAdapter: fmt::Debug + Send + Sync {
    /// The static description of the chain.
    fn descriptor(&self) -> &ChainDescriptor;

    /// Chain id this adapter serves.
    fn chain_id(&self) -> ChainId {
        self.descriptor().chain_id
    }

    /// Feature tags advertised by the chain.
    fn features(&self) -> Vec<ChainFeature>;

    /// Address of the configured signer, if any.
    fn signer_address(&self) -> Option<Address>;

    /// Estimated time for a transaction to confirm on this chain.
    fn estimated_confirmation(&self) -> Duration;

    /// Bridge fee charged for transfers leaving this chain.
    fn bridge_fee(&self, amount: U256) -> U256;

    /// Last recorded health snapshot.
    fn health(&self) -> ChainHealth;

    /// Verifies connectivity and prepares the adapter for use.
    async fn init(&self) -> Result<()>;

    /// Releases any resources held by the adapter.
    async fn shutdown(&self);

    /// Current block height.
    async fn block_number(&self) -> Result<u64>;

    /// Native balance of an address.
    async fn balance(&self, address: Address) -> Result<U256>;

    /// Chain-adjusted gas price in wei.
    ///
    /// Infallible by contract: pricing must never block a transaction, so on
    /// an RPC error the policy fallback is returned and the error is logged.
    async fn gas_price(&self) -> u128;

    /// Chain-adjusted gas estimate for a request.
    async fn estimate_gas(&self, request: &ExecutionRequest) -> Result<u64>;

    /// Chain-specific request validation.
    ///
    /// Returns `Ok(false)` for policy rejections. Errors are reserved for
    /// adapter-internal faults.
    async fn validate(&self, request: &ExecutionRequest) -> Result<bool>;

    /// Signs and submits a request, returning the transaction hash.
    async fn submit(&self, request: &ExecutionRequest) -> Result<TxHash>;

    /// Waits until a transaction has the given number of confirmations and
    /// returns its receipt.
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TransactionReceipt>;

    /// Scans the chain's bridge contract for a settlement correlated to the
    /// given source transaction.
    async fn find_settlement(
        &self,
        source_tx_hash: TxHash,
        lookback_blocks: u64,
    ) -> Result<Option<SettlementProof>>;

    /// Probes the chain and records a fresh health snapshot.
    async fn check_health(&self) -> ChainHealth;
}
