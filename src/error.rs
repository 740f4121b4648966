//! Top level error types.

use crate::{
    adapters::AdapterError,
    executor::ExecutorError,
    orchestrator::{BridgeError, SettlementError},
    storage::StorageError,
};
use alloy::primitives::{ChainId, U256};
use thiserror::Error;

/// Request validation failures.
///
/// These are raised before any network traffic happens and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidParams {
    /// The requested amount is zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,
    /// Source and target chain are the same.
    #[error("source and target chain must differ")]
    SameChain,
    /// The chain is not supported.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// The amount is below the configured minimum.
    #[error("amount {amount} below minimum {minimum}")]
    BelowMinimum {
        /// Requested amount.
        amount: U256,
        /// Smallest accepted amount.
        minimum: U256,
    },
    /// The amount is above the configured maximum.
    #[error("amount {amount} above maximum {maximum}")]
    AboveMaximum {
        /// Requested amount.
        amount: U256,
        /// Largest accepted amount.
        maximum: U256,
    },
}

/// The overarching error type.
#[derive(Debug, Error)]
pub enum TrestleError {
    /// The request failed validation.
    #[error(transparent)]
    InvalidParams(#[from] InvalidParams),
    /// Errors raised by a chain adapter.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Errors raised by the transaction executor.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// Errors raised while driving a bridge.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// Errors raised while watching for settlement.
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    /// Errors related to storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An internal error occurred.
    #[error(transparent)]
    Internal(#[from] eyre::Error),
}
