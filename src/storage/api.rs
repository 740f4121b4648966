//! Trestle storage api.

use super::StorageError;
use crate::types::{BridgeId, BridgeStatus, BridgeTransaction, BridgeUpdate};
use alloy::primitives::Address;
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for `Result<T, StorageError>`
pub type Result<T> = core::result::Result<T, StorageError>;

/// Storage API.
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Writes a freshly created bridge record.
    async fn create_bridge(&self, tx: &BridgeTransaction) -> Result<()>;

    /// Reads a bridge record by id.
    async fn bridge_by_id(&self, id: BridgeId) -> Result<Option<BridgeTransaction>>;

    /// Reads the most recent bridge records for a user, newest first.
    async fn bridges_by_user(&self, user: Address, limit: usize)
    -> Result<Vec<BridgeTransaction>>;

    /// Moves a bridge to `status` and applies the accompanying field updates.
    ///
    /// Also advances `updated_at`. Returns the record after the update.
    async fn update_bridge_status(
        &self,
        id: BridgeId,
        status: BridgeStatus,
        update: BridgeUpdate,
    ) -> Result<BridgeTransaction>;

    /// Reads all bridges that have not reached a terminal status.
    async fn active_bridges(&self) -> Result<Vec<BridgeTransaction>>;

    /// Reads all bridge records.
    async fn bridges(&self) -> Result<Vec<BridgeTransaction>>;
}
