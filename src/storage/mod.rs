//! Trestle storage

mod api;
pub use api::StorageApi;
mod error;
pub use error::StorageError;
mod memory;
pub use memory::InMemoryStorage;

use crate::types::{BridgeId, BridgeStatus, BridgeTransaction, BridgeUpdate};
use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;

/// Trestle storage interface.
#[derive(Debug, Clone)]
pub struct TrestleStorage {
    inner: Arc<dyn StorageApi>,
}

impl TrestleStorage {
    /// Create [`TrestleStorage`] with the given backend.
    pub fn new(inner: Arc<dyn StorageApi>) -> Self {
        Self { inner }
    }

    /// Create [`TrestleStorage`] with an in-memory backend.
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(InMemoryStorage::default()) }
    }
}

#[async_trait]
impl StorageApi for TrestleStorage {
    async fn create_bridge(&self, tx: &BridgeTransaction) -> api::Result<()> {
        self.inner.create_bridge(tx).await
    }

    async fn bridge_by_id(&self, id: BridgeId) -> api::Result<Option<BridgeTransaction>> {
        self.inner.bridge_by_id(id).await
    }

    async fn bridges_by_user(
        &self,
        user: Address,
        limit: usize,
    ) -> api::Result<Vec<BridgeTransaction>> {
        self.inner.bridges_by_user(user, limit).await
    }

    async fn update_bridge_status(
        &self,
        id: BridgeId,
        status: BridgeStatus,
        update: BridgeUpdate,
    ) -> api::Result<BridgeTransaction> {
        self.inner.update_bridge_status(id, status, update).await
    }

    async fn active_bridges(&self) -> api::Result<Vec<BridgeTransaction>> {
        self.inner.active_bridges().await
    }

    async fn bridges(&self) -> api::Result<Vec<BridgeTransaction>> {
        self.inner.bridges().await
    }
}
