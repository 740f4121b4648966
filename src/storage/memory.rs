//! Trestle storage implementation in-memory.

use super::{StorageApi, api::Result};
use crate::{
    storage::StorageError,
    types::{BridgeId, BridgeStatus, BridgeTransaction, BridgeUpdate},
};
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, Entry};

/// [`StorageApi`] implementation in-memory.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    bridges: DashMap<BridgeId, BridgeTransaction>,
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn create_bridge(&self, tx: &BridgeTransaction) -> Result<()> {
        match self.bridges.entry(tx.id) {
            Entry::Occupied(_) => Err(StorageError::Duplicate(tx.id)),
            Entry::Vacant(entry) => {
                entry.insert(tx.clone());
                Ok(())
            }
        }
    }

    async fn bridge_by_id(&self, id: BridgeId) -> Result<Option<BridgeTransaction>> {
        Ok(self.bridges.get(&id).map(|tx| tx.clone()))
    }

    async fn bridges_by_user(
        &self,
        user: Address,
        limit: usize,
    ) -> Result<Vec<BridgeTransaction>> {
        let mut txs: Vec<_> = self
            .bridges
            .iter()
            .filter(|tx| tx.user == user)
            .map(|tx| tx.clone())
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        txs.truncate(limit);
        Ok(txs)
    }

    async fn update_bridge_status(
        &self,
        id: BridgeId,
        status: BridgeStatus,
        update: BridgeUpdate,
    ) -> Result<BridgeTransaction> {
        let mut tx = self.bridges.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        tx.status = status;
        tx.updated_at = Utc::now();
        if let Some(hash) = update.source_tx_hash {
            tx.source_tx_hash = Some(hash);
        }
        if let Some(hash) = update.target_tx_hash {
            tx.target_tx_hash = Some(hash);
        }
        if let Some(at) = update.completed_at {
            tx.completed_at = Some(at);
        }
        if let Some(error) = update.error {
            tx.metadata.error = Some(error);
        }
        Ok(tx.clone())
    }

    async fn active_bridges(&self) -> Result<Vec<BridgeTransaction>> {
        Ok(self
            .bridges
            .iter()
            .filter(|tx| !tx.status.is_final())
            .map(|tx| tx.clone())
            .collect())
    }

    async fn bridges(&self) -> Result<Vec<BridgeTransaction>> {
        Ok(self.bridges.iter().map(|tx| tx.clone()).collect())
    }
}
