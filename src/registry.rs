//! Chain registry.
//!
//! Holds every configured [`ChainAdapter`] and owns the periodic health
//! probes for them. Lookups hand out shared adapters; chains unknown to the
//! registry fail before any network traffic happens.

use crate::{
    adapters::{AdapterError, ChainAdapter},
    error::InvalidParams,
    types::{ChainDescriptor, ChainHealth},
};
use alloy::primitives::{ChainId, map::HashMap};
use futures_util::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Registry of all configured chains.
#[derive(Debug)]
pub struct ChainRegistry {
    adapters: HashMap<ChainId, Arc<dyn ChainAdapter>>,
    by_name: HashMap<String, ChainId>,
    health_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChainRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::default(),
            by_name: HashMap::default(),
            health_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Registers an adapter, replacing any previous adapter for the chain.
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        let chain_id = adapter.chain_id();
        let name = adapter.descriptor().name.clone();
        info!(chain_id, chain = %name, "registered chain");
        self.by_name.insert(name.to_lowercase(), chain_id);
        self.adapters.insert(chain_id, adapter);
    }

    /// Returns the adapter for a chain, if registered.
    pub fn get(&self, chain_id: ChainId) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters.get(&chain_id).cloned()
    }

    /// Returns the adapter for a chain by its case-insensitive name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ChainAdapter>> {
        self.by_name.get(&name.to_lowercase()).and_then(|chain_id| self.get(*chain_id))
    }

    /// Returns the adapter for a chain, failing validation for unknown ones.
    pub fn require(&self, chain_id: ChainId) -> Result<Arc<dyn ChainAdapter>, InvalidParams> {
        self.get(chain_id).ok_or(InvalidParams::UnsupportedChain(chain_id))
    }

    /// Whether a chain is registered.
    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.adapters.contains_key(&chain_id)
    }

    /// Ids of all registered chains, ascending.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<_> = self.adapters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Descriptions of all registered chains, ordered by chain id.
    pub fn descriptors(&self) -> Vec<ChainDescriptor> {
        self.chain_ids()
            .into_iter()
            .filter_map(|chain_id| self.get(chain_id).map(|a| a.descriptor().clone()))
            .collect()
    }

    /// All registered adapters.
    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn ChainAdapter>> {
        self.adapters.values()
    }

    /// Initializes every registered chain.
    ///
    /// One chain failing does not keep the others from coming up; failures
    /// are logged and returned so the caller can decide what is fatal.
    pub async fn initialize_all(&self) -> Vec<(ChainId, AdapterError)> {
        info!(chains = self.adapters.len(), "initializing registered chains");

        let results = join_all(self.adapters.values().map(|adapter| async move {
            (adapter.chain_id(), adapter.init().await)
        }))
        .await;

        let failures: Vec<_> = results
            .into_iter()
            .filter_map(|(chain_id, result)| match result {
                Ok(()) => None,
                Err(err) => {
                    error!(chain_id, %err, "failed to initialize chain");
                    Some((chain_id, err))
                }
            })
            .collect();

        info!(failed = failures.len(), "chain initialization complete");
        failures
    }

    /// Launches one periodic health probe task per registered chain.
    pub fn start_health_checks(&self, interval: std::time::Duration) {
        let mut tasks = self.health_tasks.lock().unwrap();
        for adapter in self.adapters.values() {
            let adapter = adapter.clone();
            tasks.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(interval);
                loop {
                    interval.tick().await;
                    adapter.check_health().await;
                }
            }));
        }
    }

    /// Health snapshots of every registered chain.
    pub fn health_snapshot(&self) -> HashMap<ChainId, ChainHealth> {
        self.adapters
            .iter()
            .map(|(chain_id, adapter)| (*chain_id, adapter.health()))
            .collect()
    }

    /// Stops health probes and shuts every adapter down.
    pub async fn shutdown_all(&self) {
        for task in self.health_tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        join_all(self.adapters.values().map(|adapter| adapter.shutdown())).await;
        info!("all chains shut down");
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
