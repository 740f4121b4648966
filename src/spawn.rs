//! Trestle spawn utilities.
use crate::{
    adapters::EvmChain,
    cli::Args,
    config::TrestleConfig,
    executor::TransactionExecutor,
    metrics,
    notify::BroadcastSink,
    orchestrator::{BridgeOrchestrator, BridgeOrchestratorHandle, LogSettlementWatcher},
    registry::ChainRegistry,
    storage::TrestleStorage,
    types::BridgeEvent,
};
use alloy::primitives::{ChainId, map::HashMap};
use std::{path::Path, sync::Arc};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Context returned once the orchestrator is launched.
#[derive(Debug, Clone)]
pub struct TrestleHandle {
    /// Handle to the bridge orchestration service.
    pub orchestrator: BridgeOrchestratorHandle,
    /// All configured chains.
    pub registry: Arc<ChainRegistry>,
    /// Per-chain transaction executors.
    pub executors: HashMap<ChainId, Arc<TransactionExecutor>>,
    /// Storage backing the orchestrator.
    pub storage: TrestleStorage,
    /// Bridge event fan-out.
    pub events: Arc<BroadcastSink>,
}

impl TrestleHandle {
    /// Subscribes to bridge status events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Stops periodic tasks and shuts every chain down.
    pub async fn shutdown(&self) {
        for executor in self.executors.values() {
            executor.stop_deadline_sweep();
        }
        self.registry.shutdown_all().await;
    }
}

/// Attempts to spawn the orchestrator using CLI arguments and a configuration
/// file.
pub async fn try_spawn_with_args<P: AsRef<Path>>(
    args: Args,
    config_path: P,
) -> eyre::Result<TrestleHandle> {
    let config = if !config_path.as_ref().exists() {
        let config = args.merge_config(TrestleConfig::default());
        config.save_to_file(&config_path)?;
        config
    } else {
        // File exists: load and override with CLI values.
        args.merge_config(TrestleConfig::load_from_file(&config_path)?)
    };

    try_spawn(config).await
}

/// Spawns the orchestrator using the provided [`TrestleConfig`].
pub async fn try_spawn(config: TrestleConfig) -> eyre::Result<TrestleHandle> {
    info!("Using in-memory storage.");
    let storage = TrestleStorage::in_memory();

    if let Some(metrics_addr) = config.metrics_addr {
        metrics::setup_exporter(metrics_addr).await;
    }

    let mut registry = ChainRegistry::new();
    for chain_config in &config.chains {
        registry.register(Arc::new(EvmChain::new(chain_config, &config.health)?));
    }
    let registry = Arc::new(registry);

    // A chain that fails to come up stays registered; its health probes keep
    // trying and quotes against it stay local either way.
    let failures = registry.initialize_all().await;
    if !failures.is_empty() {
        warn!(failed = failures.len(), "some chains failed to initialize");
    }
    registry.start_health_checks(config.health.interval);

    let mut executors = HashMap::default();
    for adapter in registry.adapters() {
        let executor =
            Arc::new(TransactionExecutor::new(adapter.clone(), config.executor.clone()));
        executor.start_deadline_sweep();
        executors.insert(adapter.chain_id(), executor);
    }

    let events = Arc::new(BroadcastSink::default());
    let settlement = Arc::new(LogSettlementWatcher::new(
        registry.clone(),
        config.bridge.settlement_poll_interval,
        config.bridge.settlement_lookback_blocks,
    ));

    let (service, orchestrator) = BridgeOrchestrator::new(
        registry.clone(),
        executors.clone(),
        storage.clone(),
        events.clone(),
        settlement,
        config.bridge.clone(),
    )
    .await?;
    tokio::spawn(service);

    info!(chains = registry.chain_ids().len(), "Started trestle orchestrator");
    Ok(TrestleHandle { orchestrator, registry, executors, storage, events })
}
