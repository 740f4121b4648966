//! Types for metrics.

use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{net::SocketAddr, sync::Mutex, time::Duration};

/// Metrics for a single [`ChainAdapter`](crate::adapters::ChainAdapter).
#[derive(Metrics)]
#[metrics(scope = "adapter")]
pub struct AdapterMetrics {
    /// Number of submitted transactions.
    pub submitted: Counter,
    /// Number of failed submissions.
    pub submit_failures: Counter,
    /// Number of confirmed transactions.
    pub confirmed: Counter,
    /// Number of confirmation waits that timed out.
    pub confirmation_timeouts: Counter,
    /// Health probe latency, in seconds.
    pub probe_latency: Histogram,
}

impl AdapterMetrics {
    /// Metrics labelled with the chain name.
    pub fn for_chain(name: &str) -> Self {
        Self::new_with_labels(&[("chain", name.to_string())])
    }
}

/// Metrics for a [`TransactionExecutor`](crate::executor::TransactionExecutor).
#[derive(Metrics)]
#[metrics(scope = "executor")]
pub struct ExecutorMetrics {
    /// Number of executed requests.
    pub executed: Counter,
    /// Number of requests that ended in failure.
    pub failed: Counter,
    /// Number of retried requests.
    pub retried: Counter,
    /// Number of requests expired by their deadline.
    pub expired: Counter,
    /// Number of requests currently in flight.
    pub pending: Gauge,
    /// Time from submission to confirmation, in seconds.
    pub confirmation_time: Histogram,
}

impl ExecutorMetrics {
    /// Metrics labelled with the chain name.
    pub fn for_chain(name: &str) -> Self {
        Self::new_with_labels(&[("chain", name.to_string())])
    }
}

/// Metrics for the [`BridgeOrchestrator`](crate::orchestrator::BridgeOrchestrator).
#[derive(Metrics)]
#[metrics(scope = "bridge")]
pub struct BridgeMetrics {
    /// Number of quotes served.
    pub quotes: Counter,
    /// Number of bridges started.
    pub started: Counter,
    /// Number of bridges that completed.
    pub completed: Counter,
    /// Number of bridges that failed.
    pub failed: Counter,
    /// Number of bridges currently in flight.
    pub active: Gauge,
    /// Time from creation to completion, in seconds.
    pub completion_time: Histogram,
}

/// Builds a Prometheus exporter, returning a handle.
///
/// The recorder will perform upkeep every 5 seconds.
///
/// # Panics
///
/// This will panic if the Prometheus recorder could not be set as the global metrics recorder.
pub async fn setup_exporter(metrics_addr: impl Into<SocketAddr>) -> PrometheusHandle {
    static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    let mut lock = HANDLE.lock().unwrap();
    if let Some(handle) = &*lock {
        return handle.clone();
    }

    let addr: SocketAddr = metrics_addr.into();
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .upkeep_timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build metrics recorder");

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).expect("could not set metrics recorder");
    tokio::spawn(exporter);

    tracing::info!(target: "trestle::spawn", %addr, "Started metrics server");

    *lock = Some(handle.clone());

    handle
}
