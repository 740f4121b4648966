//! # Trestle CLI
use crate::{config::TrestleConfig, spawn::try_spawn_with_args};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// The Trestle service routes token bridges across chains.
#[derive(Debug, Parser)]
#[command(author, about = "Trestle", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working directory under
    /// `trestle.yaml`.
    #[arg(long, value_name = "CONFIG", env = "TRESTLE_CONFIG", default_value = "trestle.yaml")]
    pub config: PathBuf,
    /// The address to serve Prometheus metrics on.
    #[arg(long = "metrics-addr", value_name = "ADDR", env = "TRESTLE_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Args {
    /// Run the bridge service until interrupted.
    pub async fn run(self) -> eyre::Result<()> {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .init();

        let config_path = self.config.clone();
        let handle = try_spawn_with_args(self, &config_path).await?;

        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        handle.shutdown().await;

        Ok(())
    }

    /// Merges [`Args`] values into an existing [`TrestleConfig`] instance.
    pub fn merge_config(self, config: TrestleConfig) -> TrestleConfig {
        let metrics_addr = self.metrics_addr.or(config.metrics_addr);
        config.with_metrics_addr(metrics_addr)
    }
}
