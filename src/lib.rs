//! # Trestle
//!
//! Library for the implementation of the Trestle bridge orchestrator.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod serde;
pub mod signers;
pub mod spawn;
pub mod storage;
pub mod types;
