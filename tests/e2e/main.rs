//! Trestle end-to-end tests.
//!
//! Every case wires the full orchestration stack, registry, executors,
//! storage, events and the settlement watcher, over scripted chain adapters.
//! Nothing here talks to a real endpoint.
#![allow(unused)]

mod environment;

pub use constants::*;
use environment::*;
