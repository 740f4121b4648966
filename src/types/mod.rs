//! Shared primitive types.
mod bridge;
pub use bridge::*;

mod chain;
pub use chain::*;

mod contracts;
pub use contracts::*;

mod request;
pub use request::*;
