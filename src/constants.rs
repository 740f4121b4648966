//! Trestle constants.

use alloy::primitives::ChainId;

/// Chain id of the RiseChain testnet.
pub const RISE_TESTNET: ChainId = 11155931;

/// Chain id of the Abstract testnet.
pub const ABSTRACT_TESTNET: ChainId = 11124;

/// Chain id of the 0G Galileo testnet.
pub const ZEROG_TESTNET: ChainId = 16601;

/// Chain id of the Somnia Shannon testnet.
pub const SOMNIA_TESTNET: ChainId = 50312;

/// Chain id of the Sepolia testnet.
pub const SEPOLIA: ChainId = 11155111;

/// The chain acting as the routing hub for pairs without a direct bridge.
pub const BRIDGE_HUB: ChainId = SEPOLIA;

/// Chain pairs with a directly deployed bridge lane.
///
/// Everything else routes through [`BRIDGE_HUB`].
pub const DIRECT_BRIDGE_PAIRS: [(ChainId, ChainId); 3] = [
    (RISE_TESTNET, ABSTRACT_TESTNET),
    (RISE_TESTNET, ZEROG_TESTNET),
    (SOMNIA_TESTNET, ABSTRACT_TESTNET),
];

/// Characteristic confirmation latency of a chain, in seconds.
///
/// The estimated completion time of a bridge is the sum of the values for its
/// source and target chains.
pub const fn estimated_confirmation_secs(chain_id: ChainId) -> u64 {
    match chain_id {
        RISE_TESTNET => 10,
        ABSTRACT_TESTNET => 60,
        ZEROG_TESTNET => 120,
        SOMNIA_TESTNET => 30,
        SEPOLIA => 90,
        _ => DEFAULT_CONFIRMATION_SECS,
    }
}

/// Fallback confirmation latency for chains without a known characteristic
/// latency.
pub const DEFAULT_CONFIRMATION_SECS: u64 = 60;

/// Contract key under which a chain's bridge contract is registered in its
/// descriptor.
pub const BRIDGE_CONTRACT_KEY: &str = "bridge";

/// Gas limit used when quoting the source leg of a bridge.
pub const DEFAULT_BRIDGE_GAS_LIMIT: u64 = 100_000;

/// Maximum number of execution results retained in memory before the oldest
/// half is pruned.
pub const DEFAULT_MAX_RETAINED_RESULTS: usize = 1000;

/// Percentage added to the gas price of a retried transaction.
pub const DEFAULT_GAS_BUMP_PERCENT: u64 = 20;

/// Number of extra confirmations observed on the source chain before the
/// target leg is started, as defense against shallow reorgs.
pub const DEFAULT_REORG_DEPTH: u64 = 3;

/// Default number of entries returned by a bridge history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Calldata ceiling applied by most chain policies, in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 128 * 1024;
