use alloy::primitives::{Address, ChainId, TxHash, U256, wrap_fixed_bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

wrap_fixed_bytes! {
    /// Id of a bridge transaction.
    ///
    /// Random, assigned when the record is created and stable for its whole
    /// lifetime. This is the id callers poll status with.
    pub struct BridgeId<32>;
}

/// Status of a bridge transaction.
///
/// Transitions are one-directional and driven exclusively by the monitor task
/// owning the bridge; [`Self::Completed`] and [`Self::Failed`] are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    /// Record created, source leg submitted or about to be.
    ///
    /// Next: [`Self::Confirming`] OR [`Self::Failed`]
    Pending,
    /// Source transaction has reached the configured confirmation depth;
    /// waiting out the reorg-defense depth.
    ///
    /// Next: [`Self::Bridging`] OR [`Self::Failed`]
    Confirming,
    /// Source leg final; waiting for the target chain settlement.
    ///
    /// Next: [`Self::Completed`] OR [`Self::Failed`]
    Bridging,
    /// Settlement observed on the target chain.
    ///
    /// Terminal state
    Completed,
    /// The bridge failed at some stage; the error is recorded in metadata.
    ///
    /// Terminal state
    Failed,
}

impl BridgeStatus {
    /// Check if this status can transition to another status.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use BridgeStatus::*;
        matches!(
            (self, next),
            (Pending, Confirming)
                | (Pending, Failed)
                | (Confirming, Bridging)
                | (Confirming, Failed)
                | (Bridging, Completed)
                | (Bridging, Failed)
        )
    }

    /// Whether the status is terminal.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Completion percentage reported to callers.
    pub const fn progress(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirming => 25,
            Self::Bridging => 50,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    /// Human readable description of the current step.
    pub const fn current_step(&self) -> &'static str {
        match self {
            Self::Pending => "Initializing bridge transaction",
            Self::Confirming => "Transaction confirmed on source chain",
            Self::Bridging => "Processing cross-chain transfer",
            Self::Completed => "Bridge completed successfully",
            Self::Failed => "Bridge transaction failed",
        }
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirming => "confirming",
            Self::Bridging => "bridging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Parameters of a bridge request, as accepted by quote and execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeParams {
    /// Address initiating the bridge.
    pub user: Address,
    /// Source chain id.
    pub from_chain: ChainId,
    /// Target chain id.
    pub to_chain: ChainId,
    /// Token being bridged on the source chain. [`Address::ZERO`] means the
    /// native asset.
    pub from_token: Address,
    /// Token received on the target chain.
    pub to_token: Address,
    /// Amount in the token's smallest unit.
    pub amount: U256,
    /// Slippage tolerance in percent. Defaults from configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    /// Recipient on the target chain. Defaults to `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
    /// Explicit gas price for the source leg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
    /// Explicit gas limit for the source leg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
}

impl BridgeParams {
    /// Creates params for bridging `amount` of the native asset.
    pub fn native(user: Address, from_chain: ChainId, to_chain: ChainId, amount: U256) -> Self {
        Self {
            user,
            from_chain,
            to_chain,
            from_token: Address::ZERO,
            to_token: Address::ZERO,
            amount,
            slippage: None,
            recipient: None,
            gas_price: None,
            gas_limit: None,
        }
    }

    /// The target chain recipient, falling back to the initiating user.
    pub fn recipient(&self) -> Address {
        self.recipient.unwrap_or(self.user)
    }
}

/// A non-binding estimate of fee, time and rate for a prospective bridge.
///
/// Produced fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeQuote {
    /// Source chain id.
    pub from_chain: ChainId,
    /// Target chain id.
    pub to_chain: ChainId,
    /// Source token.
    pub from_token: Address,
    /// Target token.
    pub to_token: Address,
    /// Requested amount.
    pub amount: U256,
    /// Bridge fee charged on the source chain.
    pub fee: U256,
    /// Gas estimate for the source leg.
    pub gas_estimate: u64,
    /// Estimated end-to-end completion time.
    #[serde(with = "crate::serde::duration")]
    pub estimated_time: Duration,
    /// Source-to-target exchange rate. 1.0 for same-asset bridges.
    pub exchange_rate: f64,
    /// Amount expected on the target chain after fees.
    pub estimated_output: U256,
    /// Minimum transferable amount.
    pub min_amount: U256,
    /// Maximum transferable amount.
    pub max_amount: U256,
    /// Chains the transfer hops through, source first.
    pub route: Vec<ChainId>,
}

#[cfg(test)]
impl BridgeQuote {
    /// A plain 1:1 quote for the given params.
    pub(crate) fn test_quote(params: &BridgeParams) -> Self {
        let fee = params.amount / U256::from(100);
        Self {
            from_chain: params.from_chain,
            to_chain: params.to_chain,
            from_token: params.from_token,
            to_token: params.to_token,
            amount: params.amount,
            fee,
            gas_estimate: 100_000,
            estimated_time: Duration::from_secs(70),
            exchange_rate: 1.0,
            estimated_output: params.amount - fee,
            min_amount: U256::ZERO,
            max_amount: U256::MAX,
            route: vec![params.from_chain, params.to_chain],
        }
    }
}

/// Cost breakdown for a prospective bridge, including the source-leg gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    /// Bridge fee charged on the source chain.
    pub fee: U256,
    /// Gas units budgeted for the source leg.
    pub gas: u64,
    /// Gas price the estimate was made at, in wei.
    pub gas_price: u128,
    /// Fee plus the source-leg gas cost at that price.
    pub total_cost: U256,
}

/// Free-form bookkeeping attached to a bridge transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMetadata {
    /// Slippage tolerance the bridge was executed with, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    /// Recipient on the target chain, when different from the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
    /// Gas price used for the source leg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
    /// Gas limit used for the source leg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Failure description, set when the bridge ends in
    /// [`BridgeStatus::Failed`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The persisted record of one bridge operation.
///
/// Created at execute time with [`BridgeStatus::Pending`] and mutated only by
/// the monitor task driving its state machine. Records are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransaction {
    /// Unique id.
    pub id: BridgeId,
    /// Owning user.
    pub user: Address,
    /// Source chain id.
    pub from_chain: ChainId,
    /// Target chain id.
    pub to_chain: ChainId,
    /// Source token.
    pub from_token: Address,
    /// Target token.
    pub to_token: Address,
    /// Bridged amount.
    pub amount: U256,
    /// Fee charged on the source chain.
    pub fee: U256,
    /// Current status.
    pub status: BridgeStatus,
    /// Source chain transaction hash. Set no later than the transition into
    /// [`BridgeStatus::Confirming`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tx_hash: Option<TxHash>,
    /// Target chain transaction hash. Set iff the bridge completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tx_hash: Option<TxHash>,
    /// Estimated completion timestamp derived from the quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the bridge completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Bookkeeping.
    #[serde(default)]
    pub metadata: BridgeMetadata,
}

impl BridgeTransaction {
    /// Creates a new pending record for the given request and quote.
    pub fn new(params: &BridgeParams, quote: &BridgeQuote, default_slippage: f64) -> Self {
        let now = Utc::now();
        Self {
            id: BridgeId::random(),
            user: params.user,
            from_chain: params.from_chain,
            to_chain: params.to_chain,
            from_token: params.from_token,
            to_token: params.to_token,
            amount: params.amount,
            fee: quote.fee,
            status: BridgeStatus::Pending,
            source_tx_hash: None,
            target_tx_hash: None,
            estimated_completion: now.checked_add_signed(
                chrono::Duration::from_std(quote.estimated_time).unwrap_or_default(),
            ),
            created_at: now,
            updated_at: now,
            completed_at: None,
            metadata: BridgeMetadata {
                slippage: Some(params.slippage.unwrap_or(default_slippage)),
                recipient: params.recipient,
                gas_price: params.gas_price,
                gas_limit: params.gas_limit,
                error: None,
            },
        }
    }

    /// Completion percentage for this record.
    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    /// Time from creation to completion, for completed bridges.
    pub fn completion_time(&self) -> Option<Duration> {
        self.completed_at.and_then(|done| (done - self.created_at).to_std().ok())
    }
}

#[cfg(test)]
impl BridgeTransaction {
    /// A pending native-asset record between two testnets.
    pub(crate) fn test_transaction() -> Self {
        let params = BridgeParams::native(Address::ZERO, 11155931, 11124, U256::from(1000));
        Self::new(&params, &BridgeQuote::test_quote(&params), 5.0)
    }
}

/// Field updates applied together with a status change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeUpdate {
    /// Sets the source transaction hash.
    pub source_tx_hash: Option<TxHash>,
    /// Sets the target transaction hash.
    pub target_tx_hash: Option<TxHash>,
    /// Sets the completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Sets the failure description in metadata.
    pub error: Option<String>,
}

impl BridgeUpdate {
    /// An update setting only the source transaction hash.
    pub fn source_tx(tx_hash: TxHash) -> Self {
        Self { source_tx_hash: Some(tx_hash), ..Default::default() }
    }

    /// An update completing the bridge with the observed target hash.
    pub fn settled(tx_hash: TxHash) -> Self {
        Self {
            target_tx_hash: Some(tx_hash),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// An update recording a failure description.
    pub fn failure(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Default::default() }
    }
}

/// Evidence that a transfer was paid out on the target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementProof {
    /// Hash of the settlement transaction on the target chain.
    pub tx_hash: TxHash,
    /// Block the settlement landed in.
    pub block_number: u64,
    /// Recipient that was paid out.
    pub recipient: Address,
    /// Amount paid out.
    pub amount: U256,
}

/// Status-change event published to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEvent {
    /// Id of the bridge the event belongs to.
    pub bridge_id: BridgeId,
    /// Status after the change.
    pub status: BridgeStatus,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    /// Human readable description of the current step.
    pub current_step: String,
    /// Source transaction hash, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tx_hash: Option<TxHash>,
    /// Target transaction hash, once settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tx_hash: Option<TxHash>,
    /// Failure description for failed bridges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl BridgeEvent {
    /// Builds the event describing the record's current state.
    pub fn for_transaction(tx: &BridgeTransaction) -> Self {
        Self {
            bridge_id: tx.id,
            status: tx.status,
            progress: tx.status.progress(),
            current_step: tx.status.current_step().to_string(),
            source_tx_hash: tx.source_tx_hash,
            target_tx_hash: tx.target_tx_hash,
            error: tx.metadata.error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Status report returned by a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatusView {
    /// The underlying record.
    pub transaction: BridgeTransaction,
    /// Completion percentage.
    pub progress: u8,
    /// Human readable description of the current step.
    pub current_step: String,
}

impl From<BridgeTransaction> for BridgeStatusView {
    fn from(transaction: BridgeTransaction) -> Self {
        Self {
            progress: transaction.status.progress(),
            current_step: transaction.status.current_step().to_string(),
            transaction,
        }
    }
}

/// Aggregate statistics over all recorded bridges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// All recorded bridges.
    pub total: u64,
    /// Bridges that completed.
    pub successful: u64,
    /// Bridges that failed.
    pub failed: u64,
    /// Total completed volume.
    pub total_volume: U256,
    /// Average creation-to-completion time in seconds, over completed
    /// bridges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_completion_secs: Option<u64>,
}

/// Volume aggregated over one trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeWindow {
    /// Completed volume inside the window.
    pub total_volume: U256,
    /// Completed bridges inside the window.
    pub transaction_count: u64,
    /// Average bridged amount inside the window.
    pub average_size: U256,
}

/// Completed volume over the standard trailing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeVolume {
    /// Trailing 24 hours.
    #[serde(rename = "24h")]
    pub last_24h: VolumeWindow,
    /// Trailing 7 days.
    #[serde(rename = "7d")]
    pub last_7d: VolumeWindow,
    /// Trailing 30 days.
    #[serde(rename = "30d")]
    pub last_30d: VolumeWindow,
}
