//! Bridge lifecycle end-to-end cases.

use crate::{constants::*, environment::*};
use alloy::primitives::{U256, keccak256, map::HashMap};
use eyre::Result;
use std::time::Duration;
use tokio::time::timeout;
use trestle::{
    constants::{ABSTRACT_TESTNET, RISE_TESTNET, SEPOLIA, SOMNIA_TESTNET, ZEROG_TESTNET},
    types::{BridgeId, BridgeParams, BridgeStatus},
};

#[tokio::test(flavor = "multi_thread")]
async fn a_native_bridge_completes_with_both_hashes() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;

    let id = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, RISE_TESTNET, ABSTRACT_TESTNET, BRIDGED_AMOUNT))
        .await?;
    let view = env.wait_for_final(id).await?;

    assert_eq!(view.transaction.status, BridgeStatus::Completed);
    assert_eq!(view.progress, 100);
    assert_eq!(view.current_step, "Bridge completed successfully");
    let source_tx = view.transaction.source_tx_hash.expect("source leg was broadcast");
    assert_eq!(view.transaction.target_tx_hash, Some(keccak256(source_tx)));
    assert!(view.transaction.completed_at.is_some());

    // Exactly one history entry, carrying the bridged amount.
    let history = env.handle.orchestrator.history(USER, None).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
    assert_eq!(history[0].amount, BRIDGED_AMOUNT);
    assert_eq!(history[0].status, BridgeStatus::Completed);

    // The source leg carried amount plus fee as value.
    let fee = BRIDGED_AMOUNT * U256::from(30) / U256::from(10_000);
    let submissions = env.chain(RISE_TESTNET).submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].value, BRIDGED_AMOUNT + fee);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribers_observe_the_full_status_walk() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;
    let mut events = env.handle.subscribe();

    let id = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, RISE_TESTNET, ABSTRACT_TESTNET, BRIDGED_AMOUNT))
        .await?;

    let mut walk = Vec::new();
    while walk.last().is_none_or(|status: &BridgeStatus| !status.is_final()) {
        let event = timeout(Duration::from_secs(10), events.recv()).await??;
        assert_eq!(event.bridge_id, id);
        assert_eq!(event.progress, event.status.progress());
        walk.push(event.status);
    }
    assert_eq!(
        walk,
        vec![
            BridgeStatus::Pending,
            BridgeStatus::Confirming,
            BridgeStatus::Bridging,
            BridgeStatus::Completed
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn a_source_confirmation_timeout_fails_the_bridge() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET).with_confirmation_timeout(),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;

    let id = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, RISE_TESTNET, ABSTRACT_TESTNET, BRIDGED_AMOUNT))
        .await?;
    let view = env.wait_for_final(id).await?;

    assert_eq!(view.transaction.status, BridgeStatus::Failed);
    assert_eq!(view.progress, 0);
    assert_eq!(view.current_step, "Bridge transaction failed");
    let error = view.transaction.metadata.error.expect("failure is recorded");
    assert!(error.to_lowercase().contains("timeout"), "unexpected failure: {error}");
    assert!(view.transaction.target_tx_hash.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn an_unobserved_settlement_fails_after_the_relay_deadline() -> Result<()> {
    // The target chain never reports a payout, so the settlement wait runs
    // into its deadline.
    let mut bridge = fast_bridge_config();
    bridge.relay_grace = Duration::from_secs(1);
    let env = Environment::setup_with(
        vec![
            ScriptedChain::new(RISE_TESTNET),
            ScriptedChain::new(ABSTRACT_TESTNET).without_settlement(),
        ],
        bridge,
    )
    .await?;

    let id = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, RISE_TESTNET, ABSTRACT_TESTNET, BRIDGED_AMOUNT))
        .await?;
    let view = env.wait_for_final(id).await?;

    assert_eq!(view.transaction.status, BridgeStatus::Failed);
    let error = view.transaction.metadata.error.expect("failure is recorded");
    assert!(error.to_lowercase().contains("timeout"), "unexpected failure: {error}");
    // The source leg landed, the target leg never did.
    assert!(view.transaction.source_tx_hash.is_some());
    assert!(view.transaction.target_tx_hash.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_bridges_complete_independently() -> Result<()> {
    // The slow lane confirms an order of magnitude slower than the fast one.
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET).with_confirmation_delay(Duration::from_millis(30)),
        ScriptedChain::new(ABSTRACT_TESTNET),
        ScriptedChain::new(ZEROG_TESTNET).with_confirmation_delay(Duration::from_millis(300)),
        ScriptedChain::new(SOMNIA_TESTNET),
    ])
    .await?;

    let fast = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, RISE_TESTNET, ABSTRACT_TESTNET, BRIDGED_AMOUNT))
        .await?;
    let slow = env
        .handle
        .orchestrator
        .execute(BridgeParams::native(USER, ZEROG_TESTNET, SOMNIA_TESTNET, BRIDGED_AMOUNT))
        .await?;

    // The fast bridge finishes while the slow one is still in flight.
    let fast_view = env.wait_for_final(fast).await?;
    assert_eq!(fast_view.transaction.status, BridgeStatus::Completed);
    let slow_view = env.handle.orchestrator.status(slow).await?;
    assert!(!slow_view.transaction.status.is_final());

    let slow_view = env.wait_for_final(slow).await?;
    assert_eq!(slow_view.transaction.status, BridgeStatus::Completed);
    assert!(slow_view.transaction.completed_at >= fast_view.transaction.completed_at);

    // Each lane saw exactly its own submission.
    assert_eq!(env.chain(RISE_TESTNET).submissions().len(), 1);
    assert_eq!(env.chain(ZEROG_TESTNET).submissions().len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn status_walks_stay_legal_under_mixed_latencies_and_failures() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET).with_confirmation_delay(Duration::from_millis(5)),
        ScriptedChain::new(ABSTRACT_TESTNET).with_confirmation_delay(Duration::from_millis(40)),
        ScriptedChain::new(SEPOLIA).with_confirmation_delay(Duration::from_millis(15)),
        ScriptedChain::new(ZEROG_TESTNET).with_confirmation_timeout(),
        ScriptedChain::new(SOMNIA_TESTNET).with_reverted_receipt(),
    ])
    .await?;
    let mut events = env.handle.subscribe();

    let lanes = [
        (RISE_TESTNET, ABSTRACT_TESTNET),
        (ABSTRACT_TESTNET, RISE_TESTNET),
        (ZEROG_TESTNET, ABSTRACT_TESTNET),
        (SOMNIA_TESTNET, RISE_TESTNET),
        (RISE_TESTNET, SEPOLIA),
        (SEPOLIA, ABSTRACT_TESTNET),
    ];
    let mut ids = Vec::new();
    for (n, (from, to)) in lanes.into_iter().enumerate() {
        let amount = U256::from((n as u64 + 1) * 1_000_000);
        let params = BridgeParams::native(USER, from, to, amount);
        ids.push(env.handle.orchestrator.execute(params).await?);
    }

    // Collect every event until all bridges have reported a terminal status.
    let mut walks: HashMap<BridgeId, Vec<BridgeStatus>> = HashMap::default();
    let mut terminal = 0;
    while terminal < ids.len() {
        let event = timeout(Duration::from_secs(10), events.recv()).await??;
        if event.status.is_final() {
            terminal += 1;
        }
        walks.entry(event.bridge_id).or_default().push(event.status);
    }

    for id in &ids {
        let walk = &walks[id];
        assert_eq!(walk[0], BridgeStatus::Pending, "walk of {id} starts wrong: {walk:?}");
        for pair in walk.windows(2) {
            assert!(
                pair[0].can_transition_to(&pair[1]),
                "illegal transition {:?} -> {:?} for {id}",
                pair[0],
                pair[1]
            );
        }
        assert!(walk.last().unwrap().is_final(), "walk of {id} never terminated: {walk:?}");

        // The stored record agrees with the last published event.
        let view = env.handle.orchestrator.status(*id).await?;
        assert_eq!(view.transaction.status, *walk.last().unwrap());
    }

    // Healthy lanes walked the whole way; the broken source chains failed.
    for id in [ids[0], ids[1], ids[4], ids[5]] {
        assert_eq!(walks[&id].last(), Some(&BridgeStatus::Completed));
    }
    for id in [ids[2], ids[3]] {
        assert_eq!(walks[&id].last(), Some(&BridgeStatus::Failed));
    }
    Ok(())
}
