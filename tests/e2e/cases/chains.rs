//! Chain management end-to-end cases.

use crate::{constants::*, environment::*};
use alloy::sol_types::SolCall;
use eyre::Result;
use trestle::{
    adapters::ChainAdapter,
    constants::{ABSTRACT_TESTNET, RISE_TESTNET, SEPOLIA},
    types::{BridgeParams, BridgeStatus, ITokenBridge, Priority},
};

#[tokio::test(flavor = "multi_thread")]
async fn supported_chains_come_back_in_ascending_id_order() -> Result<()> {
    // Registered out of order on purpose.
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET),
        ScriptedChain::new(ABSTRACT_TESTNET),
        ScriptedChain::new(SEPOLIA),
    ])
    .await?;

    let chains = env.handle.orchestrator.supported_chains();
    let ids: Vec<_> = chains.iter().map(|descriptor| descriptor.chain_id).collect();
    assert_eq!(ids, vec![ABSTRACT_TESTNET, SEPOLIA, RISE_TESTNET]);
    assert!(chains.iter().all(|descriptor| descriptor.bridge_contract().is_some()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_leaves_every_chain_probed_and_healthy() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET),
        ScriptedChain::new(ABSTRACT_TESTNET),
        ScriptedChain::new(SEPOLIA),
    ])
    .await?;

    let snapshot = env.handle.registry.health_snapshot();
    assert_eq!(snapshot.len(), 3);
    for health in snapshot.values() {
        assert!(health.healthy);
        assert!(health.latency_ms.is_some());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_and_resume_call_into_the_bridge_contract() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;

    let paused = env.handle.orchestrator.pause(RISE_TESTNET).await?;
    assert!(paused.success);
    let resumed = env.handle.orchestrator.resume(RISE_TESTNET).await?;
    assert!(resumed.success);

    let contract =
        env.chain(RISE_TESTNET).descriptor().bridge_contract().expect("scripted contract");
    let submissions = env.chain(RISE_TESTNET).submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(
        submissions[0].data.as_deref().map(|data| &data[..]),
        Some(&ITokenBridge::pauseCall {}.abi_encode()[..])
    );
    assert_eq!(
        submissions[1].data.as_deref().map(|data| &data[..]),
        Some(&ITokenBridge::unpauseCall {}.abi_encode()[..])
    );
    for submission in &submissions {
        assert_eq!(submission.to, contract);
        assert_eq!(submission.priority, Priority::High);
    }
    assert!(env.chain(ABSTRACT_TESTNET).submissions().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_keeps_completed_bridges_readable() -> Result<()> {
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
    env.wait_for_final(id).await?;

    env.handle.shutdown().await;
    // Shutting down twice is harmless.
    env.handle.shutdown().await;

    let view = env.handle.orchestrator.status(id).await?;
    assert_eq!(view.transaction.status, BridgeStatus::Completed);
    Ok(())
}
