//! Transaction execution end-to-end cases.

use crate::{constants::*, environment::*};
use alloy::primitives::{Address, U256};
use eyre::Result;
use std::time::Duration;
use trestle::{
    constants::{ABSTRACT_TESTNET, RISE_TESTNET},
    types::{ExecutionRequest, Priority},
};

#[tokio::test(flavor = "multi_thread")]
async fn batches_submit_sequentially_in_priority_order() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET).with_submit_delay(Duration::from_millis(5)),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;
    let executor = env.executor(RISE_TESTNET);

    let low = ExecutionRequest::new(Address::with_last_byte(1)).with_priority(Priority::Low);
    let first_medium = ExecutionRequest::new(Address::with_last_byte(2));
    let high = ExecutionRequest::new(Address::with_last_byte(3)).with_priority(Priority::High);
    let second_medium = ExecutionRequest::new(Address::with_last_byte(4));

    let results = executor
        .execute_batch(vec![
            low.clone(),
            first_medium.clone(),
            high.clone(),
            second_medium.clone(),
        ])
        .await;
    assert!(results.iter().all(|result| result.success));

    // High tier first, ties in submission order, and never two in flight.
    let order: Vec<_> =
        env.chain(RISE_TESTNET).submissions().into_iter().map(|request| request.id).collect();
    assert_eq!(order, vec![high.id, first_medium.id, second_medium.id, low.id]);
    assert!(!env.chain(RISE_TESTNET).saw_overlapping_submissions());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_raise_the_price_and_leave_the_original_result() -> Result<()> {
    let env = Environment::setup(vec![
        ScriptedChain::new(RISE_TESTNET).with_confirmation_timeout().with_gas_price(1_000_000_000),
        ScriptedChain::new(ABSTRACT_TESTNET),
    ])
    .await?;
    let executor = env.executor(RISE_TESTNET);

    let request = ExecutionRequest::new(Address::with_last_byte(7)).with_value(U256::from(100));
    let id = request.id;
    let original = executor.execute(request).await;
    assert!(!original.success);

    let retried = executor.retry(id).await?;
    assert_ne!(retried.request_id, id);

    let submissions = env.chain(RISE_TESTNET).submissions();
    assert_eq!(submissions.len(), 2);
    let offered = submissions[0].gas_price.expect("price was resolved before broadcast");
    let bumped = submissions[1].gas_price.expect("retry keeps an explicit price");
    assert!(bumped >= offered * 120 / 100, "retry offered {bumped}, original {offered}");
    assert_eq!(submissions[1].priority, Priority::High);
    assert_eq!(submissions[1].retry_of, Some(id));

    // The original result is untouched by the retry.
    assert_eq!(executor.result(id), Some(original));
    Ok(())
}
