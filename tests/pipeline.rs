mod common;

use common::*;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use raydium_pool_sniper::config::Config;
use raydium_pool_sniper::models::PoolCreationEvent;
use raydium_pool_sniper::strategy::{Dispatch, Orchestrator, RiskFilter};

fn event(mint: Pubkey) -> PoolCreationEvent {
    PoolCreationEvent::new(
        mint,
        vec![format!("Program log: initialize2: InitializeInstruction2 {{ mint: {} }}", mint)],
        "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXFSDwt8GFXM7W5Ncn16wmqokgpiKRLuS83KUxyZyv2sUYv".to_string(),
    )
}

fn orchestrator(
    config: Config,
    mints: StaticMints,
    h: &Harness,
    shutdown: watch::Receiver<bool>,
) -> Orchestrator<StaticMints> {
    let config = Arc::new(config);
    let risk = RiskFilter::new(mints, config.liquidity_threshold);
    Orchestrator::new(config, risk, h.services(), shutdown)
}

#[tokio::test(start_paused = true)]
async fn test_candidates_are_screened_deduplicated_and_traded() {
    let good = Pubkey::new_unique();
    let rug = Pubkey::new_unique();
    let mints = StaticMints::default().with(good, safe_mint()).with(rug, rug_mint());

    let h = Harness::new(
        ScriptedQuoter::new(&test_config(), vec![Some(200)], vec![Some(130)]),
        ScriptedExecutor::default(),
        ScriptedPrices::new(vec![0.65]),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = orchestrator(test_config(), mints, &h, shutdown_rx);

    let (tx, rx) = mpsc::channel(16);
    tx.send(event(good)).await.unwrap();
    tx.send(event(good)).await.unwrap();
    tx.send(event(rug)).await.unwrap();
    drop(tx);

    let report = orchestrator.run(rx).await;
    assert_eq!(report.candidates, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.closed, 1);
    assert_eq!(report.abandoned, 0);

    // The rug was never quoted
    assert!(h.quoter.calls().iter().all(|(input, output, _)| *input != rug && *output != rug));
    let closed = h.sink.closed();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].token_mint, good);
    assert_eq!(closed[0].profit, 30);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_leaves_open_positions_untouched() {
    let mint = Pubkey::new_unique();
    let h = Harness::new(
        ScriptedQuoter::new(&test_config(), vec![Some(200)], vec![]),
        ScriptedExecutor::default(),
        ScriptedPrices::default(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = orchestrator(
        test_config(),
        StaticMints::default().with(mint, safe_mint()),
        &h,
        shutdown_rx,
    );

    let registry = orchestrator.registry();

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(orchestrator.run(rx));
    tx.send(event(mint)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(registry.snapshot(), vec![mint]);

    shutdown_tx.send(true).unwrap();
    let report = handle.await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.interrupted, 1);
    assert_eq!(report.closed, 0);
    assert_eq!(h.executor.executed().len(), 1);
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn test_dispatch_respects_capacity_and_quote_mint() {
    let config = Config {
        max_concurrent_positions: 1,
        ..test_config()
    };
    let quote_mint = config.quote_mint;
    let (first, second) = (Pubkey::new_unique(), Pubkey::new_unique());
    let mints = StaticMints::default().with(first, safe_mint()).with(second, safe_mint());

    let h = Harness::new(
        ScriptedQuoter::new(&test_config(), vec![], vec![]),
        ScriptedExecutor::default(),
        ScriptedPrices::default(),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut orchestrator = orchestrator(config, mints, &h, shutdown_rx);

    assert_eq!(orchestrator.dispatch(event(quote_mint)), Dispatch::Ignored);
    assert_eq!(orchestrator.dispatch(event(first)), Dispatch::Spawned);
    assert_eq!(orchestrator.dispatch(event(first)), Dispatch::Duplicate);
    assert_eq!(orchestrator.dispatch(event(second)), Dispatch::AtCapacity);
    assert_eq!(orchestrator.active_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mint_can_be_retraded_after_abandon() {
    let mint = Pubkey::new_unique();
    let h = Harness::new(
        ScriptedQuoter::new(&test_config(), vec![None, None], vec![]),
        ScriptedExecutor::default(),
        ScriptedPrices::default(),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = orchestrator(
        test_config(),
        StaticMints::default().with(mint, safe_mint()),
        &h,
        shutdown_rx,
    );

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(orchestrator.run(rx));
    tx.send(event(mint)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(event(mint)).await.unwrap();
    drop(tx);

    let report = handle.await.unwrap();
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.abandoned, 2);
    assert_eq!(h.sink.abandoned().len(), 2);
}
