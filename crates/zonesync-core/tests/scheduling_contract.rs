//! Contract Test: Periodic Trigger & Concurrency
//!
//! Constraints verified:
//! - The periodic loop runs immediately, then on every tick
//! - The loop terminates promptly on shutdown
//! - Failed scheduled runs do not stop the loop
//! - Overlapping runs are serialized when configured, and still converge
//!   when they are not

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use zonesync_core::{SyncEngine, SyncEvent, Target, Trigger};

#[tokio::test]
async fn scheduled_loop_runs_and_stops_on_shutdown() {
    let inventory = StaticInventory::new(vec![Target::new("db1", "10.0.0.5")]);
    let zone = InMemoryZone::new(vec![]);

    let (engine, mut events) = SyncEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        engine
            .run_scheduled(Duration::from_millis(20), async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(110)).await;
    shutdown_tx.send(()).expect("shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "loop should terminate within 5 seconds");
    assert!(result.unwrap().unwrap().is_ok());

    assert!(inventory.call_count() >= 2, "loop should tick more than once");
    assert_eq!(zone.batch_count(), 1, "only the first run has changes");

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(SyncEvent::Stopped {
            reason: "Shutdown signal".to_string()
        })
    );
}

#[tokio::test]
async fn failed_scheduled_run_does_not_stop_loop() {
    let inventory = StaticInventory::new(vec![]);
    inventory.fail_with("connection refused");
    let zone = InMemoryZone::new(vec![]);

    let (engine, _events) = SyncEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        engine
            .run_scheduled(Duration::from_millis(20), async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(90)).await;
    shutdown_tx.send(()).unwrap();

    let result = handle.await.unwrap();
    assert!(result.is_ok(), "fetch failures must not end the loop");
    assert!(inventory.call_count() >= 2);
}

#[tokio::test]
async fn zero_interval_is_rejected() {
    let (engine, _events) = SyncEngine::new(
        Box::new(StaticInventory::new(vec![])),
        Box::new(InMemoryZone::new(vec![])),
        minimal_config(),
    )
    .unwrap();

    let result = engine.run_scheduled(Duration::ZERO, async {}).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn overlapping_runs_are_serialized() {
    let inventory = StaticInventory::new(vec![Target::new("db1", "10.0.0.5")]);
    let zone = InMemoryZone::new(vec![]).with_apply_delay(Duration::from_millis(50));

    let (engine, _events) = SyncEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .unwrap();
    let engine = Arc::new(engine);

    let a = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run_once(Trigger::Scheduled).await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run_once(Trigger::OnDemand).await }
    });

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    // The second run sees the first run's result and has nothing to do
    assert_eq!(zone.batch_count(), 1);
    assert!(a.applied != b.applied);
    assert_eq!(zone.records().len(), 1);
}

#[tokio::test]
async fn unserialized_overlap_still_converges() {
    let inventory = StaticInventory::new(vec![Target::new("db1", "10.0.0.5")]);
    let zone = InMemoryZone::new(vec![]).with_apply_delay(Duration::from_millis(50));

    let mut config = minimal_config();
    config.engine.serialize_runs = false;

    let (engine, _events) =
        SyncEngine::new(Box::new(inventory.clone()), Box::new(zone.clone()), config).unwrap();
    let engine = Arc::new(engine);

    let runs: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run_once(Trigger::OnDemand).await })
        })
        .collect();
    let mut results = Vec::new();
    for run in runs {
        results.push(run.await.unwrap());
    }

    // Both runs planned the same create: a duplicate call, not corruption
    assert_eq!(zone.batch_count(), 2);
    let batches = zone.batches();
    assert_eq!(batches[0], batches[1]);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(zonesync_core::Error::Apply(_))))
    );

    // The zone holds the record once and the next run has nothing to do
    let report = engine.run_once(Trigger::Scheduled).await.unwrap();
    assert!(!report.applied);
    assert_eq!(
        zone.entries(),
        vec![("db1.internal.example".to_string(), "10.0.0.5".to_string())]
    );
}
