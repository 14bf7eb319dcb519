use std::sync::atomic::Ordering;
use std::sync::Arc;

use nodevisor::{
    devnet::MemoryLauncher, Balance, EventKind, NodeError, NodeOverrides, NodeRegistry, NodeStatus,
    RetryError, Subscribe, WEI_PER_TOKEN,
};

mod common;
use common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_acquire_query_quit() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new().with_account(ACCOUNT, 100 * WEI_PER_TOKEN);
    let (registry, recorder) = test_registry(&launcher);

    let node = registry.acquire(8545, NodeOverrides::default()).await?;
    assert_eq!(node.status(), NodeStatus::Started);
    assert_eq!(node.get_accounts().await?, vec![ACCOUNT.to_string()]);
    assert_eq!(node.get_balance().await?.to_string(), "100");

    assert_eq!(node.quit().await?, NodeStatus::Stopped);
    assert!(matches!(node.get_balance().await, Err(NodeError::NotRunning { port: 8545 })));

    recorder.wait_for(EventKind::NodeStopped, 1).await?;
    assert_eq!(
        recorder.kinds(),
        vec![
            EventKind::NodeRegistered,
            EventKind::NodeStarting,
            EventKind::NodeStarted,
            EventKind::NodeStopping,
            EventKind::NodeStopped,
        ]
    );
    let seqs: Vec<u64> = recorder.events().iter().map(|e| e.seq).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "sequence must increase: {seqs:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reacquire_restarts_same_instance() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new();
    let (registry, recorder) = test_registry(&launcher);

    let first = registry.acquire(7545, NodeOverrides::default()).await?;
    let second = registry
        .acquire(
            7545,
            NodeOverrides {
                network_id: Some(42),
                ..NodeOverrides::default()
            },
        )
        .await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(launcher.launched(), 2);
    assert_eq!(launcher.close_calls(), 1);
    assert_eq!(second.options().map(|o| o.network_id), Some(42));

    recorder.wait_for(EventKind::NodeStarted, 2).await?;
    assert_eq!(
        recorder.kinds().iter().filter(|k| **k == EventKind::RestartRequested).count(),
        1
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_independent_ports() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new();
    let (registry, _recorder) = test_registry(&launcher);

    let (a, b) = tokio::join!(
        registry.acquire(8545, NodeOverrides::default()),
        registry.acquire(7545, NodeOverrides::default()),
    );
    let (a, b) = (a?, b?);

    assert!(a.needs_stopping() && b.needs_stopping());
    assert_eq!(registry.ports().await, vec![7545, 8545]);

    let stopped = registry.shutdown_all().await;
    assert_eq!(stopped, vec![(7545, NodeStatus::Stopped), (8545, NodeStatus::Stopped)]);
    assert!(!launcher.is_bound(7545) && !launcher.is_bound(8545));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_foreign_port_exhausts_start_policy() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new();
    assert!(launcher.occupy(9545));
    let (registry, recorder) = test_registry(&launcher);

    let err = registry
        .acquire(9545, NodeOverrides::default())
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("acquire on an occupied port must fail"))?;
    assert_eq!(err.as_label(), "node_retry_exhausted");
    assert!(matches!(
        err,
        NodeError::RetryExhausted(RetryError::Exhausted { attempts: 3, .. })
    ));

    recorder.wait_for(EventKind::StartExhausted, 1).await?;
    assert_eq!(
        recorder.kinds().iter().filter(|k| **k == EventKind::StartFailed).count(),
        3
    );

    // The port frees up: the same instance starts on the next acquire.
    launcher.release(9545);
    let node = registry.acquire(9545, NodeOverrides::default()).await?;
    assert_eq!(node.status(), NodeStatus::Started);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_quit_survives_stuck_close() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new();
    let (registry, recorder) = test_registry(&launcher);
    let node = registry.acquire(8546, NodeOverrides::default()).await?;

    launcher.faults().fail_close_always.store(true, Ordering::Relaxed);
    launcher.faults().stick_on_close_failure.store(true, Ordering::Relaxed);

    assert_eq!(node.quit().await?, NodeStatus::Stopping);
    assert!(launcher.is_bound(8546));

    recorder.wait_for(EventKind::StopUnconfirmed, 1).await?;
    assert!(recorder.kinds().contains(&EventKind::StopFailed));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rpc_failure_surfaces_from_queries() -> anyhow::Result<()> {
    let launcher = MemoryLauncher::new().with_account(ACCOUNT, 1);
    let (registry, _recorder) = test_registry(&launcher);
    let node = registry.acquire(8547, NodeOverrides::default()).await?;

    launcher.faults().fail_rpc_always.store(true, Ordering::Relaxed);
    let err = node.get_balance().await.err();
    assert!(matches!(err, Some(NodeError::Rpc { .. })));
    assert!(err.is_some_and(|e| e.is_retryable()));

    launcher.faults().fail_rpc_always.store(false, Ordering::Relaxed);
    assert_eq!(node.get_balance().await?, Balance::from_wei(1));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_port_scoped_subscriber() -> anyhow::Result<()> {
    init_tracing();
    let launcher = MemoryLauncher::new();
    let everything = Arc::new(Recorder::default());
    let only_8545 = Arc::new(Recorder::for_port(8545));
    let registry = NodeRegistry::builder(Arc::new(launcher.clone()))
        .with_subscribers(vec![
            everything.clone() as Arc<dyn Subscribe>,
            only_8545.clone() as Arc<dyn Subscribe>,
        ])
        .build();

    registry.acquire(7545, NodeOverrides::default()).await?;
    registry.acquire(8545, NodeOverrides::default()).await?;
    everything.wait_for(EventKind::NodeStarted, 2).await?;
    only_8545.wait_for(EventKind::NodeStarted, 1).await?;

    assert!(only_8545.events().iter().all(|e| e.port == Some(8545)));
    assert_eq!(
        only_8545.kinds(),
        vec![EventKind::NodeRegistered, EventKind::NodeStarting, EventKind::NodeStarted]
    );
    assert_eq!(everything.events().len(), 6);
    Ok(())
}
