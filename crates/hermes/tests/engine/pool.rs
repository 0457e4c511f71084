//! Worker pool: backpressure, concurrency, acknowledgement and shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hermes::action::LogExecutor;
use hermes::{
    Error, EventId, ExecutionStore, Job, MemoryStore, OutcomeRecord, PoolConfig, RelayAction,
    RelayId, SubmitError, WorkerPool,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::support::helpers::{
    AckRecorder, fast_webhook_client, init_test_tracing, record, registry, test_pool_config,
};
use crate::support::recording::CallLog;

fn pool_over(
    store: &MemoryStore,
    calls: &CallLog,
    config: PoolConfig,
) -> (WorkerPool<MemoryStore>, hermes::JobSender) {
    WorkerPool::new(
        store.clone(),
        registry(calls, fast_webhook_client()),
        config,
    )
}

#[tokio::test]
async fn try_submit_rejects_when_full() {
    let store = MemoryStore::new();
    let calls = CallLog::default();
    let config = PoolConfig {
        queue_capacity: 1,
        ..test_pool_config()
    };
    let (pool, sender) = pool_over(&store, &calls, config);
    let recorder = AckRecorder::default();

    sender.try_submit(recorder.job("relay-1", "evt-1", "{}")).unwrap();
    let rejected = sender
        .try_submit(recorder.job("relay-1", "evt-2", "{}"))
        .unwrap_err();

    assert!(matches!(rejected, SubmitError::Full(_)));
    let job = rejected.into_job();
    assert_eq!(job.event_id().as_str(), "evt-2");
    job.acknowledge(false);
    assert_eq!(recorder.acks(), vec![("evt-2".to_string(), false)]);

    pool.shutdown().await;
}

#[tokio::test]
async fn submit_waits_for_capacity() {
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "a", json!({}))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        queue_capacity: 1,
        ..test_pool_config()
    };
    let (mut pool, sender) = pool_over(&store, &calls, config);
    let recorder = AckRecorder::default();

    sender.submit(recorder.job("relay-1", "evt-1", "{}")).await.unwrap();

    let blocked = {
        let sender = sender.clone();
        let job = recorder.job("relay-1", "evt-2", "{}");
        tokio::spawn(async move { sender.submit(job).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!blocked.is_finished(), "submit must wait while the queue is full");

    let shutdown = CancellationToken::new();
    pool.start(&shutdown);

    blocked.await.unwrap().unwrap();
    let acks = recorder.wait_for(2).await.unwrap();
    assert!(acks.iter().all(|(_, ok)| *ok));

    pool.shutdown().await;
}

#[tokio::test]
async fn submit_after_shutdown_is_closed() {
    let store = MemoryStore::new();
    let calls = CallLog::default();
    let (mut pool, sender) = pool_over(&store, &calls, test_pool_config());
    pool.start(&CancellationToken::new());
    pool.shutdown().await;

    let recorder = AckRecorder::default();
    let err = sender
        .submit(recorder.job("relay-1", "evt-1", "{}"))
        .await
        .unwrap_err();
    assert!(err.is_closed());
    assert!(sender.is_closed());

    let err = sender
        .try_submit(recorder.job("relay-1", "evt-2", "{}"))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Closed(_)));
    assert!(recorder.acks().is_empty());
}

#[tokio::test]
async fn workers_run_jobs_concurrently() {
    init_test_tracing();
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "slow", json!({ "delay_ms": 200 }))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        worker_count: 4,
        ..test_pool_config()
    };
    let (mut pool, sender) = pool_over(&store, &calls, config);
    let recorder = AckRecorder::default();
    pool.start(&CancellationToken::new());

    for i in 0..8 {
        sender
            .submit(recorder.job("relay-1", &format!("evt-{i}"), "{}"))
            .await
            .unwrap();
    }
    let acks = recorder.wait_for(8).await.unwrap();
    pool.shutdown().await;

    assert!(acks.iter().all(|(_, ok)| *ok));
    assert!(calls.max_concurrent() > 1, "jobs never overlapped");
    assert!(calls.max_concurrent() <= 4, "more jobs than workers ran at once");
}

#[tokio::test]
async fn every_job_is_acknowledged_once() {
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "a", json!({}))]);
    let calls = CallLog::default();
    let (mut pool, sender) = pool_over(&store, &calls, test_pool_config());
    let recorder = AckRecorder::default();
    pool.start(&CancellationToken::new());

    for i in 0..50 {
        // Every fifth event is a redelivery of the previous one
        let event_id = format!("evt-{}", i - i % 5 / 4);
        sender
            .submit(recorder.job("relay-1", &event_id, "{}"))
            .await
            .unwrap();
    }
    let acks = recorder.wait_for(50).await.unwrap();
    pool.shutdown().await;

    assert_eq!(acks.len(), 50);
    assert!(acks.iter().all(|(_, ok)| *ok));
    assert_eq!(calls.len(), 40);
    assert_eq!(store.execution_logs().len(), 40);
}

#[tokio::test]
async fn shutdown_drains_on_a_best_effort_basis() {
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "a", json!({ "delay_ms": 50 }))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        worker_count: 1,
        queue_capacity: 32,
        ..test_pool_config()
    };
    let (mut pool, sender) = pool_over(&store, &calls, config);

    let counts: Arc<std::sync::Mutex<HashMap<String, usize>>> = Arc::default();
    for i in 0..20 {
        let counts = Arc::clone(&counts);
        let event_id = format!("evt-{i}");
        let key = event_id.clone();
        sender
            .submit(Job::new("relay-1", event_id, "{}", move |_| {
                *counts.lock().unwrap().entry(key).or_default() += 1;
            }))
            .await
            .unwrap();
    }

    pool.start(&CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(120)).await;
    pool.shutdown().await;

    let counts = counts.lock().unwrap().clone();
    assert!(counts.values().all(|count| *count == 1), "a job was acked twice");
    assert!(!counts.is_empty(), "in-flight work must finish");
    assert!(counts.len() < 20, "queued jobs are not drained");

    // Every acknowledged job ran to completion and was logged
    assert_eq!(store.execution_logs().len(), counts.len());
    assert_eq!(calls.len(), counts.len());
}

#[tokio::test]
async fn submissions_during_shutdown_are_rejected() {
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "slow", json!({ "delay_ms": 400 }))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        worker_count: 1,
        ..test_pool_config()
    };
    let (mut pool, sender) = pool_over(&store, &calls, config);
    let recorder = AckRecorder::default();
    pool.start(&CancellationToken::new());

    sender
        .submit(recorder.job("relay-1", "evt-1", "{}"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopping = tokio::spawn(pool.shutdown());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished(), "in-flight job must hold shutdown open");

    let rejected = sender
        .try_submit(recorder.job("relay-1", "evt-2", "{}"))
        .unwrap_err();
    assert!(matches!(rejected, SubmitError::Closed(_)));
    assert_eq!(rejected.into_job().event_id().as_str(), "evt-2");

    let rejected = sender
        .submit(recorder.job("relay-1", "evt-3", "{}"))
        .await
        .unwrap_err();
    assert!(rejected.is_closed());

    stopping.await.unwrap();
    assert_eq!(recorder.acks(), vec![("evt-1".to_string(), true)]);
    assert_eq!(store.execution_logs().len(), 1);
}

#[tokio::test]
async fn worker_survives_a_panicking_job() {
    let store = MemoryStore::new();
    store.insert_relay("boom", vec![record(1, "boom", json!({ "panic": true }))]);
    store.insert_relay("fine", vec![record(1, "fine", json!({}))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        worker_count: 1,
        ..test_pool_config()
    };
    let (mut pool, sender) = pool_over(&store, &calls, config);
    let recorder = AckRecorder::default();
    pool.start(&CancellationToken::new());

    sender.submit(recorder.job("boom", "evt-1", "{}")).await.unwrap();
    sender.submit(recorder.job("fine", "evt-2", "{}")).await.unwrap();

    let acks = recorder.wait_for(2).await.unwrap();
    pool.shutdown().await;

    assert_eq!(
        acks,
        vec![("evt-1".to_string(), false), ("evt-2".to_string(), true)]
    );
}

/// Store that panics while claiming events for the `explode` relay.
#[derive(Clone)]
struct ExplodingClaimStore {
    inner: MemoryStore,
}

impl ExecutionStore for ExplodingClaimStore {
    async fn fetch_actions(&self, relay_id: &RelayId) -> hermes::Result<Vec<RelayAction>> {
        self.inner.fetch_actions(relay_id).await
    }

    async fn claim_dedup(&self, relay_id: &RelayId, event_id: &EventId) -> hermes::Result<bool> {
        if relay_id.as_str() == "explode" {
            panic!("claim exploded for {event_id}");
        }
        self.inner.claim_dedup(relay_id, event_id).await
    }

    async fn record_outcome(&self, record: &OutcomeRecord) -> hermes::Result<()> {
        self.inner.record_outcome(record).await
    }
}

#[tokio::test]
async fn worker_survives_a_panicking_store() {
    init_test_tracing();
    let inner = MemoryStore::new();
    inner.insert_relay("explode", vec![record(1, "never", json!({}))]);
    inner.insert_relay("fine", vec![record(1, "fine", json!({}))]);
    let calls = CallLog::default();
    let config = PoolConfig {
        worker_count: 1,
        ..test_pool_config()
    };
    let (mut pool, sender) = WorkerPool::new(
        ExplodingClaimStore {
            inner: inner.clone(),
        },
        registry(&calls, fast_webhook_client()),
        config,
    );
    let recorder = AckRecorder::default();
    pool.start(&CancellationToken::new());

    sender
        .submit(recorder.job("explode", "evt-1", "{}"))
        .await
        .unwrap();
    sender
        .submit(recorder.job("fine", "evt-2", "{}"))
        .await
        .unwrap();

    let acks = recorder.wait_for(2).await.unwrap();
    pool.shutdown().await;

    assert_eq!(
        acks,
        vec![("evt-1".to_string(), false), ("evt-2".to_string(), true)]
    );
    assert_eq!(calls.labels(), vec!["fine"]);
    let logs = inner.execution_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].relay_id.as_str(), "fine");
}

#[tokio::test]
async fn parent_cancellation_stops_workers() {
    let store = MemoryStore::new();
    store.insert_relay("relay-1", vec![record(1, "a", json!({}))]);
    let calls = CallLog::default();
    let (mut pool, sender) = pool_over(&store, &calls, test_pool_config());
    let parent = CancellationToken::new();
    pool.start(&parent);
    assert!(pool.is_running());

    parent.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let acked = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&acked);
    sender
        .submit(Job::new("relay-1", "evt-1", "{}", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.shutdown().await;

    assert_eq!(acked.load(Ordering::SeqCst), 0);
    assert_eq!(calls.len(), 0);
}

#[tokio::test]
async fn builder_reports_duplicate_registrations() {
    let result = WorkerPool::builder(MemoryStore::new())
        .register_builtins(fast_webhook_client())
        .register(LogExecutor::TYPE, LogExecutor)
        .build();

    assert!(matches!(result, Err(Error::DuplicateActionType(t)) if t == "log"));
}

#[tokio::test]
async fn builder_rejects_invalid_config() {
    let result = WorkerPool::builder(MemoryStore::new())
        .config(PoolConfig {
            worker_count: 0,
            ..Default::default()
        })
        .build();

    assert!(matches!(result, Err(Error::Config(_))));
}
