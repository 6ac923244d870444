// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery guarantees of the offline submission queue.

use std::time::Duration;

use floodline_config::model::QueueConfig;
use floodline_core::{
    DeliveryReport, EmergencyKind, Location, Severity, SosPayload, SubmissionStatus,
    SubmissionStore,
};
use floodline_test_utils::{MockOutcome, TestHarness};
use serde_json::json;

fn sos_payload() -> SosPayload {
    SosPayload {
        reporter_id: "user123".into(),
        location: Location {
            lat: 22.5726,
            lng: 88.3639,
        },
        kind: EmergencyKind::Trapped,
        severity: Severity::Critical,
        description: "Family trapped on rooftop, water level rising rapidly".into(),
        media: vec!["photo_001.jpg".into()],
        state: Some("WB".into()),
        district: Some("WB-KOL".into()),
    }
}

fn report(delivered: usize, pending: usize, failed: usize) -> DeliveryReport {
    DeliveryReport {
        delivered,
        pending,
        failed,
        skipped: 0,
    }
}

/// Offline enqueue, one failed flush, then delivery once the network returns.
#[tokio::test]
async fn offline_then_online_scenario() {
    let harness = TestHarness::builder().offline().build().await.unwrap();
    let payload = sos_payload();
    payload.validate().unwrap();

    let id = harness.queue.enqueue(&payload).await.unwrap();
    let pending = harness.queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].attempt_count, 0);

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 1, 0));
    let entry = harness.queue.get(&id).await.unwrap().unwrap();
    assert_eq!(entry.attempt_count, 1);
    assert!(entry.last_error.is_some());

    harness.endpoint.set_online(true);
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
    assert!(harness.queue.list_pending().await.unwrap().is_empty());

    let delivered: SosPayload =
        serde_json::from_str(&harness.endpoint.accepted_payload(&id).await.unwrap()).unwrap();
    assert_eq!(delivered, payload);
}

/// Same scenario where "offline" means the endpoint never answers in time.
#[tokio::test]
async fn timed_out_attempt_stays_pending() {
    let harness = TestHarness::builder()
        .with_delivery_timeout(Duration::from_millis(100))
        .build()
        .await
        .unwrap();
    let id = harness
        .queue
        .enqueue(&json!({"type": "trapped", "lat": 22.57, "lng": 88.36}))
        .await
        .unwrap();
    harness
        .endpoint
        .script(&id, [MockOutcome::Hang(Duration::from_secs(30))])
        .await;

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 1, 0));
    let entry = harness.queue.get(&id).await.unwrap().unwrap();
    assert!(entry.last_error.unwrap().contains("timed out"));
    assert!(harness.endpoint.accepted_ids().await.is_empty());

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
    assert!(harness.queue.list_pending().await.unwrap().is_empty());
}

/// An entry stays in the store until some flush gets an acknowledgement.
#[tokio::test]
async fn at_least_once_delivery() {
    let harness = TestHarness::builder().offline().build().await.unwrap();
    let id = harness.queue.enqueue(&json!({"kind": "medical"})).await.unwrap();

    for _ in 0..3 {
        harness.queue.flush_pending().await.unwrap();
        assert!(harness.queue.get(&id).await.unwrap().is_some());
    }
    assert_eq!(harness.queue.get(&id).await.unwrap().unwrap().attempt_count, 3);

    harness.endpoint.set_online(true);
    harness.queue.flush_pending().await.unwrap();
    assert!(harness.queue.get(&id).await.unwrap().is_none());
    assert_eq!(harness.endpoint.accepted_ids().await, [id]);
}

/// A process killed after enqueue returned finds the entry on restart.
#[tokio::test]
async fn no_loss_across_restart() {
    let mut harness = TestHarness::builder().offline().build().await.unwrap();
    let id = harness.queue.enqueue(&sos_payload()).await.unwrap();
    harness.queue.flush_pending().await.unwrap();

    harness.restart().await.unwrap();

    let pending = harness.queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].attempt_count, 1);

    harness.endpoint.set_online(true);
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
}

/// A lost acknowledgement leads to a redelivery the server de-duplicates.
#[tokio::test]
async fn redelivery_is_deduplicated_by_id() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"kind": "trapped"}))
        .await
        .unwrap();
    harness.endpoint.script("sos-1", [MockOutcome::AckLost]).await;

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 1, 0));
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));

    assert_eq!(harness.endpoint.calls_for("sos-1").await, 2);
    assert_eq!(harness.endpoint.accepted_ids().await, ["sos-1"]);
    assert_eq!(harness.endpoint.duplicate_count().await, 1);
}

/// One failing entry does not block the others.
#[tokio::test]
async fn failures_are_isolated_per_entry() {
    let harness = TestHarness::new().await.unwrap();
    for id in ["sos-1", "sos-2", "sos-3"] {
        harness
            .queue
            .enqueue_with_id(id, &json!({"id": id}))
            .await
            .unwrap();
    }
    harness.endpoint.script("sos-2", [MockOutcome::Offline]).await;

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(2, 1, 0));

    let pending = harness.queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "sos-2");
    assert_eq!(pending[0].attempt_count, 1);
    assert!(harness.queue.get("sos-1").await.unwrap().is_none());
    assert!(harness.queue.get("sos-3").await.unwrap().is_none());
}

/// Two flushes racing over the same store deliver each entry exactly once.
#[tokio::test]
async fn concurrent_flushes_do_not_double_deliver() {
    let harness = TestHarness::new().await.unwrap();
    let other = harness.second_queue();
    let mut ids = Vec::new();
    for n in 0..10 {
        let id = harness.queue.enqueue(&json!({"n": n})).await.unwrap();
        harness
            .endpoint
            .script(&id, [MockOutcome::Hang(Duration::from_millis(50))])
            .await;
        ids.push(id);
    }

    let (a, b) = tokio::join!(harness.queue.flush_pending(), other.flush_pending());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.delivered + b.delivered, 10, "a={a:?} b={b:?}");
    assert_eq!(a.pending + b.pending + a.failed + b.failed, 0);
    assert_eq!(harness.endpoint.call_count().await, 10);
    assert_eq!(harness.endpoint.duplicate_count().await, 0);
    for id in &ids {
        assert_eq!(harness.endpoint.calls_for(id).await, 1);
    }
    assert!(harness.queue.list_pending().await.unwrap().is_empty());
}

/// Concurrent flushes on one queue never count an attempt twice.
#[tokio::test]
async fn concurrent_failed_flushes_count_each_attempt_once() {
    let harness = TestHarness::builder().offline().build().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"kind": "other"}))
        .await
        .unwrap();

    let (a, b) = tokio::join!(harness.queue.flush_pending(), harness.queue.flush_pending());
    let (a, b) = (a.unwrap(), b.unwrap());

    let attempts = harness.endpoint.calls_for("sos-1").await;
    let entry = harness.queue.get("sos-1").await.unwrap().unwrap();
    assert_eq!(entry.attempt_count as usize, attempts);
    assert_eq!(a.pending + b.pending, attempts);
}

/// An entry enqueued while a flush is in flight is never lost.
#[tokio::test]
async fn enqueue_during_flush_is_kept() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .queue
        .enqueue_with_id("early", &json!({"n": 1}))
        .await
        .unwrap();
    harness
        .endpoint
        .script("early", [MockOutcome::Hang(Duration::from_millis(200))])
        .await;

    let queue = harness.queue.clone();
    let flush = tokio::spawn(async move { queue.flush_pending().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness
        .queue
        .enqueue_with_id("late", &json!({"n": 2}))
        .await
        .unwrap();

    let first = flush.await.unwrap().unwrap();
    assert_eq!(first.delivered, 1);
    assert_eq!(
        harness.queue.list_pending().await.unwrap()[0].id,
        "late",
        "late entry waits for the next flush"
    );

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
    assert_eq!(harness.endpoint.accepted_ids().await, ["early", "late"]);
}

/// A flush that died holding a lease delays the entry only until the lease expires.
#[tokio::test]
async fn expired_lease_from_crashed_flush_is_retried() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"kind": "trapped"}))
        .await
        .unwrap();

    // A live lease held elsewhere: this flush skips the entry.
    assert!(
        harness
            .store
            .claim("sos-1", "crashed-flush", Duration::from_millis(100))
            .await
            .unwrap()
    );
    let skipped = harness.queue.flush_pending().await.unwrap();
    assert_eq!(skipped.skipped, 1);
    assert_eq!(harness.endpoint.call_count().await, 0);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
}

/// A process killed mid-flush leaves a live lease; the next process retries at once.
#[tokio::test]
async fn crash_mid_flush_is_retried_after_restart() {
    let mut harness = TestHarness::new().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"kind": "trapped"}))
        .await
        .unwrap();
    assert!(
        harness
            .store
            .claim("sos-1", "dead-process-0", Duration::from_secs(120))
            .await
            .unwrap()
    );

    harness.restart().await.unwrap();

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
    assert_eq!(harness.endpoint.calls_for("sos-1").await, 1);
    assert!(harness.queue.list_pending().await.unwrap().is_empty());
}

/// Rejected payloads are parked as failed and wait for an operator.
#[tokio::test]
async fn rejected_entry_waits_for_manual_retry() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"kind": "trapped"}))
        .await
        .unwrap();
    harness
        .endpoint
        .script(
            "sos-1",
            [MockOutcome::Reject {
                status: 422,
                message: "location out of service area".into(),
            }],
        )
        .await;

    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 0, 1));
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 0, 0));
    let failed = harness.store.list(SubmissionStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 1);

    harness.queue.retry_failed("sos-1").await.unwrap();
    assert_eq!(harness.queue.flush_pending().await.unwrap(), report(1, 0, 0));
}

/// Unbounded retries when the cap is disabled.
#[tokio::test]
async fn zero_max_attempts_retries_forever() {
    let harness = TestHarness::builder()
        .offline()
        .with_queue_config(QueueConfig {
            max_attempts: 0,
            ..QueueConfig::default()
        })
        .build()
        .await
        .unwrap();
    let id = harness.queue.enqueue(&json!({"n": 1})).await.unwrap();

    for _ in 0..30 {
        assert_eq!(harness.queue.flush_pending().await.unwrap(), report(0, 1, 0));
    }
    assert_eq!(harness.queue.get(&id).await.unwrap().unwrap().attempt_count, 30);
}

/// Re-enqueueing an id overwrites the entry instead of duplicating it.
#[tokio::test]
async fn enqueue_with_same_id_overwrites() {
    let harness = TestHarness::builder().offline().build().await.unwrap();
    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"v": 1}))
        .await
        .unwrap();
    harness.queue.flush_pending().await.unwrap();
    let first = harness.queue.get("sos-1").await.unwrap().unwrap();

    harness
        .queue
        .enqueue_with_id("sos-1", &json!({"v": 2}))
        .await
        .unwrap();
    let pending = harness.queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payload, r#"{"v":2}"#);
    assert_eq!(pending[0].attempt_count, 0);
    assert_eq!(pending[0].created_at, first.created_at);
}

/// Validation failures leave the store untouched.
#[tokio::test]
async fn invalid_payload_is_not_stored() {
    let harness = TestHarness::new().await.unwrap();
    assert!(harness.queue.enqueue(&json!({})).await.is_err());
    assert!(harness.queue.enqueue(&json!(null)).await.is_err());
    assert!(harness.queue.list_pending().await.unwrap().is_empty());
    assert_eq!(harness.endpoint.call_count().await, 0);
}

/// Pending entries come back in creation order.
#[tokio::test]
async fn list_pending_is_ordered_by_creation() {
    let harness = TestHarness::builder().offline().build().await.unwrap();
    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(harness.queue.enqueue(&json!({"n": n})).await.unwrap());
    }
    let listed: Vec<String> = harness
        .queue
        .list_pending()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, ids);
}
