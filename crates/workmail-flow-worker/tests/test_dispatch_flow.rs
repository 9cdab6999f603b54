//! Dispatch, locate and poll against the in-memory engine and store
//!
//! Covers the end-to-end scenarios of an invocation and its retries:
//! - Fresh start and retry resolving through the store
//! - Fallback listing scan after the record expired
//! - Checkpoint early return and execution-output-only polling
#[path = "common/mod.rs"]
mod common;

use common::test_data::{BOUNCE_DECISION, DEFAULT_DECISION, MALFORMED_DECISION};
use common::{CHECKPOINT_STATE, STATE_MACHINE_ARN, generate_invocation_id};
use std::sync::Arc;
use std::time::Duration;
use workmail_flow_worker::execution::{
    Dispatched, Dispatcher, ExecutionLocator, Located, PollOutcome, ResultPoller,
};
use workmail_flow_worker::models::{
    ExecutionHandle, HistoryEventKind, OutputValidation, RoutingDecision,
};
use workmail_flow_worker::services::engine::InMemoryExecutionEngine;
use workmail_flow_worker::services::execution_store::InMemoryExecutionStore;
use workmail_flow_worker::services::metrics::MockMetricsService;

const TTL: Duration = Duration::from_secs(14_400);

struct Fixture {
    engine: Arc<InMemoryExecutionEngine>,
    store: Arc<InMemoryExecutionStore>,
    metrics: Arc<MockMetricsService>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_engine(InMemoryExecutionEngine::new())
    }

    fn with_engine(engine: InMemoryExecutionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            store: Arc::new(InMemoryExecutionStore::new()),
            metrics: Arc::new(MockMetricsService::new()),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.engine.clone(),
            self.store.clone(),
            self.metrics.clone(),
            TTL,
        )
    }

    fn locator(&self) -> ExecutionLocator {
        ExecutionLocator::new(self.store.clone(), self.engine.clone(), self.metrics.clone())
    }

    fn poller(&self) -> ResultPoller {
        ResultPoller::new(
            self.engine.clone(),
            self.metrics.clone(),
            OutputValidation::Minimal,
        )
    }
}

fn succeeded(output: &str) -> HistoryEventKind {
    HistoryEventKind::ExecutionSucceeded {
        output: Some(output.to_string()),
    }
}

fn exited(state: &str, output: &str) -> HistoryEventKind {
    HistoryEventKind::StateExited {
        name: state.to_string(),
        output: Some(output.to_string()),
    }
}

fn decision(raw: &str) -> RoutingDecision {
    RoutingDecision::parse(raw, OutputValidation::Minimal).unwrap()
}

/// Scenario A: fresh dispatch, pending poll, then the execution output
#[tokio::test]
async fn test_fresh_dispatch_then_execution_output() {
    let fixture = Fixture::new();

    let dispatched = fixture
        .dispatcher()
        .dispatch("abc-1", STATE_MACHINE_ARN, r#"{"invocationId":"abc-1"}"#)
        .await
        .unwrap();

    let expected = ExecutionHandle::new("arn:exec:abc-1");
    assert_eq!(dispatched, Dispatched::Started(expected.clone()));
    assert_eq!(fixture.engine.start_calls(), 1);
    assert_eq!(
        fixture.engine.input_of("abc-1").as_deref(),
        Some(r#"{"invocationId":"abc-1"}"#)
    );

    let record = fixture.store.get("abc-1").await.unwrap();
    assert_eq!(record.handle(), Some(expected.clone()));
    assert_eq!(fixture.store.writes(), 1);

    let poller = fixture.poller();
    assert_eq!(poller.poll(&expected, None).await.unwrap(), PollOutcome::Pending);

    fixture.engine.append_event("abc-1", succeeded(DEFAULT_DECISION));
    assert_eq!(
        poller.poll(&expected, None).await.unwrap(),
        PollOutcome::Decision(RoutingDecision::allow_all())
    );
}

/// Scenario B: a retry resolves through the store without a second write
#[tokio::test]
async fn test_retry_resolves_existing_execution() {
    let fixture = Fixture::new();
    let dispatcher = fixture.dispatcher();

    let first = dispatcher
        .dispatch("abc-1", STATE_MACHINE_ARN, "{}")
        .await
        .unwrap();
    let retry = dispatcher
        .dispatch("abc-1", STATE_MACHINE_ARN, "{}")
        .await
        .unwrap();

    assert_eq!(retry, Dispatched::ExistsResolved(first.handle().clone()));
    assert_eq!(fixture.engine.execution_count(), 1);
    assert_eq!(fixture.store.writes(), 1);
    // Fast path only
    assert_eq!(fixture.engine.list_calls(), 0);

    fixture.engine.append_event("abc-1", succeeded(DEFAULT_DECISION));
    assert_eq!(
        fixture.poller().poll(retry.handle(), None).await.unwrap(),
        PollOutcome::Decision(RoutingDecision::allow_all())
    );
    assert_eq!(
        fixture.metrics.get_metric_values("DuplicateStartsResolved").await,
        vec![1.0]
    );
}

/// Scenario C: the record is gone and the execution sits on the second listing page
#[tokio::test]
async fn test_expired_record_falls_back_to_listing_scan() {
    let fixture = Fixture::with_engine(InMemoryExecutionEngine::with_page_size(2));
    fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-2");
    fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-3");
    fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-4");

    let located = fixture
        .locator()
        .locate("abc-2", STATE_MACHINE_ARN)
        .await
        .unwrap();

    assert_eq!(
        located,
        Located::Scanned(ExecutionHandle::new("arn:exec:abc-2"))
    );
    assert_eq!(fixture.engine.list_calls(), 2);
    assert_eq!(
        fixture.metrics.get_metric_values("LocatorFallbackPages").await,
        vec![2.0]
    );
}

#[tokio::test]
async fn test_retry_after_record_expiry_scans_and_never_restarts() {
    let fixture = Fixture::with_engine(InMemoryExecutionEngine::with_page_size(1));
    let dispatcher = fixture.dispatcher();
    let id = generate_invocation_id();

    let first = dispatcher.dispatch(&id, STATE_MACHINE_ARN, "{}").await.unwrap();
    fixture.engine.seed_execution(STATE_MACHINE_ARN, "newer-1");
    fixture.engine.seed_execution(STATE_MACHINE_ARN, "newer-2");
    fixture.store.expire(&id).await;

    let retry = dispatcher.dispatch(&id, STATE_MACHINE_ARN, "{}").await.unwrap();

    assert_eq!(retry, Dispatched::ExistsResolved(first.handle().clone()));
    assert_eq!(fixture.engine.list_calls(), 3);
    assert_eq!(fixture.engine.execution_count(), 3);
    assert_eq!(fixture.store.writes(), 1);
}

#[tokio::test]
async fn test_live_record_never_triggers_scan() {
    let fixture = Fixture::new();
    let dispatcher = fixture.dispatcher();

    for _ in 0..5 {
        dispatcher
            .dispatch("abc-1", STATE_MACHINE_ARN, "{}")
            .await
            .unwrap();
    }

    assert_eq!(fixture.engine.start_calls(), 5);
    assert_eq!(fixture.engine.execution_count(), 1);
    assert_eq!(fixture.engine.list_calls(), 0);
    assert_eq!(fixture.store.lookups(), 4);
}

#[tokio::test]
async fn test_concurrent_dispatch_starts_one_execution() {
    let fixture = Fixture::new();
    let first = fixture.dispatcher();
    let second = fixture.dispatcher();
    let id = generate_invocation_id();

    let (a, b) = futures::join!(
        first.dispatch(&id, STATE_MACHINE_ARN, "{}"),
        second.dispatch(&id, STATE_MACHINE_ARN, "{}"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.handle(), b.handle());
    assert_eq!(fixture.engine.execution_count(), 1);
    let started = [&a, &b]
        .iter()
        .filter(|d| matches!(d, Dispatched::Started(_)))
        .count();
    assert_eq!(started, 1);
    assert_eq!(fixture.store.writes(), 1);
}

#[tokio::test]
async fn test_checkpoint_returns_before_execution_completes() {
    let fixture = Fixture::new();
    let handle = fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-1");
    fixture
        .engine
        .append_event("abc-1", exited("Enrich", DEFAULT_DECISION));
    fixture
        .engine
        .append_event("abc-1", exited(CHECKPOINT_STATE, BOUNCE_DECISION));

    let outcome = fixture
        .poller()
        .poll(&handle, Some(CHECKPOINT_STATE))
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Decision(decision(BOUNCE_DECISION)));
}

#[tokio::test]
async fn test_without_checkpoint_state_exits_are_ignored() {
    let fixture = Fixture::new();
    let handle = fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-1");
    fixture
        .engine
        .append_event("abc-1", exited(CHECKPOINT_STATE, BOUNCE_DECISION));

    let poller = fixture.poller();
    assert_eq!(poller.poll(&handle, None).await.unwrap(), PollOutcome::Pending);

    fixture.engine.append_event("abc-1", succeeded(DEFAULT_DECISION));
    assert_eq!(
        poller.poll(&handle, None).await.unwrap(),
        PollOutcome::Decision(RoutingDecision::allow_all())
    );
}

#[tokio::test]
async fn test_malformed_checkpoint_output_skipped_for_later_valid_one() {
    let fixture = Fixture::new();
    let handle = fixture.engine.seed_execution(STATE_MACHINE_ARN, "abc-1");
    fixture
        .engine
        .append_event("abc-1", exited(CHECKPOINT_STATE, MALFORMED_DECISION));

    let poller = fixture.poller();
    assert_eq!(
        poller.poll(&handle, Some(CHECKPOINT_STATE)).await.unwrap(),
        PollOutcome::Invalid
    );
    assert_eq!(
        fixture.metrics.get_metric_values("MalformedOutputs").await,
        vec![1.0]
    );

    // The state ran again and produced a usable output
    fixture
        .engine
        .append_event("abc-1", exited(CHECKPOINT_STATE, BOUNCE_DECISION));
    assert_eq!(
        poller.poll(&handle, Some(CHECKPOINT_STATE)).await.unwrap(),
        PollOutcome::Decision(decision(BOUNCE_DECISION))
    );
}

#[tokio::test]
async fn test_lost_record_write_recovered_by_scan() {
    let fixture = Fixture::new();
    let dispatcher = fixture.dispatcher();
    let id = generate_invocation_id();

    let first = dispatcher.dispatch(&id, STATE_MACHINE_ARN, "{}").await.unwrap();
    fixture.store.remove(&id).await;

    let retry = dispatcher.dispatch(&id, STATE_MACHINE_ARN, "{}").await.unwrap();

    assert_eq!(retry, Dispatched::ExistsResolved(first.handle().clone()));
    assert_eq!(fixture.engine.list_calls(), 1);
    assert!(fixture.store.get(&id).await.is_none());
}
