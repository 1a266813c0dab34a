use crate::support::{count, kinds, memory_context, record, LogCapture};
use cadkit_core::{
    CancellationToken, EventKind, FactoryError, OperationOptions, Settled, ValidationError,
};
use cadkit_engine::MemoryEngine;
use cadkit_ops::{BoxFactory, BoxParams, Factory, FactoryState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_box_preview_and_commit() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::new(10.0, 20.0, 30.0));
    let log = record(&factory);

    let preview = factory.update(OperationOptions::new()).await;
    let mesh = preview.value().expect("preview completes").clone();
    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(factory.preview(), Some(mesh));
    assert_eq!(factory.state(), FactoryState::Idle);

    let result = factory.commit(OperationOptions::new()).await;
    assert!(result.success);
    assert!(result.error.is_none());
    let id = result.result_id.expect("committed id");
    assert!(engine.contains(&id));
    assert_eq!(factory.result_id(), Some(id));
    assert_eq!(factory.state(), FactoryState::Committed);

    // Preview shape is replaced by the committed shape
    assert_eq!(engine.live_shape_count(), 1);
    assert_eq!(
        kinds(&log),
        vec![EventKind::PreviewUpdated, EventKind::Committed]
    );
}

#[tokio::test]
async fn test_invalid_parameters_reject_synchronously() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::new(10.0, 20.0, 30.0));
    let log = record(&factory);

    factory.set_width(-1.0).unwrap();
    assert!(!factory.is_valid());
    assert!(!factory.can_commit());

    let operation = factory.update(OperationOptions::new());
    assert!(operation.is_settled());
    let outcome = operation.await;
    assert_eq!(
        outcome.error(),
        Some(&FactoryError::Validation(ValidationError::NonPositive {
            field: "width".to_string(),
            value: -1.0
        }))
    );

    assert_eq!(engine.stats().total_calls(), 0);
    assert_eq!(factory.state(), FactoryState::Idle);
    assert_eq!(count(&log, EventKind::Errored), 1);
}

#[tokio::test]
async fn test_skip_validation_reaches_engine() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::new(-1.0, 1.0, 1.0));

    let outcome = factory
        .update(OperationOptions::new().skip_validation())
        .await;
    assert!(outcome.error().is_some_and(|e| e.is_engine()));
    assert_eq!(engine.stats().create_calls, 1);
    assert_eq!(factory.state(), FactoryState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_update_is_applied() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    // Earlier calls are slower, so they finish after the last one
    let mut handles = Vec::new();
    for i in 1..=5 {
        engine.push_latency(Duration::from_millis(60 - 10 * i as u64));
        factory.set_width(i as f64).unwrap();
        handles.push(tokio::spawn(factory.update(OperationOptions::new())));
        tokio::task::yield_now().await;
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    for outcome in &outcomes[..4] {
        assert!(outcome.is_discarded());
    }
    let latest = outcomes[4].value().expect("latest update completes");
    let (min, max) = latest.bounds().unwrap();
    assert_eq!(max.x - min.x, 5.0);
    assert_eq!(factory.preview().as_ref(), Some(latest));

    assert_eq!(count(&log, EventKind::PreviewUpdated), 1);
    assert_eq!(count(&log, EventKind::ParameterChanged), 5);
    assert_eq!(engine.stats().create_calls, 5);
    // Superseded shapes are deleted once they land
    assert_eq!(engine.live_shape_count(), 1);
    assert_eq!(factory.pending_shapes(), 0);
    assert_eq!(factory.state(), FactoryState::Idle);
}

#[tokio::test]
async fn test_cancelled_operation_is_discarded() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    let operation = factory.update(OperationOptions::new());
    assert_eq!(factory.state(), FactoryState::Updating);
    operation.cancel();
    operation.cancel();

    assert_eq!(operation.await, Settled::Discarded);
    assert_eq!(factory.state(), FactoryState::Idle);
    assert_eq!(count(&log, EventKind::PreviewUpdated), 0);
    assert_eq!(engine.live_shape_count(), 0);
}

#[tokio::test]
async fn test_dropped_operation_returns_to_idle() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    drop(factory.update(OperationOptions::new()));
    assert_eq!(factory.state(), FactoryState::Idle);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_caller_token_discards_result() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    let token = CancellationToken::new();
    let operation = factory.update(OperationOptions::new().with_token(token.clone()));
    token.cancel();
    assert!(operation.await.is_discarded());
    assert!(factory.preview().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_parameter_write_invalidates_in_flight_update() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    engine.push_latency(Duration::from_millis(20));
    let handle = tokio::spawn(factory.update(OperationOptions::new()));
    tokio::task::yield_now().await;
    assert_eq!(factory.state(), FactoryState::Updating);

    factory.set_height(3.0).unwrap();
    assert_eq!(factory.state(), FactoryState::Idle);
    assert!(handle.await.unwrap().is_discarded());
    assert!(factory.preview().is_none());
    assert_eq!(engine.live_shape_count(), 0);
}

#[tokio::test]
async fn test_commit_only_from_idle_or_updating() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context.clone(), BoxParams::default());
    let log = record(&factory);

    assert!(factory.commit(OperationOptions::new()).await.success);
    let again = factory.commit(OperationOptions::new()).await;
    assert!(!again.success);
    assert!(matches!(again.error, Some(FactoryError::InvalidState { .. })));

    let mut cancelled = BoxFactory::new(context, BoxParams::default());
    cancelled.cancel().await;
    let result = cancelled.commit(OperationOptions::new()).await;
    assert!(matches!(result.error, Some(FactoryError::InvalidState { .. })));

    // Rejected attempts on a terminal factory do not fire errored
    assert_eq!(count(&log, EventKind::Errored), 0);
}

#[tokio::test]
async fn test_commit_failure_returns_to_idle() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    engine.fail_next_creates(1);
    let result = factory.commit(OperationOptions::new()).await;
    assert!(!result.success);
    assert!(result.error.as_ref().is_some_and(|e| e.is_engine()));
    assert_eq!(factory.state(), FactoryState::Idle);
    assert_eq!(count(&log, EventKind::Errored), 1);

    // A retry succeeds
    assert!(factory.commit(OperationOptions::new()).await.success);
}

#[tokio::test(start_paused = true)]
async fn test_commit_cancels_in_flight_update() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    engine.push_latency(Duration::from_millis(50));
    let handle = tokio::spawn(factory.update(OperationOptions::new()));
    tokio::task::yield_now().await;

    let result = factory.commit(OperationOptions::new()).await;
    assert!(result.success);
    assert!(handle.await.unwrap().is_discarded());
    assert_eq!(engine.live_shape_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_commit_deletes_its_shape() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    let token = CancellationToken::new();
    let canceller = token.clone();
    engine.push_latency(Duration::from_millis(50));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result = factory
        .commit(OperationOptions::new().with_token(token))
        .await;
    assert_eq!(result.error, Some(FactoryError::Cancelled));
    assert_eq!(factory.state(), FactoryState::Idle);
    assert_eq!(engine.live_shape_count(), 0);
    assert_eq!(count(&log, EventKind::Errored), 0);
}

#[tokio::test]
async fn test_commit_promotes_matching_preview() {
    let (engine, context) = memory_context(MemoryEngine::new().with_preview_promotion());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    factory.update(OperationOptions::new()).await;
    let result = factory.commit(OperationOptions::new()).await;
    assert!(result.success);
    assert_eq!(engine.stats().create_calls, 1);
    assert_eq!(engine.live_shape_count(), 1);
}

#[tokio::test]
async fn test_commit_without_promotion_replaces_preview_shape() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    factory.update(OperationOptions::new()).await;
    let result = factory.commit(OperationOptions::new()).await;
    assert!(result.success);
    assert_eq!(engine.stats().create_calls, 2);
    assert_eq!(engine.live_shape_count(), 1);
    assert!(engine.contains(result.result_id.as_ref().unwrap()));
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    factory.update(OperationOptions::new()).await;
    assert_eq!(engine.live_shape_count(), 1);

    factory.cancel().await;
    factory.cancel().await;
    assert_eq!(factory.state(), FactoryState::Cancelled);
    assert!(factory.preview().is_none());
    assert_eq!(engine.live_shape_count(), 0);
    assert_eq!(count(&log, EventKind::Cancelled), 1);

    assert!(matches!(
        factory.set_width(2.0),
        Err(FactoryError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_reset_returns_to_fresh_idle() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    assert!(factory.commit(OperationOptions::new()).await.success);
    factory.reset().await;
    assert_eq!(factory.state(), FactoryState::Idle);
    assert!(factory.result_id().is_none());
    assert!(factory.preview().is_none());

    assert!(factory.update(OperationOptions::new()).await.is_completed());
}

#[tokio::test]
async fn test_dispose_releases_everything_once() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();
    factory.add_disposer(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    factory.update(OperationOptions::new()).await;
    factory.dispose().await;
    factory.dispose().await;

    assert!(factory.is_disposed());
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(engine.live_shape_count(), 0);
    assert!(!factory.events().has_handler());
    assert_eq!(count(&log, EventKind::Cancelled), 1);

    let outcome = factory.update(OperationOptions::new()).await;
    assert_eq!(outcome.error(), Some(&FactoryError::Disposed));
    let result = factory.commit(OperationOptions::new()).await;
    assert_eq!(result.error, Some(FactoryError::Disposed));
}

#[tokio::test]
async fn test_revert_commit_deletes_result() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    assert!(matches!(
        factory.revert_commit().await,
        Err(FactoryError::InvalidState { .. })
    ));

    let result = factory.commit(OperationOptions::new()).await;
    let id = result.result_id.unwrap();
    factory.revert_commit().await.unwrap();
    assert!(!engine.contains(&id));
    assert_eq!(factory.state(), FactoryState::Idle);
    assert!(factory.result_id().is_none());
}

#[tokio::test]
async fn test_engine_failure_fires_errored() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());
    let log = record(&factory);

    engine.fail_next_tessellations(1);
    let outcome = factory.update(OperationOptions::new()).await;
    assert!(outcome.is_failed());
    assert_eq!(count(&log, EventKind::Errored), 1);
    // The shape created before tessellation failed is removed
    assert_eq!(engine.live_shape_count(), 0);
}

#[tokio::test]
async fn test_last_handler_wins() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::default());

    let first = record(&factory);
    let second = record(&factory);
    factory.set_depth(4.0).unwrap();
    assert!(first.lock().unwrap().is_empty());
    assert_eq!(count(&second, EventKind::ParameterChanged), 1);

    assert!(factory.clear_event_handler());
    factory.set_depth(5.0).unwrap();
    assert_eq!(count(&second, EventKind::ParameterChanged), 1);
}

#[tokio::test]
async fn test_dropping_undisposed_factory_reports_leftover_preview() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context.clone(), BoxParams::default());
    factory.update(OperationOptions::new()).await;

    let logs = LogCapture::default();
    logs.scope(|| drop(factory));
    assert!(logs.contents().contains("dropped without dispose"));
    assert_eq!(engine.live_shape_count(), 1);

    let mut factory = BoxFactory::new(context, BoxParams::default());
    factory.update(OperationOptions::new()).await;
    factory.dispose().await;

    let logs = LogCapture::default();
    logs.scope(|| drop(factory));
    assert!(logs.contents().is_empty());
    assert_eq!(engine.live_shape_count(), 1);
}
