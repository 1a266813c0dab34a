use crate::support::{count, memory_context, record};
use cadkit_core::{EventKind, OperationOptions};
use cadkit_engine::MemoryEngine;
use cadkit_ops::{Factory, SphereFactory, SphereParams};

#[tokio::test]
async fn test_cache_hit_skips_engine() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = SphereFactory::new(context, SphereParams::new(3.0));
    let log = record(&factory);

    let first = factory.update_with_cache(OperationOptions::new()).await;
    assert!(first.is_completed());
    let calls = engine.stats();
    assert_eq!(calls.create_calls, 1);

    let second = factory.update_with_cache(OperationOptions::new());
    assert!(second.is_settled());
    assert_eq!(second.await, first);
    assert_eq!(engine.stats(), calls);
    assert_eq!(count(&log, EventKind::PreviewUpdated), 1);
}

#[tokio::test]
async fn test_parameter_change_misses_cache() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = SphereFactory::new(context, SphereParams::new(3.0));

    factory.update_with_cache(OperationOptions::new()).await;
    let before = factory.fingerprint();
    factory.set_radius(4.0).unwrap();
    assert_ne!(factory.fingerprint(), before);

    let outcome = factory.update_with_cache(OperationOptions::new()).await;
    assert!(outcome.is_completed());
    assert_eq!(engine.stats().create_calls, 2);
    // The older preview shape was replaced
    assert_eq!(engine.live_shape_count(), 1);
}

#[tokio::test]
async fn test_restoring_parameters_hits_cache_only_for_latest_preview() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = SphereFactory::new(context, SphereParams::new(3.0));

    factory.update(OperationOptions::new()).await;
    factory.set_radius(4.0).unwrap();
    factory.set_radius(3.0).unwrap();

    assert!(factory
        .update_with_cache(OperationOptions::new())
        .is_settled());
    assert_eq!(engine.stats().create_calls, 1);
}

#[tokio::test]
async fn test_cancel_clears_cache() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factory = SphereFactory::new(context, SphereParams::new(3.0));

    factory.update(OperationOptions::new()).await;
    factory.reset().await;

    let outcome = factory.update_with_cache(OperationOptions::new()).await;
    assert!(outcome.is_completed());
    assert_eq!(engine.stats().create_calls, 2);
}
