use crate::support::{memory_context, record};
use cadkit_core::{FactoryError, FactoryEvent, OperationOptions, ValidationError};
use cadkit_engine::{MemoryEngine, Placement, TimeoutEngine};
use cadkit_ops::{
    BoxFactory, BoxParams, ConeFactory, ConeParams, CylinderFactory, CylinderParams, Factory,
    OperationContext, SphereFactory, SphereParams, TorusFactory, TorusParams,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_every_primitive_previews_and_commits() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut factories: Vec<Box<dyn Factory>> = vec![
        Box::new(BoxFactory::new(context.clone(), BoxParams::default())),
        Box::new(CylinderFactory::new(context.clone(), CylinderParams::default())),
        Box::new(SphereFactory::new(context.clone(), SphereParams::default())),
        Box::new(ConeFactory::new(context.clone(), ConeParams::default())),
        Box::new(TorusFactory::new(context, TorusParams::default())),
    ];

    for factory in factories.iter_mut() {
        let outcome = factory.update(OperationOptions::new()).await;
        let mesh = outcome.value().expect("preview completes");
        assert!(mesh.is_consistent(), "{} mesh", factory.kind());

        let result = factory.commit(OperationOptions::new()).await;
        assert!(result.success, "{} commit", factory.kind());
    }
    assert_eq!(engine.live_shape_count(), 5);
}

#[tokio::test]
async fn test_cone_rules() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut cone = ConeFactory::new(context, ConeParams::new(5.0, 0.0, 10.0));
    assert!(cone.is_valid());

    cone.set_top_radius(5.0).unwrap();
    assert!(matches!(
        cone.validate(),
        Err(ValidationError::Relation { .. })
    ));

    cone.set_top_radius(-1.0).unwrap();
    let outcome = cone.update(OperationOptions::new()).await;
    assert!(outcome.error().is_some_and(FactoryError::is_validation));

    cone.set_top_radius(2.0).unwrap();
    cone.set_height(0.0).unwrap();
    assert!(!cone.is_valid());
}

#[tokio::test]
async fn test_torus_minor_must_be_smaller() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut torus = TorusFactory::new(context, TorusParams::new(10.0, 2.0));
    torus.set_minor_radius(10.0).unwrap();
    assert!(!torus.is_valid());
    torus.set_major_radius(12.0).unwrap();
    assert!(torus.is_valid());
}

#[tokio::test]
async fn test_offsets_move_the_preview() {
    let (engine, context) = memory_context(MemoryEngine::new());
    let mut cylinder = CylinderFactory::new(context, CylinderParams::new(1.0, 2.0));
    let log = record(&cylinder);

    cylinder.set_offset_x(10.0).unwrap();
    cylinder
        .set_placement(Placement::new(10.0, -5.0, 2.0))
        .unwrap();
    assert_eq!(cylinder.placement(), Placement::new(10.0, -5.0, 2.0));
    assert_eq!(cylinder.param("offset_y"), Some(-5.0));

    let outcome = cylinder.update(OperationOptions::new()).await;
    let (min, max) = outcome.value().unwrap().bounds().unwrap();
    assert!((min.z - 1.0).abs() < 1e-9 && (max.z - 3.0).abs() < 1e-9);
    assert!((min.y + 6.0).abs() < 1e-9);

    let result = cylinder.commit(OperationOptions::new()).await;
    let request = engine.shape(result.result_id.as_ref().unwrap()).unwrap();
    assert_eq!(request.placement(), Placement::new(10.0, -5.0, 2.0));

    let names: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            FactoryEvent::ParameterChanged { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, ["offset_x", "offset_x", "offset_y", "offset_z"]);
}

#[tokio::test]
async fn test_unknown_parameter() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut sphere = SphereFactory::new(context, SphereParams::default());
    assert_eq!(
        sphere.set_param("width", 1.0),
        Err(FactoryError::UnknownParameter {
            name: "width".to_string()
        })
    );
    assert!(sphere.has_param("radius"));
    assert_eq!(
        sphere.param_names(),
        ["radius", "offset_x", "offset_y", "offset_z"]
    );
}

#[tokio::test]
async fn test_outputs() {
    let (_engine, context) = memory_context(MemoryEngine::new());
    let mut factory = BoxFactory::new(context, BoxParams::new(2.0, 3.0, 4.0));

    assert_eq!(factory.output("volume"), Some(serde_json::json!(24.0)));
    assert_eq!(factory.output("kind"), Some(serde_json::json!("box")));
    assert_eq!(factory.output("vertex_count"), None);

    factory.update(OperationOptions::new()).await;
    assert_eq!(factory.output("vertex_count"), Some(serde_json::json!(8)));
    assert_eq!(factory.output("triangle_count"), Some(serde_json::json!(12)));

    let result = factory.commit(OperationOptions::new()).await;
    let id = result.result_id.unwrap();
    assert_eq!(
        factory.output("result_ids"),
        Some(serde_json::json!([id.as_str()]))
    );
}

#[tokio::test(start_paused = true)]
async fn test_engine_timeout_is_an_ordinary_failure() {
    let slow = Arc::new(MemoryEngine::new().with_latency(Duration::from_secs(10)));
    let engine = TimeoutEngine::new(slow.clone(), Duration::from_millis(200));
    let context = OperationContext::from_engine(engine);
    let mut factory = SphereFactory::new(context, SphereParams::default());

    let outcome = factory.update(OperationOptions::new()).await;
    assert!(outcome.error().is_some_and(FactoryError::is_timeout));

    let result = factory.commit(OperationOptions::new()).await;
    assert!(result.error.as_ref().is_some_and(FactoryError::is_timeout));
    assert_eq!(slow.live_shape_count(), 0);
}
