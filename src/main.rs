use cadkit::{
    init_logging, BoxFactory, BoxParams, CompositeFactory, CylinderFactory, CylinderParams,
    Factory, LifecycleConfig, LogFormat, MemoryEngine, OperationContext, OperationOptions,
    SphereFactory, SphereParams,
};
use std::time::Duration;
use tracing::{info, warn};

/// Builds a small assembly against the in-memory engine, previews it while
/// editing a shared parameter, then commits it.
///
/// Usage: `cadkit [config.toml]`. Set `CADKIT_LOG_FORMAT=json` for JSON logs.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match std::env::var("CADKIT_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };
    init_logging(format)?;

    let config = match std::env::args().nth(1) {
        Some(path) => LifecycleConfig::load(&path)?,
        None => LifecycleConfig::default(),
    };

    let engine = MemoryEngine::new().with_latency(Duration::from_millis(20));
    let context = OperationContext::from_engine(engine).with_config(config);

    let mut assembly = CompositeFactory::new(context.clone())
        .with_child(BoxFactory::new(context.clone(), BoxParams::new(40.0, 40.0, 5.0)))
        .with_child(CylinderFactory::new(
            context.clone(),
            CylinderParams::new(3.0, 20.0),
        ))
        .with_child(SphereFactory::new(context, SphereParams::new(4.0)));

    assembly.events().set_handler(|event| info!("Assembly event: {:?}", event.kind()));

    for offset in [0.0, 5.0, 10.0] {
        assembly.set_param("offset_z", offset)?;
        let preview = assembly.update_with_cache(OperationOptions::new()).await;
        match preview.value() {
            Some(mesh) => info!(
                "Preview at offset {}: {} vertices, {} triangles",
                offset,
                mesh.vertex_count(),
                mesh.triangle_count()
            ),
            None => warn!("Preview at offset {} did not complete: {:?}", offset, preview),
        }
    }

    let result = assembly.commit(OperationOptions::new()).await;
    if let Some(error) = result.error {
        anyhow::bail!("commit failed: {}", error);
    }
    info!(
        "Committed {:?}, total volume {:?}",
        assembly.output("result_ids"),
        assembly.output("volume")
    );

    Ok(())
}
