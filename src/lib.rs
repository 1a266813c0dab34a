//! # CADKit
//!
//! Interactive parametric CAD operations on top of a pluggable geometry
//! engine:
//! - Cancellable operations with cooperative cancellation tokens
//! - Operation factories with a preview/commit/cancel state machine
//! - Positioned primitives: box, cylinder, sphere, cone, torus
//! - Composite factories with merged previews and rollback on failed commits
//!
//! ## Architecture
//!
//! CADKit is organized as a workspace with multiple crates:
//!
//! 1. **cadkit-core** - Errors, cancellation, events, mesh buffers, configuration
//! 2. **cadkit-engine** - Geometry engine contract, in-memory engine, tessellation
//! 3. **cadkit-ops** - Factories, primitives, and composites
//! 4. **cadkit** - Logging setup and the demo binary

pub use cadkit_core::{
    CancellableOperation, CancellationToken, CompositeConfig, EngineError, Error, EventKind,
    FactoryError, FactoryEvent, LifecycleConfig, MeshData, OperationOptions, OperationResult,
    Result, Settled, ShapeId, TessellationConfig, ValidationError,
};

pub use cadkit_engine::{
    GeometryEngine, MemoryEngine, Placement, ShapeRequest, SharedEngine, TimeoutEngine,
};

pub use cadkit_ops::{
    BoxFactory, BoxParams, CompositeFactory, ConeFactory, ConeParams, CylinderFactory,
    CylinderParams, Factory, FactoryState, OperationContext, OperationFactory,
    ParametricOperation, Positioned, Reducer, SphereFactory, SphereParams, TorusFactory,
    TorusParams,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for [`init_logging`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output in the requested format
/// - RUST_LOG environment variable support, defaulting to INFO
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .pretty();
            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .json();
            registry.with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}
