//! # CADKit Operations
//!
//! Interactive operation lifecycle for parametric geometry: factories that
//! turn continuously edited parameters into engine previews, commit or cancel
//! them, and compose several factories into one transactional operation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cadkit_core::OperationOptions;
//! use cadkit_engine::MemoryEngine;
//! use cadkit_ops::{BoxFactory, BoxParams, Factory, OperationContext};
//!
//! # async fn run() {
//! let context = OperationContext::from_engine(MemoryEngine::new());
//! let mut factory = BoxFactory::new(context, BoxParams::new(10.0, 20.0, 30.0));
//!
//! factory.set_width(12.0).unwrap();
//! let preview = factory.update(OperationOptions::new()).await;
//! assert!(preview.is_completed());
//!
//! let result = factory.commit(OperationOptions::new()).await;
//! assert!(result.success);
//! # }
//! ```

pub mod composite;
pub mod context;
pub mod factory;
pub mod lifecycle;
pub mod positioned;
pub mod primitives;
pub mod state;

pub use composite::{CompositeFactory, ReduceFn, Reducer};
pub use context::OperationContext;
pub use factory::{Factory, OperationFactory, ParametricOperation};
pub use lifecycle::{EngineCall, ShapeLedger};
pub use positioned::{Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
pub use primitives::{
    BoxFactory, BoxParams, ConeFactory, ConeParams, CylinderFactory, CylinderParams,
    SphereFactory, SphereParams, TorusFactory, TorusParams,
};
pub use state::FactoryState;
