//! # CADKit Core
//!
//! Core types, errors, and primitives shared by the CADKit crates.
//! Provides the building blocks of the operation lifecycle: cancellation
//! tokens, cancellable operations, mesh buffers, lifecycle events, and
//! configuration.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod events;
pub mod mesh;
pub mod operation;
pub mod result;
pub mod types;

pub use cancellation::CancellationToken;
pub use config::{CompositeConfig, LifecycleConfig, TessellationConfig};
pub use error::{ConfigError, EngineError, Error, FactoryError, Result, ValidationError};
pub use events::{EventDispatcher, EventHandler, EventKind, FactoryEvent};
pub use mesh::MeshData;
pub use operation::{CancellableOperation, Settled};
pub use result::{OperationOptions, OperationResult, ShapeId};

// Re-export type aliases for convenience
pub use types::{thread_safe, Disposer, ThreadSafe};
