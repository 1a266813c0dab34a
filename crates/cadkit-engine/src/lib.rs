//! # CADKit Engine
//!
//! The geometry engine contract used by operation factories, an in-memory
//! reference engine with analytic tessellation, and a timeout adapter.

pub mod contract;
pub mod memory;
pub mod tessellation;
pub mod timeout;

pub use contract::{GeometryEngine, Placement, ShapeRequest, SharedEngine};
pub use memory::{EngineStats, MemoryEngine};
pub use timeout::TimeoutEngine;
