//! Geometry engine contract
//!
//! The narrow interface factories use to reach the geometry kernel: create a
//! shape from a request, tessellate it, delete it. Implementations own their
//! concurrency safety and timeouts; factories treat them as opaque and
//! reentrant.

use async_trait::async_trait;
use cadkit_core::{CancellationToken, EngineError, MeshData, ShapeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Spatial placement of a shape's center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    /// Offset along X
    pub x: f64,
    /// Offset along Y
    pub y: f64,
    /// Offset along Z
    pub z: f64,
}

impl Placement {
    /// Create a placement from offsets
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Payload of a single-shape creation call
///
/// Every shape is centered on its placement. Box extents run width along X,
/// depth along Y, height along Z; revolved shapes use Z as their axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeRequest {
    /// Rectangular box
    Box {
        /// Center placement.
        placement: Placement,
        /// Size along X.
        width: f64,
        /// Size along Z.
        height: f64,
        /// Size along Y.
        depth: f64,
    },
    /// Right circular cylinder
    Cylinder {
        /// Center placement.
        placement: Placement,
        /// Cylinder radius.
        radius: f64,
        /// Cylinder height.
        height: f64,
    },
    /// Sphere
    Sphere {
        /// Center placement.
        placement: Placement,
        /// Sphere radius.
        radius: f64,
    },
    /// Cone or truncated cone
    Cone {
        /// Center placement.
        placement: Placement,
        /// Radius at the bottom.
        base_radius: f64,
        /// Radius at the top; zero for a pointed cone.
        top_radius: f64,
        /// Cone height.
        height: f64,
    },
    /// Torus around the Z axis
    Torus {
        /// Center placement.
        placement: Placement,
        /// Distance from center to tube center.
        major_radius: f64,
        /// Tube radius.
        minor_radius: f64,
    },
}

impl ShapeRequest {
    /// Short name of the requested shape
    pub fn kind(&self) -> &'static str {
        match self {
            ShapeRequest::Box { .. } => "box",
            ShapeRequest::Cylinder { .. } => "cylinder",
            ShapeRequest::Sphere { .. } => "sphere",
            ShapeRequest::Cone { .. } => "cone",
            ShapeRequest::Torus { .. } => "torus",
        }
    }

    /// Placement of the requested shape
    pub fn placement(&self) -> Placement {
        match self {
            ShapeRequest::Box { placement, .. }
            | ShapeRequest::Cylinder { placement, .. }
            | ShapeRequest::Sphere { placement, .. }
            | ShapeRequest::Cone { placement, .. }
            | ShapeRequest::Torus { placement, .. } => *placement,
        }
    }

    /// Stable serialization used to detect unchanged parameters
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Contract every geometry engine implements
#[async_trait]
pub trait GeometryEngine: Send + Sync {
    /// Engine name for diagnostics
    fn name(&self) -> &str;

    /// Create a shape and return its identity
    ///
    /// Implementations may check `token` and stop early with
    /// [`EngineError::Cancelled`]; callers must not rely on it.
    async fn create_shape(
        &self,
        request: &ShapeRequest,
        token: &CancellationToken,
    ) -> Result<ShapeId, EngineError>;

    /// Tessellate an existing shape at the given linear deflection
    async fn tessellate(&self, shape: &ShapeId, deflection: f64) -> Result<MeshData, EngineError>;

    /// Delete a shape
    async fn delete_shape(&self, shape: &ShapeId) -> Result<(), EngineError>;

    /// Whether a preview shape may be kept as the committed result
    fn supports_preview_promotion(&self) -> bool {
        false
    }
}

/// Shared handle to the process-wide engine
pub type SharedEngine = Arc<dyn GeometryEngine>;
