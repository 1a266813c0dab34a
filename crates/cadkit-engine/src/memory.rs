//! In-memory geometry engine
//!
//! Keeps every created shape in a registry until it is explicitly deleted,
//! tessellates analytically, and exposes knobs for latency and failure
//! injection plus counters used by leak and call-count tests.

use crate::contract::{GeometryEngine, ShapeRequest};
use crate::tessellation;
use async_trait::async_trait;
use cadkit_core::{CancellationToken, EngineError, MeshData, ShapeId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

/// Call counters for a [`MemoryEngine`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Number of `create_shape` calls, including failed ones
    pub create_calls: usize,
    /// Number of `tessellate` calls, including failed ones
    pub tessellate_calls: usize,
    /// Number of `delete_shape` calls, including failed ones
    pub delete_calls: usize,
}

impl EngineStats {
    /// Total calls of every kind
    pub fn total_calls(&self) -> usize {
        self.create_calls + self.tessellate_calls + self.delete_calls
    }
}

#[derive(Debug, Default)]
struct FailurePlan {
    creates: usize,
    tessellations: usize,
    kind: Option<String>,
    deletes: bool,
}

#[derive(Debug, Default)]
struct Registry {
    shapes: HashMap<ShapeId, ShapeRequest>,
    stats: EngineStats,
    failures: FailurePlan,
    latencies: VecDeque<Duration>,
}

/// Geometry engine backed by an in-process shape registry
#[derive(Debug)]
pub struct MemoryEngine {
    registry: Mutex<Registry>,
    latency: Duration,
    honor_cancellation: bool,
    preview_promotion: bool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an engine with no latency
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            latency: Duration::ZERO,
            honor_cancellation: false,
            preview_promotion: false,
        }
    }

    /// Delay every creation by `latency` unless a queued latency overrides it
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Stop creation early when the call's token is cancelled
    pub fn honoring_cancellation(mut self) -> Self {
        self.honor_cancellation = true;
        self
    }

    /// Allow factories to keep their preview shape as the committed result
    pub fn with_preview_promotion(mut self) -> Self {
        self.preview_promotion = true;
        self
    }

    /// Queue a latency for the next creation call
    ///
    /// Queued latencies are consumed in call order.
    pub fn push_latency(&self, latency: Duration) {
        self.registry.lock().latencies.push_back(latency);
    }

    /// Fail the next `count` creation calls
    pub fn fail_next_creates(&self, count: usize) {
        self.registry.lock().failures.creates = count;
    }

    /// Fail the next `count` tessellation calls
    pub fn fail_next_tessellations(&self, count: usize) {
        self.registry.lock().failures.tessellations = count;
    }

    /// Fail every creation of the given kind until cleared with `None`
    pub fn fail_kind(&self, kind: Option<&str>) {
        self.registry.lock().failures.kind = kind.map(str::to_string);
    }

    /// Fail every deletion while set
    pub fn fail_deletes(&self, fail: bool) {
        self.registry.lock().failures.deletes = fail;
    }

    /// Number of shapes currently held
    pub fn live_shape_count(&self) -> usize {
        self.registry.lock().shapes.len()
    }

    /// Whether a shape is currently held
    pub fn contains(&self, shape: &ShapeId) -> bool {
        self.registry.lock().shapes.contains_key(shape)
    }

    /// Request a held shape was created from
    pub fn shape(&self, shape: &ShapeId) -> Option<ShapeRequest> {
        self.registry.lock().shapes.get(shape).cloned()
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> EngineStats {
        self.registry.lock().stats
    }

    fn check_request(request: &ShapeRequest) -> Result<(), EngineError> {
        let fail = |reason: &str| {
            Err(EngineError::CreationFailed {
                kind: request.kind().to_string(),
                reason: reason.to_string(),
            })
        };
        let positive = |v: f64| v.is_finite() && v > 0.0;

        let placement = request.placement();
        if ![placement.x, placement.y, placement.z]
            .iter()
            .all(|v| v.is_finite())
        {
            return fail("placement must be finite");
        }

        match *request {
            ShapeRequest::Box {
                width,
                height,
                depth,
                ..
            } if !(positive(width) && positive(height) && positive(depth)) => {
                fail("box dimensions must be positive")
            }
            ShapeRequest::Cylinder { radius, height, .. }
                if !(positive(radius) && positive(height)) =>
            {
                fail("cylinder dimensions must be positive")
            }
            ShapeRequest::Sphere { radius, .. } if !positive(radius) => {
                fail("sphere radius must be positive")
            }
            ShapeRequest::Cone {
                base_radius,
                top_radius,
                height,
                ..
            } if !(positive(base_radius)
                && positive(height)
                && top_radius.is_finite()
                && top_radius >= 0.0) =>
            {
                fail("cone dimensions out of range")
            }
            ShapeRequest::Torus {
                major_radius,
                minor_radius,
                ..
            } if !(positive(major_radius)
                && positive(minor_radius)
                && minor_radius < major_radius) =>
            {
                fail("torus radii out of range")
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GeometryEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_shape(
        &self,
        request: &ShapeRequest,
        token: &CancellationToken,
    ) -> Result<ShapeId, EngineError> {
        let latency = {
            let mut registry = self.registry.lock();
            registry.stats.create_calls += 1;
            registry.latencies.pop_front().unwrap_or(self.latency)
        };

        if self.honor_cancellation && token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.honor_cancellation && token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut registry = self.registry.lock();
        if registry.failures.creates > 0 {
            registry.failures.creates -= 1;
            return Err(EngineError::CreationFailed {
                kind: request.kind().to_string(),
                reason: "injected failure".to_string(),
            });
        }
        if registry.failures.kind.as_deref() == Some(request.kind()) {
            return Err(EngineError::CreationFailed {
                kind: request.kind().to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Self::check_request(request)?;

        let id = ShapeId::new(format!("shape_{}", Uuid::new_v4().simple()));
        registry.shapes.insert(id.clone(), request.clone());
        debug!("Created {} {}", request.kind(), id);
        Ok(id)
    }

    async fn tessellate(&self, shape: &ShapeId, deflection: f64) -> Result<MeshData, EngineError> {
        let request = {
            let mut registry = self.registry.lock();
            registry.stats.tessellate_calls += 1;
            if registry.failures.tessellations > 0 {
                registry.failures.tessellations -= 1;
                return Err(EngineError::TessellationFailed {
                    reason: "injected failure".to_string(),
                });
            }
            registry
                .shapes
                .get(shape)
                .cloned()
                .ok_or_else(|| EngineError::ShapeNotFound {
                    id: shape.to_string(),
                })?
        };

        let mesh = tessellation::tessellate(&request, deflection)?;
        trace!(
            "Tessellated {} at {}: {} vertices",
            shape,
            deflection,
            mesh.vertex_count()
        );
        Ok(mesh)
    }

    async fn delete_shape(&self, shape: &ShapeId) -> Result<(), EngineError> {
        let mut registry = self.registry.lock();
        registry.stats.delete_calls += 1;
        if registry.failures.deletes {
            return Err(EngineError::other(format!("injected delete failure for {}", shape)));
        }
        match registry.shapes.remove(shape) {
            Some(_) => {
                debug!("Deleted {}", shape);
                Ok(())
            }
            None => Err(EngineError::ShapeNotFound {
                id: shape.to_string(),
            }),
        }
    }

    fn supports_preview_promotion(&self) -> bool {
        self.preview_promotion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Placement;

    fn sphere(radius: f64) -> ShapeRequest {
        ShapeRequest::Sphere {
            placement: Placement::default(),
            radius,
        }
    }

    #[tokio::test]
    async fn test_create_tessellate_delete() {
        let engine = MemoryEngine::new();
        let token = CancellationToken::new();

        let id = engine.create_shape(&sphere(2.0), &token).await.unwrap();
        assert!(id.as_str().starts_with("shape_"));
        assert!(engine.contains(&id));
        assert_eq!(engine.shape(&id), Some(sphere(2.0)));

        let mesh = engine.tessellate(&id, 0.1).await.unwrap();
        assert!(!mesh.is_empty());

        engine.delete_shape(&id).await.unwrap();
        assert_eq!(engine.live_shape_count(), 0);
        assert!(matches!(
            engine.delete_shape(&id).await,
            Err(EngineError::ShapeNotFound { .. })
        ));

        let stats = engine.stats();
        assert_eq!(stats.create_calls, 1);
        assert_eq!(stats.tessellate_calls, 1);
        assert_eq!(stats.delete_calls, 2);
    }

    #[tokio::test]
    async fn test_rejects_invalid_request() {
        let engine = MemoryEngine::new();
        let result = engine
            .create_shape(&sphere(-1.0), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(EngineError::CreationFailed { .. })));
        assert_eq!(engine.live_shape_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let engine = MemoryEngine::new();
        let token = CancellationToken::new();
        engine.fail_next_creates(1);

        assert!(engine.create_shape(&sphere(1.0), &token).await.is_err());
        assert!(engine.create_shape(&sphere(1.0), &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_kind() {
        let engine = MemoryEngine::new();
        let token = CancellationToken::new();
        engine.fail_kind(Some("sphere"));
        assert!(engine.create_shape(&sphere(1.0), &token).await.is_err());

        engine.fail_kind(None);
        assert!(engine.create_shape(&sphere(1.0), &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_honors_cancellation() {
        let engine = MemoryEngine::new().honoring_cancellation();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            engine.create_shape(&sphere(1.0), &token).await,
            Err(EngineError::Cancelled)
        );

        let ignoring = MemoryEngine::new();
        assert!(ignoring.create_shape(&sphere(1.0), &token).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_latency_is_consumed_in_order() {
        let engine = MemoryEngine::new();
        engine.push_latency(Duration::from_millis(50));

        let start = tokio::time::Instant::now();
        engine
            .create_shape(&sphere(1.0), &CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        let start = tokio::time::Instant::now();
        engine
            .create_shape(&sphere(1.0), &CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
