//! Timeout adapter for geometry engines
//!
//! Bounds every call of a wrapped engine so a stuck kernel surfaces as
//! [`EngineError::Timeout`] instead of hanging the factory that awaits it.

use crate::contract::{GeometryEngine, SharedEngine, ShapeRequest};
use async_trait::async_trait;
use cadkit_core::{CancellationToken, EngineError, MeshData, ShapeId};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Engine wrapper applying a per-call deadline
pub struct TimeoutEngine {
    inner: SharedEngine,
    timeout: Duration,
}

impl TimeoutEngine {
    /// Wrap an engine with a per-call deadline
    pub fn new(inner: SharedEngine, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        call: &str,
        future: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!("{} on {} timed out after {}ms", call, self.inner.name(), timeout_ms);
                Err(EngineError::Timeout { timeout_ms })
            }
        }
    }
}

#[async_trait]
impl GeometryEngine for TimeoutEngine {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_shape(
        &self,
        request: &ShapeRequest,
        token: &CancellationToken,
    ) -> Result<ShapeId, EngineError> {
        self.bounded("create_shape", self.inner.create_shape(request, token))
            .await
    }

    async fn tessellate(&self, shape: &ShapeId, deflection: f64) -> Result<MeshData, EngineError> {
        self.bounded("tessellate", self.inner.tessellate(shape, deflection))
            .await
    }

    async fn delete_shape(&self, shape: &ShapeId) -> Result<(), EngineError> {
        self.bounded("delete_shape", self.inner.delete_shape(shape))
            .await
    }

    fn supports_preview_promotion(&self) -> bool {
        self.inner.supports_preview_promotion()
    }
}
