//! Lifecycle bookkeeping shared between a factory and its in-flight calls
//!
//! A factory hands clones of its [`LifecycleState`] handle and its
//! [`ShapeLedger`] to detached preview futures. The state lock is only held
//! for short synchronous sections, never across an engine call.

use crate::state::FactoryState;
use cadkit_core::{
    thread_safe, CancellationToken, Disposer, EngineError, MeshData, ShapeId, ThreadSafe,
};
use cadkit_engine::{GeometryEngine, ShapeRequest};
use tracing::{debug, trace, warn};

/// Mutable lifecycle data of one factory
#[derive(Default)]
pub(crate) struct LifecycleState {
    pub(crate) state: FactoryState,
    pub(crate) preview: Option<MeshData>,
    pub(crate) preview_shape: Option<ShapeId>,
    pub(crate) preview_fingerprint: Option<String>,
    pub(crate) in_flight: Option<CancellationToken>,
    pub(crate) result_id: Option<ShapeId>,
    pub(crate) disposed: bool,
    disposers: Vec<Disposer>,
}

impl LifecycleState {
    pub(crate) fn shared() -> ThreadSafe<Self> {
        thread_safe(Self::default())
    }

    pub(crate) fn set_state(&mut self, next: FactoryState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected factory transition {} -> {}", self.state, next);
        }
        trace!("Factory state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Fold a dropped or cancelled in-flight call back into Idle
    pub(crate) fn sync(&mut self) {
        let busy = matches!(
            self.state,
            FactoryState::Updating | FactoryState::Committing
        );
        let live = self
            .in_flight
            .as_ref()
            .is_some_and(|token| !token.is_cancelled());
        if busy && !live {
            self.in_flight = None;
            self.set_state(FactoryState::Idle);
        }
    }

    pub(crate) fn begin(&mut self, token: CancellationToken, state: FactoryState) {
        self.in_flight = Some(token);
        self.set_state(state);
    }

    /// Cancel the in-flight call, if any, and return to Idle
    pub(crate) fn abort_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            debug!("Cancelled in-flight call");
        }
        if matches!(
            self.state,
            FactoryState::Updating | FactoryState::Committing
        ) {
            self.set_state(FactoryState::Idle);
        }
    }

    /// Whether `token` still owns the factory and has not been cancelled
    pub(crate) fn is_current(&self, token: &CancellationToken) -> bool {
        !token.is_cancelled()
            && self
                .in_flight
                .as_ref()
                .is_some_and(|current| current.same_as(token))
    }

    /// Release the in-flight slot held by `token` and settle to `next`
    pub(crate) fn finish(&mut self, token: &CancellationToken, next: FactoryState) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|current| current.same_as(token))
        {
            self.in_flight = None;
            self.set_state(next);
        }
    }

    pub(crate) fn cached_preview(&self, fingerprint: &str) -> Option<MeshData> {
        match (&self.preview, &self.preview_fingerprint) {
            (Some(mesh), Some(cached)) if cached == fingerprint => Some(mesh.clone()),
            _ => None,
        }
    }

    /// Drop the cached preview, returning its engine shape
    pub(crate) fn clear_preview(&mut self) -> Option<ShapeId> {
        self.preview = None;
        self.preview_fingerprint = None;
        self.preview_shape.take()
    }

    pub(crate) fn push_disposer(&mut self, disposer: Disposer) {
        self.disposers.push(disposer);
    }

    pub(crate) fn take_disposers(&mut self) -> Vec<Disposer> {
        std::mem::take(&mut self.disposers)
    }
}

/// Registry of engine shapes created by calls that have not yet handed
/// them over to their factory
///
/// A shape stays recorded from creation until the call either adopts it or
/// deletes it. Entries whose token is cancelled belong to abandoned calls
/// and are deleted by [`ShapeLedger::sweep`].
#[derive(Clone, Default)]
pub struct ShapeLedger {
    entries: ThreadSafe<Vec<(CancellationToken, ShapeId)>>,
}

impl ShapeLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shape owned by the call holding `token`
    pub fn record(&self, token: &CancellationToken, shape: ShapeId) {
        self.entries.lock().push((token.clone(), shape));
    }

    /// Take ownership of a recorded shape
    ///
    /// Returns false if the shape was not recorded or was already swept.
    pub fn release(&self, shape: &ShapeId) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|(_, id)| id == shape) {
            Some(index) => {
                entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Mark a shape for deletion on the next sweep
    pub fn retire(&self, shape: ShapeId) {
        let token = CancellationToken::new();
        token.cancel();
        self.record(&token, shape);
    }

    /// Number of shapes currently recorded
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn take_abandoned(&self) -> Option<ShapeId> {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|(token, _)| token.is_cancelled())?;
        Some(entries.swap_remove(index).1)
    }

    /// Delete every shape left behind by cancelled or dropped calls
    pub async fn sweep(&self, engine: &dyn GeometryEngine) -> usize {
        let mut swept = 0;
        while let Some(shape) = self.take_abandoned() {
            delete_quietly(engine, &shape).await;
            swept += 1;
        }
        if swept > 0 {
            debug!("Swept {} abandoned shape(s)", swept);
        }
        swept
    }
}

/// Delete a shape, logging instead of failing
pub(crate) async fn delete_quietly(engine: &dyn GeometryEngine, shape: &ShapeId) {
    match engine.delete_shape(shape).await {
        Ok(()) => trace!("Deleted temporary shape {}", shape),
        Err(e) => warn!("Failed to delete temporary shape {}: {}", shape, e),
    }
}

/// Engine access for one preview or commit call
///
/// Shapes created through the call are tracked until the factory adopts
/// them, so a call abandoned midway never leaks engine-side results.
pub struct EngineCall<'a> {
    engine: &'a dyn GeometryEngine,
    token: &'a CancellationToken,
    deflection: f64,
    ledger: &'a ShapeLedger,
}

impl<'a> EngineCall<'a> {
    pub(crate) fn new(
        engine: &'a dyn GeometryEngine,
        token: &'a CancellationToken,
        deflection: f64,
        ledger: &'a ShapeLedger,
    ) -> Self {
        Self {
            engine,
            token,
            deflection,
            ledger,
        }
    }

    /// The engine behind this call
    pub fn engine(&self) -> &'a dyn GeometryEngine {
        self.engine
    }

    /// Token governing this call
    pub fn token(&self) -> &'a CancellationToken {
        self.token
    }

    /// Linear deflection requested for this call
    pub fn deflection(&self) -> f64 {
        self.deflection
    }

    /// Create a shape owned by this call
    pub async fn create(&self, request: &ShapeRequest) -> Result<ShapeId, EngineError> {
        let shape = self.engine.create_shape(request, self.token).await?;
        self.ledger.record(self.token, shape.clone());
        Ok(shape)
    }

    /// Tessellate a shape at this call's deflection
    pub async fn tessellate(&self, shape: &ShapeId) -> Result<MeshData, EngineError> {
        self.engine.tessellate(shape, self.deflection).await
    }

    /// Delete a shape created by this call
    pub async fn discard(&self, shape: &ShapeId) {
        if self.ledger.release(shape) {
            delete_quietly(self.engine, shape).await;
        }
    }

    /// Create a shape and tessellate it, deleting it if tessellation fails
    pub async fn create_and_tessellate(
        &self,
        request: &ShapeRequest,
    ) -> Result<(ShapeId, MeshData), EngineError> {
        let shape = self.create(request).await?;
        match self.tessellate(&shape).await {
            Ok(mesh) => Ok((shape, mesh)),
            Err(e) => {
                self.discard(&shape).await;
                Err(e)
            }
        }
    }
}

/// Cancels a token when dropped, ending a call abandoned by its caller
pub(crate) struct CancelOnDrop(pub(crate) CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
