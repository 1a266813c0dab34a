//! Operation factories
//!
//! A factory owns one parametric operation and drives it through the
//! preview/commit lifecycle:
//!
//! ```text
//! Idle ──update──▶ Updating ──result──▶ Idle
//!   │                 │
//!   └──────commit─────┴──▶ Committing ──▶ Committed
//!                                    └──▶ Idle (failure)
//! any non-terminal ──cancel──▶ Cancelled
//! ```
//!
//! Only the latest update's result is ever applied: every call carries its
//! own cancellation token, and the token is checked again right before the
//! result is stored.

use crate::context::OperationContext;
use crate::lifecycle::{CancelOnDrop, EngineCall, LifecycleState, ShapeLedger};
use crate::state::FactoryState;
use async_trait::async_trait;
use cadkit_core::{
    CancellableOperation, Disposer, EngineError, EventDispatcher, EventHandler, FactoryError,
    FactoryEvent, MeshData, OperationOptions, OperationResult, Settled, ShapeId, ThreadSafe,
    ValidationError,
};
use cadkit_engine::ShapeRequest;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Object-safe lifecycle contract shared by single and composite factories
#[async_trait]
pub trait Factory: Send {
    /// Short name of what this factory builds
    fn kind(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> FactoryState;

    /// Whether `dispose` has run
    fn is_disposed(&self) -> bool;

    /// Check the current parameters
    fn validate(&self) -> Result<(), ValidationError>;

    /// Whether the current parameters are valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Whether a commit would be attempted right now
    fn can_commit(&self) -> bool {
        !self.is_disposed() && self.state().can_commit() && self.is_valid()
    }

    /// Names of every parameter this factory accepts
    fn param_names(&self) -> Vec<String>;

    /// Current value of a parameter
    fn param(&self, name: &str) -> Option<f64>;

    /// Whether this factory declares a parameter
    fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Write a parameter and fire a parameter-changed event
    fn set_param(&mut self, name: &str, value: f64) -> Result<(), FactoryError>;

    /// Serialization of the current parameters
    fn fingerprint(&self) -> String;

    /// Most recent preview mesh
    fn preview(&self) -> Option<MeshData>;

    /// Identity of the committed shape
    fn result_id(&self) -> Option<ShapeId>;

    /// Named output value such as `volume` or `vertex_count`
    fn output(&self, key: &str) -> Option<Value>;

    /// Event slot of this factory
    fn events(&self) -> &EventDispatcher;

    /// Register the event handler, replacing any previous one
    fn set_event_handler(&mut self, handler: EventHandler) -> bool {
        self.events().set_handler(move |event| handler(event))
    }

    /// Remove the event handler
    fn clear_event_handler(&mut self) -> bool {
        self.events().clear_handler()
    }

    /// Register a callback run once on dispose
    fn add_disposer(&mut self, disposer: Disposer);

    /// Start a preview update, superseding any update still in flight
    fn update(&mut self, options: OperationOptions) -> CancellableOperation<MeshData>;

    /// Return the cached preview if parameters are unchanged, else update
    fn update_with_cache(&mut self, options: OperationOptions) -> CancellableOperation<MeshData>;

    /// Finalize the operation in the engine
    async fn commit(&mut self, options: OperationOptions) -> OperationResult;

    /// Abandon the operation; no-op once terminal
    async fn cancel(&mut self);

    /// Cancel, then return to a fresh Idle state
    async fn reset(&mut self);

    /// Cancel if needed and release every resource; idempotent
    async fn dispose(&mut self);

    /// Delete the committed shape and return to Idle
    async fn revert_commit(&mut self) -> Result<(), FactoryError>;
}

/// A parameter set that can be turned into engine geometry
///
/// Implementors describe their parameters and validity; the default preview
/// and commit steps create the payload shape and tessellate it.
#[async_trait]
pub trait ParametricOperation: Clone + Send + Sync + 'static {
    /// Short name of the shape
    fn kind(&self) -> &'static str;

    /// Check the parameters
    fn validate(&self) -> Result<(), ValidationError>;

    /// Engine request for the current parameters
    fn payload(&self) -> ShapeRequest;

    /// Names of every parameter
    fn param_names(&self) -> &'static [&'static str];

    /// Read a parameter
    fn param(&self, name: &str) -> Option<f64>;

    /// Write a parameter; false if the name is unknown
    fn set_param(&mut self, name: &str, value: f64) -> bool;

    /// Analytic volume of the shape
    fn volume(&self) -> f64;

    /// Produce preview geometry
    async fn generate_preview(
        &self,
        call: EngineCall<'_>,
    ) -> Result<(ShapeId, MeshData), EngineError> {
        call.create_and_tessellate(&self.payload()).await
    }

    /// Produce the committed geometry
    async fn commit_shape(&self, call: EngineCall<'_>) -> Result<(ShapeId, MeshData), EngineError> {
        call.create_and_tessellate(&self.payload()).await
    }
}

/// Factory driving a single parametric operation
pub struct OperationFactory<Op: ParametricOperation> {
    op: Arc<Op>,
    context: OperationContext,
    lifecycle: ThreadSafe<LifecycleState>,
    ledger: ShapeLedger,
    events: EventDispatcher,
    fingerprint: String,
}

impl<Op: ParametricOperation> OperationFactory<Op> {
    /// Create an idle factory
    pub fn new(context: OperationContext, op: Op) -> Self {
        let fingerprint = op.payload().fingerprint();
        Self {
            op: Arc::new(op),
            context,
            lifecycle: LifecycleState::shared(),
            ledger: ShapeLedger::new(),
            events: EventDispatcher::new(),
            fingerprint,
        }
    }

    /// Current parameters
    pub fn operation(&self) -> &Op {
        &self.op
    }

    /// The context this factory was built with
    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    /// Engine shapes created by calls that have not yet been adopted
    pub fn pending_shapes(&self) -> usize {
        self.ledger.len()
    }

    pub(crate) fn write_param(&mut self, name: &str, value: f64) -> Result<(), FactoryError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed {
                return Err(FactoryError::Disposed);
            }
            if !lifecycle.state.accepts_parameters() {
                return Err(FactoryError::invalid_state("set parameter", lifecycle.state));
            }
            if self.op.param(name).is_none() {
                return Err(FactoryError::UnknownParameter {
                    name: name.to_string(),
                });
            }
            // The running preview no longer matches the parameters
            lifecycle.abort_in_flight();
        }

        Arc::make_mut(&mut self.op).set_param(name, value);
        self.fingerprint = self.op.payload().fingerprint();
        self.events.publish(FactoryEvent::ParameterChanged {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn reject_invalid(&self) -> Option<FactoryError> {
        let error = FactoryError::from(self.op.validate().err()?);
        debug!("Rejected {} parameters: {}", self.op.kind(), error);
        self.events.publish(FactoryEvent::Errored(error.clone()));
        Some(error)
    }
}

#[async_trait]
impl<Op: ParametricOperation> Factory for OperationFactory<Op> {
    fn kind(&self) -> &str {
        self.op.kind()
    }

    fn state(&self) -> FactoryState {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.sync();
        lifecycle.state
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.lock().disposed
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.op.validate()
    }

    fn param_names(&self) -> Vec<String> {
        self.op.param_names().iter().map(|s| s.to_string()).collect()
    }

    fn param(&self, name: &str) -> Option<f64> {
        self.op.param(name)
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<(), FactoryError> {
        self.write_param(name, value)
    }

    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }

    fn preview(&self) -> Option<MeshData> {
        self.lifecycle.lock().preview.clone()
    }

    fn result_id(&self) -> Option<ShapeId> {
        self.lifecycle.lock().result_id.clone()
    }

    fn output(&self, key: &str) -> Option<Value> {
        match key {
            "kind" => Some(json!(self.op.kind())),
            "volume" => Some(json!(self.op.volume())),
            "vertex_count" => self.preview().map(|mesh| json!(mesh.vertex_count())),
            "triangle_count" => self.preview().map(|mesh| json!(mesh.triangle_count())),
            "result_ids" => self.result_id().map(|id| json!([id.as_str()])),
            name => self.op.param(name).map(|value| json!(value)),
        }
    }

    fn events(&self) -> &EventDispatcher {
        &self.events
    }

    fn add_disposer(&mut self, disposer: Disposer) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.disposed {
            drop(lifecycle);
            disposer();
        } else {
            lifecycle.push_disposer(disposer);
        }
    }

    fn update(&mut self, options: OperationOptions) -> CancellableOperation<MeshData> {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed {
                return CancellableOperation::rejected(FactoryError::Disposed);
            }
            if !lifecycle.state.accepts_parameters() {
                return CancellableOperation::rejected(FactoryError::invalid_state(
                    "update",
                    lifecycle.state,
                ));
            }
            lifecycle.abort_in_flight();
        }

        if !options.skip_validation {
            if let Some(error) = self.reject_invalid() {
                return CancellableOperation::rejected(error);
            }
        }

        let token = options.call_token();
        self.lifecycle
            .lock()
            .begin(token.clone(), FactoryState::Updating);
        debug!("Updating {} preview", self.op.kind());

        let op = Arc::clone(&self.op);
        let engine = Arc::clone(self.context.engine());
        let deflection = self.context.preview_deflection();
        let lifecycle = Arc::clone(&self.lifecycle);
        let ledger = self.ledger.clone();
        let events = self.events.clone();
        let fingerprint = self.fingerprint.clone();
        let call_token = token.clone();

        CancellableOperation::new(token, async move {
            let token = call_token;
            ledger.sweep(engine.as_ref()).await;

            let current = lifecycle.lock().is_current(&token);
            if !current {
                lifecycle.lock().finish(&token, FactoryState::Idle);
                return Settled::Discarded;
            }

            let outcome = op
                .generate_preview(EngineCall::new(
                    engine.as_ref(),
                    &token,
                    deflection,
                    &ledger,
                ))
                .await;

            match outcome {
                Ok((shape, mesh)) => {
                    let owned = ledger.release(&shape);
                    let adopted = {
                        let mut lifecycle = lifecycle.lock();
                        if owned && lifecycle.is_current(&token) {
                            let previous = lifecycle.preview_shape.replace(shape.clone());
                            lifecycle.preview = Some(mesh.clone());
                            lifecycle.preview_fingerprint = Some(fingerprint);
                            lifecycle.finish(&token, FactoryState::Idle);
                            Some(previous)
                        } else {
                            lifecycle.finish(&token, FactoryState::Idle);
                            None
                        }
                    };

                    match adopted {
                        Some(previous) => {
                            if let Some(previous) = previous {
                                ledger.retire(previous);
                            }
                            events.publish(FactoryEvent::PreviewUpdated(mesh.clone()));
                            ledger.sweep(engine.as_ref()).await;
                            Settled::Completed(mesh)
                        }
                        None => {
                            if owned {
                                ledger.retire(shape);
                            }
                            debug!("Discarded superseded {} preview", op.kind());
                            ledger.sweep(engine.as_ref()).await;
                            Settled::Discarded
                        }
                    }
                }
                Err(e) => {
                    let current = {
                        let mut lifecycle = lifecycle.lock();
                        let current = lifecycle.is_current(&token);
                        lifecycle.finish(&token, FactoryState::Idle);
                        current
                    };
                    if !current {
                        debug!("Ignoring failure of superseded {} preview: {}", op.kind(), e);
                        return Settled::Discarded;
                    }
                    let error = FactoryError::Engine(e);
                    error!("{} preview failed: {}", op.kind(), error);
                    events.publish(FactoryEvent::Errored(error.clone()));
                    Settled::Failed(error)
                }
            }
        })
    }

    fn update_with_cache(&mut self, options: OperationOptions) -> CancellableOperation<MeshData> {
        let cached = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed || !lifecycle.state.accepts_parameters() {
                None
            } else {
                lifecycle.cached_preview(&self.fingerprint)
            }
        };
        match cached {
            Some(mesh) => {
                debug!("Reusing cached {} preview", self.op.kind());
                CancellableOperation::resolved(mesh)
            }
            None => self.update(options),
        }
    }

    async fn commit(&mut self, options: OperationOptions) -> OperationResult {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed {
                return OperationResult::failed(FactoryError::Disposed);
            }
            if !lifecycle.state.can_commit() {
                return OperationResult::failed(FactoryError::invalid_state(
                    "commit",
                    lifecycle.state,
                ));
            }
            lifecycle.abort_in_flight();
        }

        if !options.skip_validation {
            if let Some(error) = self.reject_invalid() {
                return OperationResult::failed(error);
            }
        }

        let token = options.call_token();
        let _abandon = CancelOnDrop(token.clone());
        let engine = Arc::clone(self.context.engine());
        let promoted = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.begin(token.clone(), FactoryState::Committing);
            let fresh = lifecycle.preview_fingerprint.as_deref() == Some(self.fingerprint.as_str());
            if engine.supports_preview_promotion() && fresh {
                lifecycle.preview_shape.take()
            } else {
                None
            }
        };
        info!("Committing {}", self.op.kind());
        self.ledger.sweep(engine.as_ref()).await;

        let call = EngineCall::new(
            engine.as_ref(),
            &token,
            self.context.commit_deflection(),
            &self.ledger,
        );
        let outcome = match &promoted {
            Some(shape) => {
                debug!("Promoting preview shape {}", shape);
                self.ledger.record(&token, shape.clone());
                call.tessellate(shape).await.map(|mesh| (shape.clone(), mesh))
            }
            None => self.op.commit_shape(call).await,
        };

        match outcome {
            Ok((shape, mesh)) => {
                let owned = self.ledger.release(&shape);
                if !owned || token.is_cancelled() {
                    {
                        let mut lifecycle = self.lifecycle.lock();
                        if owned && promoted.is_some() {
                            lifecycle.preview_shape = Some(shape);
                        } else if owned {
                            self.ledger.retire(shape);
                        }
                        lifecycle.finish(&token, FactoryState::Idle);
                    }
                    self.ledger.sweep(engine.as_ref()).await;
                    info!("Commit of {} cancelled", self.op.kind());
                    return OperationResult::failed(FactoryError::Cancelled);
                }

                let stale_preview = {
                    let mut lifecycle = self.lifecycle.lock();
                    lifecycle.result_id = Some(shape.clone());
                    lifecycle.finish(&token, FactoryState::Committed);
                    lifecycle.preview_shape.take()
                };
                if let Some(stale) = stale_preview {
                    self.ledger.retire(stale);
                }
                self.ledger.sweep(engine.as_ref()).await;

                info!("Committed {} as {}", self.op.kind(), shape);
                let result = OperationResult::succeeded(shape, mesh);
                self.events
                    .publish(FactoryEvent::Committed(result.clone()));
                result
            }
            Err(e) => {
                {
                    let mut lifecycle = self.lifecycle.lock();
                    if let Some(shape) = promoted {
                        if self.ledger.release(&shape) {
                            lifecycle.preview_shape = Some(shape);
                        }
                    }
                    lifecycle.finish(&token, FactoryState::Idle);
                }
                if token.is_cancelled() {
                    info!("Commit of {} cancelled", self.op.kind());
                    return OperationResult::failed(FactoryError::Cancelled);
                }
                let error = FactoryError::Engine(e);
                error!("Commit of {} failed: {}", self.op.kind(), error);
                self.events.publish(FactoryEvent::Errored(error.clone()));
                OperationResult::failed(error)
            }
        }
    }

    async fn cancel(&mut self) {
        let stale = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed || lifecycle.state.is_terminal() {
                return;
            }
            lifecycle.abort_in_flight();
            lifecycle.set_state(FactoryState::Cancelled);
            lifecycle.clear_preview()
        };
        if let Some(shape) = stale {
            self.ledger.retire(shape);
        }
        self.ledger.sweep(self.context.engine().as_ref()).await;
        info!("Cancelled {}", self.op.kind());
        self.events.publish(FactoryEvent::Cancelled);
    }

    async fn reset(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel().await;
        let stale = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_id = None;
            lifecycle.set_state(FactoryState::Idle);
            lifecycle.clear_preview()
        };
        if let Some(shape) = stale {
            self.ledger.retire(shape);
            self.ledger.sweep(self.context.engine().as_ref()).await;
        }
        self.fingerprint = self.op.payload().fingerprint();
        debug!("Reset {}", self.op.kind());
    }

    async fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel().await;
        let disposers = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.disposed = true;
            lifecycle.take_disposers()
        };
        for disposer in disposers {
            disposer();
        }
        self.ledger.sweep(self.context.engine().as_ref()).await;
        self.events.clear_handler();
        debug!("Disposed {}", self.op.kind());
    }

    async fn revert_commit(&mut self) -> Result<(), FactoryError> {
        let shape = {
            let lifecycle = self.lifecycle.lock();
            match (&lifecycle.state, &lifecycle.result_id) {
                (FactoryState::Committed, Some(shape)) => shape.clone(),
                (state, _) => return Err(FactoryError::invalid_state("revert commit", state)),
            }
        };

        if let Err(e) = self.context.engine().delete_shape(&shape).await {
            warn!("Failed to revert {} commit {}: {}", self.op.kind(), shape, e);
            return Err(FactoryError::Engine(e));
        }

        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_id = None;
            lifecycle.set_state(FactoryState::Idle);
        }
        info!("Reverted {} commit {}", self.op.kind(), shape);
        Ok(())
    }
}

impl<Op: ParametricOperation> Drop for OperationFactory<Op> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.disposed {
            return;
        }
        if let Some(shape) = &lifecycle.preview_shape {
            warn!(
                "{} factory dropped without dispose; preview shape {} is left in the engine",
                self.op.kind(),
                shape
            );
        }
        if !self.ledger.is_empty() {
            warn!(
                "{} factory dropped without dispose; {} unadopted shapes are left in the engine",
                self.op.kind(),
                self.ledger.len()
            );
        }
    }
}

impl<Op: ParametricOperation + fmt::Debug> fmt::Debug for OperationFactory<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFactory")
            .field("op", &self.op)
            .field("state", &self.state())
            .field("events", &self.events)
            .finish()
    }
}
