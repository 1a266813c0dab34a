//! Composite factory
//!
//! Groups several factories into one logical operation. Parameter writes fan
//! out to every child that declares the parameter, previews run concurrently
//! and are merged into one mesh, and commit is all-or-nothing: if any child
//! fails, the children committed earlier in the same call are reverted.

pub mod reducers;

pub use reducers::{ReduceFn, Reducer};

use crate::context::OperationContext;
use crate::factory::Factory;
use crate::lifecycle::{CancelOnDrop, LifecycleState};
use crate::state::FactoryState;
use async_trait::async_trait;
use cadkit_core::{
    CancellableOperation, Disposer, EventDispatcher, FactoryError, FactoryEvent, MeshData,
    OperationOptions, OperationResult, Settled, ShapeId, ThreadSafe, ValidationError,
};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Factory treating its children as one transactional unit
pub struct CompositeFactory {
    children: Vec<Box<dyn Factory>>,
    // Children committed by a composite commit that has not settled as
    // Committed. Reverted before the next commit, cancel or removal.
    stranded: Vec<usize>,
    reducers: HashMap<String, Reducer>,
    context: OperationContext,
    lifecycle: ThreadSafe<LifecycleState>,
    events: EventDispatcher,
}

impl CompositeFactory {
    /// Create an empty composite with the default reducers
    pub fn new(context: OperationContext) -> Self {
        let reducers = [
            ("volume", Reducer::Sum),
            ("vertex_count", Reducer::Sum),
            ("triangle_count", Reducer::Sum),
            ("result_ids", Reducer::MergeSet),
            ("kind", Reducer::FirstNonNull),
        ]
        .into_iter()
        .map(|(key, reducer)| (key.to_string(), reducer))
        .collect();

        Self {
            children: Vec::new(),
            stranded: Vec::new(),
            reducers,
            context,
            lifecycle: LifecycleState::shared(),
            events: EventDispatcher::new(),
        }
    }

    /// Builder-style child registration
    pub fn with_child<F: Factory + 'static>(mut self, child: F) -> Self {
        self.children.push(Box::new(child));
        self
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if the composite has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Borrow a child
    pub fn child(&self, index: usize) -> Option<&dyn Factory> {
        self.children.get(index).map(|child| child.as_ref())
    }

    /// Mutably borrow a child
    pub fn child_mut(&mut self, index: usize) -> Option<&mut (dyn Factory + 'static)> {
        self.children.get_mut(index).map(|child| child.as_mut())
    }

    /// Register the reducer for an output key, returning the previous one
    pub fn register_reducer(&mut self, key: impl Into<String>, reducer: Reducer) -> Option<Reducer> {
        self.reducers.insert(key.into(), reducer)
    }

    /// Append a child; only while Idle
    pub fn add_child(&mut self, child: Box<dyn Factory>) -> Result<(), FactoryError> {
        self.ensure_idle("add child")?;
        debug!("Adding {} child to composite", child.kind());
        self.children.push(child);
        Ok(())
    }

    /// Remove and dispose a child; only while Idle
    pub async fn remove_child(&mut self, index: usize) -> Result<(), FactoryError> {
        self.ensure_idle("remove child")?;
        if index >= self.children.len() {
            return Err(FactoryError::ChildIndex { index });
        }
        self.rollback().await;
        let mut child = self.children.remove(index);
        self.stranded.retain(|&i| i != index);
        for i in self.stranded.iter_mut().filter(|i| **i > index) {
            *i -= 1;
        }
        debug!("Removing {} child {} from composite", child.kind(), index);
        child.dispose().await;
        Ok(())
    }

    fn ensure_idle(&self, operation: &str) -> Result<(), FactoryError> {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.sync();
        if lifecycle.disposed {
            return Err(FactoryError::Disposed);
        }
        if lifecycle.state != FactoryState::Idle {
            return Err(FactoryError::invalid_state(operation, lifecycle.state));
        }
        Ok(())
    }

    fn reject_invalid(&self) -> Option<FactoryError> {
        let error = FactoryError::from(self.validate().err()?);
        debug!("Rejected composite parameters: {}", error);
        self.events.publish(FactoryEvent::Errored(error.clone()));
        Some(error)
    }

    fn start_update(
        &mut self,
        options: OperationOptions,
        use_cache: bool,
    ) -> CancellableOperation<MeshData> {
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

        let child_options = OperationOptions {
            token: Some(token.clone()),
            skip_validation: options.skip_validation,
        };
        let pending: Vec<_> = self
            .children
            .iter_mut()
            .map(|child| {
                if use_cache {
                    child.update_with_cache(child_options.clone())
                } else {
                    child.update(child_options.clone())
                }
            })
            .collect();
        debug!("Updating composite preview across {} children", pending.len());

        let lifecycle = Arc::clone(&self.lifecycle);
        let events = self.events.clone();
        let fingerprint = self.fingerprint();
        let call_token = token.clone();

        CancellableOperation::new(token, async move {
            let token = call_token;
            let outcomes = join_all(pending).await;

            let mut meshes = Vec::with_capacity(outcomes.len());
            for (index, outcome) in outcomes.into_iter().enumerate() {
                match outcome {
                    Settled::Completed(mesh) => meshes.push(mesh),
                    Settled::Failed(source) => {
                        let current = {
                            let mut lifecycle = lifecycle.lock();
                            let current = lifecycle.is_current(&token);
                            lifecycle.finish(&token, FactoryState::Idle);
                            current
                        };
                        if !current {
                            return Settled::Discarded;
                        }
                        let error = FactoryError::ChildUpdate {
                            index,
                            source: Box::new(source),
                        };
                        error!("Composite preview failed: {}", error);
                        events.publish(FactoryEvent::Errored(error.clone()));
                        return Settled::Failed(error);
                    }
                    Settled::Discarded => {
                        lifecycle.lock().finish(&token, FactoryState::Idle);
                        return Settled::Discarded;
                    }
                }
            }

            let merged = MeshData::merge(&meshes);
            let adopted = {
                let mut lifecycle = lifecycle.lock();
                let current = lifecycle.is_current(&token);
                if current {
                    lifecycle.preview = Some(merged.clone());
                    lifecycle.preview_fingerprint = Some(fingerprint);
                }
                lifecycle.finish(&token, FactoryState::Idle);
                current
            };
            if !adopted {
                debug!("Discarded superseded composite preview");
                return Settled::Discarded;
            }

            debug!(
                "Composite preview merged {} meshes into {} vertices",
                meshes.len(),
                merged.vertex_count()
            );
            events.publish(FactoryEvent::PreviewUpdated(merged.clone()));
            Settled::Completed(merged)
        })
    }

    /// Revert stranded children in reverse commit order
    ///
    /// Children that cannot be reverted stay stranded so a later call can
    /// retry them. Returns one message per child left committed.
    async fn rollback(&mut self) -> Vec<String> {
        let attempts = self.context.config().composite.rollback_attempts.max(1);
        let mut failures = Vec::new();

        let pending: Vec<usize> = self.stranded.iter().rev().copied().collect();
        for index in pending {
            let Some(child) = self.children.get_mut(index) else {
                self.stranded.retain(|&i| i != index);
                continue;
            };
            if child.state() != FactoryState::Committed {
                self.stranded.retain(|&i| i != index);
                continue;
            }

            let mut last_error = None;
            for attempt in 1..=attempts {
                match child.revert_commit().await {
                    Ok(()) => {
                        last_error = None;
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "Rollback of child {} failed (attempt {}/{}): {}",
                            index, attempt, attempts, e
                        );
                        last_error = Some(e);
                    }
                }
            }
            match last_error {
                Some(e) => failures.push(format!("child {}: {}", index, e)),
                None => self.stranded.retain(|&i| i != index),
            }
        }
        failures
    }
}

#[async_trait]
impl Factory for CompositeFactory {
    fn kind(&self) -> &str {
        "composite"
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
        if self.children.is_empty() {
            return Err(ValidationError::EmptyComposite);
        }
        for (index, child) in self.children.iter().enumerate() {
            child.validate().map_err(|e| ValidationError::Child {
                index,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    fn param_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.children.iter().flat_map(|child| child.param_names()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn param(&self, name: &str) -> Option<f64> {
        self.children.iter().find_map(|child| child.param(name))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<(), FactoryError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed {
                return Err(FactoryError::Disposed);
            }
            if !lifecycle.state.accepts_parameters() {
                return Err(FactoryError::invalid_state("set parameter", lifecycle.state));
            }
            if !self.children.iter().any(|child| child.has_param(name)) {
                return Err(FactoryError::UnknownParameter {
                    name: name.to_string(),
                });
            }
            lifecycle.abort_in_flight();
        }

        for child in self.children.iter_mut().filter(|child| child.has_param(name)) {
            child.set_param(name, value)?;
        }
        self.events.publish(FactoryEvent::ParameterChanged {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn fingerprint(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|child| child.fingerprint()).collect();
        format!("composite[{}]", parts.join(";"))
    }

    fn preview(&self) -> Option<MeshData> {
        self.lifecycle.lock().preview.clone()
    }

    fn result_id(&self) -> Option<ShapeId> {
        self.lifecycle.lock().result_id.clone()
    }

    fn output(&self, key: &str) -> Option<Value> {
        let values = self.children.iter().map(|child| child.output(key));
        match self.reducers.get(key) {
            Some(reducer) => reducer.reduce(values),
            None => Reducer::FirstNonNull.reduce(values),
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
        self.start_update(options, false)
    }

    fn update_with_cache(&mut self, options: OperationOptions) -> CancellableOperation<MeshData> {
        let fingerprint = self.fingerprint();
        let cached = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed || !lifecycle.state.accepts_parameters() {
                None
            } else {
                lifecycle.cached_preview(&fingerprint)
            }
        };
        match cached {
            Some(mesh) => {
                debug!("Reusing cached composite preview");
                CancellableOperation::resolved(mesh)
            }
            None => self.start_update(options, true),
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

        if !self.stranded.is_empty() {
            debug!(
                "Reverting {} children left committed by an earlier commit",
                self.stranded.len()
            );
            let rollback_failures = self.rollback().await;
            if let Some(&index) = self.stranded.first() {
                let error = FactoryError::CompositeCommit {
                    index,
                    source: Box::new(FactoryError::invalid_state(
                        "commit",
                        FactoryState::Committed,
                    )),
                    rollback_failures,
                };
                error!("Composite commit blocked: {}", error);
                self.events.publish(FactoryEvent::Errored(error.clone()));
                return OperationResult::failed(error);
            }
        }

        let token = options.call_token();
        let _abandon = CancelOnDrop(token.clone());
        self.lifecycle
            .lock()
            .begin(token.clone(), FactoryState::Committing);
        info!("Committing composite of {} children", self.children.len());

        let child_options = OperationOptions {
            token: Some(token.clone()),
            skip_validation: options.skip_validation,
        };
        let mut results = Vec::with_capacity(self.children.len());
        let mut failure = None;
        for (index, child) in self.children.iter_mut().enumerate() {
            let result = child.commit(child_options.clone()).await;
            if result.success {
                self.stranded.push(index);
                results.push(result);
            } else {
                failure = Some((index, result.error.unwrap_or(FactoryError::Cancelled)));
                break;
            }
        }
        if failure.is_none() && token.is_cancelled() {
            failure = Some((self.children.len(), FactoryError::Cancelled));
        }

        if let Some((index, source)) = failure {
            let rollback_failures = self.rollback().await;
            self.lifecycle.lock().finish(&token, FactoryState::Idle);

            if token.is_cancelled() && source == FactoryError::Cancelled {
                info!("Composite commit cancelled");
                return OperationResult::failed(FactoryError::Cancelled);
            }
            let error = FactoryError::CompositeCommit {
                index,
                source: Box::new(source),
                rollback_failures,
            };
            error!("Composite commit failed: {}", error);
            self.events.publish(FactoryEvent::Errored(error.clone()));
            return OperationResult::failed(error);
        }

        self.stranded.clear();
        let merged = MeshData::merge(results.iter().filter_map(|result| result.mesh.as_ref()));
        let result_id = results.iter().find_map(|result| result.result_id.clone());
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_id = result_id.clone();
            lifecycle.finish(&token, FactoryState::Committed);
        }

        let result = OperationResult {
            result_id,
            mesh: Some(merged),
            success: true,
            error: None,
        };
        info!("Committed composite of {} children", results.len());
        self.events.publish(FactoryEvent::Committed(result.clone()));
        result
    }

    async fn cancel(&mut self) {
        let cancelled = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.sync();
            if lifecycle.disposed || lifecycle.state.is_terminal() {
                false
            } else {
                lifecycle.abort_in_flight();
                lifecycle.set_state(FactoryState::Cancelled);
                lifecycle.clear_preview();
                true
            }
        };

        let rollback_failures = self.rollback().await;
        if !rollback_failures.is_empty() {
            warn!(
                "Cancelled composite left {} children committed",
                rollback_failures.len()
            );
        }
        for child in self.children.iter_mut() {
            child.cancel().await;
        }

        if cancelled {
            info!("Cancelled composite");
            self.events.publish(FactoryEvent::Cancelled);
        }
    }

    async fn reset(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel().await;
        for child in self.children.iter_mut() {
            child.reset().await;
        }
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_id = None;
            lifecycle.clear_preview();
            lifecycle.set_state(FactoryState::Idle);
        }
        debug!("Reset composite");
    }

    async fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel().await;
        for child in self.children.iter_mut() {
            child.dispose().await;
        }
        let disposers = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.disposed = true;
            lifecycle.take_disposers()
        };
        for disposer in disposers {
            disposer();
        }
        self.events.clear_handler();
        debug!("Disposed composite");
    }

    async fn revert_commit(&mut self) -> Result<(), FactoryError> {
        {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state != FactoryState::Committed {
                return Err(FactoryError::invalid_state("revert commit", lifecycle.state));
            }
        }

        let mut first_error = None;
        for (index, child) in self.children.iter_mut().enumerate().rev() {
            if child.state() != FactoryState::Committed {
                continue;
            }
            if let Err(e) = child.revert_commit().await {
                warn!("Failed to revert composite child {}: {}", index, e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_id = None;
            lifecycle.set_state(FactoryState::Idle);
        }
        info!("Reverted composite commit");
        Ok(())
    }
}

impl Drop for CompositeFactory {
    fn drop(&mut self) {
        if !self.stranded.is_empty() && !self.lifecycle.lock().disposed {
            warn!(
                "Composite dropped with children {:?} still committed by an unfinished commit",
                self.stranded
            );
        }
    }
}

impl fmt::Debug for CompositeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.children.iter().map(|child| child.kind()).collect();
        f.debug_struct("CompositeFactory")
            .field("children", &kinds)
            .field("state", &self.state())
            .field("reducers", &self.reducers.keys().collect::<Vec<_>>())
            .finish()
    }
}
