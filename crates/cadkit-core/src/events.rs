//! Factory lifecycle events
//!
//! Every factory reports its lifecycle through one tagged [`FactoryEvent`]
//! delivered to a single registered handler. Registering a new handler
//! replaces the previous one.

use crate::error::FactoryError;
use crate::mesh::MeshData;
use crate::result::OperationResult;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Lifecycle event emitted by a factory
#[derive(Debug, Clone, PartialEq)]
pub enum FactoryEvent {
    /// A parameter was written
    ParameterChanged {
        /// Parameter name.
        name: String,
        /// New value.
        value: f64,
    },
    /// A new preview mesh is available
    PreviewUpdated(MeshData),
    /// The operation was finalized in the engine
    Committed(OperationResult),
    /// The operation was cancelled
    Cancelled,
    /// An update or commit attempt failed
    Errored(FactoryError),
}

/// Discriminant of [`FactoryEvent`], handy for filtering and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`FactoryEvent::ParameterChanged`]
    ParameterChanged,
    /// See [`FactoryEvent::PreviewUpdated`]
    PreviewUpdated,
    /// See [`FactoryEvent::Committed`]
    Committed,
    /// See [`FactoryEvent::Cancelled`]
    Cancelled,
    /// See [`FactoryEvent::Errored`]
    Errored,
}

impl FactoryEvent {
    /// Get the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            FactoryEvent::ParameterChanged { .. } => EventKind::ParameterChanged,
            FactoryEvent::PreviewUpdated(_) => EventKind::PreviewUpdated,
            FactoryEvent::Committed(_) => EventKind::Committed,
            FactoryEvent::Cancelled => EventKind::Cancelled,
            FactoryEvent::Errored(_) => EventKind::Errored,
        }
    }
}

impl fmt::Display for FactoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryEvent::ParameterChanged { name, value } => {
                write!(f, "Parameter {} = {}", name, value)
            }
            FactoryEvent::PreviewUpdated(mesh) => write!(
                f,
                "Preview updated ({} vertices, {} triangles)",
                mesh.vertex_count(),
                mesh.triangle_count()
            ),
            FactoryEvent::Committed(result) => match &result.result_id {
                Some(id) => write!(f, "Committed {}", id),
                None => write!(f, "Committed"),
            },
            FactoryEvent::Cancelled => write!(f, "Cancelled"),
            FactoryEvent::Errored(err) => write!(f, "Error: {}", err),
        }
    }
}

/// Handler invoked for every event a factory emits
pub type EventHandler = Arc<dyn Fn(FactoryEvent) + Send + Sync>;

/// Single-slot event dispatcher
///
/// Cloning the dispatcher shares the slot, so detached preview tasks publish
/// to whatever handler is registered at the moment the result lands.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handler: Arc<RwLock<Option<EventHandler>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler, replacing any previous one
    ///
    /// Returns true if a previous handler was replaced.
    pub fn set_handler<F>(&self, handler: F) -> bool
    where
        F: Fn(FactoryEvent) + Send + Sync + 'static,
    {
        self.handler.write().replace(Arc::new(handler)).is_some()
    }

    /// Remove the handler
    ///
    /// Returns true if a handler was registered.
    pub fn clear_handler(&self) -> bool {
        self.handler.write().take().is_some()
    }

    /// Check if a handler is registered
    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Deliver an event to the registered handler
    ///
    /// The handler runs on the publishing thread, outside the slot's lock.
    /// Returns true if a handler received the event.
    pub fn publish(&self, event: FactoryEvent) -> bool {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                tracing::trace!("Dispatching event: {}", event);
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}
