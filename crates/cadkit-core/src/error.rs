//! Error handling for CADKit
//!
//! Provides error types for every layer of the operation lifecycle:
//! - Validation errors (parameters rejected by a factory)
//! - Engine errors (failures reported by the geometry engine)
//! - Factory errors (lifecycle misuse, engine failures, composite rollback)
//! - Configuration errors (loading lifecycle settings)
//!
//! All error types use `thiserror`. Errors that travel through factory events
//! are `Clone` so a single failure can be both reported and returned.

use thiserror::Error;

/// Validation error type
///
/// Raised when a factory's parameter set fails its validity predicate.
/// Validation errors never reach the geometry engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A dimension that must be strictly positive is zero or negative
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// The offending parameter name.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A dimension that may be zero is negative
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// The offending parameter name.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A parameter is NaN or infinite
    #[error("{field} must be a finite number")]
    NonFinite {
        /// The offending parameter name.
        field: String,
    },

    /// Two related parameters violate the relationship the shape requires
    #[error("Invalid relation: {reason}")]
    Relation {
        /// Description of the violated relationship.
        reason: String,
    },

    /// A composite without children cannot produce geometry
    #[error("Composite has no children")]
    EmptyComposite,

    /// A child of a composite is invalid
    #[error("Child {index} is invalid: {source}")]
    Child {
        /// Position of the child in the composite.
        index: usize,
        /// The child's own validation error.
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Create a relation error from a message
    pub fn relation(reason: impl Into<String>) -> Self {
        ValidationError::Relation {
            reason: reason.into(),
        }
    }
}

/// Engine error type
///
/// Represents failures reported by a geometry engine implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Shape creation was rejected by the engine
    #[error("Failed to create {kind}: {reason}")]
    CreationFailed {
        /// The kind of shape requested.
        kind: String,
        /// The reason reported by the engine.
        reason: String,
    },

    /// Tessellation of an existing shape failed
    #[error("Tessellation failed: {reason}")]
    TessellationFailed {
        /// The reason reported by the engine.
        reason: String,
    },

    /// The referenced shape does not exist in the engine
    #[error("Shape '{id}' not found")]
    ShapeNotFound {
        /// The missing shape identity.
        id: String,
    },

    /// The engine did not answer in time
    #[error("Engine call timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The engine noticed the call's token was cancelled and stopped early
    #[error("Engine call cancelled")]
    Cancelled,

    /// Generic engine error
    #[error("Engine error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

impl EngineError {
    /// Create an engine error from a message
    pub fn other(message: impl Into<String>) -> Self {
        EngineError::Other {
            message: message.into(),
        }
    }
}

/// Factory error type
///
/// Everything a factory operation can fail with. Returned inside failed
/// operation results and delivered through the errored event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    /// The operation is not legal in the factory's current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The attempted operation.
        operation: String,
        /// The state the factory was in.
        state: String,
    },

    /// Parameters failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The geometry engine reported a failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The caller's cancellation token fired before the result was applied
    #[error("Operation cancelled")]
    Cancelled,

    /// The factory has been disposed
    #[error("Factory has been disposed")]
    Disposed,

    /// No parameter with this name exists on the factory
    #[error("Unknown parameter '{name}'")]
    UnknownParameter {
        /// The requested parameter name.
        name: String,
    },

    /// Index outside the composite's children
    #[error("No child at index {index}")]
    ChildIndex {
        /// The requested index.
        index: usize,
    },

    /// A child of a composite failed during update
    #[error("Child {index} failed to update: {source}")]
    ChildUpdate {
        /// Position of the failing child.
        index: usize,
        /// The child's error.
        source: Box<FactoryError>,
    },

    /// A child of a composite failed to commit; earlier children were rolled back
    #[error("Child {index} failed to commit: {source}")]
    CompositeCommit {
        /// Position of the failing child.
        index: usize,
        /// The child's commit error.
        source: Box<FactoryError>,
        /// Rollback failures, one message per child that could not be reverted.
        rollback_failures: Vec<String>,
    },
}

impl FactoryError {
    /// Create an invalid state error
    pub fn invalid_state(operation: impl Into<String>, state: impl ToString) -> Self {
        FactoryError::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Check if this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, FactoryError::Validation(_))
    }

    /// Check if this failure came from the geometry engine
    pub fn is_engine(&self) -> bool {
        matches!(self, FactoryError::Engine(_))
    }

    /// Check if this is a timeout reported by the engine
    pub fn is_timeout(&self) -> bool {
        matches!(self, FactoryError::Engine(EngineError::Timeout { .. }))
    }
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is outside its valid range
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange {
        /// The configuration key.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Main error type for CADKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Factory error
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Result type alias using the unified error
pub type Result<T> = std::result::Result<T, Error>;
