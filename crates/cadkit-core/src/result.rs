//! Operation inputs and outputs shared by engines and factories

use crate::cancellation::CancellationToken;
use crate::error::FactoryError;
use crate::mesh::MeshData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned identity of a shape
///
/// Opaque to factories: it is only stored, compared, and handed back to the
/// engine that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(String);

impl ShapeId {
    /// Wrap an engine identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-call configuration for `update` and `commit`
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Caller-owned token; cancelling it discards the call's result
    pub token: Option<CancellationToken>,
    /// Skip the factory's validity predicate
    pub skip_validation: bool,
}

impl OperationOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a caller-owned cancellation token
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Skip parameter validation
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Create the per-call token, chained to the caller's token when present
    pub fn call_token(&self) -> CancellationToken {
        match &self.token {
            Some(token) => token.child(),
            None => CancellationToken::new(),
        }
    }
}

/// Result of committing an operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Identity of the finalized shape
    pub result_id: Option<ShapeId>,
    /// Mesh of the finalized shape
    pub mesh: Option<MeshData>,
    /// Whether the commit succeeded
    pub success: bool,
    /// Failure reason when `success` is false
    pub error: Option<FactoryError>,
}

impl OperationResult {
    /// A successful commit
    pub fn succeeded(result_id: ShapeId, mesh: MeshData) -> Self {
        Self {
            result_id: Some(result_id),
            mesh: Some(mesh),
            success: true,
            error: None,
        }
    }

    /// A failed commit
    pub fn failed(error: FactoryError) -> Self {
        Self {
            result_id: None,
            mesh: None,
            success: false,
            error: Some(error),
        }
    }
}
