//! Shared context injected into every factory

use cadkit_core::LifecycleConfig;
use cadkit_engine::{GeometryEngine, SharedEngine};
use std::fmt;
use std::sync::Arc;

/// Engine handle and configuration shared by a family of factories
#[derive(Clone)]
pub struct OperationContext {
    engine: SharedEngine,
    config: LifecycleConfig,
}

impl OperationContext {
    /// Create a context with the default configuration
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine,
            config: LifecycleConfig::default(),
        }
    }

    /// Create a context from a concrete engine
    pub fn from_engine<E: GeometryEngine + 'static>(engine: E) -> Self {
        Self::new(Arc::new(engine))
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared engine
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// The lifecycle configuration
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Linear deflection used for previews
    pub fn preview_deflection(&self) -> f64 {
        self.config.preview.deflection
    }

    /// Linear deflection used for commits
    pub fn commit_deflection(&self) -> f64 {
        self.config.commit.deflection
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}
