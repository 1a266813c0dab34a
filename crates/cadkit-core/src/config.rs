//! Lifecycle configuration
//!
//! Centralizes the tessellation tolerances used for previews and commits and
//! the composite rollback policy. Values can be loaded from TOML; missing
//! sections fall back to their defaults.
//!
//! ```rust
//! use cadkit_core::config::{LifecycleConfig, TessellationConfig};
//!
//! let config = LifecycleConfig::from_toml_str("[preview]\ndeflection = 0.25\n").unwrap();
//! assert_eq!(config.preview.deflection, 0.25);
//! assert_eq!(config.commit, TessellationConfig::MEDIUM_QUALITY);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// TESSELLATION CONFIGURATION
// =============================================================================

/// Configuration for mesh tessellation requests.
///
/// Smaller deflection means a finer mesh and a slower engine call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    /// Linear deflection: maximum distance between the mesh and the true surface.
    pub deflection: f64,

    /// Angular deflection in radians between adjacent facets.
    pub angular_deflection: f64,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self::MEDIUM_QUALITY
    }
}

impl TessellationConfig {
    /// High quality settings for final renders
    pub const HIGH_QUALITY: Self = Self {
        deflection: 0.01,
        angular_deflection: 0.05,
    };

    /// Medium quality for interactive viewing
    pub const MEDIUM_QUALITY: Self = Self {
        deflection: 0.1,
        angular_deflection: 0.1,
    };

    /// Low quality for fast preview
    pub const LOW_QUALITY: Self = Self {
        deflection: 0.5,
        angular_deflection: 0.3,
    };

    /// Preview quality for large models
    pub const PREVIEW: Self = Self {
        deflection: 1.0,
        angular_deflection: 0.5,
    };

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if !(self.deflection.is_finite() && self.deflection > 0.0) {
            return Err(ConfigError::ValueOutOfRange {
                key: format!("{}.deflection", section),
                value: self.deflection.to_string(),
            });
        }
        if !(self.angular_deflection.is_finite() && self.angular_deflection > 0.0) {
            return Err(ConfigError::ValueOutOfRange {
                key: format!("{}.angular_deflection", section),
                value: self.angular_deflection.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// COMPOSITE CONFIGURATION
// =============================================================================

/// Composite commit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Delete attempts per child when rolling back a failed composite commit.
    pub rollback_attempts: u32,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            rollback_attempts: 1,
        }
    }
}

// =============================================================================
// LIFECYCLE CONFIGURATION
// =============================================================================

/// Settings shared by every factory built from one context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Tessellation used for live previews
    pub preview: TessellationConfig,
    /// Tessellation used for committed results
    pub commit: TessellationConfig,
    /// Composite commit policy
    pub composite: CompositeConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            preview: TessellationConfig::LOW_QUALITY,
            commit: TessellationConfig::MEDIUM_QUALITY,
            composite: CompositeConfig::default(),
        }
    }
}

impl LifecycleConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: LifecycleConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded lifecycle config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.preview.validate("preview")?;
        self.commit.validate("commit")?;
        if self.composite.rollback_attempts == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "composite.rollback_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.preview, TessellationConfig::LOW_QUALITY);
        assert_eq!(config.commit, TessellationConfig::MEDIUM_QUALITY);
        assert_eq!(config.composite.rollback_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = LifecycleConfig::from_toml_str("[composite]\nrollback_attempts = 3\n")
            .expect("valid config");
        assert_eq!(config.composite.rollback_attempts, 3);
        assert_eq!(config.preview, TessellationConfig::LOW_QUALITY);
    }

    #[test]
    fn test_rejects_non_positive_deflection() {
        let err = LifecycleConfig::from_toml_str("[commit]\ndeflection = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValueOutOfRange { ref key, .. } if key == "commit.deflection"));
    }

    #[test]
    fn test_rejects_zero_rollback_attempts() {
        let err =
            LifecycleConfig::from_toml_str("[composite]\nrollback_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = LifecycleConfig::from_toml_str("preview = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lifecycle.toml");

        let mut config = LifecycleConfig::default();
        config.preview = TessellationConfig::PREVIEW;
        config.save(&path).expect("save");

        let loaded = LifecycleConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }
}
