//! Sphere

use super::positive;
use crate::factory::{OperationFactory, ParametricOperation};
use crate::positioned::{offset, set_offset, validate_placement, Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::{Placement, ShapeRequest};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct SphereParams {
    pub placement: Placement,
    pub radius: f64,
}

impl SphereParams {
    /// Sphere at the origin
    pub fn new(radius: f64) -> Self {
        Self {
            placement: Placement::default(),
            radius,
        }
    }
}

impl Default for SphereParams {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl Positioned for SphereParams {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}

impl ParametricOperation for SphereParams {
    fn kind(&self) -> &'static str {
        "sphere"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("radius", self.radius)?;
        validate_placement(&self.placement)
    }

    fn payload(&self) -> ShapeRequest {
        ShapeRequest::Sphere {
            placement: self.placement,
            radius: self.radius,
        }
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["radius", OFFSET_X, OFFSET_Y, OFFSET_Z]
    }

    fn param(&self, name: &str) -> Option<f64> {
        match name {
            "radius" => Some(self.radius),
            other => offset(&self.placement, other),
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "radius" => {
                self.radius = value;
                true
            }
            other => set_offset(&mut self.placement, other, value),
        }
    }

    fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }
}

/// Factory for spheres
pub type SphereFactory = OperationFactory<SphereParams>;

impl OperationFactory<SphereParams> {
    /// Set the radius
    pub fn set_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("radius", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(SphereParams::new(1.0).validate().is_ok());
        assert!(SphereParams::new(-1.0).validate().is_err());
    }
}
