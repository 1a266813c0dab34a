//! Right circular cylinder along Z

use super::positive;
use crate::factory::{OperationFactory, ParametricOperation};
use crate::positioned::{offset, set_offset, validate_placement, Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::{Placement, ShapeRequest};
use std::f64::consts::PI;

/// Cylinder dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderParams {
    /// Center placement
    pub placement: Placement,
    pub radius: f64,
    pub height: f64,
}

impl CylinderParams {
    /// Cylinder at the origin
    pub fn new(radius: f64, height: f64) -> Self {
        Self {
            placement: Placement::default(),
            radius,
            height,
        }
    }
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self::new(5.0, 10.0)
    }
}

impl Positioned for CylinderParams {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}

impl ParametricOperation for CylinderParams {
    fn kind(&self) -> &'static str {
        "cylinder"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("radius", self.radius)?;
        positive("height", self.height)?;
        validate_placement(&self.placement)
    }

    fn payload(&self) -> ShapeRequest {
        ShapeRequest::Cylinder {
            placement: self.placement,
            radius: self.radius,
            height: self.height,
        }
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["radius", "height", OFFSET_X, OFFSET_Y, OFFSET_Z]
    }

    fn param(&self, name: &str) -> Option<f64> {
        match name {
            "radius" => Some(self.radius),
            "height" => Some(self.height),
            other => offset(&self.placement, other),
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "radius" => self.radius = value,
            "height" => self.height = value,
            other => return set_offset(&mut self.placement, other, value),
        }
        true
    }

    fn volume(&self) -> f64 {
        PI * self.radius * self.radius * self.height
    }
}

/// Factory for cylinders
pub type CylinderFactory = OperationFactory<CylinderParams>;

impl OperationFactory<CylinderParams> {
    pub fn set_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("radius", value)
    }

    pub fn set_height(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("height", value)
    }
}
