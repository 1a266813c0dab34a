//! Torus around Z

use super::positive;
use crate::factory::{OperationFactory, ParametricOperation};
use crate::positioned::{offset, set_offset, validate_placement, Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::{Placement, ShapeRequest};
use std::f64::consts::PI;

/// Torus radii
#[derive(Debug, Clone, PartialEq)]
pub struct TorusParams {
    /// Center placement
    pub placement: Placement,
    /// Distance from the center to the tube center
    pub major_radius: f64,
    /// Tube radius, strictly smaller than the major radius
    pub minor_radius: f64,
}

impl TorusParams {
    /// Torus at the origin
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self {
            placement: Placement::default(),
            major_radius,
            minor_radius,
        }
    }
}

impl Default for TorusParams {
    fn default() -> Self {
        Self::new(10.0, 2.0)
    }
}

impl Positioned for TorusParams {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}

impl ParametricOperation for TorusParams {
    fn kind(&self) -> &'static str {
        "torus"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("major_radius", self.major_radius)?;
        positive("minor_radius", self.minor_radius)?;
        if self.minor_radius >= self.major_radius {
            return Err(ValidationError::relation(format!(
                "minor_radius ({}) must be less than major_radius ({})",
                self.minor_radius, self.major_radius
            )));
        }
        validate_placement(&self.placement)
    }

    fn payload(&self) -> ShapeRequest {
        ShapeRequest::Torus {
            placement: self.placement,
            major_radius: self.major_radius,
            minor_radius: self.minor_radius,
        }
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["major_radius", "minor_radius", OFFSET_X, OFFSET_Y, OFFSET_Z]
    }

    fn param(&self, name: &str) -> Option<f64> {
        match name {
            "major_radius" => Some(self.major_radius),
            "minor_radius" => Some(self.minor_radius),
            other => offset(&self.placement, other),
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "major_radius" => self.major_radius = value,
            "minor_radius" => self.minor_radius = value,
            other => return set_offset(&mut self.placement, other, value),
        }
        true
    }

    fn volume(&self) -> f64 {
        2.0 * PI * PI * self.major_radius * self.minor_radius * self.minor_radius
    }
}

/// Factory for tori
pub type TorusFactory = OperationFactory<TorusParams>;

impl OperationFactory<TorusParams> {
    /// Set the major radius
    pub fn set_major_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("major_radius", value)
    }

    /// Set the minor radius
    pub fn set_minor_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("minor_radius", value)
    }
}
