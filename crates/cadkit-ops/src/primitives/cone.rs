//! Cone and truncated cone along Z

use super::{non_negative, positive};
use crate::factory::{OperationFactory, ParametricOperation};
use crate::positioned::{offset, set_offset, validate_placement, Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::{Placement, ShapeRequest};
use std::f64::consts::PI;

/// Cone dimensions
///
/// A zero top radius gives a pointed cone. Equal radii would describe a
/// cylinder and are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ConeParams {
    /// Center placement
    pub placement: Placement,
    /// Radius at the bottom
    pub base_radius: f64,
    /// Radius at the top
    pub top_radius: f64,
    /// Cone height
    pub height: f64,
}

impl ConeParams {
    /// Cone at the origin
    pub fn new(base_radius: f64, top_radius: f64, height: f64) -> Self {
        Self {
            placement: Placement::default(),
            base_radius,
            top_radius,
            height,
        }
    }
}

impl Default for ConeParams {
    fn default() -> Self {
        Self::new(5.0, 0.0, 10.0)
    }
}

impl Positioned for ConeParams {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}

impl ParametricOperation for ConeParams {
    fn kind(&self) -> &'static str {
        "cone"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("base_radius", self.base_radius)?;
        non_negative("top_radius", self.top_radius)?;
        positive("height", self.height)?;
        if self.top_radius == self.base_radius {
            return Err(ValidationError::relation(
                "top_radius must differ from base_radius",
            ));
        }
        validate_placement(&self.placement)
    }

    fn payload(&self) -> ShapeRequest {
        ShapeRequest::Cone {
            placement: self.placement,
            base_radius: self.base_radius,
            top_radius: self.top_radius,
            height: self.height,
        }
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["base_radius", "top_radius", "height", OFFSET_X, OFFSET_Y, OFFSET_Z]
    }

    fn param(&self, name: &str) -> Option<f64> {
        match name {
            "base_radius" => Some(self.base_radius),
            "top_radius" => Some(self.top_radius),
            "height" => Some(self.height),
            other => offset(&self.placement, other),
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "base_radius" => self.base_radius = value,
            "top_radius" => self.top_radius = value,
            "height" => self.height = value,
            other => return set_offset(&mut self.placement, other, value),
        }
        true
    }

    fn volume(&self) -> f64 {
        let (r1, r2) = (self.base_radius, self.top_radius);
        PI * self.height * (r1 * r1 + r1 * r2 + r2 * r2) / 3.0
    }
}

/// Factory for cones
pub type ConeFactory = OperationFactory<ConeParams>;

impl OperationFactory<ConeParams> {
    /// Set the bottom radius
    pub fn set_base_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("base_radius", value)
    }

    /// Set the top radius
    pub fn set_top_radius(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("top_radius", value)
    }

    /// Set the height
    pub fn set_height(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("height", value)
    }
}
