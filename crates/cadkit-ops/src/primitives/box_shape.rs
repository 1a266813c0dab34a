//! Rectangular box

use super::positive;
use crate::factory::{OperationFactory, ParametricOperation};
use crate::positioned::{offset, set_offset, validate_placement, Positioned, OFFSET_X, OFFSET_Y, OFFSET_Z};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::{Placement, ShapeRequest};

/// Box dimensions, centered on its placement
#[derive(Debug, Clone, PartialEq)]
pub struct BoxParams {
    /// Center placement
    pub placement: Placement,
    /// Size along X
    pub width: f64,
    /// Size along Z
    pub height: f64,
    /// Size along Y
    pub depth: f64,
}

impl BoxParams {
    /// Box at the origin
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            placement: Placement::default(),
            width,
            height,
            depth,
        }
    }
}

impl Default for BoxParams {
    fn default() -> Self {
        Self::new(10.0, 10.0, 10.0)
    }
}

impl Positioned for BoxParams {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}

impl ParametricOperation for BoxParams {
    fn kind(&self) -> &'static str {
        "box"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("depth", self.depth)?;
        validate_placement(&self.placement)
    }

    fn payload(&self) -> ShapeRequest {
        ShapeRequest::Box {
            placement: self.placement,
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["width", "height", "depth", OFFSET_X, OFFSET_Y, OFFSET_Z]
    }

    fn param(&self, name: &str) -> Option<f64> {
        match name {
            "width" => Some(self.width),
            "height" => Some(self.height),
            "depth" => Some(self.depth),
            other => offset(&self.placement, other),
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "width" => self.width = value,
            "height" => self.height = value,
            "depth" => self.depth = value,
            other => return set_offset(&mut self.placement, other, value),
        }
        true
    }

    fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }
}

/// Factory for boxes
pub type BoxFactory = OperationFactory<BoxParams>;

impl OperationFactory<BoxParams> {
    /// Set the size along X
    pub fn set_width(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("width", value)
    }

    /// Set the size along Z
    pub fn set_height(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("height", value)
    }

    /// Set the size along Y
    pub fn set_depth(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param("depth", value)
    }
}
