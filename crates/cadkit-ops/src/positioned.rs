//! Placement parameters shared by positioned operations

use crate::factory::{OperationFactory, ParametricOperation};
use cadkit_core::{FactoryError, ValidationError};
use cadkit_engine::Placement;

/// Parameter name of the X offset
pub const OFFSET_X: &str = "offset_x";
/// Parameter name of the Y offset
pub const OFFSET_Y: &str = "offset_y";
/// Parameter name of the Z offset
pub const OFFSET_Z: &str = "offset_z";

/// An operation placed in space by three offsets
pub trait Positioned {
    /// Current placement
    fn placement(&self) -> Placement;

    /// Mutable access to the placement
    fn placement_mut(&mut self) -> &mut Placement;
}

pub(crate) fn offset(placement: &Placement, name: &str) -> Option<f64> {
    match name {
        OFFSET_X => Some(placement.x),
        OFFSET_Y => Some(placement.y),
        OFFSET_Z => Some(placement.z),
        _ => None,
    }
}

pub(crate) fn set_offset(placement: &mut Placement, name: &str, value: f64) -> bool {
    let slot = match name {
        OFFSET_X => &mut placement.x,
        OFFSET_Y => &mut placement.y,
        OFFSET_Z => &mut placement.z,
        _ => return false,
    };
    *slot = value;
    true
}

pub(crate) fn validate_placement(placement: &Placement) -> Result<(), ValidationError> {
    for (field, value) in [
        (OFFSET_X, placement.x),
        (OFFSET_Y, placement.y),
        (OFFSET_Z, placement.z),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

impl<Op: ParametricOperation + Positioned> OperationFactory<Op> {
    /// Current placement
    pub fn placement(&self) -> Placement {
        self.operation().placement()
    }

    /// Set the X offset
    pub fn set_offset_x(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param(OFFSET_X, value)
    }

    /// Set the Y offset
    pub fn set_offset_y(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param(OFFSET_Y, value)
    }

    /// Set the Z offset
    pub fn set_offset_z(&mut self, value: f64) -> Result<(), FactoryError> {
        self.write_param(OFFSET_Z, value)
    }

    /// Set all three offsets, firing one parameter-changed event per axis
    pub fn set_placement(&mut self, placement: Placement) -> Result<(), FactoryError> {
        self.set_offset_x(placement.x)?;
        self.set_offset_y(placement.y)?;
        self.set_offset_z(placement.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_accessors() {
        let mut placement = Placement::default();
        assert!(set_offset(&mut placement, OFFSET_Y, 4.0));
        assert!(!set_offset(&mut placement, "offset_w", 1.0));
        assert_eq!(offset(&placement, OFFSET_Y), Some(4.0));
        assert_eq!(offset(&placement, "width"), None);
    }

    #[test]
    fn test_non_finite_offset_is_invalid() {
        let placement = Placement::new(0.0, f64::NAN, 0.0);
        assert_eq!(
            validate_placement(&placement),
            Err(ValidationError::NonFinite {
                field: OFFSET_Y.to_string()
            })
        );
        assert!(validate_placement(&Placement::new(1.0, -2.0, 3.0)).is_ok());
    }
}
