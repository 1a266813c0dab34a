//! Primitive solid factories
//!
//! Each primitive is a positioned parameter set with its own validity rules.
//! All dimensions must be finite; the remaining rules follow the kernel:
//!
//! | Primitive | Rule |
//! |-----------|------|
//! | Box       | width, height, depth > 0 |
//! | Cylinder  | radius, height > 0 |
//! | Sphere    | radius > 0 |
//! | Cone      | base > 0, height > 0, top >= 0, top != base |
//! | Torus     | both radii > 0, minor < major |

pub mod box_shape;
pub mod cone;
pub mod cylinder;
pub mod sphere;
pub mod torus;

pub use box_shape::{BoxFactory, BoxParams};
pub use cone::{ConeFactory, ConeParams};
pub use cylinder::{CylinderFactory, CylinderParams};
pub use sphere::{SphereFactory, SphereParams};
pub use torus::{TorusFactory, TorusParams};

use cadkit_core::ValidationError;

pub(crate) fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite {
            field: field.to_string(),
        })
    }
}

pub(crate) fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositive {
            field: field.to_string(),
            value,
        })
    }
}

pub(crate) fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        })
    }
}
