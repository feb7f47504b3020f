//! Small vector helpers on top of `nalgebra`.
//!
//! Positions are [`Point3<f64>`] and forces/velocities are [`Vector3<f64>`];
//! `nalgebra` supplies the arithmetic. The helpers here add the guards the
//! simulation relies on: direction vectors are never produced from
//! zero-length deltas, and state is checked for `NaN`/infinity.

use nalgebra::{Point3, Vector3};

/// Lengths below this are treated as coincident points.
pub const DEGENERATE_LENGTH: f64 = 1e-12;

/// Unit vector pointing along the up (normal) axis of the fabric plane.
#[must_use]
pub fn up() -> Vector3<f64> {
    Vector3::z()
}

/// Split `delta` into its length and unit direction.
///
/// Returns `None` when `delta` is shorter than [`DEGENERATE_LENGTH`], in which
/// case no direction is defined.
#[must_use]
pub fn length_and_direction(delta: &Vector3<f64>) -> Option<(f64, Vector3<f64>)> {
    let length = delta.norm();
    if length < DEGENERATE_LENGTH || !length.is_finite() {
        None
    } else {
        Some((length, delta / length))
    }
}

/// Check that every component of a point is finite.
#[must_use]
pub fn point_is_finite(p: &Point3<f64>) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}

/// Check that every component of a vector is finite.
#[must_use]
pub fn vector_is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}
