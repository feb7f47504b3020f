//! External force fields.
//!
//! Forces are written into a per-particle buffer that is cleared at the start
//! of every step. Gravity and drag act per particle; springs are added by the
//! [`SpringNetwork`](crate::SpringNetwork) afterwards.

use nalgebra::Vector3;

/// Density of air at sea level (kg/m³).
pub const AIR_DENSITY: f64 = 1.225;

/// Reset every force to zero.
pub fn clear(forces: &mut [Vector3<f64>]) {
    forces.fill(Vector3::zeros());
}

/// Add `m g` to every particle.
pub fn apply_gravity(forces: &mut [Vector3<f64>], masses: &[f64], gravity: &Vector3<f64>) {
    for (force, &mass) in forces.iter_mut().zip(masses) {
        *force += gravity * mass;
    }
}

/// Quadratic drag on a particle moving at `velocity` through still air.
///
/// `F = -½ ρ Cd A |v| v`, opposing the motion.
#[must_use]
pub fn drag_force(velocity: &Vector3<f64>, drag_coefficient: f64, area: f64) -> Vector3<f64> {
    let speed = velocity.norm();
    -velocity * (0.5 * AIR_DENSITY * drag_coefficient * area * speed)
}

/// Add quadratic drag to every particle.
///
/// `area` is the frontal area per particle, usually the grid spacing squared.
pub fn apply_drag(
    forces: &mut [Vector3<f64>],
    velocities: &[Vector3<f64>],
    drag_coefficient: f64,
    area: f64,
) {
    for (force, velocity) in forces.iter_mut().zip(velocities) {
        *force += drag_force(velocity, drag_coefficient, area);
    }
}
