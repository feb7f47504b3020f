//! Structure-of-arrays particle state.
//!
//! Every per-particle quantity lives in its own vector, indexed by particle.
//! Springs and passes refer to particles only by index.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FabricError, Result};
use crate::types::ParticleFlags;

/// Per-particle state of a mass-spring system.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParticleState {
    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) previous_positions: Vec<Point3<f64>>,
    pub(crate) velocities: Vec<Vector3<f64>>,
    pub(crate) forces: Vec<Vector3<f64>>,
    pub(crate) accelerations: Vec<Vector3<f64>>,
    pub(crate) previous_accelerations: Vec<Vector3<f64>>,
    pub(crate) masses: Vec<f64>,
    pub(crate) inverse_masses: Vec<f64>,
    pub(crate) flags: Vec<ParticleFlags>,
}

impl ParticleState {
    /// Create particles at rest.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if the lengths differ or any
    /// mass is not positive and finite, and [`FabricError::NumericalError`]
    /// for a non-finite position.
    pub fn new(positions: Vec<Point3<f64>>, masses: Vec<f64>) -> Result<Self> {
        let n = positions.len();
        if masses.len() != n {
            return Err(FabricError::invalid_config(format!(
                "{} masses for {n} particles",
                masses.len()
            )));
        }
        if let Some((i, m)) = masses
            .iter()
            .enumerate()
            .find(|(_, m)| !(m.is_finite() && **m > 0.0))
        {
            return Err(FabricError::invalid_config(format!(
                "particle {i} has invalid mass {m}"
            )));
        }
        if let Some(i) = positions.iter().position(|p| !crate::math::point_is_finite(p)) {
            return Err(FabricError::numerical_error(format!(
                "particle {i} has a non-finite position"
            )));
        }

        let inverse_masses = masses.iter().map(|&m| 1.0 / m).collect();
        Ok(Self {
            previous_positions: positions.clone(),
            positions,
            velocities: vec![Vector3::zeros(); n],
            forces: vec![Vector3::zeros(); n],
            accelerations: vec![Vector3::zeros(); n],
            previous_accelerations: vec![Vector3::zeros(); n],
            masses,
            inverse_masses,
            flags: vec![ParticleFlags::empty(); n],
        })
    }

    /// Put every particle back at `positions`, at rest.
    pub(crate) fn reset_to(&mut self, positions: &[Point3<f64>]) {
        self.positions.copy_from_slice(positions);
        self.previous_positions.copy_from_slice(positions);
        self.velocities.fill(Vector3::zeros());
        self.forces.fill(Vector3::zeros());
        self.accelerations.fill(Vector3::zeros());
        self.previous_accelerations.fill(Vector3::zeros());
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Current positions.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Positions at the start of the previous step.
    #[must_use]
    pub fn previous_positions(&self) -> &[Point3<f64>] {
        &self.previous_positions
    }

    /// Current velocities.
    #[must_use]
    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    /// Forces from the last accumulation.
    #[must_use]
    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    /// Accelerations from the last integration.
    #[must_use]
    pub fn accelerations(&self) -> &[Vector3<f64>] {
        &self.accelerations
    }

    /// Particle masses.
    #[must_use]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Inverse particle masses.
    #[must_use]
    pub fn inverse_masses(&self) -> &[f64] {
        &self.inverse_masses
    }

    /// Particle flags.
    #[must_use]
    pub fn flags(&self) -> &[ParticleFlags] {
        &self.flags
    }

    /// Set a particle's velocity.
    ///
    /// Position Verlet re-derives velocity from the position history every
    /// step, so this has no effect on its motion.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::IndexOutOfBounds`] if `index` does not exist.
    pub fn set_velocity(&mut self, index: usize, velocity: Vector3<f64>) -> Result<()> {
        let count = self.len();
        let v = self
            .velocities
            .get_mut(index)
            .ok_or(FabricError::index_out_of_bounds(index, count))?;
        *v = velocity;
        Ok(())
    }

    /// Move a particle without giving it velocity.
    ///
    /// The Verlet history moves with it.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::IndexOutOfBounds`] if `index` does not exist.
    pub fn set_position(&mut self, index: usize, position: Point3<f64>) -> Result<()> {
        let count = self.len();
        if index >= count {
            return Err(FabricError::index_out_of_bounds(index, count));
        }
        self.positions[index] = position;
        self.previous_positions[index] = position;
        Ok(())
    }

    /// Total kinetic energy `Σ ½ m |v|²`.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, &m)| 0.5 * m * v.norm_squared())
            .sum()
    }

    /// Total mass.
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Mass-weighted center.
    #[must_use]
    pub fn center_of_mass(&self) -> Point3<f64> {
        let total = self.total_mass();
        if total <= 0.0 {
            return Point3::origin();
        }
        let weighted: Vector3<f64> = self
            .positions
            .iter()
            .zip(&self.masses)
            .map(|(p, &m)| p.coords * m)
            .sum();
        Point3::from(weighted / total)
    }

    /// Axis-aligned bounds `(min, max)`.
    #[must_use]
    pub fn bounding_box(&self) -> (Point3<f64>, Point3<f64>) {
        let Some(first) = self.positions.first() else {
            return (Point3::origin(), Point3::origin());
        };
        self.positions
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair() -> ParticleState {
        ParticleState::new(
            vec![Point3::origin(), Point3::new(2.0, 0.0, 0.0)],
            vec![1.0, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_state_is_at_rest() {
        let state = pair();
        assert_eq!(state.len(), 2);
        assert_eq!(state.positions(), state.previous_positions());
        assert_relative_eq!(state.kinetic_energy(), 0.0);
        assert_relative_eq!(state.inverse_masses()[1], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_mass() {
        let result = ParticleState::new(vec![Point3::origin()], vec![0.0]);
        assert!(matches!(result, Err(FabricError::InvalidConfig(_))));

        let result = ParticleState::new(vec![Point3::origin()], vec![]);
        assert!(matches!(result, Err(FabricError::InvalidConfig(_))));
    }

    #[test]
    fn test_kinetic_energy() {
        let mut state = pair();
        state.set_velocity(1, Vector3::new(0.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(state.kinetic_energy(), 6.0, epsilon = 1e-12);
        assert!(state.set_velocity(2, Vector3::zeros()).is_err());
    }

    #[test]
    fn test_center_and_bounds() {
        let state = pair();
        assert_relative_eq!(state.center_of_mass(), Point3::new(1.5, 0.0, 0.0), epsilon = 1e-12);
        let (lo, hi) = state.bounding_box();
        assert_relative_eq!(lo, Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(hi, Point3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_reset_to() {
        let mut state = pair();
        state.set_velocity(0, Vector3::x()).unwrap();
        state.set_position(0, Point3::new(5.0, 5.0, 5.0)).unwrap();
        state.reset_to(&[Point3::origin(), Point3::new(2.0, 0.0, 0.0)]);
        assert_relative_eq!(state.positions()[0], Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(state.kinetic_energy(), 0.0);
    }
}
