//! Position corrections applied outside the force model.
//!
//! - [`resolve_self_intersection`] pushes apart fabric particles that are
//!   closer than a minimum separation.
//! - [`apply_floor`] keeps particles above a horizontal plane.
//!
//! Both edit positions directly and leave velocities alone.

use nalgebra::Point3;

use crate::math;

/// Particles are held this far above the floor plane.
pub const FLOOR_EPSILON: f64 = 1e-3;

/// Push apart every pair among the first `count` particles that is closer
/// than `min_separation`.
///
/// Each particle of an offending pair moves by half of
/// `delta * (dist - min_separation) / dist`, so the pair ends exactly
/// `min_separation` apart unless a later pair moves it again. Coincident
/// pairs have no defined direction and are skipped. A separation of 0
/// disables the pass.
///
/// This is a single O(n²) sweep. Returns the number of pairs corrected.
pub fn resolve_self_intersection(
    positions: &mut [Point3<f64>],
    count: usize,
    min_separation: f64,
) -> usize {
    if min_separation <= 0.0 {
        return 0;
    }
    let count = count.min(positions.len());
    let min_sq = min_separation * min_separation;
    let mut corrected = 0;

    for i in 0..count {
        for j in (i + 1)..count {
            let delta = positions[i] - positions[j];
            if delta.norm_squared() >= min_sq {
                continue;
            }
            let Some((dist, _)) = math::length_and_direction(&delta) else {
                continue;
            };
            let half = delta * (0.5 * (dist - min_separation) / dist);
            positions[i] -= half;
            positions[j] += half;
            corrected += 1;
        }
    }

    corrected
}

/// Clamp every particle to at least `floor_height + FLOOR_EPSILON` along Z.
///
/// Returns the number of particles moved.
pub fn apply_floor(positions: &mut [Point3<f64>], floor_height: f64) -> usize {
    let limit = floor_height + FLOOR_EPSILON;
    let mut clamped = 0;
    for p in positions.iter_mut().filter(|p| p.z < limit) {
        p.z = limit;
        clamped += 1;
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_close_pair_is_separated() {
        let mut positions = vec![Point3::origin(), Point3::new(0.4, 0.0, 0.0)];
        let corrected = resolve_self_intersection(&mut positions, 2, 1.0);

        assert_eq!(corrected, 1);
        assert_relative_eq!(positions[0], Point3::new(-0.3, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(positions[1], Point3::new(0.7, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_distant_pairs_untouched() {
        let mut positions = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(resolve_self_intersection(&mut positions, 2, 1.0), 0);
        assert_relative_eq!(positions[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_coincident_pair_skipped() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let mut positions = vec![p, p];
        assert_eq!(resolve_self_intersection(&mut positions, 2, 1.0), 0);
        assert_eq!(positions[0], p);
    }

    #[test]
    fn test_only_first_count_particles() {
        let mut positions = vec![Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        assert_eq!(resolve_self_intersection(&mut positions, 1, 1.0), 0);
        assert_eq!(resolve_self_intersection(&mut positions, 2, 0.0), 0);
    }

    #[test]
    fn test_floor_clamps() {
        let mut positions = vec![
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(0.0, 0.0, 0.0),
        ];
        assert_eq!(apply_floor(&mut positions, 0.0), 2);
        assert_relative_eq!(positions[0].z, FLOOR_EPSILON);
        assert_relative_eq!(positions[1].z, 0.5);
        assert_relative_eq!(positions[2].z, FLOOR_EPSILON);
    }
}
