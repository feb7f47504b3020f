//! Hookean spring constraints.
//!
//! - [`DistanceSpring`] - Two particles held at a rest length
//! - [`AnchorSpring`] - One particle pulled toward a fixed point (rest length 0)
//!
//! Both use the same force law. For a spring between `a` and `b`:
//!
//! ```text
//! d = x_a - x_b
//! F_a = -k (|d| - L) d / |d|
//! F_b = -F_a
//! ```
//!
//! Forces are accumulated into a shared buffer, never overwritten. When the
//! two ends coincide the direction is undefined and the spring contributes
//! no force.
//!
//! Indices are trusted here: an out-of-range index panics. Networks are
//! checked with [`SpringNetwork::validate`](crate::SpringNetwork::validate)
//! when a system is built.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math;
use crate::types::SpringKind;

/// A spring constraint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Spring {
    /// Spring between two particles.
    Distance(DistanceSpring),
    /// Zero-length spring to a fixed point.
    Anchor(AnchorSpring),
}

impl Spring {
    /// Accumulate this spring's force into `forces`.
    pub fn resolve(&self, positions: &[Point3<f64>], forces: &mut [Vector3<f64>]) {
        match self {
            Self::Distance(s) => s.resolve(positions, forces),
            Self::Anchor(s) => s.resolve(positions, forces),
        }
    }

    /// Particle indices this spring acts on.
    #[must_use]
    pub fn particles(&self) -> SmallVec<[usize; 2]> {
        match self {
            Self::Distance(s) => SmallVec::from_buf([s.a, s.b]),
            Self::Anchor(s) => {
                let mut v = SmallVec::new();
                v.push(s.particle);
                v
            }
        }
    }

    /// Stiffness of this spring.
    #[must_use]
    pub const fn stiffness(&self) -> f64 {
        match self {
            Self::Distance(s) => s.stiffness,
            Self::Anchor(s) => s.stiffness,
        }
    }

    /// Set the stiffness of this spring.
    pub fn set_stiffness(&mut self, stiffness: f64) {
        match self {
            Self::Distance(s) => s.stiffness = stiffness,
            Self::Anchor(s) => s.stiffness = stiffness,
        }
    }

    /// Rest length (always 0 for anchors).
    #[must_use]
    pub const fn rest_length(&self) -> f64 {
        match self {
            Self::Distance(s) => s.rest_length,
            Self::Anchor(_) => 0.0,
        }
    }

    /// Category of a two-body spring, `None` for anchors.
    #[must_use]
    pub const fn kind(&self) -> Option<SpringKind> {
        match self {
            Self::Distance(s) => Some(s.kind),
            Self::Anchor(_) => None,
        }
    }

    /// Current length between the two ends.
    #[must_use]
    pub fn length(&self, positions: &[Point3<f64>]) -> f64 {
        match self {
            Self::Distance(s) => s.length(positions),
            Self::Anchor(s) => (positions[s.particle] - s.anchor).norm(),
        }
    }

    /// Elastic potential energy `½ k (|d| - L)²`.
    #[must_use]
    pub fn potential_energy(&self, positions: &[Point3<f64>]) -> f64 {
        let stretch = self.length(positions) - self.rest_length();
        0.5 * self.stiffness() * stretch * stretch
    }
}

impl From<DistanceSpring> for Spring {
    fn from(spring: DistanceSpring) -> Self {
        Self::Distance(spring)
    }
}

impl From<AnchorSpring> for Spring {
    fn from(spring: AnchorSpring) -> Self {
        Self::Anchor(spring)
    }
}

/// Force on the first end of a spring whose ends are `from - to` apart.
///
/// The second end receives the negation.
#[must_use]
pub fn spring_force(delta: &Vector3<f64>, rest_length: f64, stiffness: f64) -> Vector3<f64> {
    match math::length_and_direction(delta) {
        Some((length, direction)) => -direction * (stiffness * (length - rest_length)),
        None => Vector3::zeros(),
    }
}

/// Spring between two particles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceSpring {
    /// Index of the first particle.
    pub a: usize,
    /// Index of the second particle.
    pub b: usize,
    /// Length at which the spring exerts no force.
    pub rest_length: f64,
    /// Hooke constant.
    pub stiffness: f64,
    /// Which neighbor rule produced this spring.
    pub kind: SpringKind,
}

impl DistanceSpring {
    /// Create a new spring.
    #[must_use]
    pub const fn new(
        a: usize,
        b: usize,
        rest_length: f64,
        stiffness: f64,
        kind: SpringKind,
    ) -> Self {
        Self {
            a,
            b,
            rest_length,
            stiffness,
            kind,
        }
    }

    /// Create a spring whose rest length is the current distance times `ratio`.
    #[must_use]
    pub fn from_positions(
        a: usize,
        b: usize,
        positions: &[Point3<f64>],
        ratio: f64,
        stiffness: f64,
        kind: SpringKind,
    ) -> Self {
        let rest_length = (positions[a] - positions[b]).norm() * ratio;
        Self::new(a, b, rest_length, stiffness, kind)
    }

    /// Current distance between the two particles.
    #[must_use]
    pub fn length(&self, positions: &[Point3<f64>]) -> f64 {
        (positions[self.a] - positions[self.b]).norm()
    }

    /// Relative extension `(|d| - L) / L`, or 0 for a zero rest length.
    #[must_use]
    pub fn strain(&self, positions: &[Point3<f64>]) -> f64 {
        if self.rest_length < math::DEGENERATE_LENGTH {
            return 0.0;
        }
        (self.length(positions) - self.rest_length) / self.rest_length
    }

    /// Force acting on particle `a`. Particle `b` receives the negation.
    #[must_use]
    pub fn force(&self, positions: &[Point3<f64>]) -> Vector3<f64> {
        spring_force(
            &(positions[self.a] - positions[self.b]),
            self.rest_length,
            self.stiffness,
        )
    }

    /// Accumulate equal and opposite forces on both particles.
    pub fn resolve(&self, positions: &[Point3<f64>], forces: &mut [Vector3<f64>]) {
        let force = self.force(positions);
        forces[self.a] += force;
        forces[self.b] -= force;
    }
}

/// Zero-length spring pulling a particle toward a fixed point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnchorSpring {
    /// Index of the anchored particle.
    pub particle: usize,
    /// Fixed point in space.
    pub anchor: Point3<f64>,
    /// Hooke constant.
    pub stiffness: f64,
}

impl AnchorSpring {
    /// Create a new anchor spring.
    #[must_use]
    pub const fn new(particle: usize, anchor: Point3<f64>, stiffness: f64) -> Self {
        Self {
            particle,
            anchor,
            stiffness,
        }
    }

    /// Anchor a particle at its current position.
    #[must_use]
    pub fn at_current(particle: usize, positions: &[Point3<f64>], stiffness: f64) -> Self {
        Self::new(particle, positions[particle], stiffness)
    }

    /// Force acting on the anchored particle.
    #[must_use]
    pub fn force(&self, positions: &[Point3<f64>]) -> Vector3<f64> {
        spring_force(&(positions[self.particle] - self.anchor), 0.0, self.stiffness)
    }

    /// Accumulate the pull toward the anchor point.
    pub fn resolve(&self, positions: &[Point3<f64>], forces: &mut [Vector3<f64>]) {
        forces[self.particle] += self.force(positions);
    }
}
