//! Core tags for particles and springs.
//!
//! - [`ParticleFlags`] - Per-particle state bits (layer membership, anchoring)
//! - [`SpringKind`] - Category of a two-body spring, used for diagnostics

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Flags for particle membership and behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ParticleFlags: u32 {
        /// Particle belongs to the hydrogel (secondary) layer.
        const HYDROGEL = 0b0000_0001;
        /// Particle is pulled toward a fixed point by an anchor spring.
        const ANCHORED = 0b0000_0010;
    }
}

/// Category of a two-body spring.
///
/// The kind never changes the force law; it records which neighbor rule
/// produced the spring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpringKind {
    /// Immediate row or column neighbor in the fabric grid.
    Structural,
    /// Neighbor two or more rows/columns away in the fabric grid.
    Bend,
    /// Diagonal neighbor in the fabric grid.
    Shear,
    /// Couples a hydrogel particle to a fabric particle.
    InterLayer,
    /// Couples two hydrogel particles.
    IntraLayer,
}

impl SpringKind {
    /// All kinds, in construction order.
    pub const ALL: [Self; 5] = [
        Self::Structural,
        Self::Bend,
        Self::Shear,
        Self::InterLayer,
        Self::IntraLayer,
    ];

    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Bend => "bend",
            Self::Shear => "shear",
            Self::InterLayer => "inter-layer",
            Self::IntraLayer => "intra-layer",
        }
    }

    /// Whether this kind belongs to the fabric grid itself.
    #[must_use]
    pub const fn is_fabric(self) -> bool {
        matches!(self, Self::Structural | Self::Bend | Self::Shear)
    }
}

impl std::fmt::Display for SpringKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
