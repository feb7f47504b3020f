//! Spring network construction.
//!
//! The network is built once from the initial particle positions. Springs are
//! emitted in a fixed order so identical configurations always produce
//! identical networks:
//!
//! 1. Fabric structural springs, grid order
//! 2. Fabric bend springs, grid order
//! 3. Fabric shear springs, grid order
//! 4. Hydrogel springs, by strip then row
//! 5. Anchor springs
//!
//! Within the grid, each particle only links to neighbors at lower row or
//! column, so every fabric pair is visited once:
//!
//! ```text
//!   (r-1,c-1)  (r-1,c)  (r-1,c+1)
//!        ╲        │        ╱
//!         ╲       │       ╱        shear ╲ ╱   structural │ ─
//!   (r,c-1) ──── (r,c)
//! ```
//!
//! Hydrogel springs can meet the same pair from both ends; a set of visited
//! pairs keeps them unique.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::config::{PinConfig, PinSet, SimulationConfig};
use crate::error::{FabricError, Result};
use crate::spring::{AnchorSpring, DistanceSpring, Spring};
use crate::topology::Topology;
use crate::types::SpringKind;

/// Number of springs per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpringCounts {
    /// Structural fabric springs.
    pub structural: usize,
    /// Bend fabric springs.
    pub bend: usize,
    /// Shear fabric springs.
    pub shear: usize,
    /// Fabric to hydrogel springs.
    pub inter_layer: usize,
    /// Hydrogel to hydrogel springs.
    pub intra_layer: usize,
    /// Anchor springs.
    pub anchor: usize,
}

impl SpringCounts {
    /// Count for one two-body kind.
    #[must_use]
    pub const fn get(&self, kind: SpringKind) -> usize {
        match kind {
            SpringKind::Structural => self.structural,
            SpringKind::Bend => self.bend,
            SpringKind::Shear => self.shear,
            SpringKind::InterLayer => self.inter_layer,
            SpringKind::IntraLayer => self.intra_layer,
        }
    }

    fn slot(&mut self, kind: SpringKind) -> &mut usize {
        match kind {
            SpringKind::Structural => &mut self.structural,
            SpringKind::Bend => &mut self.bend,
            SpringKind::Shear => &mut self.shear,
            SpringKind::InterLayer => &mut self.inter_layer,
            SpringKind::IntraLayer => &mut self.intra_layer,
        }
    }

    /// Springs inside the fabric grid.
    #[must_use]
    pub const fn fabric(&self) -> usize {
        self.structural + self.bend + self.shear
    }

    /// Springs touching the hydrogel layer.
    #[must_use]
    pub const fn hydrogel(&self) -> usize {
        self.inter_layer + self.intra_layer
    }

    /// All springs, anchors included.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.fabric() + self.hydrogel() + self.anchor
    }
}

/// Summary of spring strain over a network.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrainSummary {
    /// Largest absolute strain.
    pub max: f64,
    /// Mean absolute strain.
    pub mean: f64,
}

/// Ordered list of springs over a particle system.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpringNetwork {
    springs: Vec<Spring>,
}

impl SpringNetwork {
    /// Create a network from an explicit list of springs.
    #[must_use]
    pub const fn from_springs(springs: Vec<Spring>) -> Self {
        Self { springs }
    }

    /// Build the full fabric, hydrogel and anchor network for `topology`.
    ///
    /// Rest lengths are the distances in `topology.positions()`, scaled by
    /// the hydrogel shrink ratios for springs that touch the layer.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if the fabric or pin settings
    /// are invalid, or [`FabricError::IndexOutOfBounds`] if a pinned particle
    /// does not exist.
    pub fn build(topology: &Topology, config: &SimulationConfig) -> Result<Self> {
        config.fabric.validate()?;

        let mut builder = NetworkBuilder::new(topology.positions());
        builder.add_fabric(topology, config);
        builder.add_hydrogel(topology, config);
        if let Some(pinning) = &config.pinning {
            pinning.validate()?;
            let pinned = pinned_particles(&pinning.pins, topology)?;
            builder.add_anchors(&pinned, pinning.stiffness);
        }

        let network = Self::from_springs(builder.springs);
        let counts = network.count_by_kind();
        debug!(
            structural = counts.structural,
            bend = counts.bend,
            shear = counts.shear,
            inter_layer = counts.inter_layer,
            intra_layer = counts.intra_layer,
            anchor = counts.anchor,
            "Built spring network"
        );

        Ok(network)
    }

    /// All springs in construction order.
    #[must_use]
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Number of springs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.springs.len()
    }

    /// Whether the network has no springs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.springs.is_empty()
    }

    /// Append a spring.
    pub fn push(&mut self, spring: impl Into<Spring>) {
        self.springs.push(spring.into());
    }

    /// Iterate over the anchor springs.
    pub fn anchors(&self) -> impl Iterator<Item = &AnchorSpring> {
        self.springs.iter().filter_map(|s| match s {
            Spring::Anchor(a) => Some(a),
            Spring::Distance(_) => None,
        })
    }

    /// Iterate over the two-body springs.
    pub fn distance_springs(&self) -> impl Iterator<Item = &DistanceSpring> {
        self.springs.iter().filter_map(|s| match s {
            Spring::Distance(d) => Some(d),
            Spring::Anchor(_) => None,
        })
    }

    /// Check every spring against a system of `num_particles` particles.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::IndexOutOfBounds`] for the first spring that
    /// references a missing particle, or [`FabricError::InvalidConfig`] for
    /// a negative or non-finite stiffness or rest length.
    pub fn validate(&self, num_particles: usize) -> Result<()> {
        for (i, spring) in self.springs.iter().enumerate() {
            if let Some(&index) = spring.particles().iter().find(|&&p| p >= num_particles) {
                return Err(FabricError::index_out_of_bounds(index, num_particles));
            }
            let stiffness = spring.stiffness();
            let rest_length = spring.rest_length();
            if !(stiffness.is_finite() && stiffness >= 0.0) {
                return Err(FabricError::invalid_config(format!(
                    "spring {i} has invalid stiffness {stiffness}"
                )));
            }
            if !(rest_length.is_finite() && rest_length >= 0.0) {
                return Err(FabricError::invalid_config(format!(
                    "spring {i} has invalid rest length {rest_length}"
                )));
            }
        }
        Ok(())
    }

    /// Accumulate the force of every spring into `forces`.
    pub fn resolve_all(&self, positions: &[Point3<f64>], forces: &mut [Vector3<f64>]) {
        for spring in &self.springs {
            spring.resolve(positions, forces);
        }
    }

    /// Number of springs per category.
    #[must_use]
    pub fn count_by_kind(&self) -> SpringCounts {
        let mut counts = SpringCounts::default();
        for spring in &self.springs {
            match spring.kind() {
                Some(kind) => *counts.slot(kind) += 1,
                None => counts.anchor += 1,
            }
        }
        counts
    }

    /// Absolute strain over the two-body springs.
    #[must_use]
    pub fn strain_summary(&self, positions: &[Point3<f64>]) -> StrainSummary {
        let mut summary = StrainSummary::default();
        let mut count = 0usize;
        let mut total = 0.0;
        for spring in self.distance_springs() {
            let strain = spring.strain(positions).abs();
            summary.max = summary.max.max(strain);
            total += strain;
            count += 1;
        }
        if count > 0 {
            summary.mean = total / count as f64;
        }
        summary
    }

    /// Total elastic energy stored in the network.
    #[must_use]
    pub fn potential_energy(&self, positions: &[Point3<f64>]) -> f64 {
        self.springs
            .iter()
            .map(|s| s.potential_energy(positions))
            .sum()
    }
}

/// Resolve a pin set to particle indices, without duplicates.
///
/// # Errors
///
/// Returns [`FabricError::IndexOutOfBounds`] if an explicit index does not
/// exist in `topology`.
pub fn pinned_particles(pins: &PinSet, topology: &Topology) -> Result<Vec<usize>> {
    let dim = topology.dim();
    let last_row = dim - 1;
    let candidates: Vec<usize> = match pins {
        PinSet::FirstRow => (0..dim).map(|c| topology.grid_index(0, c)).collect(),
        PinSet::LastRow => (0..dim).map(|c| topology.grid_index(last_row, c)).collect(),
        PinSet::Corners => vec![
            topology.grid_index(0, 0),
            topology.grid_index(0, last_row),
            topology.grid_index(last_row, 0),
            topology.grid_index(last_row, last_row),
        ],
        PinSet::Particles(indices) => {
            let count = topology.num_particles();
            if let Some(&index) = indices.iter().find(|&&i| i >= count) {
                return Err(FabricError::index_out_of_bounds(index, count));
            }
            indices.clone()
        }
    };

    let mut seen = HashSet::with_capacity(candidates.len());
    Ok(candidates.into_iter().filter(|i| seen.insert(*i)).collect())
}

impl PinConfig {
    /// Particles this config anchors on `topology`.
    ///
    /// # Errors
    ///
    /// See [`pinned_particles`].
    pub fn resolve(&self, topology: &Topology) -> Result<Vec<usize>> {
        pinned_particles(&self.pins, topology)
    }
}

/// Accumulates springs and rejects repeated pairs.
struct NetworkBuilder<'a> {
    positions: &'a [Point3<f64>],
    springs: Vec<Spring>,
    pairs: HashSet<(usize, usize)>,
}

impl<'a> NetworkBuilder<'a> {
    fn new(positions: &'a [Point3<f64>]) -> Self {
        Self {
            positions,
            springs: Vec::new(),
            pairs: HashSet::new(),
        }
    }

    /// Add a spring unless the unordered pair already has one.
    fn link(&mut self, a: usize, b: usize, ratio: f64, stiffness: f64, kind: SpringKind) {
        let key = if a < b { (a, b) } else { (b, a) };
        if !self.pairs.insert(key) {
            return;
        }
        self.springs.push(Spring::Distance(DistanceSpring::from_positions(
            a,
            b,
            self.positions,
            ratio,
            stiffness,
            kind,
        )));
    }

    fn add_fabric(&mut self, topology: &Topology, config: &SimulationConfig) {
        let dim = topology.dim();
        let fabric = &config.fabric;

        for row in 0..dim {
            for col in 0..dim {
                let i = topology.grid_index(row, col);
                if row > 0 {
                    let up = topology.grid_index(row - 1, col);
                    let k = fabric.structural_stiffness_y;
                    self.link(i, up, 1.0, k, SpringKind::Structural);
                }
                if col > 0 {
                    let left = topology.grid_index(row, col - 1);
                    let k = fabric.structural_stiffness_x;
                    self.link(i, left, 1.0, k, SpringKind::Structural);
                }
            }
        }

        let bend_band = fabric.bend_start..fabric.bend_end_for(dim);
        for row in 0..dim {
            for col in 0..dim {
                let i = topology.grid_index(row, col);
                for j in bend_band.clone() {
                    if row >= j {
                        let other = topology.grid_index(row - j, col);
                        self.link(i, other, 1.0, fabric.bend_stiffness_y, SpringKind::Bend);
                    }
                    if col >= j {
                        let other = topology.grid_index(row, col - j);
                        self.link(i, other, 1.0, fabric.bend_stiffness_x, SpringKind::Bend);
                    }
                }
            }
        }

        for row in 1..dim {
            for col in 0..dim {
                let i = topology.grid_index(row, col);
                if col > 0 {
                    let other = topology.grid_index(row - 1, col - 1);
                    self.link(i, other, 1.0, fabric.shear_stiffness, SpringKind::Shear);
                }
                if col + 1 < dim {
                    let other = topology.grid_index(row - 1, col + 1);
                    self.link(i, other, 1.0, fabric.shear_stiffness, SpringKind::Shear);
                }
            }
        }
    }

    fn add_hydrogel(&mut self, topology: &Topology, config: &SimulationConfig) {
        let dim = topology.dim();
        let gel = &config.hydrogel;
        let slots = topology.hydrogel_columns().len();
        let (ratio_z, k_z) = (gel.shrink_ratio_z, gel.stiffness_z);
        let (ratio_xy, k_xy) = (gel.shrink_ratio_xy, gel.stiffness_xy);

        for (slot, &col) in topology.hydrogel_columns().iter().enumerate() {
            for row in 0..dim {
                let layer = topology.layer_index(slot, row);
                let primary = topology.grid_index(row, col);

                self.link(primary, layer, ratio_z, k_z, SpringKind::InterLayer);
                if row >= 1 {
                    let below = topology.layer_index(slot, row - 1);
                    self.link(below, layer, ratio_xy, k_xy, SpringKind::IntraLayer);
                }
                if row >= 2 {
                    let below = topology.layer_index(slot, row - 2);
                    self.link(below, layer, ratio_xy, k_xy, SpringKind::IntraLayer);
                }
                for neighbor in topology.grid_neighbors(row, col) {
                    self.link(layer, neighbor, ratio_z, k_z, SpringKind::InterLayer);
                }
                if slot + 1 < slots {
                    let next = topology.layer_index(slot + 1, row);
                    self.link(layer, next, ratio_xy, k_xy, SpringKind::IntraLayer);
                }
            }
        }
    }

    fn add_anchors(&mut self, particles: &[usize], stiffness: f64) {
        for &p in particles {
            self.springs
                .push(Spring::Anchor(AnchorSpring::at_current(p, self.positions, stiffness)));
        }
    }
}
