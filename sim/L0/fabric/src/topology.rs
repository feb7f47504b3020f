//! Fabric grid and hydrogel overlay topology.
//!
//! The fabric is a square grid of particles in the XY plane, stored
//! row-major. Each quad is split into two triangles, alternating the diagonal
//! by cell index so the mesh has no directional bias:
//!
//! ```text
//!   even cell        odd cell
//!   ●───●            ●───●
//!   │ A╱│            │╲ C│
//!   │ ╱B│            │D╲ │
//!   ●───●            ●───●
//! ```
//!
//! Hydrogel particles sit `layer_height` above selected fabric columns, one
//! per row. For rendering they are joined to the fabric by degenerate index
//! triples `(a, b, b)`; these are line segments and never physical triangles.

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{GridConfig, HydrogelConfig};
use crate::error::{FabricError, Result};
use crate::math;

/// Choose `count` evenly spaced columns of a grid with side `dim`.
///
/// The stride is `dim / count` and the first column sits at half a stride,
/// which centers the strips on the grid. Returns an empty list when `count`
/// is 0 or exceeds `dim`.
///
/// ```
/// use sim_fabric::topology::hydrogel_columns;
///
/// assert_eq!(hydrogel_columns(30, 6), vec![2, 7, 12, 17, 22, 27]);
/// assert_eq!(hydrogel_columns(4, 4), vec![0, 1, 2, 3]);
/// ```
#[must_use]
pub fn hydrogel_columns(dim: usize, count: usize) -> Vec<usize> {
    if count == 0 || count > dim {
        return Vec::new();
    }
    let stride = dim / count;
    let offset = stride / 2;
    (0..count).map(|k| offset + k * stride).collect()
}

/// Particle positions and render indices for a fabric with an optional
/// hydrogel layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Topology {
    /// Initial particle positions: fabric first, then hydrogel.
    positions: Vec<Point3<f64>>,
    /// Triangles followed by degenerate line triples.
    render_indices: Vec<[u32; 3]>,
    /// Number of leading entries in `render_indices` that are real triangles.
    num_triangles: usize,
    /// Grid side length.
    dim: usize,
    /// Grid spacing.
    spacing: f64,
    /// Fabric columns carrying hydrogel, ascending.
    hydrogel_columns: Vec<usize>,
    /// Hydrogel offset along the up axis.
    layer_height: f64,
}

impl Topology {
    /// Build the fabric grid and hydrogel overlay.
    ///
    /// A grid dimension of 0 is clamped to 1.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if the grid or hydrogel
    /// parameters are invalid (including more hydrogel columns than grid
    /// columns), or [`FabricError::InvalidTopology`] if the particle count
    /// does not fit a `u32` index buffer.
    pub fn build(grid: &GridConfig, hydrogel: &HydrogelConfig) -> Result<Self> {
        grid.validate()?;
        let dim = grid.effective_dim();
        if dim != grid.dim {
            warn!(requested = grid.dim, dim, "Grid dimension clamped");
        }
        hydrogel.validate(dim)?;

        let columns = hydrogel_columns(dim, hydrogel.column_count);
        let num_grid = dim * dim;
        let num_particles = num_grid + columns.len() * dim;
        if u32::try_from(num_particles).is_err() {
            return Err(FabricError::invalid_topology(format!(
                "{num_particles} particles do not fit a u32 index buffer"
            )));
        }

        let mut positions = Vec::with_capacity(num_particles);
        for row in 0..dim {
            for col in 0..dim {
                positions.push(Point3::new(
                    col as f64 * grid.spacing,
                    row as f64 * grid.spacing,
                    grid.base_height,
                ));
            }
        }

        let mut render_indices = Self::grid_triangles(dim);
        let num_triangles = render_indices.len();

        let lift = math::up() * hydrogel.layer_height;
        for &col in &columns {
            for row in 0..dim {
                positions.push(positions[row * dim + col] + lift);
            }
        }

        let mut topology = Self {
            positions,
            render_indices: Vec::new(),
            num_triangles,
            dim,
            spacing: grid.spacing,
            hydrogel_columns: columns,
            layer_height: hydrogel.layer_height,
        };
        render_indices.extend(topology.layer_lines());
        topology.render_indices = render_indices;

        debug!(
            dim,
            particles = topology.num_particles(),
            triangles = topology.num_triangles,
            lines = topology.render_indices.len() - topology.num_triangles,
            "Built fabric topology"
        );

        Ok(topology)
    }

    /// Checkerboard-split triangles over a `dim × dim` grid.
    fn grid_triangles(dim: usize) -> Vec<[u32; 3]> {
        let num_grid = dim * dim;
        let mut triangles = Vec::with_capacity(2 * dim.saturating_sub(1).pow(2));

        for i in 0..num_grid.saturating_sub(dim + 1) {
            // The last particle of a row has no quad to its right.
            if (i + 1) % dim == 0 {
                continue;
            }
            let i0 = i as u32;
            let i1 = (i + 1) as u32;
            let up0 = (i + dim) as u32;
            let up1 = (i + 1 + dim) as u32;

            if i % 2 == 0 {
                triangles.push([i0, i1, up0]);
                triangles.push([up0, i1, up1]);
            } else {
                triangles.push([up0, i0, up1]);
                triangles.push([up1, i0, i1]);
            }
        }

        triangles
    }

    /// Degenerate triples drawing the hydrogel links as lines.
    fn layer_lines(&self) -> Vec<[u32; 3]> {
        let dim = self.dim;
        let mut lines = Vec::new();
        let line = |a: usize, b: usize| [a as u32, b as u32, b as u32];

        for (slot, &col) in self.hydrogel_columns.iter().enumerate() {
            for row in 0..dim {
                let layer = self.layer_index(slot, row);
                let primary = self.grid_index(row, col);

                lines.push(line(primary, layer));
                if row > 0 {
                    lines.push(line(layer - 1, layer));
                }
                for neighbor in self.grid_neighbors(row, col) {
                    lines.push(line(layer, neighbor));
                }
            }
        }

        lines
    }

    /// Fabric particles at `(row±1, col)` and `(row, col±1)` that exist.
    pub(crate) fn grid_neighbors(
        &self,
        row: usize,
        col: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        let offsets: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        offsets.into_iter().filter_map(move |(dr, dc)| {
            let r = row.checked_add_signed(dr)?;
            let c = col.checked_add_signed(dc)?;
            (r < self.dim && c < self.dim).then(|| self.grid_index(r, c))
        })
    }

    /// Initial particle positions.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// All render triples: triangles first, then degenerate line triples.
    #[must_use]
    pub fn render_indices(&self) -> &[[u32; 3]] {
        &self.render_indices
    }

    /// Only the physical triangles of the fabric surface.
    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.render_indices[..self.num_triangles]
    }

    /// Only the degenerate line triples of the hydrogel overlay.
    #[must_use]
    pub fn line_segments(&self) -> &[[u32; 3]] {
        &self.render_indices[self.num_triangles..]
    }

    /// Render indices flattened into a single buffer.
    #[must_use]
    pub fn index_buffer(&self) -> Vec<u32> {
        self.render_indices.iter().flatten().copied().collect()
    }

    /// Number of physical triangles.
    #[must_use]
    pub const fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    /// Grid side length.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows in the fabric grid.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.dim
    }

    /// Number of columns in the fabric grid.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.dim
    }

    /// Grid spacing.
    #[must_use]
    pub const fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Hydrogel offset along the up axis.
    #[must_use]
    pub const fn layer_height(&self) -> f64 {
        self.layer_height
    }

    /// Fabric columns carrying a hydrogel strip.
    #[must_use]
    pub fn hydrogel_columns(&self) -> &[usize] {
        &self.hydrogel_columns
    }

    /// Number of fabric particles.
    #[must_use]
    pub const fn num_grid_particles(&self) -> usize {
        self.dim * self.dim
    }

    /// Number of hydrogel particles.
    #[must_use]
    pub fn num_layer_particles(&self) -> usize {
        self.hydrogel_columns.len() * self.dim
    }

    /// Total number of particles.
    #[must_use]
    pub fn num_particles(&self) -> usize {
        self.positions.len()
    }

    /// Index of the fabric particle at `(row, col)`.
    #[must_use]
    pub const fn grid_index(&self, row: usize, col: usize) -> usize {
        row * self.dim + col
    }

    /// `(row, col)` of a fabric particle.
    #[must_use]
    pub fn grid_coords(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.num_grid_particles()).then(|| (index / self.dim, index % self.dim))
    }

    /// Index of the hydrogel particle in strip `slot` at `row`.
    #[must_use]
    pub const fn layer_index(&self, slot: usize, row: usize) -> usize {
        self.num_grid_particles() + slot * self.dim + row
    }

    /// Whether `index` is a hydrogel particle.
    #[must_use]
    pub fn is_layer_particle(&self, index: usize) -> bool {
        index >= self.num_grid_particles() && index < self.num_particles()
    }

    /// Vector from a fabric particle to the hydrogel particle above it.
    #[must_use]
    pub fn layer_offset(&self) -> Vector3<f64> {
        math::up() * self.layer_height
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fabric(dim: usize) -> Topology {
        Topology::build(&GridConfig::new(dim, 1.0), &HydrogelConfig::disabled()).unwrap()
    }

    #[test]
    fn test_grid_positions_row_major() {
        let topo = Topology::build(
            &GridConfig::new(3, 0.5).with_base_height(2.0),
            &HydrogelConfig::disabled(),
        )
        .unwrap();

        assert_eq!(topo.num_particles(), 9);
        let p = topo.positions()[topo.grid_index(2, 1)];
        assert_relative_eq!(p, Point3::new(0.5, 1.0, 2.0), epsilon = 1e-12);
        assert_eq!(topo.grid_coords(7), Some((2, 1)));
        assert_eq!(topo.grid_coords(9), None);
    }

    #[test]
    fn test_triangle_count() {
        assert_eq!(fabric(1).num_triangles(), 0);
        assert_eq!(fabric(2).num_triangles(), 2);
        assert_eq!(fabric(4).num_triangles(), 18); // 3x3 quads * 2
    }

    #[test]
    fn test_checkerboard_split() {
        let topo = fabric(3);
        let tris = topo.triangles();
        // Cell 0 is even: diagonal from 1 to 3.
        assert_eq!(tris[0], [0, 1, 3]);
        assert_eq!(tris[1], [3, 1, 4]);
        // Cell 1 is odd: diagonal from 1 to 5.
        assert_eq!(tris[2], [4, 1, 5]);
        assert_eq!(tris[3], [5, 1, 2]);
    }

    #[test]
    fn test_triangles_cover_each_quad_once() {
        let topo = fabric(5);
        for tri in topo.triangles() {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
            assert!(tri.iter().all(|&i| (i as usize) < topo.num_grid_particles()));
        }
        let area: f64 = topo
            .triangles()
            .iter()
            .map(|t| {
                let p = topo.positions();
                let a = p[t[1] as usize] - p[t[0] as usize];
                let b = p[t[2] as usize] - p[t[0] as usize];
                a.cross(&b).norm() * 0.5
            })
            .sum();
        assert_relative_eq!(area, 16.0, epsilon = 1e-10);
    }

    #[test]
    fn test_hydrogel_columns() {
        assert_eq!(hydrogel_columns(10, 0), Vec::<usize>::new());
        assert_eq!(hydrogel_columns(10, 2), vec![2, 7]);
        assert_eq!(hydrogel_columns(10, 3), vec![1, 4, 7]);
        assert_eq!(hydrogel_columns(3, 4), Vec::<usize>::new());
    }

    #[test]
    fn test_hydrogel_layer() {
        let topo = Topology::build(
            &GridConfig::new(4, 1.0),
            &HydrogelConfig::with_columns(2).with_layer_height(1.5),
        )
        .unwrap();

        assert_eq!(topo.hydrogel_columns(), &[1, 3]);
        assert_eq!(topo.num_layer_particles(), 8);
        assert_eq!(topo.num_particles(), 24);

        let layer = topo.layer_index(1, 2);
        assert!(topo.is_layer_particle(layer));
        let primary = topo.grid_index(2, 3);
        let offset = topo.positions()[layer] - topo.positions()[primary];
        assert_relative_eq!(offset, Vector3::new(0.0, 0.0, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_layer_lines_are_degenerate() {
        let topo = Topology::build(&GridConfig::new(4, 1.0), &HydrogelConfig::with_columns(1))
            .unwrap();

        assert!(!topo.line_segments().is_empty());
        for line in topo.line_segments() {
            assert_eq!(line[1], line[2]);
            assert!(line.iter().all(|&i| (i as usize) < topo.num_particles()));
        }
        // Column 2: per row one vertical link, plus horizontal links for rows 1..4,
        // plus grid-neighbor diagonals (3 for end rows, 4 for middle rows).
        assert_eq!(topo.line_segments().len(), 4 + 3 + (3 + 4 + 4 + 3));
    }

    #[test]
    fn test_index_buffer() {
        let topo = fabric(2);
        assert_eq!(topo.index_buffer(), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_zero_dim_clamped() {
        let topo = fabric(0);
        assert_eq!(topo.dim(), 1);
        assert_eq!(topo.num_particles(), 1);
    }

    #[test]
    fn test_too_many_columns() {
        let result = Topology::build(&GridConfig::new(3, 1.0), &HydrogelConfig::with_columns(4));
        assert!(matches!(result, Err(FabricError::InvalidConfig(_))));
    }
}
