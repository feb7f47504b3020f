//! Configuration for fabric and hydrogel simulation.
//!
//! The configuration is split by lifetime:
//!
//! - [`GridConfig`], [`FabricConfig`], [`HydrogelConfig`] and [`PinConfig`]
//!   are consumed when the topology and spring network are built.
//! - [`IntegrationScheme`] is fixed for the lifetime of a
//!   [`ParticleSystem`](crate::ParticleSystem).
//! - [`DynamicsConfig`] is read on every step, so a settings panel can edit it
//!   between steps.
//!
//! # Stability
//!
//! Both integrators are explicit. High stiffness combined with a large time
//! step diverges; the core does not detect or correct this. As a rule of
//! thumb keep `dt * sqrt(k / m)` well below 1 for the stiffest spring.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FabricError, Result};

/// Standard gravitational acceleration (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Layout and mass of the primary fabric grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// Number of particles along each side. Clamped to at least 1.
    pub dim: usize,
    /// Distance between neighboring particles.
    pub spacing: f64,
    /// Height (Z) of the fabric plane.
    pub base_height: f64,
    /// Mass of each fabric particle.
    pub particle_mass: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dim: 16,
            spacing: 1.0,
            base_height: 0.0,
            particle_mass: 1.0,
        }
    }
}

impl GridConfig {
    /// Create a grid config with the given side length and spacing.
    #[must_use]
    pub const fn new(dim: usize, spacing: f64) -> Self {
        Self {
            dim,
            spacing,
            base_height: 0.0,
            particle_mass: 1.0,
        }
    }

    /// Set the height of the fabric plane.
    #[must_use]
    pub const fn with_base_height(mut self, base_height: f64) -> Self {
        self.base_height = base_height;
        self
    }

    /// Set the mass of each fabric particle.
    #[must_use]
    pub const fn with_particle_mass(mut self, mass: f64) -> Self {
        self.particle_mass = mass;
        self
    }

    /// Side length after clamping.
    #[must_use]
    pub fn effective_dim(&self) -> usize {
        self.dim.max(1)
    }

    /// Validate the grid parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if spacing or mass is not
    /// positive and finite.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("grid spacing", self.spacing)?;
        ensure_positive("fabric particle mass", self.particle_mass)?;
        ensure_finite("grid base height", self.base_height)
    }
}

/// Stiffness of the springs inside the fabric grid.
///
/// X refers to springs along a row (column neighbors), Y to springs along a
/// column (row neighbors).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FabricConfig {
    /// Structural stiffness along X.
    pub structural_stiffness_x: f64,
    /// Structural stiffness along Y.
    pub structural_stiffness_y: f64,
    /// Bend stiffness along X.
    pub bend_stiffness_x: f64,
    /// Bend stiffness along Y.
    pub bend_stiffness_y: f64,
    /// Shear (diagonal) stiffness.
    pub shear_stiffness: f64,
    /// First bend offset (inclusive). Must be at least 2.
    pub bend_start: usize,
    /// Last bend offset (exclusive). `None` uses the grid dimension.
    pub bend_end: Option<usize>,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            structural_stiffness_x: 1.0,
            structural_stiffness_y: 1.0,
            bend_stiffness_x: 1.0,
            bend_stiffness_y: 1.0,
            shear_stiffness: 1.0,
            bend_start: 2,
            bend_end: None,
        }
    }
}

impl FabricConfig {
    /// Fabric with the same stiffness for every spring category.
    #[must_use]
    pub const fn uniform(stiffness: f64) -> Self {
        Self {
            structural_stiffness_x: stiffness,
            structural_stiffness_y: stiffness,
            bend_stiffness_x: stiffness,
            bend_stiffness_y: stiffness,
            shear_stiffness: stiffness,
            bend_start: 2,
            bend_end: None,
        }
    }

    /// Set the bend band `[start, end)`.
    #[must_use]
    pub const fn with_bend_band(mut self, start: usize, end: Option<usize>) -> Self {
        self.bend_start = start;
        self.bend_end = end;
        self
    }

    /// Exclusive upper bend offset for a grid of side `dim`.
    #[must_use]
    pub fn bend_end_for(&self, dim: usize) -> usize {
        self.bend_end.unwrap_or(dim).min(dim)
    }

    /// Validate the fabric parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] for negative stiffness or a bend
    /// band starting below 2 or ending before it starts.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("structural stiffness x", self.structural_stiffness_x)?;
        ensure_non_negative("structural stiffness y", self.structural_stiffness_y)?;
        ensure_non_negative("bend stiffness x", self.bend_stiffness_x)?;
        ensure_non_negative("bend stiffness y", self.bend_stiffness_y)?;
        ensure_non_negative("shear stiffness", self.shear_stiffness)?;
        if self.bend_start < 2 {
            return Err(FabricError::invalid_config(format!(
                "bend band must start at 2 or more, got {}",
                self.bend_start
            )));
        }
        match self.bend_end {
            Some(end) if end < self.bend_start => Err(FabricError::invalid_config(format!(
                "bend band end {end} is before start {}",
                self.bend_start
            ))),
            _ => Ok(()),
        }
    }
}

/// Layout and coupling of the hydrogel layer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HydrogelConfig {
    /// Number of fabric columns carrying a hydrogel strip. 0 disables the layer.
    pub column_count: usize,
    /// Offset of the layer along the up axis.
    pub layer_height: f64,
    /// Stiffness of springs crossing between layers.
    pub stiffness_z: f64,
    /// Stiffness of springs inside the hydrogel layer.
    pub stiffness_xy: f64,
    /// Rest-length multiplier for springs crossing between layers.
    pub shrink_ratio_z: f64,
    /// Rest-length multiplier for springs inside the hydrogel layer.
    pub shrink_ratio_xy: f64,
    /// Mass of each hydrogel particle.
    pub particle_mass: f64,
}

impl Default for HydrogelConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl HydrogelConfig {
    /// No hydrogel layer.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            column_count: 0,
            layer_height: 2.0,
            stiffness_z: 1.0,
            stiffness_xy: 1.0,
            shrink_ratio_z: 1.0,
            shrink_ratio_xy: 1.0,
            particle_mass: 1.0,
        }
    }

    /// Hydrogel strips on `column_count` evenly spaced columns.
    #[must_use]
    pub const fn with_columns(column_count: usize) -> Self {
        let mut config = Self::disabled();
        config.column_count = column_count;
        config
    }

    /// Set the layer height.
    #[must_use]
    pub const fn with_layer_height(mut self, layer_height: f64) -> Self {
        self.layer_height = layer_height;
        self
    }

    /// Set the shrink ratios (Z, XY).
    #[must_use]
    pub const fn with_shrink_ratios(mut self, z: f64, xy: f64) -> Self {
        self.shrink_ratio_z = z;
        self.shrink_ratio_xy = xy;
        self
    }

    /// Set the coupling stiffness (Z, XY).
    #[must_use]
    pub const fn with_stiffness(mut self, z: f64, xy: f64) -> Self {
        self.stiffness_z = z;
        self.stiffness_xy = xy;
        self
    }

    /// Whether any hydrogel particles will be created.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.column_count > 0
    }

    /// Validate the hydrogel parameters against a grid of side `dim`.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if more columns are requested
    /// than the grid has, or if any height, stiffness, ratio or mass is out of
    /// range.
    pub fn validate(&self, dim: usize) -> Result<()> {
        if self.column_count > dim {
            return Err(FabricError::invalid_config(format!(
                "hydrogel column count {} exceeds grid dimension {dim}",
                self.column_count
            )));
        }
        if !self.is_enabled() {
            return Ok(());
        }
        ensure_positive("hydrogel layer height", self.layer_height)?;
        ensure_non_negative("hydrogel stiffness z", self.stiffness_z)?;
        ensure_non_negative("hydrogel stiffness xy", self.stiffness_xy)?;
        ensure_positive("hydrogel shrink ratio z", self.shrink_ratio_z)?;
        ensure_positive("hydrogel shrink ratio xy", self.shrink_ratio_xy)?;
        ensure_positive("hydrogel particle mass", self.particle_mass)
    }
}

/// Which particles receive anchor springs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PinSet {
    /// Every particle of row 0.
    FirstRow,
    /// Every particle of the last row (a hem).
    LastRow,
    /// The four corners of the grid.
    Corners,
    /// Explicit particle indices.
    Particles(Vec<usize>),
}

/// Anchor (zero-length) springs holding particles at their initial position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// Particles to anchor.
    pub pins: PinSet,
    /// Stiffness of each anchor spring.
    pub stiffness: f64,
}

impl PinConfig {
    /// Default anchor stiffness.
    pub const DEFAULT_STIFFNESS: f64 = 1000.0;

    /// Anchor the given set with the default stiffness.
    #[must_use]
    pub const fn new(pins: PinSet) -> Self {
        Self {
            pins,
            stiffness: Self::DEFAULT_STIFFNESS,
        }
    }

    /// Set the anchor stiffness.
    #[must_use]
    pub const fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Validate the anchor parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] for negative stiffness.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("anchor stiffness", self.stiffness)
    }
}

/// Time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntegrationScheme {
    /// Semi-implicit Euler: velocity first, then position.
    #[default]
    SymplecticEuler,
    /// Position-based Störmer–Verlet.
    Verlet,
    /// Velocity Verlet using the previous and current acceleration.
    VelocityVerlet,
}

/// Per-step forces and corrective passes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DynamicsConfig {
    /// Apply gravity.
    pub gravity_enabled: bool,
    /// Gravitational acceleration.
    pub gravity: Vector3<f64>,
    /// Apply quadratic air drag.
    pub drag_enabled: bool,
    /// Drag coefficient (typically 0-2).
    pub drag_coefficient: f64,
    /// Damp velocity every step.
    pub damping_enabled: bool,
    /// Fraction of velocity removed per step, in `[0, 1)`.
    pub damping: f64,
    /// Push apart fabric particles closer than `min_separation`.
    pub self_intersection_enabled: bool,
    /// Minimum separation between fabric particles. 0 disables the pass.
    pub min_separation: f64,
    /// Keep particles above `floor_height`.
    pub floor_enabled: bool,
    /// Height of the floor plane.
    pub floor_height: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            gravity_enabled: true,
            gravity: Vector3::new(0.0, 0.0, -STANDARD_GRAVITY),
            drag_enabled: false,
            drag_coefficient: 1.0,
            damping_enabled: true,
            damping: 0.02,
            self_intersection_enabled: false,
            min_separation: 0.0,
            floor_enabled: false,
            floor_height: 0.0,
        }
    }
}

impl DynamicsConfig {
    /// No forces and no corrective passes: springs alone drive motion.
    #[must_use]
    pub fn free() -> Self {
        Self {
            gravity_enabled: false,
            damping_enabled: false,
            ..Self::default()
        }
    }

    /// Enable gravity with the given acceleration.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity_enabled = true;
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub const fn without_gravity(mut self) -> Self {
        self.gravity_enabled = false;
        self
    }

    /// Enable drag with the given coefficient.
    #[must_use]
    pub const fn with_drag(mut self, coefficient: f64) -> Self {
        self.drag_enabled = true;
        self.drag_coefficient = coefficient;
        self
    }

    /// Enable velocity damping with the given constant.
    #[must_use]
    pub const fn with_damping(mut self, damping: f64) -> Self {
        self.damping_enabled = true;
        self.damping = damping;
        self
    }

    /// Disable velocity damping.
    #[must_use]
    pub const fn without_damping(mut self) -> Self {
        self.damping_enabled = false;
        self
    }

    /// Enable the self-intersection pass.
    #[must_use]
    pub const fn with_self_intersection(mut self, min_separation: f64) -> Self {
        self.self_intersection_enabled = true;
        self.min_separation = min_separation;
        self
    }

    /// Enable the floor constraint at the given height.
    #[must_use]
    pub const fn with_floor(mut self, floor_height: f64) -> Self {
        self.floor_enabled = true;
        self.floor_height = floor_height;
        self
    }

    /// Damping factor actually applied this step.
    #[must_use]
    pub fn effective_damping(&self) -> f64 {
        if self.damping_enabled { self.damping } else { 0.0 }
    }

    /// Validate the dynamics parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] for non-finite gravity, negative
    /// drag or separation, or damping outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.iter().all(|c| c.is_finite()) {
            return Err(FabricError::invalid_config("gravity must be finite"));
        }
        ensure_non_negative("drag coefficient", self.drag_coefficient)?;
        if !(0.0..1.0).contains(&self.damping) {
            return Err(FabricError::invalid_config(format!(
                "damping must be in [0, 1), got {}",
                self.damping
            )));
        }
        ensure_non_negative("minimum separation", self.min_separation)?;
        ensure_finite("floor height", self.floor_height)
    }
}

/// Complete configuration of a fabric simulation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Fabric grid layout.
    pub grid: GridConfig,
    /// Fabric spring stiffness.
    pub fabric: FabricConfig,
    /// Hydrogel layer layout and coupling.
    pub hydrogel: HydrogelConfig,
    /// Optional anchor springs.
    pub pinning: Option<PinConfig>,
    /// Integration scheme, fixed for the lifetime of the system.
    pub scheme: IntegrationScheme,
    /// Per-step forces and corrections.
    pub dynamics: DynamicsConfig,
}

impl SimulationConfig {
    /// Create a fabric-only config on a `dim × dim` grid.
    #[must_use]
    pub fn new(dim: usize, spacing: f64) -> Self {
        Self {
            grid: GridConfig::new(dim, spacing),
            ..Self::default()
        }
    }

    /// The stretched-textile demo: 30×30 fabric, six hydrogel strips
    /// pre-tensioned against it, Verlet integration with heavy damping.
    #[must_use]
    pub fn stretched() -> Self {
        let spacing = 1.0;
        Self {
            grid: GridConfig {
                dim: 30,
                spacing,
                base_height: 30.0,
                particle_mass: 1.0 / 1000.0,
            },
            fabric: FabricConfig::uniform(1.0),
            hydrogel: HydrogelConfig {
                column_count: 6,
                layer_height: 2.0,
                stiffness_z: 1.0,
                stiffness_xy: 1.0,
                shrink_ratio_z: 1.001,
                shrink_ratio_xy: 0.998,
                particle_mass: 1.0 / 1000.0,
            },
            pinning: None,
            scheme: IntegrationScheme::Verlet,
            dynamics: DynamicsConfig {
                gravity_enabled: false,
                damping_enabled: true,
                damping: 0.2,
                self_intersection_enabled: true,
                min_separation: spacing,
                ..DynamicsConfig::default()
            },
        }
    }

    /// Set the fabric stiffness.
    #[must_use]
    pub const fn with_fabric(mut self, fabric: FabricConfig) -> Self {
        self.fabric = fabric;
        self
    }

    /// Set the hydrogel layer.
    #[must_use]
    pub const fn with_hydrogel(mut self, hydrogel: HydrogelConfig) -> Self {
        self.hydrogel = hydrogel;
        self
    }

    /// Set the anchor springs.
    #[must_use]
    pub fn with_pinning(mut self, pinning: PinConfig) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Set the integration scheme.
    #[must_use]
    pub const fn with_scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the per-step dynamics.
    #[must_use]
    pub const fn with_dynamics(mut self, dynamics: DynamicsConfig) -> Self {
        self.dynamics = dynamics;
        self
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`FabricError::InvalidConfig`] found.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.fabric.validate()?;
        self.hydrogel.validate(self.grid.effective_dim())?;
        if let Some(pinning) = &self.pinning {
            pinning.validate()?;
        }
        self.dynamics.validate()
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FabricError::invalid_config(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FabricError::invalid_config(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FabricError::invalid_config(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig::stretched().validate().is_ok());
    }

    #[test]
    fn test_stretched_preset() {
        let config = SimulationConfig::stretched();
        assert_eq!(config.grid.dim, 30);
        assert_eq!(config.hydrogel.column_count, 6);
        assert_eq!(config.scheme, IntegrationScheme::Verlet);
        assert!(config.hydrogel.shrink_ratio_xy < 1.0);
        assert!(config.hydrogel.shrink_ratio_z > 1.0);
    }

    #[test]
    fn test_zero_mass_rejected() {
        let config = SimulationConfig {
            grid: GridConfig::new(4, 1.0).with_particle_mass(0.0),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FabricError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_too_many_columns_rejected() {
        let config = SimulationConfig::new(4, 1.0).with_hydrogel(HydrogelConfig::with_columns(5));
        assert!(config.validate().is_err());

        let config = SimulationConfig::new(4, 1.0).with_hydrogel(HydrogelConfig::with_columns(4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bend_band_validation() {
        assert!(FabricConfig::default().with_bend_band(1, None).validate().is_err());
        assert!(FabricConfig::default().with_bend_band(4, Some(3)).validate().is_err());
        assert!(FabricConfig::default().with_bend_band(2, Some(4)).validate().is_ok());
        assert_eq!(FabricConfig::default().bend_end_for(10), 10);
        assert_eq!(FabricConfig::default().with_bend_band(2, Some(20)).bend_end_for(10), 10);
    }

    #[test]
    fn test_damping_range() {
        assert!(DynamicsConfig::default().with_damping(1.0).validate().is_err());
        assert!(DynamicsConfig::default().with_damping(-0.1).validate().is_err());
        assert!(DynamicsConfig::default().with_damping(0.5).validate().is_ok());
    }

    #[test]
    fn test_effective_damping() {
        let dynamics = DynamicsConfig::default().with_damping(0.3);
        assert_eq!(dynamics.effective_damping(), 0.3);
        assert_eq!(dynamics.without_damping().effective_damping(), 0.0);
    }

    #[test]
    fn test_grid_dim_clamped() {
        assert_eq!(GridConfig::new(0, 1.0).effective_dim(), 1);
    }
}
