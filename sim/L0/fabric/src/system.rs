//! The fabric particle system.
//!
//! # Step Overview
//!
//! ```text
//! For each step:
//!   1. Clear forces
//!   2. Add gravity and drag
//!   3. Add every spring force
//!   4. Push apart fabric particles closer than the minimum separation
//!   5. Integrate with the configured scheme
//!   6. Clamp to the floor
//!   7. Restore any particle whose state became NaN/infinite
//! ```
//!
//! The system owns the topology, the spring network and the particle state.
//! It is single-threaded; identical configurations stepped with identical
//! time steps produce bit-identical positions.

use nalgebra::Point3;
use tracing::{debug, info, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{DynamicsConfig, IntegrationScheme, SimulationConfig};
use crate::correction;
use crate::error::{FabricError, Result};
use crate::forces;
use crate::integrator::Integrator;
use crate::math;
use crate::network::{SpringCounts, SpringNetwork};
use crate::state::ParticleState;
use crate::topology::Topology;
use crate::types::ParticleFlags;

/// Statistics from one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepStats {
    /// Total kinetic energy after the step.
    pub kinetic_energy: f64,
    /// Largest absolute spring strain after the step.
    pub max_strain: f64,
    /// Mean absolute spring strain after the step.
    pub mean_strain: f64,
    /// Fabric particle pairs pushed apart.
    pub corrected_pairs: usize,
    /// Particles clamped to the floor.
    pub floor_contacts: usize,
    /// Particles restored after a non-finite result.
    pub numerical_resets: usize,
    /// Number of springs in the network.
    pub num_springs: usize,
}

/// Fabric and hydrogel particles joined by springs.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    topology: Topology,
    network: SpringNetwork,
    state: ParticleState,
    integrator: Integrator,
    /// Positions at the start of the current step.
    step_start: Vec<Point3<f64>>,
    stats: StepStats,
    time: f64,
    steps: u64,
}

impl ParticleSystem {
    /// Build the topology, particles and springs described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] for invalid parameters and
    /// [`FabricError::IndexOutOfBounds`] if a pinned particle does not exist.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let topology = Topology::build(&config.grid, &config.hydrogel)?;
        let num_grid = topology.num_grid_particles();
        let masses = (0..topology.num_particles())
            .map(|i| {
                if i < num_grid {
                    config.grid.particle_mass
                } else {
                    config.hydrogel.particle_mass
                }
            })
            .collect();

        let mut state = ParticleState::new(topology.positions().to_vec(), masses)?;
        for flags in &mut state.flags[num_grid..] {
            flags.insert(ParticleFlags::HYDROGEL);
        }

        let network = SpringNetwork::build(&topology, config)?;
        network.validate(state.len())?;
        for anchor in network.anchors() {
            state.flags[anchor.particle].insert(ParticleFlags::ANCHORED);
        }

        info!(
            dim = topology.dim(),
            particles = state.len(),
            hydrogel_particles = topology.num_layer_particles(),
            springs = network.len(),
            scheme = ?config.scheme,
            "Created fabric particle system"
        );

        Ok(Self {
            step_start: topology.positions().to_vec(),
            topology,
            network,
            state,
            integrator: Integrator::new(config.scheme),
            stats: StepStats::default(),
            time: 0.0,
            steps: 0,
        })
    }

    /// Advance the simulation by exactly `dt`.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidTimeStep`] if `dt` is not positive and
    /// finite, or [`FabricError::InvalidConfig`] if `dynamics` is invalid.
    /// The state is unchanged on error.
    pub fn step(&mut self, dt: f64, dynamics: &DynamicsConfig) -> Result<StepStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(FabricError::InvalidTimeStep(dt));
        }
        dynamics.validate()?;

        self.step_start.copy_from_slice(&self.state.positions);

        let corrected_pairs = self.accumulate_forces(dynamics);
        self.integrator
            .integrate(&mut self.state, dt, dynamics.effective_damping());

        let floor_contacts = if dynamics.floor_enabled {
            correction::apply_floor(&mut self.state.positions, dynamics.floor_height)
        } else {
            0
        };

        let numerical_resets = self.restore_non_finite();

        let strain = self.network.strain_summary(&self.state.positions);
        self.stats = StepStats {
            kinetic_energy: self.state.kinetic_energy(),
            max_strain: strain.max,
            mean_strain: strain.mean,
            corrected_pairs,
            floor_contacts,
            numerical_resets,
            num_springs: self.network.len(),
        };
        self.time += dt;
        self.steps += 1;

        trace!(
            step = self.steps,
            kinetic_energy = self.stats.kinetic_energy,
            max_strain = self.stats.max_strain,
            corrected_pairs,
            floor_contacts,
            "Stepped fabric"
        );

        Ok(self.stats)
    }

    /// Fill the force buffer for the current state.
    ///
    /// Runs the self-intersection pass last, which moves fabric particles.
    /// Returns the number of corrected pairs.
    fn accumulate_forces(&mut self, dynamics: &DynamicsConfig) -> usize {
        let state = &mut self.state;
        forces::clear(&mut state.forces);

        if dynamics.gravity_enabled {
            forces::apply_gravity(&mut state.forces, &state.masses, &dynamics.gravity);
        }
        if dynamics.drag_enabled {
            let spacing = self.topology.spacing();
            forces::apply_drag(
                &mut state.forces,
                &state.velocities,
                dynamics.drag_coefficient,
                spacing * spacing,
            );
        }

        self.network.resolve_all(&state.positions, &mut state.forces);

        if dynamics.self_intersection_enabled {
            correction::resolve_self_intersection(
                &mut state.positions,
                self.topology.num_grid_particles(),
                dynamics.min_separation,
            )
        } else {
            0
        }
    }

    /// Put back any particle whose position or velocity is not finite.
    fn restore_non_finite(&mut self) -> usize {
        let state = &mut self.state;
        let mut resets = 0;
        for i in 0..state.len() {
            if math::point_is_finite(&state.positions[i])
                && math::vector_is_finite(&state.velocities[i])
            {
                continue;
            }
            let start = self.step_start[i];
            state.positions[i] = start;
            state.previous_positions[i] = start;
            state.velocities[i].fill(0.0);
            state.previous_accelerations[i].fill(0.0);
            resets += 1;
        }
        if resets > 0 {
            warn!(
                resets,
                step = self.steps + 1,
                "Non-finite particle state restored"
            );
        }
        resets
    }

    /// Restore the initial positions with zero velocity.
    pub fn reset(&mut self) {
        self.state.reset_to(self.topology.positions());
        self.integrator.reset();
        self.stats = StepStats::default();
        self.time = 0.0;
        self.steps = 0;
        debug!("Reset fabric particle system");
    }

    /// Rebuild the spring network from the initial positions.
    ///
    /// Use after editing stiffness, shrink ratios, the bend band or pins.
    /// Current particle state is kept.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfig`] if `config` is invalid or
    /// describes a different grid or hydrogel layout than this system was
    /// built with.
    pub fn rebuild_springs(&mut self, config: &SimulationConfig) -> Result<()> {
        config.validate()?;
        let dim = config.grid.effective_dim();
        let columns = crate::topology::hydrogel_columns(dim, config.hydrogel.column_count);
        if dim != self.topology.dim() || columns != self.topology.hydrogel_columns() {
            return Err(FabricError::invalid_config(
                "spring rebuild requires the same grid and hydrogel layout",
            ));
        }

        let network = SpringNetwork::build(&self.topology, config)?;
        network.validate(self.state.len())?;

        for flags in &mut self.state.flags {
            flags.remove(ParticleFlags::ANCHORED);
        }
        for anchor in network.anchors() {
            self.state.flags[anchor.particle].insert(ParticleFlags::ANCHORED);
        }
        self.network = network;
        self.stats.num_springs = self.network.len();

        debug!(springs = self.network.len(), "Rebuilt spring network");
        Ok(())
    }

    /// Current particle positions, fabric first, then hydrogel.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        self.state.positions()
    }

    /// Render triples: triangles first, then degenerate line triples.
    #[must_use]
    pub fn render_indices(&self) -> &[[u32; 3]] {
        self.topology.render_indices()
    }

    /// Grid and hydrogel layout.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The spring network.
    #[must_use]
    pub const fn network(&self) -> &SpringNetwork {
        &self.network
    }

    /// Per-particle state.
    #[must_use]
    pub const fn state(&self) -> &ParticleState {
        &self.state
    }

    /// Mutable per-particle state, for setting velocities or moving particles.
    pub const fn state_mut(&mut self) -> &mut ParticleState {
        &mut self.state
    }

    /// Integration scheme chosen at construction.
    #[must_use]
    pub const fn scheme(&self) -> IntegrationScheme {
        self.integrator.scheme()
    }

    /// Statistics from the last step.
    #[must_use]
    pub const fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Springs per category.
    #[must_use]
    pub fn spring_counts(&self) -> SpringCounts {
        self.network.count_by_kind()
    }

    /// Number of particles.
    #[must_use]
    pub fn num_particles(&self) -> usize {
        self.state.len()
    }

    /// Simulated time since construction or the last reset.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Steps taken since construction or the last reset.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }
}
