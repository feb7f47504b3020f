//! Mass-spring simulation of a fabric sheet with a hydrogel overlay.
//!
//! A square grid of fabric particles is joined by structural, bend and shear
//! springs. Optional hydrogel strips float above selected grid columns and are
//! coupled to the fabric by springs whose rest lengths are scaled by shrink
//! ratios. When the strips contract they pull the fabric out of plane.
//!
//! # Layout
//!
//! ```text
//!   hydrogel    ○     ○          layer_height above the fabric,
//!               ┆╲   ┆╲          one strip per chosen column
//!   fabric   ●──●──●──●──●
//!            │╲ │ ╱│╲ │ ╱│       grid_dim × grid_dim, row-major
//!            ●──●──●──●──●
//! ```
//!
//! Particles are stored as parallel arrays: fabric first (`row * dim + col`),
//! then hydrogel (`dim² + strip * dim + row`). Springs refer to particles by
//! index only.
//!
//! # Physics Model
//!
//! Springs follow Hooke's law with equal and opposite forces. Each step
//! accumulates gravity, quadratic drag and spring forces, optionally pushes
//! apart fabric particles that come too close, then integrates explicitly:
//!
//! - **Symplectic Euler**: velocity first, then position
//! - **Verlet**: position history, velocity derived from displacement
//! - **Velocity Verlet**: averaged acceleration over consecutive steps
//!
//! Explicit integration is only conditionally stable. Stiff springs with a
//! large time step diverge; particles whose state becomes non-finite are put
//! back where the step started and reported in [`StepStats`].
//!
//! # Quick Start
//!
//! ```
//! use sim_fabric::{
//!     DynamicsConfig, HydrogelConfig, ParticleSystem, SimulationConfig,
//! };
//!
//! let config = SimulationConfig::new(8, 1.0).with_hydrogel(
//!     HydrogelConfig::with_columns(2).with_shrink_ratios(1.0, 0.9),
//! );
//! let mut system = ParticleSystem::new(&config)?;
//!
//! let dynamics = DynamicsConfig::default().without_gravity();
//! for _ in 0..10 {
//!     system.step(0.01, &dynamics)?;
//! }
//!
//! // Upload to a renderer.
//! let positions = system.positions();
//! let indices = system.render_indices();
//! assert_eq!(positions.len(), 64 + 16);
//! assert!(!indices.is_empty());
//! # Ok::<(), sim_fabric::FabricError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This crate has no rendering or UI dependencies. Positions and render
//! indices are plain slices for any renderer to upload.

#![doc(html_root_url = "https://docs.rs/sim-fabric/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
// Allow precision loss when converting indices to f64 - these are small values
#![allow(clippy::cast_precision_loss)]
// Allow sign loss for array indices - we validate bounds
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
// Allow long functions for network construction
#![allow(clippy::too_many_lines)]
// Test-related lints - these are style preferences
#![cfg_attr(test, allow(clippy::uninlined_format_args, clippy::float_cmp))]

pub mod config;
pub mod correction;
pub mod driver;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod math;
pub mod network;
pub mod spring;
pub mod state;
pub mod system;
pub mod topology;
pub mod types;

// Re-export main types at crate root
pub use config::{
    DynamicsConfig, FabricConfig, GridConfig, HydrogelConfig, IntegrationScheme, PinConfig,
    PinSet, STANDARD_GRAVITY, SimulationConfig,
};
pub use driver::{DEFAULT_FRAME_INTERVAL, DEFAULT_TIME_STEP, FrameStats, substeps_per_frame};
pub use error::{FabricError, Result};
pub use integrator::Integrator;
pub use network::{SpringCounts, SpringNetwork, StrainSummary};
pub use spring::{AnchorSpring, DistanceSpring, Spring};
pub use state::ParticleState;
pub use system::{ParticleSystem, StepStats};
pub use topology::Topology;
pub use types::{ParticleFlags, SpringKind};
