//! Error types for fabric simulation.

use thiserror::Error;

/// Errors that can occur while building or stepping a particle system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FabricError {
    /// A configuration value is out of range (e.g., non-positive mass).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The generated topology is inconsistent.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A spring references a particle that does not exist.
    #[error("Particle index {index} out of bounds (count: {count})")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of particles in the system.
        count: usize,
    },

    /// The time step is zero, negative, or not finite.
    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f64),

    /// Numerical error (`NaN`, infinity).
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

impl FabricError {
    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid topology error.
    pub fn invalid_topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }

    /// Create an index out of bounds error.
    #[must_use]
    pub const fn index_out_of_bounds(index: usize, count: usize) -> Self {
        Self::IndexOutOfBounds { index, count }
    }

    /// Create a numerical error.
    pub fn numerical_error(msg: impl Into<String>) -> Self {
        Self::NumericalError(msg.into())
    }
}

/// Result type for fabric simulation operations.
pub type Result<T> = std::result::Result<T, FabricError>;
