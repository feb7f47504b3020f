//! Fixed-step frame driver.
//!
//! A rendered frame covers `frame_interval` seconds of simulated time. The
//! driver runs `max(1, ceil(frame_interval / dt))` steps of exactly `dt`, so
//! a step larger than the frame still advances once per frame.

use tracing::trace;

use crate::config::DynamicsConfig;
use crate::error::{FabricError, Result};
use crate::system::{ParticleSystem, StepStats};

/// Default frame interval (30 frames per second).
pub const DEFAULT_FRAME_INTERVAL: f64 = 1.0 / 30.0;

/// Default simulation time step.
pub const DEFAULT_TIME_STEP: f64 = 0.016;

/// Summary of one driven frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Steps taken.
    pub substeps: usize,
    /// Simulated time covered (`substeps * dt`).
    pub simulated_time: f64,
    /// Particles restored during the frame, summed over steps.
    pub numerical_resets: usize,
    /// Statistics of the final step.
    pub last_step: StepStats,
}

/// Number of steps of length `dt` needed to cover `frame_interval`.
///
/// # Errors
///
/// Returns [`FabricError::InvalidTimeStep`] if `dt` is not positive and
/// finite, or [`FabricError::InvalidConfig`] if `frame_interval` is not.
pub fn substeps_per_frame(frame_interval: f64, dt: f64) -> Result<usize> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(FabricError::InvalidTimeStep(dt));
    }
    if !(frame_interval.is_finite() && frame_interval > 0.0) {
        return Err(FabricError::invalid_config(format!(
            "frame interval must be positive and finite, got {frame_interval}"
        )));
    }
    Ok(((frame_interval / dt).ceil() as usize).max(1))
}

impl ParticleSystem {
    /// Advance by one rendered frame.
    ///
    /// # Errors
    ///
    /// See [`substeps_per_frame`] and [`ParticleSystem::step`]. Nothing is
    /// stepped if the arguments are rejected.
    pub fn step_frame(
        &mut self,
        frame_interval: f64,
        dt: f64,
        dynamics: &DynamicsConfig,
    ) -> Result<FrameStats> {
        let substeps = substeps_per_frame(frame_interval, dt)?;
        dynamics.validate()?;

        let mut frame = FrameStats {
            substeps,
            ..FrameStats::default()
        };
        for _ in 0..substeps {
            let stats = self.step(dt, dynamics)?;
            frame.numerical_resets += stats.numerical_resets;
            frame.last_step = stats;
        }
        frame.simulated_time = substeps as f64 * dt;

        trace!(substeps, simulated_time = frame.simulated_time, "Stepped frame");
        Ok(frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_substeps_per_frame() {
        // 0.0333 / 0.016 = 2.08, rounded up.
        assert_eq!(substeps_per_frame(DEFAULT_FRAME_INTERVAL, DEFAULT_TIME_STEP).unwrap(), 3);
        assert_eq!(substeps_per_frame(0.5, 0.125).unwrap(), 4);
        assert_eq!(substeps_per_frame(DEFAULT_FRAME_INTERVAL, 0.1).unwrap(), 1);
    }

    #[test]
    fn test_substeps_rejects_bad_input() {
        assert!(matches!(
            substeps_per_frame(DEFAULT_FRAME_INTERVAL, 0.0),
            Err(FabricError::InvalidTimeStep(_))
        ));
        assert!(matches!(
            substeps_per_frame(-1.0, 0.01),
            Err(FabricError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_step_frame() {
        let mut system = ParticleSystem::new(&SimulationConfig::new(3, 1.0)).unwrap();
        let frame = system
            .step_frame(DEFAULT_FRAME_INTERVAL, DEFAULT_TIME_STEP, &DynamicsConfig::default())
            .unwrap();

        assert_eq!(frame.substeps, 3);
        assert_eq!(system.steps(), 3);
        assert_relative_eq!(frame.simulated_time, 0.048, epsilon = 1e-12);
        assert_eq!(frame.numerical_resets, 0);
        assert_eq!(&frame.last_step, system.stats());
    }
}
