//! Explicit time integration.
//!
//! All schemes are per particle with no iterative solve:
//!
//! ```text
//! SymplecticEuler   v += a dt;  v *= (1 - d);  x += v dt
//! Verlet            x' = x + (1 - d)(x - x_prev) + a dt²;  v = (x' - x) / dt
//! VelocityVerlet    v += ½ (a_prev + a) dt;  v *= (1 - d);  x += v dt + ½ a dt²
//! ```
//!
//! `d` is the damping fraction for the step (0 when damping is disabled).
//! Large stiffness with a large `dt` diverges; nothing here corrects it.

use crate::config::IntegrationScheme;
use crate::state::ParticleState;

/// Time integrator bound to one scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integrator {
    scheme: IntegrationScheme,
    /// Whether `previous_accelerations` holds data from a completed step.
    primed: bool,
}

impl Integrator {
    /// Create an integrator for `scheme`.
    #[must_use]
    pub const fn new(scheme: IntegrationScheme) -> Self {
        Self {
            scheme,
            primed: false,
        }
    }

    /// The scheme in use.
    #[must_use]
    pub const fn scheme(&self) -> IntegrationScheme {
        self.scheme
    }

    /// Forget history carried between steps.
    pub const fn reset(&mut self) {
        self.primed = false;
    }

    /// Advance `state` by `dt` using the forces already in `state.forces`.
    ///
    /// `dt` must be positive and finite; the caller checks it.
    pub fn integrate(&mut self, state: &mut ParticleState, dt: f64, damping: f64) {
        for ((a, f), &inv_m) in state
            .accelerations
            .iter_mut()
            .zip(&state.forces)
            .zip(&state.inverse_masses)
        {
            *a = f * inv_m;
        }

        let keep = 1.0 - damping;
        match self.scheme {
            IntegrationScheme::SymplecticEuler => Self::symplectic_euler(state, dt, keep),
            IntegrationScheme::Verlet => Self::verlet(state, dt, keep),
            IntegrationScheme::VelocityVerlet => {
                Self::velocity_verlet(state, dt, keep, self.primed);
                self.primed = true;
            }
        }
    }

    fn symplectic_euler(state: &mut ParticleState, dt: f64, keep: f64) {
        for i in 0..state.len() {
            let v = &mut state.velocities[i];
            *v += state.accelerations[i] * dt;
            *v *= keep;

            state.previous_positions[i] = state.positions[i];
            state.positions[i] += *v * dt;
        }
    }

    fn verlet(state: &mut ParticleState, dt: f64, keep: f64) {
        let dt2 = dt * dt;
        for i in 0..state.len() {
            let x = state.positions[i];
            let carried = (x - state.previous_positions[i]) * keep;
            let next = x + carried + state.accelerations[i] * dt2;

            state.previous_positions[i] = x;
            state.velocities[i] = (next - x) / dt;
            state.positions[i] = next;
        }
    }

    fn velocity_verlet(state: &mut ParticleState, dt: f64, keep: f64, primed: bool) {
        for i in 0..state.len() {
            let a = state.accelerations[i];
            let v = &mut state.velocities[i];
            if primed {
                *v += (state.previous_accelerations[i] + a) * (0.5 * dt);
            }
            *v *= keep;

            state.previous_positions[i] = state.positions[i];
            state.positions[i] += *v * dt + a * (0.5 * dt * dt);
            state.previous_accelerations[i] = a;
        }
    }
}
