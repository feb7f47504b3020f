//! Integration tests for stepping fabric particle systems.
//!
//! Run with: cargo test -p sim-fabric --test dynamics

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_fabric::{
    DynamicsConfig, FabricConfig, GridConfig, HydrogelConfig, IntegrationScheme, ParticleSystem,
    PinConfig, PinSet, STANDARD_GRAVITY, SimulationConfig,
};

fn mean_height(system: &ParticleSystem, indices: &[usize]) -> f64 {
    indices.iter().map(|&i| system.positions()[i].z).sum::<f64>() / indices.len() as f64
}

// =============================================================================
// Equilibrium
// =============================================================================

#[test]
fn rest_configuration_stays_at_rest() {
    for scheme in [
        IntegrationScheme::SymplecticEuler,
        IntegrationScheme::Verlet,
        IntegrationScheme::VelocityVerlet,
    ] {
        let config = SimulationConfig::new(5, 0.8)
            .with_hydrogel(HydrogelConfig::with_columns(2))
            .with_scheme(scheme);
        let mut system = ParticleSystem::new(&config).unwrap();
        let initial = system.positions().to_vec();

        let stats = system.step(0.01, &DynamicsConfig::free()).unwrap();

        for (p, q) in system.positions().iter().zip(&initial) {
            assert_relative_eq!(p, q, epsilon = 1e-12);
        }
        assert_relative_eq!(stats.max_strain, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.kinetic_energy, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn stretched_pair_returns_toward_rest_length() {
    let mut system = ParticleSystem::new(&SimulationConfig::new(2, 1.0)).unwrap();
    let rest = system.network().distance_springs().next().unwrap().rest_length;
    assert_relative_eq!(rest, 1.0);

    // Pull the top-right particle outward along the diagonal.
    system
        .state_mut()
        .set_position(3, Point3::new(1.2, 1.2, 0.0))
        .unwrap();
    let strain_before = system.network().strain_summary(system.positions()).max;
    assert!(strain_before > 0.1);

    let dynamics = DynamicsConfig::free().with_damping(0.1);
    for _ in 0..200 {
        system.step(0.01, &dynamics).unwrap();
    }
    let strain_after = system.network().strain_summary(system.positions()).max;
    assert!(
        strain_after < strain_before,
        "strain {} should drop below {}",
        strain_after,
        strain_before
    );
}

// =============================================================================
// Free fall
// =============================================================================

#[test]
fn euler_free_fall_speed() {
    let config = SimulationConfig {
        grid: GridConfig::new(1, 1.0).with_base_height(100.0),
        ..SimulationConfig::default()
    };
    let mut system = ParticleSystem::new(&config).unwrap();
    assert!(system.network().is_empty());

    let dt = 0.01;
    let dynamics = DynamicsConfig::default().without_damping();
    let steps = 50;
    for _ in 0..steps {
        system.step(dt, &dynamics).unwrap();
    }

    let speed = system.state().velocities()[0].norm();
    assert_relative_eq!(speed, STANDARD_GRAVITY * dt * f64::from(steps), epsilon = 1e-9);
    assert!(system.positions()[0].z < 100.0);
}

#[test]
fn all_schemes_fall_under_gravity() {
    for scheme in [
        IntegrationScheme::SymplecticEuler,
        IntegrationScheme::Verlet,
        IntegrationScheme::VelocityVerlet,
    ] {
        let config = SimulationConfig::new(1, 1.0).with_scheme(scheme);
        let mut system = ParticleSystem::new(&config).unwrap();
        let dynamics = DynamicsConfig::default().without_damping();
        for _ in 0..100 {
            system.step(0.01, &dynamics).unwrap();
        }

        // ½ g t² at t = 1 s; schemes differ by O(dt).
        let z = system.positions()[0].z;
        assert!(
            (z + 0.5 * STANDARD_GRAVITY).abs() < 0.1,
            "{:?} fell to {}",
            scheme,
            z
        );
    }
}

#[test]
fn drag_limits_speed() {
    let config = SimulationConfig::new(1, 1.0);
    let mut plain = ParticleSystem::new(&config).unwrap();
    let mut dragged = ParticleSystem::new(&config).unwrap();

    let without = DynamicsConfig::default().without_damping();
    let with = without.with_drag(1.0);
    for _ in 0..200 {
        plain.step(0.01, &without).unwrap();
        dragged.step(0.01, &with).unwrap();
    }

    let v_plain = plain.state().velocities()[0].norm();
    let v_dragged = dragged.state().velocities()[0].norm();
    assert!(v_dragged < v_plain);

    // Terminal speed: m g = ½ ρ Cd A v².
    let terminal = (2.0 * STANDARD_GRAVITY / sim_fabric::forces::AIR_DENSITY).sqrt();
    assert!(v_dragged <= terminal * 1.01);
}

// =============================================================================
// Anchored sheet
// =============================================================================

#[test]
fn anchored_corners_hold_sagging_sheet() {
    let config = SimulationConfig::new(4, 1.0)
        .with_scheme(IntegrationScheme::SymplecticEuler)
        .with_pinning(PinConfig::new(PinSet::Corners));
    let mut system = ParticleSystem::new(&config).unwrap();
    let initial = system.positions().to_vec();

    let corners = [0, 3, 12, 15];
    let free: Vec<usize> = (0..16).filter(|i| !corners.contains(i)).collect();

    let dynamics = DynamicsConfig::default();
    let mut heights = vec![mean_height(&system, &free)];
    for step in 1..=100 {
        let stats = system.step(0.016, &dynamics).unwrap();
        assert_eq!(stats.numerical_resets, 0);
        if step % 10 == 0 {
            heights.push(mean_height(&system, &free));
        }
    }

    for &c in &corners {
        let drift = (system.positions()[c] - initial[c]).norm();
        assert!(drift < 0.25, "corner {} drifted {}", c, drift);
    }

    assert!(heights[1] < heights[0]);
    assert!(*heights.last().unwrap() < -1.0);
    for &c in &corners {
        let drop = initial[c].z - system.positions()[c].z;
        assert!(drop < initial[free[0]].z - mean_height(&system, &free));
    }
}

// =============================================================================
// Zero stiffness
// =============================================================================

#[test]
fn zero_stiffness_matches_free_particles() {
    let config = SimulationConfig::new(3, 1.0)
        .with_fabric(FabricConfig::uniform(0.0))
        .with_hydrogel(HydrogelConfig::with_columns(1).with_stiffness(0.0, 0.0))
        .with_pinning(PinConfig::new(PinSet::FirstRow).with_stiffness(0.0));
    let mut sheet = ParticleSystem::new(&config).unwrap();
    assert!(!sheet.network().is_empty());

    let mut lone = ParticleSystem::new(&SimulationConfig::new(1, 1.0)).unwrap();

    let dynamics = DynamicsConfig::default().with_drag(0.5).with_damping(0.05);
    for _ in 0..30 {
        sheet.step(0.01, &dynamics).unwrap();
        lone.step(0.01, &dynamics).unwrap();
    }

    let displacement = lone.positions()[0] - lone.topology().positions()[0];
    for (p, p0) in sheet.positions().iter().zip(sheet.topology().positions()) {
        assert_relative_eq!(p - p0, displacement, epsilon = 1e-12);
    }
    for v in sheet.state().velocities() {
        assert_relative_eq!(*v, lone.state().velocities()[0], epsilon = 1e-12);
    }
}

// =============================================================================
// Floor, reset, determinism
// =============================================================================

#[test]
fn floor_stops_falling_sheet() {
    let config = SimulationConfig {
        grid: GridConfig::new(3, 1.0).with_base_height(0.5),
        ..SimulationConfig::default()
    };
    let mut system = ParticleSystem::new(&config).unwrap();
    let dynamics = DynamicsConfig::default().with_floor(0.0);

    let mut contacts = 0;
    for _ in 0..100 {
        contacts += system.step(0.01, &dynamics).unwrap().floor_contacts;
    }
    assert!(contacts > 0);
    assert!(system
        .positions()
        .iter()
        .all(|p| p.z >= sim_fabric::correction::FLOOR_EPSILON - 1e-12));
}

#[test]
fn identical_runs_are_bit_identical() {
    let config = SimulationConfig::new(6, 1.0)
        .with_hydrogel(HydrogelConfig::with_columns(2).with_shrink_ratios(1.01, 0.95))
        .with_scheme(IntegrationScheme::Verlet);
    let dynamics = DynamicsConfig::default()
        .with_drag(1.0)
        .with_self_intersection(0.9);

    let mut a = ParticleSystem::new(&config).unwrap();
    let mut b = ParticleSystem::new(&config).unwrap();
    for _ in 0..50 {
        a.step(0.005, &dynamics).unwrap();
        b.step(0.005, &dynamics).unwrap();
    }
    assert_eq!(a.positions(), b.positions());
}

#[test]
fn reset_then_replay_matches() {
    let config = SimulationConfig::new(4, 1.0).with_scheme(IntegrationScheme::VelocityVerlet);
    let dynamics = DynamicsConfig::default();
    let mut system = ParticleSystem::new(&config).unwrap();

    for _ in 0..20 {
        system.step(0.01, &dynamics).unwrap();
    }
    let first = system.positions().to_vec();

    system.reset();
    for _ in 0..20 {
        system.step(0.01, &dynamics).unwrap();
    }
    assert_eq!(system.positions(), first.as_slice());
}

#[test]
fn gravity_direction_is_configurable() {
    let mut system = ParticleSystem::new(&SimulationConfig::new(1, 1.0)).unwrap();
    let dynamics = DynamicsConfig::default().with_gravity(Vector3::new(1.0, 0.0, 0.0));
    system.step(0.1, &dynamics).unwrap();
    let p = system.positions()[0];
    assert!(p.x > 0.0);
    assert_eq!(p.z, 0.0);
}
