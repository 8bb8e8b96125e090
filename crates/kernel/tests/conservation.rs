//! Conservation and degenerate-state properties.

use kernel::{cubic_spline, Integrator, Simulation, SimulationConfig, SimulationKernel};

fn dam(n: usize, spacing: f32) -> Vec<[f32; 3]> {
    let mut positions = Vec::new();
    for iz in 0..n {
        for iy in 0..n {
            for ix in 0..n {
                positions.push([
                    0.05 + ix as f32 * spacing,
                    0.05 + iy as f32 * spacing,
                    0.05 + iz as f32 * spacing,
                ]);
            }
        }
    }
    positions
}

#[test]
fn mass_is_invariant_under_euler() {
    let config = SimulationConfig::default();
    let positions = dam(6, config.particle_spacing);
    let mut sim = Simulation::new(&positions, None, config).unwrap();
    let initial_mass = sim.particles().total_mass();

    for _ in 0..100 {
        sim.tick();
        assert_eq!(sim.particles().total_mass(), initial_mass);
    }
    let metrics = sim.error_metrics();
    assert_eq!(metrics.mass_conservation, 0.0);
    assert_eq!(sim.particle_count(), positions.len());
}

#[test]
fn mass_is_invariant_under_adami() {
    let config = SimulationConfig {
        integrator: Integrator::Adami,
        ..Default::default()
    };
    let positions = dam(5, config.particle_spacing);
    let mut sim = Simulation::new(&positions, None, config).unwrap();
    let initial_mass = sim.particles().total_mass();
    for _ in 0..50 {
        sim.tick();
    }
    assert_eq!(sim.particles().total_mass(), initial_mass);
}

#[test]
fn isolated_particle_density_is_self_kernel() {
    let config = SimulationConfig {
        enable_gravity: false,
        ..Default::default()
    };
    let h = config.smoothing_length();
    let mass = config.particle_mass();
    // Two particles far beyond each other's support
    let positions = [[0.2, 0.2, 0.2], [0.8, 0.8, 0.8]];
    let mut sim = Simulation::new(&positions, None, config).unwrap();

    let expected = mass * cubic_spline(0.0, h);
    for _ in 0..5 {
        for &rho in &sim.particles().density {
            assert!(rho.is_finite(), "density must never be NaN");
            assert!(rho > 0.0, "density must never be zero");
            assert!((rho - expected).abs() / expected < 1.0e-5, "got {rho}, expected {expected}");
        }
        sim.tick();
    }
    let p = sim.particles();
    assert!(p.pressure.iter().all(|v| v.is_finite()));
    assert!(p.ax.iter().chain(&p.ay).chain(&p.az).all(|a| a.is_finite()));
}

#[test]
fn bounds_keep_falling_particles_inside() {
    let config = SimulationConfig::default();
    let positions = dam(4, config.particle_spacing);
    let mut sim = Simulation::new(&positions, None, config).unwrap();
    for _ in 0..400 {
        sim.tick();
    }
    let p = sim.particles();
    for i in 0..p.len() {
        for c in p.position(i) {
            assert!((0.0..=1.0).contains(&c), "particle {i} left the box: {c}");
        }
    }
}
