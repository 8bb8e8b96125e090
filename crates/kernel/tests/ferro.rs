//! Ferrofluid layer behaviour.

use kernel::{Simulation, SimulationConfig, SimulationKernel};

fn blob(spacing: f32) -> Vec<[f32; 3]> {
    let mut positions = Vec::new();
    for iz in 0..5 {
        for iy in 0..5 {
            for ix in 0..5 {
                positions.push([
                    0.46 + ix as f32 * spacing,
                    0.20 + iy as f32 * spacing,
                    0.46 + iz as f32 * spacing,
                ]);
            }
        }
    }
    positions
}

fn mean_vertical_velocity(config: SimulationConfig, ticks: usize) -> f32 {
    let positions = blob(config.particle_spacing);
    let mut sim = Simulation::new(&positions, None, config).unwrap();
    for _ in 0..ticks {
        sim.tick();
    }
    let p = sim.particles();
    assert!(p.vx.iter().chain(&p.vy).chain(&p.vz).all(|v| v.is_finite()));
    assert!(p.x.iter().chain(&p.y).chain(&p.z).all(|v| v.is_finite()));
    p.vy.iter().sum::<f32>() / p.len() as f32
}

#[test]
fn external_field_pulls_fluid_toward_magnet() {
    let config = SimulationConfig {
        enable_gravity: false,
        enable_ferro: true,
        ..Default::default()
    };
    let vy = mean_vertical_velocity(config, 40);
    assert!(vy < 0.0, "mean vertical velocity {vy} should point at the magnet below");
}

#[test]
fn interparticle_force_keeps_net_pull() {
    let config = SimulationConfig {
        enable_gravity: false,
        enable_ferro: true,
        enable_interparticle_force: true,
        ..Default::default()
    };
    let vy = mean_vertical_velocity(config, 40);
    assert!(vy < 0.0, "mean vertical velocity {vy}");
}

#[test]
fn coupled_magnetization_runs_stably() {
    let config = SimulationConfig {
        enable_gravity: false,
        enable_ferro: true,
        enable_interparticle_magnetization: true,
        ..Default::default()
    };
    let vy = mean_vertical_velocity(config, 40);
    assert!(vy < 0.0, "mean vertical velocity {vy}");
}

#[test]
fn ferro_layer_is_listed_only_when_enabled() {
    let positions = blob(0.02);
    let off = Simulation::new(&positions, None, SimulationConfig::default()).unwrap();
    assert!(!off.layer_names().contains(&"ferro"));
    let on = Simulation::new(
        &positions,
        None,
        SimulationConfig {
            enable_ferro: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(on.layer_names().contains(&"ferro"));
}
