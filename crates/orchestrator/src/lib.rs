//! Orchestration Layer
//!
//! This crate turns a run description into a live simulation:
//! - Scene presets (initial particles and parameters)
//! - JSON run configuration with per-field overrides
//! - Simulation runner with lifecycle management and frame hand-off
//! - OBJ export of reconstructed surfaces

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod export;
pub mod runner;
pub mod scene;

pub use config::{RunConfig, SimulationOverrides};
pub use error::{OrchestratorError, OrchestratorResult};
pub use export::{write_mesh, ObjSequence};
pub use runner::{Frame, RunnerOptions, RunnerState, SimulationRunner};
pub use scene::{Scene, SceneKind};

use std::path::Path;

use kernel::Simulation;

/// Create a complete simulation from a configuration file
///
/// This function performs the full setup pipeline:
/// 1. Load and validate the run configuration
/// 2. Build the scene preset and apply overrides
/// 3. Create the simulation
/// 4. Wrap it in a `SimulationRunner` for lifecycle management
///
/// # Example
/// ```no_run
/// use orchestrator::create_simulation;
///
/// let runner = create_simulation("configs/ferro_spikes.json")?;
/// runner.start();
/// // ... query status, pause, resume, etc.
/// # Ok::<(), orchestrator::OrchestratorError>(())
/// ```
pub fn create_simulation(config_path: impl AsRef<Path>) -> OrchestratorResult<SimulationRunner> {
    let config_path = config_path.as_ref();
    tracing::info!("Creating simulation from config: {}", config_path.display());
    let config = RunConfig::load(config_path)?;
    runner_for(&config)
}

/// Build a runner for an already loaded configuration.
pub fn runner_for(config: &RunConfig) -> OrchestratorResult<SimulationRunner> {
    let scene = config.scene();
    tracing::info!(
        "Scene {}: {} particles",
        scene.kind,
        scene.particle_count()
    );

    let simulation = Simulation::new(
        &scene.positions,
        scene.velocities.as_deref(),
        scene.config,
    )?;

    let options = RunnerOptions {
        max_timesteps: config.max_timesteps,
        reconstruction: scene.reconstruction,
        obj_sequence: config
            .obj_interval
            .map(|interval| ObjSequence::new(config.output_dir.clone(), interval)),
        ..Default::default()
    };

    tracing::info!("Simulation ready to start");
    Ok(SimulationRunner::new(simulation, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_for_scene_preset() {
        let mut config = RunConfig::for_scene(SceneKind::FerroExternalOnly);
        config.max_timesteps = Some(2);
        let runner = runner_for(&config).unwrap();
        assert_eq!(runner.snapshot().len(), 20 * 20 * 10);
        runner.start();
        runner.join().unwrap();
    }

    #[test]
    fn invalid_override_fails_setup() {
        let mut config = RunConfig::for_scene(SceneKind::FluidCrown);
        config.overrides.c0 = Some(0.0);
        assert!(matches!(
            runner_for(&config),
            Err(OrchestratorError::Kernel(_))
        ));
    }
}
