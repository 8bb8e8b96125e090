//! Run configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use kernel::{Integrator, SimulationConfig};
use serde::{Deserialize, Serialize};
use surface::ReconstructionSettings;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::scene::{Scene, SceneKind};

/// A run: which preset to start from, what to change, and how long to go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Scene preset.
    pub scene: SceneKind,
    /// Simulation parameters to change on top of the preset.
    #[serde(default)]
    pub overrides: SimulationOverrides,
    /// Replaces the preset's reconstruction settings when present.
    #[serde(default)]
    pub reconstruction: Option<ReconstructionSettings>,
    /// Stop after this many ticks.
    #[serde(default)]
    pub max_timesteps: Option<u64>,
    /// Write a surface mesh every this many ticks.
    #[serde(default)]
    pub obj_interval: Option<u64>,
    /// Directory for exported meshes.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Optional per-field replacements for a preset's [`SimulationConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOverrides {
    /// Time step (seconds).
    pub dt: Option<f32>,
    /// Artificial viscosity coefficient.
    pub alpha: Option<f32>,
    /// Cohesion strength.
    pub tension: Option<f32>,
    /// Numerical speed of sound.
    pub c0: Option<f32>,
    /// Integration scheme.
    pub integrator: Option<Integrator>,
    /// Gravity layer switch.
    pub enable_gravity: Option<bool>,
    /// Ferrofluid layer switch.
    pub enable_ferro: Option<bool>,
    /// Mutual magnetization switch.
    pub enable_interparticle_magnetization: Option<bool>,
    /// Pairwise dipole force switch.
    pub enable_interparticle_force: Option<bool>,
}

impl SimulationOverrides {
    /// Write every set field into `config`.
    pub fn apply(&self, config: &mut SimulationConfig) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *target = v;
            }
        }
        set(&mut config.dt, self.dt);
        set(&mut config.alpha, self.alpha);
        set(&mut config.tension, self.tension);
        set(&mut config.c0, self.c0);
        set(&mut config.integrator, self.integrator);
        set(&mut config.enable_gravity, self.enable_gravity);
        set(&mut config.enable_ferro, self.enable_ferro);
        set(
            &mut config.enable_interparticle_magnetization,
            self.enable_interparticle_magnetization,
        );
        set(
            &mut config.enable_interparticle_force,
            self.enable_interparticle_force,
        );
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl RunConfig {
    /// Config for a preset with nothing changed.
    pub fn for_scene(scene: SceneKind) -> Self {
        Self {
            scene,
            overrides: SimulationOverrides::default(),
            reconstruction: None,
            max_timesteps: None,
            obj_interval: None,
            output_dir: default_output_dir(),
        }
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> OrchestratorResult<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the run-level settings and the resulting scene parameters.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.max_timesteps == Some(0) {
            return Err(OrchestratorError::InvalidConfig(
                "max_timesteps must be at least 1".to_string(),
            ));
        }
        if self.obj_interval == Some(0) {
            return Err(OrchestratorError::InvalidConfig(
                "obj_interval must be at least 1".to_string(),
            ));
        }
        let scene = self.scene();
        scene.config.validate()?;
        scene.reconstruction.validate()?;
        Ok(())
    }

    /// The preset with overrides applied.
    pub fn scene(&self) -> Scene {
        let mut scene = Scene::build(self.scene);
        self.overrides.apply(&mut scene.config);
        if let Some(settings) = self.reconstruction {
            scene.reconstruction = settings;
        }
        scene
    }
}
