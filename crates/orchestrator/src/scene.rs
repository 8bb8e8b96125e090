//! Built-in scene presets.
//!
//! Each preset fixes the initial particle layout, the force layers that are
//! switched on and the reconstruction grid used when exporting surfaces.

use std::fmt;
use std::str::FromStr;

use kernel::{BoxBounds, SimulationConfig};
use serde::{Deserialize, Serialize};
use surface::ReconstructionSettings;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Named scene preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Thin ferrofluid layer above the magnet, pairwise dipole forces on,
    /// no gravity.
    FerroSpikes,
    /// [`SceneKind::FerroSpikes`] with gravity. More stable, shorter spikes.
    FerroSpikesGravity,
    /// Ferrofluid layer driven by the external field alone.
    FerroExternalOnly,
    /// A block of water dropped into a shallow pool.
    FluidCrown,
    /// A pool whose particles start moving toward the center column.
    WaveImpact,
}

impl SceneKind {
    /// Every preset, in a stable order.
    pub const ALL: [SceneKind; 5] = [
        SceneKind::FerroSpikes,
        SceneKind::FerroSpikesGravity,
        SceneKind::FerroExternalOnly,
        SceneKind::FluidCrown,
        SceneKind::WaveImpact,
    ];

    /// Preset name as used in run configs.
    pub fn name(&self) -> &'static str {
        match self {
            SceneKind::FerroSpikes => "ferro_spikes",
            SceneKind::FerroSpikesGravity => "ferro_spikes_gravity",
            SceneKind::FerroExternalOnly => "ferro_external_only",
            SceneKind::FluidCrown => "fluid_crown",
            SceneKind::WaveImpact => "wave_impact",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| OrchestratorError::UnknownScene(s.to_string()))
    }
}

/// Initial state and parameters of one run.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Which preset this is.
    pub kind: SceneKind,
    /// Initial particle positions.
    pub positions: Vec<[f32; 3]>,
    /// Initial velocities, zero when absent.
    pub velocities: Option<Vec<[f32; 3]>>,
    /// Simulation parameters.
    pub config: SimulationConfig,
    /// Surface export parameters.
    pub reconstruction: ReconstructionSettings,
}

impl Scene {
    /// Build a preset.
    pub fn build(kind: SceneKind) -> Self {
        match kind {
            SceneKind::FerroSpikes => ferro_layer(kind, false, true),
            SceneKind::FerroSpikesGravity => ferro_layer(kind, true, true),
            SceneKind::FerroExternalOnly => ferro_layer(kind, false, false),
            SceneKind::FluidCrown => fluid_crown(),
            SceneKind::WaveImpact => wave_impact(),
        }
    }

    /// Build a preset by name.
    pub fn by_name(name: &str) -> OrchestratorResult<Self> {
        Ok(Self::build(name.parse()?))
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }
}

/// Samples `start, start + step, ...` strictly below `end`.
fn axis(start: f32, end: f32, step: f32) -> impl Iterator<Item = f32> + Clone {
    let count = ((end - start) / step - 1.0e-3).ceil().max(0.0) as usize;
    (0..count).map(move |i| start + i as f32 * step)
}

/// Lattice over `[lower, upper)` with per-axis steps, x outermost.
fn lattice(lower: [f32; 3], upper: [f32; 3], step: [f32; 3]) -> Vec<[f32; 3]> {
    let mut out = Vec::new();
    for x in axis(lower[0], upper[0], step[0]) {
        for z in axis(lower[2], upper[2], step[2]) {
            for y in axis(lower[1], upper[1], step[1]) {
                out.push([x, y, z]);
            }
        }
    }
    out
}

/// A 0.4 x 0.1 x 0.4 layer, twice as dense vertically, in a narrowed box.
fn ferro_layer(kind: SceneKind, gravity: bool, pair_forces: bool) -> Scene {
    let step = [0.02, 0.01, 0.02];
    let positions = lattice([0.3, 0.0, 0.3], [0.7, 0.1, 0.7], step);
    let config = SimulationConfig {
        // Mass follows the lattice cell volume so the layer starts at rest density
        particle_spacing: (step[0] * step[1] * step[2]).cbrt(),
        enable_ferro: true,
        enable_gravity: gravity,
        enable_interparticle_magnetization: false,
        enable_interparticle_force: pair_forces,
        dt: 0.0005,
        bounds: Some(BoxBounds::new([0.3, 0.0, 0.3], [0.7, 1.0, 0.7])),
        ..Default::default()
    };
    Scene {
        kind,
        positions,
        velocities: None,
        config,
        reconstruction: ReconstructionSettings::new([150, 80, 150], 0.5),
    }
}

fn pool() -> Vec<[f32; 3]> {
    lattice([0.0, 0.0, 0.0], [0.99, 0.15, 0.99], [0.02; 3])
}

fn fluid_crown() -> Scene {
    let mut positions = pool();
    positions.extend(lattice([0.4, 0.7, 0.4], [0.6, 0.8, 0.6], [0.02; 3]));
    let config = SimulationConfig {
        enable_ferro: false,
        enable_gravity: true,
        dt: 0.001,
        alpha: 0.04,
        ..Default::default()
    };
    Scene {
        kind: SceneKind::FluidCrown,
        positions,
        velocities: None,
        config,
        reconstruction: ReconstructionSettings::new([150, 80, 150], 0.5),
    }
}

fn wave_impact() -> Scene {
    let positions = pool();
    // Horizontal velocity toward the vertical line through the pool center
    let velocities = positions
        .iter()
        .map(|p| [0.5 - p[0], 0.0, 0.5 - p[2]])
        .collect();
    let config = SimulationConfig {
        enable_ferro: false,
        enable_gravity: true,
        dt: 0.0003,
        alpha: 0.04,
        tension: 100.0,
        c0: 30.0,
        ..Default::default()
    };
    Scene {
        kind: SceneKind::WaveImpact,
        positions,
        velocities: Some(velocities),
        config,
        reconstruction: ReconstructionSettings::new([150, 150, 150], 0.3),
    }
}
