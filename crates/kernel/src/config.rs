//! Run configuration for the simulation kernel.
//!
//! Every field carries a serde default so partial JSON documents are
//! accepted; [`SimulationConfig::validate`] must pass before a
//! [`crate::Simulation`] is built.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Time integration policy, fixed for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Explicit Euler: velocity, position and density integrated from their rates.
    #[default]
    Euler,
    /// Kick-drift-kick with density recomputed by normalized summation.
    Adami,
}

/// Axis-aligned box that particles are kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxBounds {
    /// Minimum corner [x, y, z]
    pub lower: [f32; 3],
    /// Maximum corner [x, y, z]
    pub upper: [f32; 3],
    /// Fraction of the normal velocity kept after a wall hit.
    #[serde(default = "default_restitution")]
    pub restitution: f32,
}

impl BoxBounds {
    /// Box with the default restitution.
    pub fn new(lower: [f32; 3], upper: [f32; 3]) -> Self {
        Self {
            lower,
            upper,
            restitution: default_restitution(),
        }
    }
}

impl Default for BoxBounds {
    fn default() -> Self {
        Self::new([0.0; 3], [1.0; 3])
    }
}

/// External magnet and ferrofluid material parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetConfig {
    /// Position of the point-dipole magnet.
    #[serde(default = "default_magnet_position")]
    pub position: [f32; 3],
    /// Dipole moment of the magnet.
    #[serde(default = "default_magnet_moment")]
    pub moment: [f32; 3],
    /// Linear magnetic susceptibility chi (M = chi H).
    #[serde(default = "default_susceptibility")]
    pub susceptibility: f32,
    /// Magnitude at which magnetization saturates.
    #[serde(default = "default_saturation")]
    pub saturation: f32,
    /// Scale applied to all magnetic accelerations.
    #[serde(default = "default_coupling")]
    pub coupling: f32,
}

impl Default for MagnetConfig {
    fn default() -> Self {
        Self {
            position: default_magnet_position(),
            moment: default_magnet_moment(),
            susceptibility: default_susceptibility(),
            saturation: default_saturation(),
            coupling: default_coupling(),
        }
    }
}

/// Immutable parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Initial inter-particle distance.
    #[serde(default = "default_spacing")]
    pub particle_spacing: f32,
    /// Smoothing length as a multiple of the particle spacing.
    #[serde(default = "default_smoothing_ratio")]
    pub smoothing_ratio: f32,
    /// Reference rest density rho0.
    #[serde(default = "default_rest_density")]
    pub rest_density: f32,
    /// Artificial speed of sound c0.
    #[serde(default = "default_c0")]
    pub c0: f32,
    /// Tait exponent.
    #[serde(default = "default_gamma")]
    pub gamma: f32,
    /// Stiffness multiplier on the Tait pressure.
    #[serde(default = "default_kappa")]
    pub kappa: f32,
    /// Artificial viscosity coefficient.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Fixed time step.
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Cohesion strength; zero disables the cohesion layer.
    #[serde(default)]
    pub tension: f32,
    /// Integration policy.
    #[serde(default)]
    pub integrator: Integrator,
    /// Apply uniform gravity.
    #[serde(default = "default_true")]
    pub enable_gravity: bool,
    /// Gravity vector.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Enable magnetic forcing.
    #[serde(default)]
    pub enable_ferro: bool,
    /// Magnetize particles from the external field plus their neighbors.
    #[serde(default)]
    pub enable_interparticle_magnetization: bool,
    /// Add pairwise dipole forces between magnetized particles.
    #[serde(default)]
    pub enable_interparticle_force: bool,
    /// Magnet and material parameters.
    #[serde(default)]
    pub magnet: MagnetConfig,
    /// Collision box; `None` disables the boundary layer.
    #[serde(default = "default_bounds")]
    pub bounds: Option<BoxBounds>,
    /// Lower corner of the neighbor grid domain.
    #[serde(default = "default_grid_min")]
    pub grid_min: [f32; 3],
    /// Upper corner of the neighbor grid domain.
    #[serde(default = "default_grid_max")]
    pub grid_max: [f32; 3],
    /// Clamp negative pressure to zero.
    #[serde(default = "default_true")]
    pub clamp_negative_pressure: bool,
    /// Maximum particles stored per grid cell.
    #[serde(default = "default_max_particles_per_cell")]
    pub max_particles_per_cell: usize,
    /// Maximum entries per neighbor list.
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,
}

fn default_spacing() -> f32 {
    0.02
}

fn default_smoothing_ratio() -> f32 {
    1.3
}

fn default_rest_density() -> f32 {
    1000.0
}

fn default_c0() -> f32 {
    20.0
}

fn default_gamma() -> f32 {
    7.0
}

fn default_kappa() -> f32 {
    1.0
}

fn default_alpha() -> f32 {
    0.5
}

fn default_dt() -> f32 {
    1.0e-4
}

fn default_true() -> bool {
    true
}

fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

fn default_bounds() -> Option<BoxBounds> {
    Some(BoxBounds::default())
}

fn default_grid_min() -> [f32; 3] {
    [0.0; 3]
}

fn default_grid_max() -> [f32; 3] {
    [1.0; 3]
}

fn default_max_particles_per_cell() -> usize {
    100
}

fn default_max_neighbors() -> usize {
    200
}

fn default_restitution() -> f32 {
    0.5
}

fn default_magnet_position() -> [f32; 3] {
    [0.5, -0.25, 0.5]
}

fn default_magnet_moment() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_susceptibility() -> f32 {
    1.0
}

fn default_saturation() -> f32 {
    10.0
}

fn default_coupling() -> f32 {
    30.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_spacing: default_spacing(),
            smoothing_ratio: default_smoothing_ratio(),
            rest_density: default_rest_density(),
            c0: default_c0(),
            gamma: default_gamma(),
            kappa: default_kappa(),
            alpha: default_alpha(),
            dt: default_dt(),
            tension: 0.0,
            integrator: Integrator::default(),
            enable_gravity: true,
            gravity: default_gravity(),
            enable_ferro: false,
            enable_interparticle_magnetization: false,
            enable_interparticle_force: false,
            magnet: MagnetConfig::default(),
            bounds: default_bounds(),
            grid_min: default_grid_min(),
            grid_max: default_grid_max(),
            clamp_negative_pressure: true,
            max_particles_per_cell: default_max_particles_per_cell(),
            max_neighbors: default_max_neighbors(),
        }
    }
}

impl SimulationConfig {
    /// Smoothing length h.
    pub fn smoothing_length(&self) -> f32 {
        self.particle_spacing * self.smoothing_ratio
    }

    /// Kernel support radius 2h; also the neighbor grid cell size.
    pub fn support_radius(&self) -> f32 {
        2.0 * self.smoothing_length()
    }

    /// Uniform particle mass, rest density times spacing cubed.
    pub fn particle_mass(&self) -> f32 {
        self.rest_density * self.particle_spacing.powi(3)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> KernelResult<()> {
        let positive = [
            ("particle_spacing", self.particle_spacing),
            ("smoothing_ratio", self.smoothing_ratio),
            ("rest_density", self.rest_density),
            ("c0", self.c0),
            ("gamma", self.gamma),
            ("kappa", self.kappa),
            ("dt", self.dt),
        ];
        for (name, value) in positive {
            if value <= 0.0 || !value.is_finite() {
                return Err(invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.alpha < 0.0 || self.alpha.is_nan() {
            return Err(invalid(format!("alpha must be non-negative, got {}", self.alpha)));
        }
        if self.tension < 0.0 || self.tension.is_nan() {
            return Err(invalid(format!(
                "tension must be non-negative, got {}",
                self.tension
            )));
        }

        for axis in 0..3 {
            if self.grid_min[axis] >= self.grid_max[axis] {
                return Err(invalid(format!(
                    "grid_min[{}] must be less than grid_max[{}]",
                    axis, axis
                )));
            }
        }

        if let Some(bounds) = &self.bounds {
            for axis in 0..3 {
                if bounds.lower[axis] >= bounds.upper[axis] {
                    return Err(invalid(format!(
                        "bounds.lower[{}] must be less than bounds.upper[{}]",
                        axis, axis
                    )));
                }
            }
            if !(0.0..=1.0).contains(&bounds.restitution) {
                return Err(invalid(format!(
                    "bounds.restitution must be in [0, 1], got {}",
                    bounds.restitution
                )));
            }
        }

        if self.max_particles_per_cell == 0 {
            return Err(invalid("max_particles_per_cell must be at least 1".to_string()));
        }
        if self.max_neighbors == 0 {
            return Err(invalid("max_neighbors must be at least 1".to_string()));
        }

        if self.enable_ferro && (self.magnet.susceptibility < 0.0 || self.magnet.saturation <= 0.0) {
            return Err(invalid(
                "magnet susceptibility must be non-negative and saturation positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(message: String) -> KernelError {
    KernelError::InvalidConfig(message)
}
