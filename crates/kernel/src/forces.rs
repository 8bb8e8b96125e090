//! Force layers and the composed force model.
//!
//! Each physical effect is an independent [`ForceLayer`] contributing an
//! acceleration per particle. The [`ForceModel`] composes the enabled layers
//! in order at construction and evaluates them in parallel across particles.

use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::eos::PressureLaw;
use crate::magnetic::MagneticModel;
use crate::neighbor::NeighborList;
use crate::particle::ParticleArrays;
use crate::sph::{self, cubic_spline, cubic_spline_gradient, displacement};

/// Read-only state a layer evaluates against.
pub struct ForceContext<'a> {
    /// Current particle state, with density and pressure up to date.
    pub particles: &'a ParticleArrays,
    /// Neighbor lists for the current positions.
    pub neighbors: &'a NeighborList,
    /// Smoothing length.
    pub h: f32,
}

/// One independent contributor to dv/dt.
pub trait ForceLayer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Refresh per-tick state before accelerations are evaluated.
    fn prepare(&mut self, _ctx: &ForceContext<'_>) {}

    /// Acceleration contributed to particle `i`.
    fn acceleration(&self, i: usize, ctx: &ForceContext<'_>) -> [f32; 3];
}

/// `P / rho^2`, zero for a non-positive density.
#[inline]
fn pressure_term(p: f32, rho: f32) -> f32 {
    if rho > 0.0 {
        p / (rho * rho)
    } else {
        0.0
    }
}

/// Symmetric pressure gradient.
///
/// ```text
/// a_i = -sum_j m (P_i / rho_i^2 + P_j / rho_j^2) grad_i W_ij
/// ```
/// The pair term is antisymmetric, so momentum is conserved pairwise.
pub struct PressureGradient;

impl ForceLayer for PressureGradient {
    fn name(&self) -> &'static str {
        "pressure"
    }

    fn acceleration(&self, i: usize, ctx: &ForceContext<'_>) -> [f32; 3] {
        let p = ctx.particles;
        let ti = pressure_term(p.pressure[i], p.density[i]);
        let mut acc = [0.0; 3];
        for &j in ctx.neighbors.neighbors(i) {
            let j = j as usize;
            let (d, r) = displacement(p, i, j);
            let g = cubic_spline_gradient(d[0], d[1], d[2], r, ctx.h);
            let s = -p.mass * (ti + pressure_term(p.pressure[j], p.density[j]));
            acc[0] += s * g[0];
            acc[1] += s * g[1];
            acc[2] += s * g[2];
        }
        acc
    }
}

/// Monaghan artificial viscosity, active for approaching pairs only.
///
/// ```text
/// mu_ij = h (v_ij . x_ij) / (|x_ij|^2 + 0.01 h^2)
/// Pi_ij = -alpha c0 mu_ij / rho_bar          (v_ij . x_ij < 0)
/// a_i   = -sum_j m Pi_ij grad_i W_ij
/// ```
pub struct ArtificialViscosity {
    alpha: f32,
    c0: f32,
}

impl ArtificialViscosity {
    /// Viscosity with coefficient `alpha` and sound speed `c0`.
    pub fn new(alpha: f32, c0: f32) -> Self {
        Self { alpha, c0 }
    }
}

impl ForceLayer for ArtificialViscosity {
    fn name(&self) -> &'static str {
        "viscosity"
    }

    fn acceleration(&self, i: usize, ctx: &ForceContext<'_>) -> [f32; 3] {
        let p = ctx.particles;
        let h = ctx.h;
        let vi = p.velocity(i);
        let mut acc = [0.0; 3];
        for &j in ctx.neighbors.neighbors(i) {
            let j = j as usize;
            let (d, r) = displacement(p, i, j);
            let vj = p.velocity(j);
            let v_dot_x = (vi[0] - vj[0]) * d[0] + (vi[1] - vj[1]) * d[1] + (vi[2] - vj[2]) * d[2];
            if v_dot_x >= 0.0 {
                continue;
            }
            let rho_bar = 0.5 * (p.density[i] + p.density[j]);
            if rho_bar <= 0.0 {
                continue;
            }
            let mu = h * v_dot_x / (r * r + 0.01 * h * h);
            let pi_ij = -self.alpha * self.c0 * mu / rho_bar;
            let g = cubic_spline_gradient(d[0], d[1], d[2], r, h);
            let s = -p.mass * pi_ij;
            acc[0] += s * g[0];
            acc[1] += s * g[1];
            acc[2] += s * g[2];
        }
        acc
    }
}

/// Uniform gravity.
pub struct Gravity {
    g: [f32; 3],
}

impl Gravity {
    /// Constant acceleration `g`.
    pub fn new(g: [f32; 3]) -> Self {
        Self { g }
    }
}

impl ForceLayer for Gravity {
    fn name(&self) -> &'static str {
        "gravity"
    }

    fn acceleration(&self, _i: usize, _ctx: &ForceContext<'_>) -> [f32; 3] {
        self.g
    }
}

/// Kernel-weighted cohesion pulling neighbors together.
///
/// ```text
/// a_i = -tension sum_j (m / rho_j) (x_i - x_j) W_ij
/// ```
pub struct Cohesion {
    tension: f32,
}

impl Cohesion {
    /// Cohesion of strength `tension`.
    pub fn new(tension: f32) -> Self {
        Self { tension }
    }
}

impl ForceLayer for Cohesion {
    fn name(&self) -> &'static str {
        "cohesion"
    }

    fn acceleration(&self, i: usize, ctx: &ForceContext<'_>) -> [f32; 3] {
        let p = ctx.particles;
        let mut acc = [0.0; 3];
        for &j in ctx.neighbors.neighbors(i) {
            let j = j as usize;
            if p.density[j] <= 0.0 {
                continue;
            }
            let (d, r) = displacement(p, i, j);
            let s = -self.tension * p.mass / p.density[j] * cubic_spline(r, ctx.h);
            acc[0] += s * d[0];
            acc[1] += s * d[1];
            acc[2] += s * d[2];
        }
        acc
    }
}

/// Magnetic body force and optional pairwise dipole forces.
pub struct FerroForce {
    model: MagneticModel,
}

impl FerroForce {
    /// Wrap a magnetic model.
    pub fn new(model: MagneticModel) -> Self {
        Self { model }
    }

    /// The magnetic state as of the last `prepare`.
    pub fn model(&self) -> &MagneticModel {
        &self.model
    }
}

impl ForceLayer for FerroForce {
    fn name(&self) -> &'static str {
        "ferro"
    }

    fn prepare(&mut self, ctx: &ForceContext<'_>) {
        self.model.update(ctx.particles, ctx.neighbors, ctx.h);
    }

    fn acceleration(&self, i: usize, ctx: &ForceContext<'_>) -> [f32; 3] {
        self.model.acceleration(i, ctx.particles, ctx.neighbors, ctx.h)
    }
}

/// Ordered composition of force layers plus the pressure law.
pub struct ForceModel {
    layers: Vec<Box<dyn ForceLayer>>,
    law: PressureLaw,
    h: f32,
}

impl ForceModel {
    /// Model with an explicit layer list.
    pub fn new(layers: Vec<Box<dyn ForceLayer>>, law: PressureLaw, h: f32) -> Self {
        Self { layers, law, h }
    }

    /// Compose the layers enabled by `config`.
    ///
    /// Pressure and viscosity are always present; gravity, cohesion and the
    /// magnetic layer follow their flags.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut layers: Vec<Box<dyn ForceLayer>> = vec![
            Box::new(PressureGradient),
            Box::new(ArtificialViscosity::new(config.alpha, config.c0)),
        ];
        if config.enable_gravity {
            layers.push(Box::new(Gravity::new(config.gravity)));
        }
        if config.tension > 0.0 {
            layers.push(Box::new(Cohesion::new(config.tension)));
        }
        if config.enable_ferro {
            layers.push(Box::new(FerroForce::new(MagneticModel::new(
                config.magnet,
                config.enable_interparticle_magnetization,
                config.enable_interparticle_force,
            ))));
        }

        let law = PressureLaw {
            rest_density: config.rest_density,
            c0: config.c0,
            gamma: config.gamma,
            kappa: config.kappa,
            clamp_negative: config.clamp_negative_pressure,
        };
        Self::new(layers, law, config.smoothing_length())
    }

    /// Names of the composed layers, in evaluation order.
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// The pressure law.
    pub fn pressure_law(&self) -> &PressureLaw {
        &self.law
    }

    /// Compute pressure, dv/dt and drho/dt from the current density,
    /// positions and velocities.
    ///
    /// Density itself is owned by the integrator and is not changed here.
    pub fn compute_derivatives(&mut self, particles: &mut ParticleArrays, neighbors: &NeighborList) {
        let h = self.h;
        self.law.apply(&particles.density, &mut particles.pressure);
        sph::compute_density_rate(particles, neighbors, h);

        let ctx = ForceContext {
            particles: &*particles,
            neighbors,
            h,
        };
        for layer in self.layers.iter_mut() {
            layer.prepare(&ctx);
        }

        let layers = &self.layers;
        let accel: Vec<[f32; 3]> = (0..particles.len())
            .into_par_iter()
            .map(|i| {
                let mut a = [0.0f32; 3];
                for layer in layers {
                    let la = layer.acceleration(i, &ctx);
                    a[0] += la[0];
                    a[1] += la[1];
                    a[2] += la[2];
                }
                a
            })
            .collect();

        for (i, a) in accel.into_iter().enumerate() {
            particles.ax[i] = a[0];
            particles.ay[i] = a[1];
            particles.az[i] = a[2];
        }
    }
}
