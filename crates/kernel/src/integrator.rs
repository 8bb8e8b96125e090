//! Time integration primitives.
//!
//! The tick ordering (grid, neighbors, forces, integration) lives in
//! [`crate::Simulation`]; this module only advances state from rates that
//! are already computed.

use rayon::prelude::*;

use crate::particle::ParticleArrays;

/// `v += dt * a` for every particle.
pub fn kick(particles: &mut ParticleArrays, dt: f32) {
    let ParticleArrays {
        vx, vy, vz, ax, ay, az, ..
    } = particles;
    vx.par_iter_mut().zip(ax.par_iter()).for_each(|(v, a)| *v += dt * a);
    vy.par_iter_mut().zip(ay.par_iter()).for_each(|(v, a)| *v += dt * a);
    vz.par_iter_mut().zip(az.par_iter()).for_each(|(v, a)| *v += dt * a);
}

/// `x += dt * v` for every particle.
pub fn drift(particles: &mut ParticleArrays, dt: f32) {
    let ParticleArrays {
        x, y, z, vx, vy, vz, ..
    } = particles;
    x.par_iter_mut().zip(vx.par_iter()).for_each(|(p, v)| *p += dt * v);
    y.par_iter_mut().zip(vy.par_iter()).for_each(|(p, v)| *p += dt * v);
    z.par_iter_mut().zip(vz.par_iter()).for_each(|(p, v)| *p += dt * v);
}

/// `rho += dt * drho/dt` for every particle.
pub fn integrate_density(particles: &mut ParticleArrays, dt: f32) {
    let ParticleArrays {
        density, drhodt, ..
    } = particles;
    density
        .par_iter_mut()
        .zip(drhodt.par_iter())
        .for_each(|(rho, rate)| *rho += dt * rate);
}

/// Explicit Euler update from precomputed rates.
///
/// ```text
/// v += dt * dv/dt
/// x += dt * v
/// rho += dt * drho/dt
/// ```
///
/// Conditionally stable: `dt` must stay below roughly `h / c0`. Divergence
/// is not detected.
pub fn euler_step(particles: &mut ParticleArrays, dt: f32) {
    kick(particles, dt);
    drift(particles, dt);
    integrate_density(particles, dt);
}
