//! SPH smoothing kernel functions and density operators.
//!
//! Implements the cubic B-spline kernel and its gradient for 3D SPH
//! simulations, plus the density-related operators: summation density,
//! Shepard-normalized summation density and the continuity equation.

use std::f32::consts::PI;

use rayon::prelude::*;

use crate::neighbor::NeighborList;
use crate::particle::ParticleArrays;

/// Dimensionless cubic spline profile P(q), q = r/h.
///
/// ```text
/// P(q) = 1 - 1.5 q^2 + 0.75 q^3     for 0 <= q <= 1
/// P(q) = 0.25 (2 - q)^3             for 1 < q < 2
/// P(q) = 0                          otherwise
/// ```
///
/// Normalized in 3D by `1 / (pi h^3)`. The anisotropic reconstruction
/// kernel evaluates the same profile in a warped frame.
#[inline]
pub fn cubic_spline_profile(q: f32) -> f32 {
    if q < 0.0 || q >= 2.0 {
        0.0
    } else if q <= 1.0 {
        1.0 - 1.5 * q * q + 0.75 * q * q * q
    } else {
        let t = 2.0 - q;
        0.25 * t * t * t
    }
}

/// Derivative dP/dq of the cubic spline profile.
#[inline]
pub fn cubic_spline_profile_derivative(q: f32) -> f32 {
    if q < 0.0 || q >= 2.0 {
        0.0
    } else if q <= 1.0 {
        -3.0 * q + 2.25 * q * q
    } else {
        let t = 2.0 - q;
        -0.75 * t * t
    }
}

/// Cubic spline smoothing kernel in 3D.
///
/// ```text
/// W(r, h) = P(r / h) / (pi h^3)
/// ```
///
/// # Arguments
/// * `r` - Distance between two particles (must be >= 0).
/// * `h` - Smoothing length. The support radius is 2h.
pub fn cubic_spline(r: f32, h: f32) -> f32 {
    cubic_spline_profile(r / h) / (PI * h * h * h)
}

/// Gradient of the cubic spline kernel with respect to particle i.
///
/// `(dx, dy, dz)` is the displacement from particle j to particle i and `r`
/// its length. The gradient is zero at `r = 0` (coincident particles).
pub fn cubic_spline_gradient(dx: f32, dy: f32, dz: f32, r: f32, h: f32) -> [f32; 3] {
    let q = r / h;
    if q >= 2.0 || r < 1.0e-12 {
        return [0.0; 3];
    }
    let dw_dr = cubic_spline_profile_derivative(q) / (PI * h * h * h * h);
    let s = dw_dr / r;
    [s * dx, s * dy, s * dz]
}

/// Squared distance and displacement from particle j to particle i.
#[inline]
pub(crate) fn displacement(p: &ParticleArrays, i: usize, j: usize) -> ([f32; 3], f32) {
    let d = [p.x[i] - p.x[j], p.y[i] - p.y[j], p.z[i] - p.z[j]];
    let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
    (d, r)
}

/// Summation density for every particle.
///
/// ```text
/// rho_i = m W(0, h) + sum_j m W(|r_i - r_j|, h)
/// ```
///
/// A particle with no neighbors keeps its self contribution, so density is
/// never zero.
pub fn compute_density(particles: &mut ParticleArrays, neighbors: &NeighborList, h: f32) {
    let density: Vec<f32> = (0..particles.len())
        .into_par_iter()
        .map(|i| {
            let m = particles.mass;
            let mut rho = m * cubic_spline(0.0, h);
            for &j in neighbors.neighbors(i) {
                let (_, r) = displacement(particles, i, j as usize);
                rho += m * cubic_spline(r, h);
            }
            rho
        })
        .collect();
    particles.density = density;
}

/// Shepard-normalized summation density.
///
/// ```text
/// rho_i = sum_j m W_ij / sum_j (m / rho_j) W_ij       (self included)
/// ```
///
/// Corrects the kernel deficiency near free surfaces. Uses the densities
/// currently stored as the volume estimate; when the volume sum vanishes the
/// plain summation value is kept.
pub fn compute_normalized_density(
    particles: &mut ParticleArrays,
    neighbors: &NeighborList,
    h: f32,
) {
    let density: Vec<f32> = (0..particles.len())
        .into_par_iter()
        .map(|i| {
            let m = particles.mass;
            let w0 = cubic_spline(0.0, h);
            let mut rho = m * w0;
            let mut volume = m / particles.density[i] * w0;
            for &j in neighbors.neighbors(i) {
                let j = j as usize;
                let (_, r) = displacement(particles, i, j);
                let w = cubic_spline(r, h);
                rho += m * w;
                volume += m / particles.density[j] * w;
            }
            if volume > 0.0 && volume.is_finite() {
                rho / volume
            } else {
                rho
            }
        })
        .collect();
    particles.density = density;
}

/// Continuity equation.
///
/// ```text
/// drho_i/dt = sum_j m (v_i - v_j) . grad_i W_ij
/// ```
pub fn compute_density_rate(particles: &mut ParticleArrays, neighbors: &NeighborList, h: f32) {
    let rate: Vec<f32> = (0..particles.len())
        .into_par_iter()
        .map(|i| {
            let vi = particles.velocity(i);
            let mut acc = 0.0;
            for &j in neighbors.neighbors(i) {
                let j = j as usize;
                let (d, r) = displacement(particles, i, j);
                let g = cubic_spline_gradient(d[0], d[1], d[2], r, h);
                let vj = particles.velocity(j);
                acc += particles.mass
                    * ((vi[0] - vj[0]) * g[0] + (vi[1] - vj[1]) * g[1] + (vi[2] - vj[2]) * g[2]);
            }
            acc
        })
        .collect();
    particles.drhodt = rate;
}
