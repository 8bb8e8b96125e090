//! Per-particle position smoothing and anisotropic kernel shapes.
//!
//! For each particle the weighted neighbor covariance is decomposed by SVD.
//! The principal axes and spreads give a matrix `G` that stretches the
//! reconstruction kernel along directions where neighbors spread out and
//! squeezes it across thin sheets.

use kernel::{NeighborList, ParticleSnapshot};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::settings::AnisotropyParams;

/// Smoothed positions and anisotropy matrices, one per particle.
#[derive(Debug, Clone, Default)]
pub struct Smoothing {
    /// Smoothed kernel centers.
    pub positions: Vec<Vector3<f64>>,
    /// Anisotropy matrix `G` per particle.
    pub matrices: Vec<Matrix3<f64>>,
}

impl Smoothing {
    /// Number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Return `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Cubic falloff weight `1 - (r / R)^3` for `0 < r <= R`, else zero.
#[inline]
pub fn smoothing_weight(r: f64, radius: f64) -> f64 {
    if r > 0.0 && r <= radius {
        let t = r / radius;
        1.0 - t * t * t
    } else {
        0.0
    }
}

/// Isotropic fallback matrix `I / (kn h)`.
#[inline]
pub fn isotropic_matrix(h: f64, kn: f64) -> Matrix3<f64> {
    Matrix3::identity() / (kn * h)
}

#[inline]
fn point(snapshot: &ParticleSnapshot, i: usize) -> Vector3<f64> {
    Vector3::new(
        snapshot.x[i] as f64,
        snapshot.y[i] as f64,
        snapshot.z[i] as f64,
    )
}

/// Smooth every particle of `snapshot` over its neighbor list.
///
/// Each particle is processed independently; the only shared inputs are the
/// read-only snapshot and neighbor lists.
pub fn smooth(
    snapshot: &ParticleSnapshot,
    neighbors: &NeighborList,
    params: &AnisotropyParams,
) -> Smoothing {
    let h = snapshot.h as f64;
    let (positions, matrices) = (0..snapshot.len())
        .into_par_iter()
        .map(|i| {
            let xi = point(snapshot, i);
            let nbrs: Vec<Vector3<f64>> = neighbors
                .neighbors(i)
                .iter()
                .map(|&j| point(snapshot, j as usize))
                .collect();
            smooth_particle(xi, &nbrs, h, params)
        })
        .unzip();
    Smoothing {
        positions,
        matrices,
    }
}

/// Smoothed position and anisotropy matrix for one particle at `xi` with
/// neighbor positions `nbrs` (self excluded).
pub fn smooth_particle(
    xi: Vector3<f64>,
    nbrs: &[Vector3<f64>],
    h: f64,
    params: &AnisotropyParams,
) -> (Vector3<f64>, Matrix3<f64>) {
    let isotropic = isotropic_matrix(h, params.kn);
    if nbrs.is_empty() {
        return (xi, isotropic);
    }

    let radius = 2.0 * h;
    let weights: Vec<f64> = nbrs
        .iter()
        .map(|xj| smoothing_weight((xi - xj).norm(), radius))
        .collect();
    let sum_w: f64 = weights.iter().sum();

    // A zero weight sum falls back to the unweighted average.
    let (weights, sum_w) = if sum_w > 0.0 {
        (weights, sum_w)
    } else {
        (vec![1.0; nbrs.len()], nbrs.len() as f64)
    };

    let mean = nbrs
        .iter()
        .zip(&weights)
        .fold(Vector3::zeros(), |acc, (xj, &w)| acc + xj * w)
        / sum_w;
    let smoothed = xi * (1.0 - params.lambda) + mean * params.lambda;

    if nbrs.len() < params.min_neighbors {
        return (smoothed, isotropic);
    }

    let covariance = nbrs
        .iter()
        .zip(&weights)
        .fold(Matrix3::zeros(), |acc, (xj, &w)| {
            let d = xj - mean;
            acc + d * d.transpose() * w
        })
        / sum_w;

    (smoothed, shape_matrix(&covariance, h, params).unwrap_or(isotropic))
}

/// `G = (1/h) U diag(ks * sigma)^-1 U^T` from the covariance SVD, with the
/// singular values floored at `sigma_max / kr`.
///
/// `None` when the decomposition is degenerate (no spread or no basis).
fn shape_matrix(
    covariance: &Matrix3<f64>,
    h: f64,
    params: &AnisotropyParams,
) -> Option<Matrix3<f64>> {
    let svd = covariance.svd(true, false);
    let u = svd.u?;
    let sigma = svd.singular_values;
    let sigma_max = sigma.max();
    if !sigma_max.is_finite() || sigma_max <= 1.0e-18 {
        return None;
    }
    let floor = sigma_max / params.kr;
    let inv = sigma.map(|s| 1.0 / (params.ks * s.max(floor)));
    let g = u * Matrix3::from_diagonal(&inv) * u.transpose() / h;
    if g.iter().all(|v| v.is_finite()) {
        Some(g)
    } else {
        None
    }
}
