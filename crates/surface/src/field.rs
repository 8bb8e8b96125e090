//! Scalar fill field sampled on a regular grid.
//!
//! Each particle contributes an anisotropic cubic-spline blob centered on
//! its smoothed position. The field approximates the local fluid fraction:
//! about one deep inside the fluid and zero away from it.

use kernel::neighbor::bounding_box;
use kernel::{cubic_spline_profile, NeighborGrid, ParticleSnapshot};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::anisotropy::Smoothing;

/// Regular sampling lattice; node `(ix, iy, iz)` sits at
/// `origin + (ix, iy, iz) * spacing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingGrid {
    /// Position of node `(0, 0, 0)`.
    pub origin: [f64; 3],
    /// Distance between adjacent nodes along each axis.
    pub spacing: [f64; 3],
    /// Node count along each axis.
    pub dims: [usize; 3],
}

impl SamplingGrid {
    /// Grid spanning the particle bounding box grown by `margin`, with
    /// `resolution` nodes per axis (end points included).
    pub fn around_points(
        snapshot: &ParticleSnapshot,
        margin: f64,
        resolution: [usize; 3],
    ) -> Self {
        let (lower, upper) = bounding_box(&snapshot.x, &snapshot.y, &snapshot.z);
        let mut origin = [0.0; 3];
        let mut spacing = [0.0; 3];
        for axis in 0..3 {
            let lo = lower[axis] as f64 - margin;
            let hi = upper[axis] as f64 + margin;
            origin[axis] = lo;
            spacing[axis] = (hi - lo) / (resolution[axis].max(2) - 1) as f64;
        }
        Self {
            origin,
            spacing,
            dims: resolution.map(|n| n.max(2)),
        }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Linear node index, x fastest.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + iy * self.dims[0] + iz * self.dims[0] * self.dims[1]
    }

    /// Inverse of [`SamplingGrid::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let plane = self.dims[0] * self.dims[1];
        [
            index % self.dims[0],
            (index % plane) / self.dims[0],
            index / plane,
        ]
    }

    /// World position of a node.
    #[inline]
    pub fn node(&self, ix: usize, iy: usize, iz: usize) -> [f64; 3] {
        [
            self.origin[0] + ix as f64 * self.spacing[0],
            self.origin[1] + iy as f64 * self.spacing[1],
            self.origin[2] + iz as f64 * self.spacing[2],
        ]
    }

    /// `true` for nodes on the outer faces of the lattice.
    #[inline]
    pub fn is_boundary(&self, ix: usize, iy: usize, iz: usize) -> bool {
        ix == 0
            || iy == 0
            || iz == 0
            || ix + 1 == self.dims[0]
            || iy + 1 == self.dims[1]
            || iz + 1 == self.dims[2]
    }
}

/// Field values at every node of a [`SamplingGrid`].
#[derive(Debug, Clone)]
pub struct ScalarField {
    /// Lattice the values live on.
    pub grid: SamplingGrid,
    /// One value per node, indexed by [`SamplingGrid::index`].
    pub values: Vec<f64>,
}

impl ScalarField {
    /// Value at node `(ix, iy, iz)`.
    #[inline]
    pub fn value(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.values[self.grid.index(ix, iy, iz)]
    }

    /// Largest sampled value, zero for an empty field.
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Anisotropic kernel `det(G) / pi * P(|G r|)`.
#[inline]
pub fn anisotropic_kernel(r: &Vector3<f64>, g: &nalgebra::Matrix3<f64>) -> f64 {
    let q = (g * r).norm();
    g.determinant() / std::f64::consts::PI * cubic_spline_profile(q as f32) as f64
}

/// Evaluate the fill field on `grid`.
///
/// `lookup` indexes the snapshot's unsmoothed positions; only particles whose
/// unsmoothed position lies within `2h` of a node contribute to it. Outer
/// nodes are left at zero so the extracted surface is always closed.
pub fn sample(
    grid: SamplingGrid,
    snapshot: &ParticleSnapshot,
    lookup: &NeighborGrid,
    smoothing: &Smoothing,
) -> ScalarField {
    let radius = 2.0 * snapshot.h;
    let mass = snapshot.mass as f64;
    let values = (0..grid.node_count())
        .into_par_iter()
        .map(|index| {
            let [ix, iy, iz] = grid.coords(index);
            if grid.is_boundary(ix, iy, iz) {
                return 0.0;
            }
            let node = grid.node(ix, iy, iz);
            let at = Vector3::from(node);
            let mut sum = 0.0;
            lookup.for_each_within(
                node.map(|c| c as f32),
                &snapshot.x,
                &snapshot.y,
                &snapshot.z,
                radius,
                None,
                |j| {
                    let rho = snapshot.density[j] as f64;
                    if rho.is_nan() || rho <= 0.0 {
                        return;
                    }
                    let r = at - smoothing.positions[j];
                    let term = mass / rho * anisotropic_kernel(&r, &smoothing.matrices[j]);
                    if term.is_finite() {
                        sum += term;
                    }
                },
            );
            sum
        })
        .collect();
    ScalarField { grid, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn index_round_trip() {
        let grid = SamplingGrid {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            dims: [4, 5, 6],
        };
        assert_eq!(grid.index(1, 2, 3), 1 + 2 * 4 + 3 * 20);
        assert_eq!(grid.coords(grid.index(3, 4, 5)), [3, 4, 5]);
        assert!(grid.is_boundary(0, 2, 2));
        assert!(grid.is_boundary(2, 2, 5));
        assert!(!grid.is_boundary(1, 1, 1));
    }

    #[test]
    fn grid_spans_margin() {
        let snapshot = ParticleSnapshot {
            x: vec![0.0, 1.0],
            y: vec![0.0, 0.5],
            z: vec![0.0, 0.25],
            density: vec![1000.0; 2],
            mass: 1.0,
            h: 0.1,
            tick: 0,
        };
        let grid = SamplingGrid::around_points(&snapshot, 0.5, [11, 11, 11]);
        assert!((grid.origin[0] + 0.5).abs() < 1.0e-9);
        assert!((grid.spacing[0] - 0.2).abs() < 1.0e-9);
        let far = grid.node(10, 10, 10);
        assert!((far[0] - 1.5).abs() < 1.0e-9);
        assert!((far[1] - 1.0).abs() < 1.0e-9);
        assert!((far[2] - 0.75).abs() < 1.0e-9);
    }

    /// The anisotropic kernel integrates to one for any positive-definite G.
    #[test]
    fn anisotropic_kernel_normalized() {
        let h = 0.026;
        let g = Matrix3::new(
            2.0, 0.3, 0.0, //
            0.3, 1.2, 0.1, //
            0.0, 0.1, 3.5,
        ) / h;
        // Support is |G r| < 2, so |r| < 2 / lambda_min(G)
        let lambda_min: f64 = g.symmetric_eigenvalues().min();
        let reach: f64 = 2.0 / lambda_min;
        let n = 80;
        let step = 2.0 * reach / n as f64;
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let r = Vector3::new(
                        -reach + (i as f64 + 0.5) * step,
                        -reach + (j as f64 + 0.5) * step,
                        -reach + (k as f64 + 0.5) * step,
                    );
                    total += anisotropic_kernel(&r, &g);
                }
            }
        }
        total *= step * step * step;
        assert!((total - 1.0).abs() < 1.0e-2, "integral {total}");
    }
}
