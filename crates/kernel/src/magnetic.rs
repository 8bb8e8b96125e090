//! Magnetic field model for the ferrofluid layer.
//!
//! The external magnet is a point dipole. Particles carry an induced
//! magnetization `M = chi H`, saturated at a fixed magnitude, and act as
//! point dipoles `m = M V` with `V = mass / rho`.
//!
//! Two modes:
//! - external alignment: `M` follows the magnet field only;
//! - coupled: one Jacobi sweep adds the dipole fields of neighboring
//!   particles to the magnet field before magnetizing.

use std::f32::consts::PI;

use rayon::prelude::*;

use crate::config::MagnetConfig;
use crate::neighbor::NeighborList;
use crate::particle::ParticleArrays;

/// Step for central-difference field gradients.
const GRADIENT_EPS: f32 = 1.0e-4;

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Field of a point dipole `moment` at displacement `r` from the dipole.
///
/// ```text
/// H = (3 r_hat (m . r_hat) - m) / (4 pi |r|^3)
/// ```
///
/// Zero at the dipole itself.
pub fn dipole_field(moment: [f32; 3], r: [f32; 3]) -> [f32; 3] {
    let dist = dot(r, r).sqrt();
    if dist < 1.0e-9 {
        return [0.0; 3];
    }
    let r_hat = scale(r, 1.0 / dist);
    let m_dot_r = dot(moment, r_hat);
    let k = 1.0 / (4.0 * PI * dist * dist * dist);
    [
        k * (3.0 * r_hat[0] * m_dot_r - moment[0]),
        k * (3.0 * r_hat[1] * m_dot_r - moment[1]),
        k * (3.0 * r_hat[2] * m_dot_r - moment[2]),
    ]
}

/// Force on dipole `mi` exerted by dipole `mj`, with `r = x_i - x_j`.
///
/// ```text
/// F = 3 c / (4 pi |r|^4) [ (mj.r)mi + (mi.r)mj + (mi.mj)r - 5 (mi.r)(mj.r)r ]
/// ```
/// with unit `r`. Swapping the two dipoles negates the force.
pub fn dipole_pair_force(mi: [f32; 3], mj: [f32; 3], r: [f32; 3], coupling: f32) -> [f32; 3] {
    let dist = dot(r, r).sqrt();
    if dist < 1.0e-9 {
        return [0.0; 3];
    }
    let r_hat = scale(r, 1.0 / dist);
    let mi_r = dot(mi, r_hat);
    let mj_r = dot(mj, r_hat);
    let mi_mj = dot(mi, mj);
    let k = 3.0 * coupling / (4.0 * PI * dist.powi(4));
    let mut f = [0.0; 3];
    for a in 0..3 {
        f[a] = k * (mj_r * mi[a] + mi_r * mj[a] + mi_mj * r_hat[a] - 5.0 * mi_r * mj_r * r_hat[a]);
    }
    f
}

/// Stretch `r` to at least `min_dist`, keeping its direction.
#[inline]
fn soften(r: [f32; 3], min_dist: f32) -> [f32; 3] {
    let dist = dot(r, r).sqrt();
    if dist >= min_dist || dist < 1.0e-9 {
        r
    } else {
        scale(r, min_dist / dist)
    }
}

/// Limit the magnitude of `m` to `saturation`.
#[inline]
pub fn saturate(m: [f32; 3], saturation: f32) -> [f32; 3] {
    let mag = dot(m, m).sqrt();
    if mag > saturation && mag > 0.0 {
        scale(m, saturation / mag)
    } else {
        m
    }
}

/// The external point-dipole magnet.
#[derive(Debug, Clone, Copy)]
pub struct ExternalField {
    magnet: MagnetConfig,
}

impl ExternalField {
    /// Magnet described by `magnet`.
    pub fn new(magnet: MagnetConfig) -> Self {
        Self { magnet }
    }

    /// Field at point `p`.
    pub fn field_at(&self, p: [f32; 3]) -> [f32; 3] {
        let r = [
            p[0] - self.magnet.position[0],
            p[1] - self.magnet.position[1],
            p[2] - self.magnet.position[2],
        ];
        dipole_field(self.magnet.moment, r)
    }

    /// Jacobian of the field at `p`; entry `[a][k]` is dH_a/dx_k.
    pub fn gradient_at(&self, p: [f32; 3]) -> [[f32; 3]; 3] {
        let mut jac = [[0.0; 3]; 3];
        for k in 0..3 {
            let mut plus = p;
            let mut minus = p;
            plus[k] += GRADIENT_EPS;
            minus[k] -= GRADIENT_EPS;
            let hp = self.field_at(plus);
            let hm = self.field_at(minus);
            for a in 0..3 {
                jac[a][k] = (hp[a] - hm[a]) / (2.0 * GRADIENT_EPS);
            }
        }
        jac
    }

    /// Kelvin body acceleration `c (M . grad) H / rho` at `p`.
    pub fn kelvin_acceleration(
        &self,
        p: [f32; 3],
        magnetization: [f32; 3],
        density: f32,
        coupling: f32,
    ) -> [f32; 3] {
        if density <= 0.0 {
            return [0.0; 3];
        }
        let jac = self.gradient_at(p);
        let s = coupling / density;
        [
            s * dot(jac[0], magnetization),
            s * dot(jac[1], magnetization),
            s * dot(jac[2], magnetization),
        ]
    }
}

/// Per-particle magnetic state, refreshed once per tick.
#[derive(Debug, Clone)]
pub struct MagneticModel {
    field: ExternalField,
    magnet: MagnetConfig,
    coupled: bool,
    pair_forces: bool,
    /// Magnetization per particle.
    pub magnetization: Vec<[f32; 3]>,
    /// Dipole moment per particle (magnetization times volume).
    pub moments: Vec<[f32; 3]>,
}

impl MagneticModel {
    /// Build the model.
    ///
    /// `coupled` adds neighbor dipole fields to the magnetizing field and
    /// implies pairwise dipole forces; otherwise `pair_forces` selects them.
    pub fn new(magnet: MagnetConfig, coupled: bool, pair_forces: bool) -> Self {
        Self {
            field: ExternalField::new(magnet),
            magnet,
            coupled,
            pair_forces: pair_forces || coupled,
            magnetization: Vec::new(),
            moments: Vec::new(),
        }
    }

    /// Whether pairwise dipole forces are applied.
    pub fn pair_forces(&self) -> bool {
        self.pair_forces
    }

    /// The external magnet.
    pub fn external(&self) -> &ExternalField {
        &self.field
    }

    /// Recompute magnetization and dipole moments for the current state.
    pub fn update(&mut self, particles: &ParticleArrays, neighbors: &NeighborList, h: f32) {
        let chi = self.magnet.susceptibility;
        let sat = self.magnet.saturation;
        let field = self.field;

        let aligned: Vec<[f32; 3]> = (0..particles.len())
            .into_par_iter()
            .map(|i| saturate(scale(field.field_at(particles.position(i)), chi), sat))
            .collect();

        let magnetization = if self.coupled {
            let moments = dipole_moments(&aligned, particles);
            let min_dist = 0.5 * h;
            (0..particles.len())
                .into_par_iter()
                .map(|i| {
                    let xi = particles.position(i);
                    let mut total = field.field_at(xi);
                    for &j in neighbors.neighbors(i) {
                        let j = j as usize;
                        let xj = particles.position(j);
                        let r = soften([xi[0] - xj[0], xi[1] - xj[1], xi[2] - xj[2]], min_dist);
                        total = add(total, dipole_field(moments[j], r));
                    }
                    saturate(scale(total, chi), sat)
                })
                .collect()
        } else {
            aligned
        };

        self.moments = dipole_moments(&magnetization, particles);
        self.magnetization = magnetization;
    }

    /// Magnetic acceleration of particle `i` for the state captured by the
    /// last [`MagneticModel::update`].
    pub fn acceleration(
        &self,
        i: usize,
        particles: &ParticleArrays,
        neighbors: &NeighborList,
        h: f32,
    ) -> [f32; 3] {
        let coupling = self.magnet.coupling;
        let xi = particles.position(i);
        let mut acc = self.field.kelvin_acceleration(
            xi,
            self.magnetization[i],
            particles.density[i],
            coupling,
        );

        if self.pair_forces && particles.mass > 0.0 {
            let min_dist = 0.5 * h;
            let support_sq = 4.0 * h * h;
            let inv_mass = 1.0 / particles.mass;
            for &j in neighbors.neighbors(i) {
                let j = j as usize;
                let xj = particles.position(j);
                let r = [xi[0] - xj[0], xi[1] - xj[1], xi[2] - xj[2]];
                if dot(r, r) >= support_sq {
                    continue;
                }
                let f = dipole_pair_force(
                    self.moments[i],
                    self.moments[j],
                    soften(r, min_dist),
                    coupling,
                );
                acc = add(acc, scale(f, inv_mass));
            }
        }
        acc
    }
}

/// Dipole moment `M mass / rho` per particle; zero where density is not positive.
fn dipole_moments(magnetization: &[[f32; 3]], particles: &ParticleArrays) -> Vec<[f32; 3]> {
    magnetization
        .iter()
        .zip(&particles.density)
        .map(|(&m, &rho)| {
            if rho > 0.0 {
                scale(m, particles.mass / rho)
            } else {
                [0.0; 3]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dipole_field_on_axis() {
        // On the axis: H = 2m / (4 pi r^3)
        let h = dipole_field([0.0, 1.0, 0.0], [0.0, 0.5, 0.0]);
        let expected = 2.0 / (4.0 * PI * 0.125);
        assert!((h[1] - expected).abs() < 1.0e-4 * expected);
        assert!(h[0].abs() < 1.0e-9 && h[2].abs() < 1.0e-9);
    }

    #[test]
    fn dipole_field_equatorial_is_antiparallel() {
        let h = dipole_field([0.0, 1.0, 0.0], [0.5, 0.0, 0.0]);
        assert!(h[1] < 0.0);
    }

    #[test]
    fn head_to_tail_dipoles_attract() {
        let m = [0.0, 1.0, 0.0];
        // i sits above j along the moment axis
        let f = dipole_pair_force(m, m, [0.0, 0.02, 0.0], 1.0);
        assert!(f[1] < 0.0, "expected attraction, got {:?}", f);
    }

    #[test]
    fn side_by_side_dipoles_repel() {
        let m = [0.0, 1.0, 0.0];
        let f = dipole_pair_force(m, m, [0.02, 0.0, 0.0], 1.0);
        assert!(f[0] > 0.0, "expected repulsion, got {:?}", f);
    }

    #[test]
    fn pair_force_is_antisymmetric() {
        let mi = [0.3, 1.0, -0.2];
        let mj = [0.1, 0.8, 0.4];
        let r = [0.011, 0.017, -0.005];
        let fij = dipole_pair_force(mi, mj, r, 30.0);
        let fji = dipole_pair_force(mj, mi, scale(r, -1.0), 30.0);
        for a in 0..3 {
            assert!((fij[a] + fji[a]).abs() <= 1.0e-5 * fij[a].abs().max(1.0));
        }
    }

    #[test]
    fn saturation_limits_magnitude() {
        let m = saturate([30.0, 40.0, 0.0], 10.0);
        assert!(((m[0] * m[0] + m[1] * m[1]).sqrt() - 10.0).abs() < 1.0e-4);
        assert_eq!(saturate([1.0, 0.0, 0.0], 10.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn kelvin_force_pulls_toward_magnet() {
        let field = ExternalField::new(MagnetConfig::default());
        let p = [0.5, 0.1, 0.5];
        let m = scale(field.field_at(p), 1.0);
        let a = field.kelvin_acceleration(p, m, 1000.0, 30.0);
        assert!(a[1] < 0.0, "expected pull toward the magnet, got {:?}", a);
        assert!(a[0].abs() < 1.0e-3 * a[1].abs());
    }

    #[test]
    fn external_mode_follows_field() {
        let mut p = ParticleArrays::new(0.008);
        p.push_particle([0.5, 0.2, 0.5], 1000.0);
        let neighbors = NeighborList::from_lists(vec![Vec::new()]);
        let mut model = MagneticModel::new(MagnetConfig::default(), false, false);
        model.update(&p, &neighbors, 0.026);
        let h = model.external().field_at([0.5, 0.2, 0.5]);
        for a in 0..3 {
            assert!((model.magnetization[0][a] - h[a]).abs() < 1.0e-6);
        }
        assert!((model.moments[0][1] - h[1] * 0.008 / 1000.0).abs() < 1.0e-9);
    }

    #[test]
    fn coupled_mode_reinforces_chain() {
        let mut p = ParticleArrays::new(0.008);
        p.push_particle([0.5, 0.20, 0.5], 1000.0);
        p.push_particle([0.5, 0.22, 0.5], 1000.0);
        let neighbors = NeighborList::from_lists(vec![vec![1], vec![0]]);

        let mut external = MagneticModel::new(MagnetConfig::default(), false, false);
        external.update(&p, &neighbors, 0.026);
        let mut coupled = MagneticModel::new(MagnetConfig::default(), true, false);
        coupled.update(&p, &neighbors, 0.026);

        assert!(coupled.pair_forces());
        // Neighbors stacked along the field add to each other's field
        assert!(coupled.magnetization[0][1] > external.magnetization[0][1]);
    }
}
