//! Box collision response.
//!
//! A particle that leaves the configured box is clamped back onto the wall
//! and its outward velocity component is reflected and damped. This is a
//! penalty-free collision response, not a constraint solve.

use crate::config::BoxBounds;
use crate::particle::ParticleArrays;

/// Clamp one coordinate into `[lower, upper]`, reflecting the velocity
/// component if it points out of the box.
#[inline]
fn collide_axis(pos: &mut f32, vel: &mut f32, lower: f32, upper: f32, restitution: f32) {
    if *pos < lower {
        *pos = lower;
        if *vel < 0.0 {
            *vel = -restitution * *vel;
        }
    } else if *pos > upper {
        *pos = upper;
        if *vel > 0.0 {
            *vel = -restitution * *vel;
        }
    }
}

impl BoxBounds {
    /// Apply the collision response to every particle.
    pub fn enforce(&self, particles: &mut ParticleArrays) {
        let e = self.restitution;
        for i in 0..particles.len() {
            if self.contains(particles.position(i)) {
                continue;
            }
            collide_axis(
                &mut particles.x[i],
                &mut particles.vx[i],
                self.lower[0],
                self.upper[0],
                e,
            );
            collide_axis(
                &mut particles.y[i],
                &mut particles.vy[i],
                self.lower[1],
                self.upper[1],
                e,
            );
            collide_axis(
                &mut particles.z[i],
                &mut particles.vz[i],
                self.lower[2],
                self.upper[2],
                e,
            );
        }
    }

    /// Return `true` if the point lies inside the closed box.
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.lower[a] && p[a] <= self.upper[a])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_inside_is_untouched() {
        let mut p = ParticleArrays::new(1.0);
        p.push_particle([0.5, 0.5, 0.5], 1000.0);
        p.vx[0] = -3.0;
        BoxBounds::default().enforce(&mut p);
        assert_eq!(p.position(0), [0.5, 0.5, 0.5]);
        assert_eq!(p.vx[0], -3.0);
    }

    #[test]
    fn floor_hit_reflects_and_damps() {
        let mut p = ParticleArrays::new(1.0);
        p.push_particle([0.5, -0.01, 0.5], 1000.0);
        p.vy[0] = -2.0;
        p.vx[0] = 0.3;
        BoxBounds::default().enforce(&mut p);
        assert_eq!(p.y[0], 0.0);
        assert!((p.vy[0] - 1.0).abs() < 1.0e-6);
        // Tangential velocity is kept
        assert_eq!(p.vx[0], 0.3);
    }

    #[test]
    fn inward_velocity_not_reflected() {
        let mut p = ParticleArrays::new(1.0);
        p.push_particle([1.2, 0.5, 0.5], 1000.0);
        p.vx[0] = -1.0;
        BoxBounds::default().enforce(&mut p);
        assert_eq!(p.x[0], 1.0);
        assert_eq!(p.vx[0], -1.0);
    }

    #[test]
    fn enforce_leaves_every_particle_contained() {
        let b = BoxBounds::default();
        let mut p = ParticleArrays::new(1.0);
        p.push_particle([-0.2, 0.5, 1.4], 1000.0);
        p.push_particle([0.3, 2.0, 0.7], 1000.0);
        p.push_particle([1.0, 0.0, 0.0], 1000.0);
        b.enforce(&mut p);
        for i in 0..p.len() {
            assert!(b.contains(p.position(i)), "{:?}", p.position(i));
        }
        assert_eq!(p.position(0), [0.0, 0.5, 1.0]);
        assert_eq!(p.position(1), [0.3, 1.0, 0.7]);
        // On the wall counts as inside
        assert_eq!(p.position(2), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn contains_is_closed() {
        let b = BoxBounds::new([0.0; 3], [0.99; 3]);
        assert!(b.contains([0.0, 0.99, 0.5]));
        assert!(!b.contains([0.0, 1.0, 0.5]));
    }
}
