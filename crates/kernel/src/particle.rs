//! Particle data structures using struct-of-arrays layout.

use crate::error::{KernelError, KernelResult};

/// Struct-of-arrays particle storage.
///
/// All arrays are parallel: index `i` across every array refers to the same particle.
/// Separate x/y/z arrays (rather than Vec3) keep each component contiguous so the
/// per-particle passes stream through memory.
///
/// The particle count is fixed once created; no insertion or removal happens
/// during a run.
#[derive(Debug, Clone)]
pub struct ParticleArrays {
    // ---- Positions ----
    /// X positions
    pub x: Vec<f32>,
    /// Y positions
    pub y: Vec<f32>,
    /// Z positions
    pub z: Vec<f32>,

    // ---- Velocities ----
    /// X velocities
    pub vx: Vec<f32>,
    /// Y velocities
    pub vy: Vec<f32>,
    /// Z velocities
    pub vz: Vec<f32>,

    // ---- Rate of velocity change (scratch, recomputed each tick) ----
    /// X component of dv/dt
    pub ax: Vec<f32>,
    /// Y component of dv/dt
    pub ay: Vec<f32>,
    /// Z component of dv/dt
    pub az: Vec<f32>,

    // ---- Scalar fields ----
    /// Density
    pub density: Vec<f32>,
    /// Pressure
    pub pressure: Vec<f32>,
    /// Rate of density change (scratch, recomputed each tick)
    pub drhodt: Vec<f32>,

    /// Uniform particle mass, derived once from rest density and spacing.
    pub mass: f32,
}

impl ParticleArrays {
    /// Create an empty particle collection with the given uniform mass.
    pub fn new(mass: f32) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            vx: Vec::new(),
            vy: Vec::new(),
            vz: Vec::new(),
            ax: Vec::new(),
            ay: Vec::new(),
            az: Vec::new(),
            density: Vec::new(),
            pressure: Vec::new(),
            drhodt: Vec::new(),
            mass,
        }
    }

    /// Build the store from initial positions and optional initial velocities.
    ///
    /// Density starts at `rest_density`; pressure and derivatives start at zero.
    pub fn from_positions(
        positions: &[[f32; 3]],
        velocities: Option<&[[f32; 3]]>,
        mass: f32,
        rest_density: f32,
    ) -> KernelResult<Self> {
        if let Some(v) = velocities {
            if v.len() != positions.len() {
                return Err(KernelError::LengthMismatch {
                    expected: positions.len(),
                    found: v.len(),
                });
            }
        }

        let mut particles = Self::new(mass);
        for (i, p) in positions.iter().enumerate() {
            particles.push_particle(*p, rest_density);
            if let Some(v) = velocities {
                particles.vx[i] = v[i][0];
                particles.vy[i] = v[i][1];
                particles.vz[i] = v[i][2];
            }
        }
        Ok(particles)
    }

    /// Return the number of particles currently stored.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append a single particle at rest.
    pub fn push_particle(&mut self, position: [f32; 3], density: f32) {
        self.x.push(position[0]);
        self.y.push(position[1]);
        self.z.push(position[2]);
        self.vx.push(0.0);
        self.vy.push(0.0);
        self.vz.push(0.0);
        self.ax.push(0.0);
        self.ay.push(0.0);
        self.az.push(0.0);
        self.density.push(density);
        self.pressure.push(0.0);
        self.drhodt.push(0.0);
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> [f32; 3] {
        [self.vx[i], self.vy[i], self.vz[i]]
    }

    /// Total system mass. Mass is uniform and never mutated by a tick.
    pub fn total_mass(&self) -> f64 {
        self.mass as f64 * self.len() as f64
    }
}

/// Read-only copy of the state exposed to readers outside the tick loop.
#[derive(Debug, Clone, Default)]
pub struct ParticleSnapshot {
    /// X positions
    pub x: Vec<f32>,
    /// Y positions
    pub y: Vec<f32>,
    /// Z positions
    pub z: Vec<f32>,
    /// Per-particle density
    pub density: Vec<f32>,
    /// Uniform particle mass
    pub mass: f32,
    /// Smoothing length the state was simulated with
    pub h: f32,
    /// Number of ticks completed when the copy was taken
    pub tick: u64,
}

impl ParticleSnapshot {
    /// Copy positions and densities out of a particle store.
    pub fn capture(particles: &ParticleArrays, h: f32, tick: u64) -> Self {
        Self {
            x: particles.x.clone(),
            y: particles.y.clone(),
            z: particles.z.clone(),
            density: particles.density.clone(),
            mass: particles.mass,
            h,
            tick,
        }
    }

    /// Overwrite this snapshot in place, reusing its allocations.
    pub fn copy_from(&mut self, particles: &ParticleArrays, h: f32, tick: u64) {
        self.x.clone_from(&particles.x);
        self.y.clone_from(&particles.y);
        self.z.clone_from(&particles.z);
        self.density.clone_from(&particles.density);
        self.mass = particles.mass;
        self.h = h;
        self.tick = tick;
    }

    /// Number of particles in the snapshot.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if the snapshot holds no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_particle_arrays() {
        let pa = ParticleArrays::new(0.008);
        assert_eq!(pa.len(), 0);
        assert!(pa.is_empty());
        assert_eq!(pa.total_mass(), 0.0);
    }

    #[test]
    fn push_and_len() {
        let mut pa = ParticleArrays::new(0.008);
        pa.push_particle([1.0, 2.0, 3.0], 1000.0);
        assert_eq!(pa.len(), 1);
        assert!(!pa.is_empty());
        assert_eq!(pa.position(0), [1.0, 2.0, 3.0]);
        assert_eq!(pa.density[0], 1000.0);
        // Velocity and derivatives should be zero
        assert_eq!(pa.velocity(0), [0.0, 0.0, 0.0]);
        assert_eq!(pa.ax[0], 0.0);
        assert_eq!(pa.drhodt[0], 0.0);
        assert_eq!(pa.pressure[0], 0.0);
    }

    #[test]
    fn from_positions_with_velocities() {
        let pos = [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let vel = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
        let pa = ParticleArrays::from_positions(&pos, Some(&vel), 0.5, 1000.0).unwrap();
        assert_eq!(pa.len(), 2);
        assert_eq!(pa.velocity(1), [0.0, -1.0, 0.0]);
        assert!((pa.total_mass() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn from_positions_rejects_mismatched_velocities() {
        let pos = [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let vel = [[1.0, 0.0, 0.0]];
        let err = ParticleArrays::from_positions(&pos, Some(&vel), 0.5, 1000.0).unwrap_err();
        assert_eq!(err, KernelError::LengthMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn snapshot_copy_reuses_buffers() {
        let mut pa = ParticleArrays::new(1.0);
        pa.push_particle([0.5, 0.5, 0.5], 990.0);
        let mut snap = ParticleSnapshot::default();
        snap.copy_from(&pa, 0.026, 7);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.density[0], 990.0);
        assert_eq!(snap.tick, 7);

        pa.x[0] = 0.25;
        // The snapshot is a copy, not a view into the live store
        assert_eq!(snap.x[0], 0.5);
    }
}
