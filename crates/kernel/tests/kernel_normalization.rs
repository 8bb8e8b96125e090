//! Kernel normalization tests.
//!
//! The cubic spline integrates to one over its support, and summation
//! density on a regular lattice at the rest spacing reproduces rho_0.

use kernel::sph::compute_density;
use kernel::{cubic_spline, NeighborGrid, NeighborList, ParticleArrays};

#[test]
fn cubic_spline_integrates_to_one() {
    let h = 0.026_f32;
    let support = 2.0 * h;
    let n = 80;
    let cell = 2.0 * support / n as f32;
    let volume = (cell as f64).powi(3);

    let mut integral = 0.0_f64;
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let x = -support + (i as f32 + 0.5) * cell;
                let y = -support + (j as f32 + 0.5) * cell;
                let z = -support + (k as f32 + 0.5) * cell;
                let r = (x * x + y * y + z * z).sqrt();
                integral += cubic_spline(r, h) as f64 * volume;
            }
        }
    }

    eprintln!("Kernel integral: {integral:.6}");
    assert!(
        (integral - 1.0).abs() < 5.0e-3,
        "Kernel should integrate to 1, got {integral:.6}"
    );
}

#[test]
fn density_at_rest_lattice_matches_rho0() {
    let spacing = 0.02_f32;
    let h = 1.3 * spacing;
    let rest_density = 1000.0_f32;
    let mass = rest_density * spacing * spacing * spacing;

    // 9x9x9 lattice centered at 0.5; the center has a full support sphere
    let mut particles = ParticleArrays::new(mass);
    for iz in -4i32..=4 {
        for iy in -4i32..=4 {
            for ix in -4i32..=4 {
                particles.push_particle(
                    [
                        0.5 + ix as f32 * spacing,
                        0.5 + iy as f32 * spacing,
                        0.5 + iz as f32 * spacing,
                    ],
                    rest_density,
                );
            }
        }
    }
    let center = particles.len() / 2;
    assert!((particles.x[center] - 0.5).abs() < 1.0e-6);

    let mut grid = NeighborGrid::new(2.0 * h, [0.0; 3], [1.0; 3]);
    grid.update(&particles.x, &particles.y, &particles.z);
    let neighbors = NeighborList::build(
        &grid,
        &particles.x,
        &particles.y,
        &particles.z,
        2.0 * h,
        None,
    );
    compute_density(&mut particles, &neighbors, h);

    let computed = particles.density[center];
    let relative_error = (computed - rest_density).abs() / rest_density;
    eprintln!(
        "Center particle density: {computed:.2} (expected {rest_density:.2}), error {:.4}%",
        relative_error * 100.0
    );
    assert!(
        relative_error < 0.01,
        "Density should match rho_0 within 1%, got {computed:.2}"
    );

    // Corner particles see about an eighth of the support
    assert!(particles.density[0] < 0.6 * rest_density);
}
