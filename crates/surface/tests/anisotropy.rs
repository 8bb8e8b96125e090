//! Neighborhood-driven kernel shapes.

use kernel::{NeighborList, ParticleSnapshot};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use surface::anisotropy::{isotropic_matrix, smooth};
use surface::AnisotropyParams;

const H: f32 = 0.026;

/// One particle at the origin with `count` random neighbors inside `2h`,
/// squashed along y by `flatten`.
fn cloud(count: usize, flatten: f32, seed: u64) -> (ParticleSnapshot, NeighborList) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut snapshot = ParticleSnapshot {
        x: vec![0.0],
        y: vec![0.0],
        z: vec![0.0],
        density: vec![1000.0],
        mass: 0.008,
        h: H,
        tick: 0,
    };
    while snapshot.len() < count + 1 {
        let p: [f32; 3] = [
            rng.random_range(-1.5 * H..1.5 * H),
            rng.random_range(-1.5 * H..1.5 * H) * flatten,
            rng.random_range(-1.5 * H..1.5 * H),
        ];
        let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        if r < 0.1 * H || r > 1.5 * H {
            continue;
        }
        snapshot.x.push(p[0]);
        snapshot.y.push(p[1]);
        snapshot.z.push(p[2]);
        snapshot.density.push(1000.0);
    }
    let mut lists = vec![(1..=count as u32).collect::<Vec<_>>()];
    lists.extend((0..count).map(|_| Vec::new()));
    (snapshot, NeighborList::from_lists(lists))
}

fn distance(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
    (a - b).norm() / b.norm()
}

#[test]
fn sparse_neighborhood_falls_back_to_isotropic() {
    let params = AnisotropyParams::default();
    let (snapshot, neighbors) = cloud(params.min_neighbors - 1, 0.2, 11);
    let smoothing = smooth(&snapshot, &neighbors, &params);
    let expected = isotropic_matrix(H as f64, params.kn);
    assert!(distance(&smoothing.matrices[0], &expected) < 1.0e-9);
    // Particles without neighbors keep their position
    for i in 1..snapshot.len() {
        assert_eq!(smoothing.positions[i].x, snapshot.x[i] as f64);
    }
}

#[test]
fn flattened_neighborhood_is_anisotropic() {
    let params = AnisotropyParams::default();
    let (snapshot, neighbors) = cloud(params.min_neighbors + 15, 0.2, 11);
    let smoothing = smooth(&snapshot, &neighbors, &params);
    let g = smoothing.matrices[0];
    let expected = isotropic_matrix(H as f64, params.kn);
    assert!(distance(&g, &expected) > 0.1);

    let eig = g.symmetric_eigen();
    let (lo, hi) = (eig.eigenvalues.min(), eig.eigenvalues.max());
    assert!(lo > 0.0);
    assert!(hi / lo <= params.kr * (1.0 + 1.0e-6), "ratio {}", hi / lo);

    // The stiffest direction is the squashed one
    let stiff = eig
        .eigenvalues
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (k, &v)| if v > best.1 { (k, v) } else { best })
        .0;
    let axis = eig.eigenvectors.column(stiff);
    assert!(axis[1].abs() > 0.9, "stiff axis {axis:?}");
}

#[test]
fn matrices_are_symmetric_positive_definite() {
    let params = AnisotropyParams::default();
    for seed in 0..5 {
        let (snapshot, neighbors) = cloud(40, 1.0, seed);
        let g = smooth(&snapshot, &neighbors, &params).matrices[0];
        assert!((g - g.transpose()).norm() < 1.0e-9 * g.norm());
        assert!(g.determinant() > 0.0);
    }
}
