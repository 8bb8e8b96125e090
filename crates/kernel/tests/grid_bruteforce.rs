//! Grid correctness against an O(n^2) reference.

use std::collections::BTreeSet;

use kernel::{NeighborGrid, NeighborList};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Cloud {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
}

/// Random points, some deliberately outside the unit grid domain.
fn random_cloud(n: usize, seed: u64) -> Cloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coord = || rng.random_range(-0.1_f32..1.1);
    let mut cloud = Cloud {
        x: Vec::with_capacity(n),
        y: Vec::with_capacity(n),
        z: Vec::with_capacity(n),
    };
    for _ in 0..n {
        cloud.x.push(coord());
        cloud.y.push(coord());
        cloud.z.push(coord());
    }
    cloud
}

fn brute_force(cloud: &Cloud, point: [f32; 3], radius: f32, exclude: Option<usize>) -> BTreeSet<usize> {
    let radius_sq = radius * radius;
    (0..cloud.x.len())
        .filter(|&j| Some(j) != exclude)
        .filter(|&j| {
            let dx = point[0] - cloud.x[j];
            let dy = point[1] - cloud.y[j];
            let dz = point[2] - cloud.z[j];
            dx * dx + dy * dy + dz * dz < radius_sq
        })
        .collect()
}

#[test]
fn query_neighbors_matches_brute_force() {
    let radius = 0.052;
    for (n, seed) in [(200, 1), (1000, 2), (3000, 3)] {
        let cloud = random_cloud(n, seed);
        let mut grid = NeighborGrid::new(radius, [0.0; 3], [1.0; 3]);
        grid.update(&cloud.x, &cloud.y, &cloud.z);

        let mut rng = StdRng::seed_from_u64(seed + 100);
        for _ in 0..200 {
            let point = [
                rng.random_range(-0.1..1.1),
                rng.random_range(-0.1..1.1),
                rng.random_range(-0.1..1.1),
            ];
            let found: BTreeSet<usize> = grid
                .query_neighbors(point, &cloud.x, &cloud.y, &cloud.z, radius)
                .into_iter()
                .collect();
            assert_eq!(found, brute_force(&cloud, point, radius, None), "n = {n}");
        }
    }
}

#[test]
fn wide_query_radius_scans_more_cells() {
    let cloud = random_cloud(1500, 11);
    let mut grid = NeighborGrid::new(0.05, [0.0; 3], [1.0; 3]);
    grid.update(&cloud.x, &cloud.y, &cloud.z);
    let point = [0.5, 0.5, 0.5];
    let found: BTreeSet<usize> = grid
        .query_neighbors(point, &cloud.x, &cloud.y, &cloud.z, 0.12)
        .into_iter()
        .collect();
    assert_eq!(found, brute_force(&cloud, point, 0.12, None));
}

#[test]
fn neighbor_lists_match_brute_force() {
    let radius = 0.06;
    for seed in [21, 22, 23] {
        let cloud = random_cloud(2000, seed);
        let grid = NeighborGrid::around_points(&cloud.x, &cloud.y, &cloud.z, radius, radius);
        let lists = NeighborList::build(&grid, &cloud.x, &cloud.y, &cloud.z, radius, None);
        assert_eq!(lists.len(), 2000);
        assert_eq!(lists.truncated(), 0);

        for i in (0..2000).step_by(7) {
            let found: BTreeSet<usize> = lists.neighbors(i).iter().map(|&j| j as usize).collect();
            let point = [cloud.x[i], cloud.y[i], cloud.z[i]];
            assert_eq!(found, brute_force(&cloud, point, radius, Some(i)), "particle {i}");
            assert!(!found.contains(&i), "self must not be listed");
        }
    }
}
