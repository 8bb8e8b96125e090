//! Isosurface extraction from a sampled scalar field.

use std::collections::HashMap;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::field::ScalarField;
use crate::mesh::TriangleMesh;

/// Turns a sampled field into a triangle mesh of its `iso` level set.
///
/// Nodes with `value > iso` are inside the fluid. Implementations must
/// return consistently oriented triangles with normals pointing out of the
/// fluid.
pub trait IsosurfaceExtractor: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Extract the level set `iso` from `field`.
    fn extract(&self, field: &ScalarField, iso: f64) -> TriangleMesh;
}

/// Marching tetrahedra over a six-tetrahedron split of every grid cell.
///
/// All cells use the same split along the `(0,0,0)-(1,1,1)` diagonal, so
/// shared cell faces are cut identically from both sides and the mesh has
/// no cracks. Vertices on shared grid edges are welded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingTetrahedra;

/// Cell corner offsets.
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Six tetrahedra sharing the 0-6 diagonal.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 1, 5, 6],
    [0, 3, 2, 6],
    [0, 3, 7, 6],
    [0, 4, 5, 6],
    [0, 4, 7, 6],
];

/// Grid edge between two node indices, smaller index first.
type EdgeKey = (usize, usize);

#[inline]
fn edge_key(a: usize, b: usize) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Clone, Copy)]
struct Corner {
    node: usize,
    value: f64,
    position: Vector3<f64>,
}

fn node_position(field: &ScalarField, index: usize) -> Vector3<f64> {
    let [ix, iy, iz] = field.grid.coords(index);
    Vector3::from(field.grid.node(ix, iy, iz))
}

/// Linear crossing point of `iso` along a grid edge.
fn edge_point(field: &ScalarField, key: EdgeKey, iso: f64) -> Vector3<f64> {
    let (a, b) = key;
    let (va, vb) = (field.values[a], field.values[b]);
    let (pa, pb) = (node_position(field, a), node_position(field, b));
    let t = (iso - va) / (vb - va);
    pa + (pb - pa) * t
}

impl MarchingTetrahedra {
    /// Triangles of one tetrahedron, as edge keys, oriented outward.
    fn polygonise(
        field: &ScalarField,
        iso: f64,
        tet: [Corner; 4],
        out: &mut Vec<[EdgeKey; 3]>,
    ) {
        let inside: Vec<usize> = (0..4).filter(|&k| tet[k].value > iso).collect();
        let outside: Vec<usize> = (0..4).filter(|&k| tet[k].value <= iso).collect();
        let edge = |a: usize, b: usize| edge_key(tet[a].node, tet[b].node);

        let mut emit = |mut tri: [EdgeKey; 3]| {
            let p = tri.map(|key| edge_point(field, key, iso));
            let normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
            let centroid = |ks: &[usize]| {
                ks.iter()
                    .fold(Vector3::zeros(), |acc, &k| acc + tet[k].position)
                    / ks.len() as f64
            };
            let outward = centroid(&outside) - centroid(&inside);
            if normal.dot(&outward) < 0.0 {
                tri.swap(1, 2);
            }
            out.push(tri);
        };

        match (inside.as_slice(), outside.as_slice()) {
            (&[a], &[b, c, d]) | (&[b, c, d], &[a]) => {
                emit([edge(a, b), edge(a, c), edge(a, d)]);
            }
            (&[a, b], &[c, d]) => {
                emit([edge(a, c), edge(a, d), edge(b, d)]);
                emit([edge(a, c), edge(b, d), edge(b, c)]);
            }
            _ => {}
        }
    }

    /// All triangles of the cells in z-layer `k`.
    fn layer(field: &ScalarField, iso: f64, k: usize) -> Vec<[EdgeKey; 3]> {
        let grid = &field.grid;
        let mut out = Vec::new();
        for j in 0..grid.dims[1] - 1 {
            for i in 0..grid.dims[0] - 1 {
                let cell: [Corner; 8] = CORNERS.map(|[dx, dy, dz]| {
                    let node = grid.index(i + dx, j + dy, k + dz);
                    Corner {
                        node,
                        value: field.values[node],
                        position: Vector3::from(grid.node(i + dx, j + dy, k + dz)),
                    }
                });
                let above = cell.iter().filter(|c| c.value > iso).count();
                if above == 0 || above == 8 {
                    continue;
                }
                for t in TETRAHEDRA {
                    Self::polygonise(field, iso, t.map(|c| cell[c]), &mut out);
                }
            }
        }
        out
    }
}

impl IsosurfaceExtractor for MarchingTetrahedra {
    fn name(&self) -> &'static str {
        "marching-tetrahedra"
    }

    fn extract(&self, field: &ScalarField, iso: f64) -> TriangleMesh {
        let dims = field.grid.dims;
        if dims.iter().any(|&n| n < 2) || field.values.len() != field.grid.node_count() {
            return TriangleMesh::default();
        }

        let layers: Vec<Vec<[EdgeKey; 3]>> = (0..dims[2] - 1)
            .into_par_iter()
            .map(|k| Self::layer(field, iso, k))
            .collect();

        let mut mesh = TriangleMesh::default();
        let mut welded: HashMap<EdgeKey, u32> = HashMap::new();
        for tri in layers.into_iter().flatten() {
            let indices = tri.map(|key| {
                *welded.entry(key).or_insert_with(|| {
                    let p = edge_point(field, key, iso);
                    mesh.vertices.push([p.x as f32, p.y as f32, p.z as f32]);
                    (mesh.vertices.len() - 1) as u32
                })
            });
            mesh.triangles.push(indices);
        }
        mesh
    }
}
