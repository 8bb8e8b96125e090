//! Ferrofluid Surface Reconstruction
//!
//! Turns a particle snapshot into a closed triangle mesh of the fluid
//! surface. Each particle is smoothed toward its neighbors and given an
//! anisotropic kernel from the principal axes of its neighborhood; the
//! summed kernels form a fill field whose `0.5` level set is extracted.
//!
//! # Modules
//! - [`anisotropy`] -- Position smoothing and per-particle kernel shapes.
//! - [`field`] -- Sampling grid and scalar field evaluation.
//! - [`extract`] -- Isosurface extraction (marching tetrahedra).
//! - [`mesh`] -- Indexed triangle mesh and OBJ output.
//! - [`settings`] -- Reconstruction parameters.

#![warn(missing_docs)]

pub mod anisotropy;
pub mod error;
pub mod extract;
pub mod field;
pub mod mesh;
pub mod settings;

pub use error::{SurfaceError, SurfaceResult};
pub use extract::{IsosurfaceExtractor, MarchingTetrahedra};
pub use field::{SamplingGrid, ScalarField};
pub use mesh::TriangleMesh;
pub use settings::{AnisotropyParams, ReconstructionSettings};

use std::time::Instant;

use kernel::{NeighborGrid, NeighborList, ParticleSnapshot};

/// Output of one reconstruction pass.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Sampled fill field.
    pub field: ScalarField,
    /// Extracted surface.
    pub mesh: TriangleMesh,
}

/// Reconstruct the fluid surface of `snapshot`.
///
/// The snapshot is only read. An empty snapshot, or one whose field never
/// reaches the isovalue, yields an empty mesh rather than an error.
pub fn reconstruct(
    snapshot: &ParticleSnapshot,
    settings: &ReconstructionSettings,
    extractor: &dyn IsosurfaceExtractor,
) -> SurfaceResult<Reconstruction> {
    settings.validate()?;
    let n = snapshot.x.len();
    for found in [snapshot.y.len(), snapshot.z.len(), snapshot.density.len()] {
        if found != n {
            return Err(SurfaceError::LengthMismatch { expected: n, found });
        }
    }
    if !(snapshot.h.is_finite() && snapshot.h > 0.0) {
        return Err(SurfaceError::InvalidConfig(format!(
            "smoothing length must be positive, got {}",
            snapshot.h
        )));
    }

    let start = Instant::now();
    let support = 2.0 * snapshot.h;
    let (x, y, z) = (&snapshot.x, &snapshot.y, &snapshot.z);

    let lookup = NeighborGrid::around_points(x, y, z, support, support);
    let neighbors = NeighborList::build(&lookup, x, y, z, support, None);
    let smoothing = anisotropy::smooth(snapshot, &neighbors, &settings.anisotropy);

    let grid = SamplingGrid::around_points(snapshot, support as f64, settings.resolution);
    let field = field::sample(grid, snapshot, &lookup, &smoothing);
    let mesh = extractor.extract(&field, settings.isovalue);

    tracing::info!(
        "Surface reconstructed at tick {}: {} particles, {} vertices, {} triangles ({}, {:?})",
        snapshot.tick,
        n,
        mesh.vertices.len(),
        mesh.triangles.len(),
        extractor.name(),
        start.elapsed()
    );

    Ok(Reconstruction { field, mesh })
}
