//! Uniform-grid spatial hash and per-particle neighbor lists.
//!
//! The grid uses sorted-index + cell-offset arrays built by a two-pass
//! counting sort (count, prefix-sum, scatter) rather than per-cell growable
//! buckets, so a rebuild is deterministic and contention free.

use rayon::prelude::*;

/// Upper bound on cells per axis. Space beyond it folds into the edge
/// cells, so a stray far-away particle cannot blow up the allocation.
pub const MAX_CELLS_PER_AXIS: u32 = 256;

/// Uniform-grid spatial hash for O(1) neighbor cell lookup.
///
/// Cell size should equal the kernel support radius (2h) so that for any
/// particle the 27 (3x3x3) adjacent cells contain all potential neighbors
/// within distance 2h. Larger query radii widen the scanned block.
///
/// Positions outside the grid are clamped into the nearest boundary cell.
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    cell_size: f32,
    grid_min: [f32; 3],
    grid_dims: [u32; 3],
    /// Optional bound on the number of particles stored per cell.
    cell_capacity: Option<usize>,
    /// Cell index for each particle (parallel to particle arrays).
    cell_indices: Vec<u32>,
    /// Particle indices sorted by cell index.
    sorted_indices: Vec<u32>,
    /// Start offset in `sorted_indices` for each cell.
    cell_offsets: Vec<u32>,
    /// Number of particles stored in each cell.
    cell_counts: Vec<u32>,
    /// Particles dropped by the last rebuild because their cell was full.
    dropped: usize,
}

impl NeighborGrid {
    /// Create a new neighbor grid covering `[domain_min, domain_max]`.
    ///
    /// `cell_size` should be set to the kernel support radius (typically 2h).
    /// The caller validates `cell_size > 0`; configuration checks do this
    /// before any grid is built.
    pub fn new(cell_size: f32, domain_min: [f32; 3], domain_max: [f32; 3]) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be positive");
        let raw = |axis: usize| ((domain_max[axis] - domain_min[axis]) / cell_size).ceil();
        if (0..3).any(|axis| raw(axis) > MAX_CELLS_PER_AXIS as f32) {
            tracing::warn!(
                "Neighbor grid extent {:?}..{:?} capped at {} cells per axis",
                domain_min,
                domain_max,
                MAX_CELLS_PER_AXIS
            );
        }
        // NaN extents collapse to a single cell
        let dim = |axis: usize| match raw(axis) {
            cells if cells.is_nan() => 1,
            cells => cells.clamp(1.0, MAX_CELLS_PER_AXIS as f32) as u32,
        };
        let dims = [dim(0), dim(1), dim(2)];
        let total_cells = (dims[0] as usize) * (dims[1] as usize) * (dims[2] as usize);
        Self {
            cell_size,
            grid_min: domain_min,
            grid_dims: dims,
            cell_capacity: None,
            cell_indices: Vec::new(),
            sorted_indices: Vec::new(),
            cell_offsets: vec![0; total_cells],
            cell_counts: vec![0; total_cells],
            dropped: 0,
        }
    }

    /// Create a grid sized to the bounding extent of the given points plus
    /// `margin` on every side, and fill it.
    pub fn around_points(x: &[f32], y: &[f32], z: &[f32], cell_size: f32, margin: f32) -> Self {
        let (lower, upper) = bounding_box(x, y, z);
        let lower = [lower[0] - margin, lower[1] - margin, lower[2] - margin];
        let upper = [upper[0] + margin, upper[1] + margin, upper[2] + margin];
        let mut grid = Self::new(cell_size, lower, upper);
        grid.update(x, y, z);
        grid
    }

    /// Bound the number of particles each cell may hold.
    ///
    /// Particles beyond the capacity are dropped from the cell at rebuild
    /// time and reported through `tracing::warn!`.
    pub fn with_cell_capacity(mut self, capacity: usize) -> Self {
        self.cell_capacity = Some(capacity);
        self
    }

    /// Edge length of a cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells along each axis.
    pub fn dims(&self) -> [u32; 3] {
        self.grid_dims
    }

    /// Number of particles dropped by the last rebuild.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Total number of cells in the grid.
    fn total_cells(&self) -> usize {
        (self.grid_dims[0] as usize)
            * (self.grid_dims[1] as usize)
            * (self.grid_dims[2] as usize)
    }

    /// Map a world-space position to a cell (cx, cy, cz), clamped to grid bounds.
    #[inline]
    fn pos_to_cell(&self, px: f32, py: f32, pz: f32) -> (u32, u32, u32) {
        let clamp_axis = |p: f32, axis: usize| {
            ((p - self.grid_min[axis]) / self.cell_size)
                .floor()
                .max(0.0)
                .min((self.grid_dims[axis] - 1) as f32) as u32
        };
        (clamp_axis(px, 0), clamp_axis(py, 1), clamp_axis(pz, 2))
    }

    /// Flat cell index from (cx, cy, cz).
    #[inline]
    fn cell_hash(&self, cx: u32, cy: u32, cz: u32) -> u32 {
        cx + cy * self.grid_dims[0] + cz * self.grid_dims[0] * self.grid_dims[1]
    }

    /// Rebuild the grid from current particle positions.
    ///
    /// The three slices must all have the same length (one entry per particle).
    /// Nothing is carried over from the previous build.
    pub fn update(&mut self, x: &[f32], y: &[f32], z: &[f32]) {
        let n = x.len();
        debug_assert_eq!(n, y.len());
        debug_assert_eq!(n, z.len());

        let total_cells = self.total_cells();

        // --- 1. Compute cell index for each particle (independent per particle) ---
        self.cell_indices = (0..n)
            .into_par_iter()
            .map(|i| {
                let (cx, cy, cz) = self.pos_to_cell(x[i], y[i], z[i]);
                self.cell_hash(cx, cy, cz)
            })
            .collect();

        // --- 2. Count particles per cell, capped at the cell capacity ---
        self.cell_counts.clear();
        self.cell_counts.resize(total_cells, 0);
        for &ci in &self.cell_indices {
            self.cell_counts[ci as usize] += 1;
        }
        let mut dropped = 0usize;
        if let Some(cap) = self.cell_capacity {
            for count in self.cell_counts.iter_mut() {
                if *count as usize > cap {
                    dropped += *count as usize - cap;
                    *count = cap as u32;
                }
            }
        }

        // --- 3. Prefix-sum to get cell offsets ---
        self.cell_offsets.clear();
        self.cell_offsets.resize(total_cells, 0);
        let mut running = 0u32;
        for c in 0..total_cells {
            self.cell_offsets[c] = running;
            running += self.cell_counts[c];
        }

        // --- 4. Scatter particle indices into sorted order ---
        self.sorted_indices.clear();
        self.sorted_indices.resize(running as usize, 0);
        let mut written = vec![0u32; total_cells];
        for i in 0..n {
            let ci = self.cell_indices[i] as usize;
            if written[ci] >= self.cell_counts[ci] {
                continue;
            }
            let pos = (self.cell_offsets[ci] + written[ci]) as usize;
            self.sorted_indices[pos] = i as u32;
            written[ci] += 1;
        }

        if dropped > 0 {
            tracing::warn!(
                "Neighbor grid cell capacity exceeded: {} particle(s) dropped from full cells",
                dropped
            );
        }
        self.dropped = dropped;
    }

    /// Invoke `f` for every stored particle within `radius` of `point`.
    ///
    /// `exclude` skips one particle index (the query particle itself).
    pub fn for_each_within<F>(
        &self,
        point: [f32; 3],
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        exclude: Option<usize>,
        mut f: F,
    ) where
        F: FnMut(usize),
    {
        let (cx, cy, cz) = self.pos_to_cell(point[0], point[1], point[2]);
        let radius_sq = radius * radius;
        let reach = ((radius / self.cell_size).ceil() as i32).max(1);

        let range = |c: u32, axis: usize| {
            let lo = (c as i32 - reach).max(0);
            let hi = (c as i32 + reach).min(self.grid_dims[axis] as i32 - 1);
            lo..=hi
        };

        for nz in range(cz, 2) {
            for ny in range(cy, 1) {
                for nx in range(cx, 0) {
                    let cell = self.cell_hash(nx as u32, ny as u32, nz as u32) as usize;
                    let start = self.cell_offsets[cell] as usize;
                    let count = self.cell_counts[cell] as usize;

                    for s in start..start + count {
                        let j = self.sorted_indices[s] as usize;
                        if Some(j) == exclude {
                            continue;
                        }
                        let ddx = point[0] - x[j];
                        let ddy = point[1] - y[j];
                        let ddz = point[2] - z[j];
                        let dist_sq = ddx * ddx + ddy * ddy + ddz * ddz;
                        if dist_sq < radius_sq {
                            f(j);
                        }
                    }
                }
            }
        }
    }

    /// Iterate over all neighbors of `particle_idx` within `radius`, excluding itself.
    pub fn for_each_neighbor<F>(
        &self,
        particle_idx: usize,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        f: F,
    ) where
        F: FnMut(usize),
    {
        let point = [x[particle_idx], y[particle_idx], z[particle_idx]];
        self.for_each_within(point, x, y, z, radius, Some(particle_idx), f);
    }

    /// Collect the indices of all particles within `radius` of `point`.
    pub fn query_neighbors(
        &self,
        point: [f32; 3],
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
    ) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each_within(point, x, y, z, radius, None, |j| out.push(j));
        out
    }
}

/// Axis-aligned bounding box of a point set; a degenerate box at the origin
/// when the set is empty.
pub fn bounding_box(x: &[f32], y: &[f32], z: &[f32]) -> ([f32; 3], [f32; 3]) {
    if x.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    let mut lower = [f32::INFINITY; 3];
    let mut upper = [f32::NEG_INFINITY; 3];
    for i in 0..x.len() {
        let p = [x[i], y[i], z[i]];
        for axis in 0..3 {
            lower[axis] = lower[axis].min(p[axis]);
            upper[axis] = upper[axis].max(p[axis]);
        }
    }
    (lower, upper)
}

/// Per-particle neighbor lists in compressed-row layout.
///
/// Self is never listed. Lists are rebuilt from scratch every tick.
#[derive(Debug, Clone, Default)]
pub struct NeighborList {
    offsets: Vec<usize>,
    indices: Vec<u32>,
    truncated: usize,
}

impl NeighborList {
    /// Build neighbor lists for every particle from a filled grid.
    ///
    /// With `capacity` set, each list keeps at most that many entries; the
    /// excess is dropped and reported through `tracing::warn!`.
    pub fn build(
        grid: &NeighborGrid,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        capacity: Option<usize>,
    ) -> Self {
        let n = x.len();
        let lists: Vec<(Vec<u32>, usize)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut list = Vec::new();
                grid.for_each_neighbor(i, x, y, z, radius, |j| list.push(j as u32));
                let mut dropped = 0;
                if let Some(cap) = capacity {
                    if list.len() > cap {
                        dropped = list.len() - cap;
                        list.truncate(cap);
                    }
                }
                (list, dropped)
            })
            .collect();

        let truncated: usize = lists.iter().map(|(_, d)| d).sum();
        if truncated > 0 {
            tracing::warn!(
                "Neighbor list capacity exceeded: {} neighbor entries dropped",
                truncated
            );
        }

        let mut out = Self::from_lists(lists.into_iter().map(|(l, _)| l));
        out.truncated = truncated;
        out
    }

    /// Assemble neighbor lists from explicit per-particle index lists.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = Vec<u32>>,
    {
        let mut offsets = vec![0usize];
        let mut indices = Vec::new();
        for list in lists {
            indices.extend_from_slice(&list);
            offsets.push(indices.len());
        }
        Self {
            offsets,
            indices,
            truncated: 0,
        }
    }

    /// Neighbors of particle `i`.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[u32] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Number of particles the lists were built for.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Return `true` if no lists are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries dropped because a list hit its capacity.
    pub fn truncated(&self) -> usize {
        self.truncated
    }
}
