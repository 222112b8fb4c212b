/*!
# Chunk/Cell Engine

The recursive divide-and-conquer point decomposition shared by the
geometric models. Given `(seed, n, chunks_per_dim, cells_per_dim)`, the
engine assigns `n` points to a `D`-dimensional grid of chunks such that

- chunk counts form a multinomial distribution with equal probabilities,
- the count and id-offset of any chunk is a pure function of the seed,
  independent of the rank count and of which ranks materialize it,
- the sum over all chunks is exactly `n`.

The count of one chunk is computed *locally* by descending a KD tree of
binomial splits: at each node, an axis-aligned box of chunks holding `n`
points is halved along each axis in turn, the low-side count drawn as a
conditional binomial keyed by `morton(region corner) + level · total_chunks`.
The descent is iterative; the recursion of the classical formulation
bottoms out exactly where the loop terminates.

Inside a chunk, a sequential multinomial distributes the points over a
finer grid of cells, and each cell materializes its vertices from a
generator seeded by its global cell id. Chunks and cells are memoized
per rank; a neighbor chunk needed by the edge emitter is re-derived on
demand instead of being communicated (*ghost chunk*).
*/

pub mod rgg;

use fxhash::FxHashMap;

use crate::edge::VertexRange;
use crate::error::Error;
use crate::utils::{morton, Sampler};

/// Lifecycle of a chunk: counts first, then the cell distribution.
/// Transitions are monotonic and driven by lazy access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChunkState {
    /// `(n, offset)` known
    Counted,
    /// Points distributed over the chunk's cells
    CellsDistributed,
}

/// A resolved chunk: point count, lower corner, first vertex id.
#[derive(Debug, Copy, Clone)]
pub struct Chunk<const D: usize> {
    /// Number of points in this chunk
    pub n: u64,
    /// Lower corner of the chunk's box in the unit domain
    pub corner: [f64; D],
    /// First vertex id assigned to this chunk
    pub offset: u64,
    /// Lifecycle state
    pub state: ChunkState,
}

/// A resolved cell inside a chunk. Cells with zero points are not stored.
#[derive(Debug, Copy, Clone)]
pub struct Cell<const D: usize> {
    /// Number of points in this cell
    pub n: u64,
    /// Lower corner of the cell's box
    pub corner: [f64; D],
    /// First vertex id assigned to this cell
    pub offset: u64,
    /// Whether the cell's vertices have been materialized
    pub materialized: bool,
}

/// A materialized point: position and global vertex id.
#[derive(Debug, Copy, Clone)]
pub struct PointRecord<const D: usize> {
    /// Position in the unit domain
    pub pos: [f64; D],
    /// Global vertex id
    pub id: u64,
}

/// The per-rank chunk/cell engine.
///
/// Owns the memoization tables; freed with the generator. There is no
/// shared state across ranks.
pub struct ChunkGrid<const D: usize> {
    sampler: Sampler,
    n: u64,

    chunks_per_dim: u64,
    total_chunks: u64,
    chunk_size: f64,

    cells_per_dim: u64,
    cells_per_chunk: u64,
    cell_size: f64,

    local_chunk_start: u64,
    local_chunk_end: u64,

    chunks: FxHashMap<u64, Chunk<D>>,
    cells: FxHashMap<u64, Cell<D>>,
    vertices: FxHashMap<u64, Vec<PointRecord<D>>>,

    start_node: u64,
    num_nodes: u64,
}

impl<const D: usize> ChunkGrid<D> {
    /// Creates the engine for one rank.
    ///
    /// `chunks_per_dim` must be a power of two (so that the KD splitters
    /// align with Morton bit boundaries and vertex ids increase along the
    /// Morton chunk walk); `cells_per_dim >= 1`.
    pub fn new(
        sampler: Sampler,
        n: u64,
        chunks_per_dim: u64,
        cells_per_dim: u64,
        rank: usize,
        size: usize,
    ) -> Result<Self, Error> {
        if chunks_per_dim == 0 || !chunks_per_dim.is_power_of_two() {
            return Err(Error::config(format!(
                "chunks per dimension must be a positive power of two, got {chunks_per_dim}"
            )));
        }
        if cells_per_dim == 0 {
            return Err(Error::config("cells per dimension must be positive"));
        }

        let total_chunks = chunks_per_dim
            .checked_pow(D as u32)
            .ok_or_else(|| Error::config(format!("{chunks_per_dim}^{D} chunks are not representable")))?;
        let cells_per_chunk = cells_per_dim
            .checked_pow(D as u32)
            .ok_or_else(|| Error::config(format!("{cells_per_dim}^{D} cells are not representable")))?;
        total_chunks
            .checked_mul(cells_per_chunk)
            .ok_or_else(|| Error::config("global cell id space is not representable"))?;

        // Contiguous Morton ranges of chunks per rank; the first
        // `total % size` ranks receive one extra chunk.
        let size_u = size as u64;
        let rank_u = rank as u64;
        let leftover_chunks = total_chunks % size_u;
        let local_chunks = total_chunks / size_u + u64::from(rank_u < leftover_chunks);
        let local_chunk_start = rank_u * (total_chunks / size_u) + rank_u.min(leftover_chunks);
        let local_chunk_end = local_chunk_start + local_chunks;

        let chunk_size = 1.0 / chunks_per_dim as f64;

        Ok(Self {
            sampler,
            n,
            chunks_per_dim,
            total_chunks,
            chunk_size,
            cells_per_dim,
            cells_per_chunk,
            cell_size: chunk_size / cells_per_dim as f64,
            local_chunk_start,
            local_chunk_end,
            chunks: FxHashMap::default(),
            cells: FxHashMap::default(),
            vertices: FxHashMap::default(),
            start_node: u64::MAX,
            num_nodes: 0,
        })
    }

    /// Chunks per dimension.
    #[inline]
    pub fn chunks_per_dim(&self) -> u64 {
        self.chunks_per_dim
    }

    /// Total number of chunks (`chunks_per_dim^D`).
    #[inline]
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    /// Cells per dimension inside one chunk.
    #[inline]
    pub fn cells_per_dim(&self) -> u64 {
        self.cells_per_dim
    }

    /// Cells per chunk (`cells_per_dim^D`).
    #[inline]
    pub fn cells_per_chunk(&self) -> u64 {
        self.cells_per_chunk
    }

    /// Side length of a chunk in the unit domain.
    #[inline]
    pub fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    /// Side length of a cell in the unit domain.
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The Morton ids of the chunks owned by this rank.
    #[inline]
    pub fn local_chunk_ids(&self) -> std::ops::Range<u64> {
        self.local_chunk_start..self.local_chunk_end
    }

    /// Whether `chunk_id` is owned by this rank.
    #[inline]
    pub fn is_local_chunk(&self, chunk_id: u64) -> bool {
        (self.local_chunk_start..self.local_chunk_end).contains(&chunk_id)
    }

    /// Global cell id of `(chunk_id, cell_id)`.
    #[inline]
    pub fn global_cell_id(&self, chunk_id: u64, cell_id: u64) -> u64 {
        chunk_id * self.cells_per_chunk + cell_id
    }

    /// A resolved chunk, if present.
    #[inline]
    pub fn chunk(&self, chunk_id: u64) -> Option<&Chunk<D>> {
        self.chunks.get(&chunk_id)
    }

    /// A resolved cell, if present and non-empty.
    #[inline]
    pub fn cell(&self, global_cell_id: u64) -> Option<&Cell<D>> {
        self.cells.get(&global_cell_id)
    }

    /// The materialized points of a cell; empty for absent or empty cells.
    #[inline]
    pub fn points(&self, global_cell_id: u64) -> &[PointRecord<D>] {
        self.vertices
            .get(&global_cell_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Eagerly resolves all locally owned chunks and fixes this rank's
    /// vertex range.
    pub fn compute_local_chunks(&mut self) -> Result<(), Error> {
        for chunk_id in self.local_chunk_start..self.local_chunk_end {
            self.compute_chunk(chunk_id)?;
        }

        if self.start_node == u64::MAX {
            // Rank owns no points; anchor the empty range at the prefix
            // count of the first non-local chunk to keep the global
            // partition contiguous.
            self.start_node = if self.local_chunk_start < self.total_chunks {
                self.compute_chunk(self.local_chunk_start)?;
                self.chunks[&self.local_chunk_start].offset
            } else {
                self.n
            };
        }

        Ok(())
    }

    /// The vertex range of this rank; valid after
    /// [`ChunkGrid::compute_local_chunks`].
    pub fn vertex_range(&self) -> VertexRange {
        VertexRange::new(self.start_node, self.start_node + self.num_nodes)
    }

    /// Resolves the count and id-offset of `chunk_id` by descending the KD
    /// tree of binomial splits. Memoized; a pure function of the seed.
    pub fn compute_chunk(&mut self, chunk_id: u64) -> Result<(), Error> {
        if self.chunks.contains_key(&chunk_id) {
            return Ok(());
        }
        debug_assert!(chunk_id < self.total_chunks);

        let target = morton::decode::<D>(chunk_id);

        let mut n = self.n;
        let mut extent = [self.chunks_per_dim; D];
        let mut start = [0u64; D];
        let mut offset = 0u64;
        let mut level = 0u64;

        while n > 0 && extent.iter().any(|&k| k > 1) {
            // One hash key per recursion node; the per-axis draws condition
            // on it and on the narrowed counts alone.
            let key = morton::encode(start).wrapping_add(level.wrapping_mul(self.total_chunks));

            let mut remaining = n;
            for axis in 0..D {
                if extent[axis] == 0 {
                    return Err(self.invariant_error("chunk region axis collapsed", chunk_id, level));
                }

                let splitter = (extent[axis] + 1) / 2;
                let p = splitter as f64 / extent[axis] as f64;
                let low = self.sampler.binomial(key, remaining, p);
                if low > remaining {
                    return Err(self.invariant_error("binomial draw exceeds its total", chunk_id, level));
                }

                if target[axis] < start[axis] + splitter {
                    extent[axis] = splitter;
                    remaining = low;
                } else {
                    offset += low;
                    start[axis] += splitter;
                    extent[axis] -= splitter;
                    remaining -= low;
                }
            }

            n = remaining;
            level += 1;
        }

        // Either the box is a single chunk, or the whole region is empty;
        // in both cases the target chunk's count and offset are fixed.
        let corner = std::array::from_fn(|d| target[d] as f64 * self.chunk_size);
        self.chunks.insert(
            chunk_id,
            Chunk {
                n,
                corner,
                offset,
                state: ChunkState::Counted,
            },
        );

        if self.is_local_chunk(chunk_id) {
            self.start_node = self.start_node.min(offset);
            self.num_nodes += n;
        }

        Ok(())
    }

    /// Distributes a chunk's points over its cells with a sequential
    /// multinomial. Lazily resolves the chunk first; idempotent.
    pub fn generate_cells(&mut self, chunk_id: u64) -> Result<(), Error> {
        self.compute_chunk(chunk_id)?;

        let chunk = self.chunks[&chunk_id];
        if chunk.state == ChunkState::CellsDistributed {
            return Ok(());
        }

        let mut n = chunk.n;
        let mut offset = chunk.offset;
        let cell_volume = self.cell_size.powi(D as i32);
        let mut remaining_volume = self.chunk_size.powi(D as i32);

        for i in 0..self.cells_per_chunk {
            let cell_n = if i + 1 == self.cells_per_chunk {
                // The last cell takes the exact remainder; conservation
                // must not depend on floating-point cancellation.
                n
            } else {
                let key = chunk_id * self.cells_per_chunk + i + self.total_chunks * self.cells_per_chunk;
                let p = (cell_volume / remaining_volume).clamp(0.0, 1.0);
                self.sampler.binomial(key, n, p)
            };
            if cell_n > n {
                return Err(self.invariant_error("cell split does not conserve", chunk_id, i));
            }

            if cell_n != 0 {
                let local = self.cell_coords(i);
                let corner =
                    std::array::from_fn(|d| chunk.corner[d] + local[d] as f64 * self.cell_size);
                self.cells.insert(
                    self.global_cell_id(chunk_id, i),
                    Cell {
                        n: cell_n,
                        corner,
                        offset,
                        materialized: false,
                    },
                );
            }

            n -= cell_n;
            offset += cell_n;
            remaining_volume -= cell_volume;
        }

        self.chunks.get_mut(&chunk_id).expect("chunk vanished").state =
            ChunkState::CellsDistributed;
        Ok(())
    }

    /// Materializes the vertices of one cell from a generator seeded by the
    /// global cell id. Lazily resolves chunk and cells first; idempotent:
    /// calling it twice produces identical vertices.
    pub fn generate_vertices(&mut self, chunk_id: u64, cell_id: u64) -> Result<(), Error> {
        self.generate_cells(chunk_id)?;

        let global_cell_id = self.global_cell_id(chunk_id, cell_id);
        let Some(cell) = self.cells.get(&global_cell_id).copied() else {
            return Ok(());
        };
        if cell.materialized {
            return Ok(());
        }

        let key = chunk_id * self.cells_per_chunk + cell_id;
        let mut rng = self.sampler.rng(key);

        let mut points = Vec::with_capacity(cell.n as usize);
        for i in 0..cell.n {
            let offsets: [f64; D] =
                std::array::from_fn(|_| self.sampler.uniform(&mut rng) * self.cell_size);
            points.push(PointRecord {
                pos: std::array::from_fn(|d| cell.corner[d] + offsets[d]),
                id: cell.offset + i,
            });
        }

        self.vertices.insert(global_cell_id, points);
        self.cells
            .get_mut(&global_cell_id)
            .expect("cell vanished")
            .materialized = true;
        Ok(())
    }

    /// Resolves the cell at global cell coordinates `coords` (chunk and
    /// cell combined, each axis in `0..chunks_per_dim * cells_per_dim`),
    /// materializing the owning chunk on demand. Returns the global cell id.
    pub fn ensure_cell_at(&mut self, coords: [u64; D]) -> Result<u64, Error> {
        let chunk_coords = std::array::from_fn(|d| coords[d] / self.cells_per_dim);
        let cell_coords = std::array::from_fn(|d| coords[d] % self.cells_per_dim);

        let chunk_id = morton::encode::<D>(chunk_coords);
        let cell_id = self.cell_index(cell_coords);
        self.generate_vertices(chunk_id, cell_id)?;
        Ok(self.global_cell_id(chunk_id, cell_id))
    }

    /// Per-axis coordinates of cell `i` inside its chunk; axis `D - 1`
    /// varies fastest, mirroring the Morton convention that axis `0` is
    /// the most significant.
    pub fn cell_coords(&self, mut i: u64) -> [u64; D] {
        let mut coords = [0u64; D];
        for d in (0..D).rev() {
            coords[d] = i % self.cells_per_dim;
            i /= self.cells_per_dim;
        }
        coords
    }

    /// Inverse of [`ChunkGrid::cell_coords`].
    pub fn cell_index(&self, coords: [u64; D]) -> u64 {
        coords.iter().fold(0, |acc, &c| acc * self.cells_per_dim + c)
    }

    fn invariant_error(&self, message: &str, chunk_id: u64, level: u64) -> Error {
        Error::InternalInvariant {
            message: message.to_string(),
            seed: self.sampler.seed(),
            chunk_id,
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid<const D: usize>(seed: u64, n: u64, k: u64, cells: u64) -> ChunkGrid<D> {
        ChunkGrid::new(Sampler::new(seed), n, k, cells, 0, 1).unwrap()
    }

    fn resolve_all<const D: usize>(g: &mut ChunkGrid<D>) -> Vec<(u64, u64)> {
        (0..g.total_chunks())
            .map(|id| {
                g.compute_chunk(id).unwrap();
                let chunk = g.chunk(id).unwrap();
                (chunk.n, chunk.offset)
            })
            .collect()
    }

    #[test]
    fn chunk_counts_conserve_n() {
        for seed in [1u64, 7, 42] {
            for n in [0u64, 1, 13, 1000, 12_345] {
                for k in [1u64, 2, 4, 8] {
                    let mut g = grid::<2>(seed, n, k, 1);
                    let chunks = resolve_all(&mut g);
                    assert_eq!(chunks.iter().map(|&(cn, _)| cn).sum::<u64>(), n);
                }
            }
        }
    }

    #[test]
    fn chunk_offsets_are_prefix_sums() {
        for seed in [1u64, 3] {
            let mut g = grid::<3>(seed, 5000, 4, 1);
            let chunks = resolve_all(&mut g);

            let mut expected_offset = 0;
            for (chunk_n, offset) in chunks {
                assert_eq!(offset, expected_offset);
                expected_offset += chunk_n;
            }
            assert_eq!(expected_offset, 5000);
        }
    }

    #[test]
    fn chunks_invariant_under_rank_count() {
        let n = 1_000_000;
        let k = 8;

        let mut reference = ChunkGrid::<3>::new(Sampler::new(1), n, k, 1, 0, 1).unwrap();
        reference.compute_chunk(37).unwrap();
        let expected = {
            let chunk = reference.chunk(37).unwrap();
            (chunk.n, chunk.offset)
        };

        for size in [2usize, 4, 8, 16] {
            for rank in [0, size - 1] {
                let mut g = ChunkGrid::<3>::new(Sampler::new(1), n, k, 1, rank, size).unwrap();
                g.compute_chunk(37).unwrap();
                let chunk = g.chunk(37).unwrap();
                assert_eq!((chunk.n, chunk.offset), expected);
            }
        }
    }

    #[test]
    fn vertex_ranges_partition() {
        for n in [0u64, 1, 999] {
            for size in [1usize, 3, 8] {
                let ranges: Vec<VertexRange> = (0..size)
                    .map(|rank| {
                        let mut g = ChunkGrid::<2>::new(Sampler::new(5), n, 4, 2, rank, size).unwrap();
                        g.compute_local_chunks().unwrap();
                        g.vertex_range()
                    })
                    .collect();

                assert_eq!(ranges[0].first, 0);
                assert_eq!(ranges[size - 1].first_invalid, n);
                for w in ranges.windows(2) {
                    assert_eq!(w[0].first_invalid, w[1].first);
                }
            }
        }
    }

    #[test]
    fn single_point_lands_in_one_chunk() {
        let mut g = grid::<2>(9, 1, 4, 1);
        let chunks = resolve_all(&mut g);
        let nonempty: Vec<_> = chunks.iter().filter(|&&(n, _)| n > 0).collect();
        assert_eq!(nonempty.len(), 1);
        assert_eq!(nonempty[0].0, 1);
    }

    #[test]
    fn cells_conserve_chunk_count() {
        let mut g = grid::<2>(11, 4000, 4, 3);
        for chunk_id in 0..g.total_chunks() {
            g.generate_cells(chunk_id).unwrap();
            let chunk_n = g.chunk(chunk_id).unwrap().n;
            let cell_sum: u64 = (0..g.cells_per_chunk())
                .filter_map(|c| g.cell(g.global_cell_id(chunk_id, c)))
                .map(|cell| cell.n)
                .sum();
            assert_eq!(cell_sum, chunk_n);
        }
    }

    #[test]
    fn cell_offsets_follow_prefix_rule() {
        let mut g = grid::<3>(2, 2000, 2, 2);
        for chunk_id in 0..g.total_chunks() {
            g.generate_cells(chunk_id).unwrap();
            let chunk = *g.chunk(chunk_id).unwrap();

            let mut expected_offset = chunk.offset;
            for c in 0..g.cells_per_chunk() {
                if let Some(cell) = g.cell(g.global_cell_id(chunk_id, c)) {
                    assert_eq!(cell.offset, expected_offset);
                    expected_offset += cell.n;
                }
            }
            assert_eq!(expected_offset, chunk.offset + chunk.n);
        }
    }

    #[test]
    fn vertex_materialization_is_idempotent_and_in_box() {
        let mut g = grid::<2>(3, 500, 2, 2);
        for chunk_id in 0..g.total_chunks() {
            for cell_id in 0..g.cells_per_chunk() {
                g.generate_vertices(chunk_id, cell_id).unwrap();
                let global = g.global_cell_id(chunk_id, cell_id);
                let first: Vec<_> = g.points(global).to_vec();

                g.generate_vertices(chunk_id, cell_id).unwrap();
                let second = g.points(global);

                assert_eq!(first.len(), second.len());
                for (a, b) in first.iter().zip(second) {
                    assert_eq!(a.id, b.id);
                    assert_eq!(a.pos, b.pos);
                }

                if let Some(cell) = g.cell(global) {
                    for point in g.points(global) {
                        for d in 0..2 {
                            assert!(point.pos[d] >= cell.corner[d]);
                            assert!(point.pos[d] < cell.corner[d] + g.cell_size() + 1e-12);
                        }
                    }
                    // Ids are contiguous starting at the cell's offset.
                    for (i, point) in g.points(global).iter().enumerate() {
                        assert_eq!(point.id, cell.offset + i as u64);
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert!(ChunkGrid::<2>::new(Sampler::new(1), 10, 0, 1, 0, 1).is_err());
        assert!(ChunkGrid::<2>::new(Sampler::new(1), 10, 3, 1, 0, 1).is_err());
        assert!(ChunkGrid::<2>::new(Sampler::new(1), 10, 4, 0, 0, 1).is_err());
    }
}
