/*!
# Random Geometric Graphs

`n` points are distributed over the unit square/cube by the
[`ChunkGrid`](super::ChunkGrid) engine; two vertices are adjacent iff
their distance is at most the radius `r`.

Edges are found by scanning, for every vertex of every locally owned
cell, the up-to-`3^D` neighbor cells whose boxes can contain partners
within `r` (guaranteed by the construction invariant `cell_size >= r`).
Neighbor cells in non-owned chunks are re-derived on demand (*ghost
chunks*); under a periodic boundary, cell indices wrap around the grid
and distances wrap through the domain.

Each rank emits exactly the ordered pairs whose tail it owns, so the
union over all ranks carries both directions of every edge.
*/

use smallvec::SmallVec;

use super::ChunkGrid;
use crate::config::GeneratorConfig;
use crate::edge::Edge;
use crate::error::Error;
use crate::gens::{Coordinates, Graph, GraphGenerator, Requirements};

/// Random geometric graph generator over `D` dimensions.
pub struct Rgg<const D: usize> {
    grid: ChunkGrid<D>,
    radius_sq: f64,
    periodic: bool,
    self_loops: bool,
    want_coordinates: bool,
}

impl<const D: usize> Rgg<D> {
    /// Builds the generator for one rank, resolving the chunk grid against
    /// the radius.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        let chunks_per_dim = resolve_chunks_per_dim::<D>(config, size);
        let chunk_size = 1.0 / chunks_per_dim as f64;

        // The neighbor sweep only visits adjacent cells; a radius beyond
        // the chunk size cannot be honored once there is more than one
        // chunk per dimension.
        if config.r > chunk_size && chunks_per_dim > 1 {
            return Err(Error::config(format!(
                "edge radius {} exceeds the chunk size {chunk_size}; reduce the chunk count",
                config.r
            )));
        }
        if config.periodic && config.r > 0.5 {
            return Err(Error::config(format!(
                "edge radius {} exceeds half the periodic domain",
                config.r
            )));
        }

        let total_chunks = chunks_per_dim
            .checked_pow(D as u32)
            .ok_or_else(|| Error::config(format!("{chunks_per_dim}^{D} chunks are not representable")))?;
        let cells_per_dim = resolve_cells_per_dim::<D>(config, chunk_size, total_chunks);

        Ok(Self {
            grid: ChunkGrid::new(
                config.sampler(),
                config.n,
                chunks_per_dim,
                cells_per_dim,
                rank,
                size,
            )?,
            radius_sq: config.r * config.r,
            periodic: config.periodic,
            self_loops: config.self_loops,
            want_coordinates: config.coordinates,
        })
    }

    /// Squared distance between two points, wrapping through the domain
    /// under a periodic boundary.
    fn dist_sq(&self, a: &[f64; D], b: &[f64; D]) -> f64 {
        let mut sum = 0.0;
        for d in 0..D {
            let mut delta = (a[d] - b[d]).abs();
            if self.periodic {
                delta = delta.min(1.0 - delta);
            }
            sum += delta * delta;
        }
        sum
    }

    /// Global cell ids of the stencil around the cell at global cell
    /// coordinates `center`, deduplicated (wrapping can fold neighbors
    /// onto each other on tiny grids), materializing ghost chunks.
    fn neighbor_cells(&mut self, center: [u64; D]) -> Result<SmallVec<[u64; 27]>, Error> {
        let gdim = (self.grid.chunks_per_dim() * self.grid.cells_per_dim()) as i64;

        let mut neighbors: SmallVec<[u64; 27]> = SmallVec::new();
        'stencil: for s in 0..3u32.pow(D as u32) {
            let mut index = s;
            let mut coords = [0u64; D];
            for d in 0..D {
                let delta = (index % 3) as i64 - 1;
                index /= 3;

                let c = center[d] as i64 + delta;
                coords[d] = if self.periodic {
                    ((c + gdim) % gdim) as u64
                } else if (0..gdim).contains(&c) {
                    c as u64
                } else {
                    continue 'stencil;
                };
            }
            neighbors.push(self.grid.ensure_cell_at(coords)?);
        }

        neighbors.sort_unstable();
        neighbors.dedup();
        Ok(neighbors)
    }

    fn global_cell_coords(&self, chunk_id: u64, cell_id: u64) -> [u64; D] {
        let chunk_coords = crate::utils::morton::decode::<D>(chunk_id);
        let cell_coords = self.grid.cell_coords(cell_id);
        std::array::from_fn(|d| chunk_coords[d] * self.grid.cells_per_dim() + cell_coords[d])
    }

    fn collect_coordinates(&mut self) -> Result<Vec<[f64; D]>, Error> {
        let mut coordinates = Vec::new();
        for chunk_id in self.grid.local_chunk_ids() {
            for cell_id in 0..self.grid.cells_per_chunk() {
                self.grid.generate_vertices(chunk_id, cell_id)?;
                let global_cell_id = self.grid.global_cell_id(chunk_id, cell_id);
                coordinates.extend(self.grid.points(global_cell_id).iter().map(|p| p.pos));
            }
        }
        Ok(coordinates)
    }
}

impl<const D: usize> GraphGenerator for Rgg<D> {
    fn requirements(&self) -> Requirements {
        match D {
            2 => Requirements::SQUARE_CHUNK_GRID,
            _ => Requirements::CUBIC_CHUNK_GRID,
        }
    }

    fn chunk_count(&self) -> Option<u64> {
        Some(self.grid.total_chunks())
    }

    fn generate(&mut self) -> Result<Graph, Error> {
        self.grid.compute_local_chunks()?;

        // Materialize all local cells up front; local chunk ids and cell
        // indices increase with the vertex ids, so the coordinate buffer
        // comes out in id order.
        let coordinates = if self.want_coordinates {
            self.collect_coordinates()?
        } else {
            Vec::new()
        };

        let mut edges = Vec::new();
        for chunk_id in self.grid.local_chunk_ids() {
            for cell_id in 0..self.grid.cells_per_chunk() {
                self.grid.generate_vertices(chunk_id, cell_id)?;
                let own_cell = self.grid.global_cell_id(chunk_id, cell_id);
                if self.grid.points(own_cell).is_empty() {
                    continue;
                }

                let center = self.global_cell_coords(chunk_id, cell_id);
                let neighbors = self.neighbor_cells(center)?;

                for &neighbor_cell in &neighbors {
                    let own = self.grid.points(own_cell);
                    let other = self.grid.points(neighbor_cell);

                    for v in own {
                        for w in other {
                            if v.id == w.id {
                                if self.self_loops {
                                    edges.push(Edge(v.id, v.id));
                                }
                                continue;
                            }
                            if self.dist_sq(&v.pos, &w.pos) <= self.radius_sq {
                                edges.push(Edge(v.id, w.id));
                            }
                        }
                    }
                }
            }
        }

        Ok(Graph {
            edges,
            vertex_range: self.grid.vertex_range(),
            coordinates: if self.want_coordinates {
                pack_coordinates(coordinates)
            } else {
                Coordinates::None
            },
            vertex_weights: Vec::new(),
            edge_weights: Vec::new(),
        })
    }
}

/// The chunk grid resolution: the configured power of two, or the smallest
/// power of two covering all ranks, shrunk until chunks stay at least as
/// wide as the radius.
fn resolve_chunks_per_dim<const D: usize>(config: &GeneratorConfig, size: usize) -> u64 {
    if config.k != 0 {
        return config.k;
    }

    let mut k = 1u64;
    while k.pow(D as u32) < size as u64 {
        k *= 2;
    }

    if config.r > 0.0 {
        let limit = (1.0 / config.r).floor() as u64;
        let max_k = if limit == 0 {
            1
        } else {
            1u64 << (63 - limit.leading_zeros())
        };
        k = k.min(max_k);
    }

    k
}

/// Cells per dimension: as fine as the radius allows (`cell_size >= r`),
/// but not finer than about one point per cell.
fn resolve_cells_per_dim<const D: usize>(
    config: &GeneratorConfig,
    chunk_size: f64,
    total_chunks: u64,
) -> u64 {
    let by_radius = if config.r > 0.0 {
        ((chunk_size / config.r).floor() as u64).max(1)
    } else {
        1
    };

    let points_per_chunk = (config.n / total_chunks).max(1);
    let by_occupancy = (points_per_chunk as f64)
        .powf(1.0 / D as f64)
        .ceil() as u64;

    by_radius.min(by_occupancy.max(1))
}

fn pack_coordinates<const D: usize>(coordinates: Vec<[f64; D]>) -> Coordinates {
    match D {
        2 => Coordinates::TwoD(
            coordinates
                .iter()
                .map(|p| {
                    let p = p.as_slice();
                    [p[0], p[1]]
                })
                .collect(),
        ),
        3 => Coordinates::ThreeD(
            coordinates
                .iter()
                .map(|p| {
                    let p = p.as_slice();
                    [p[0], p[1], p[2]]
                })
                .collect(),
        ),
        _ => unreachable!("only 2D and 3D geometric graphs are supported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Model;
    use crate::edge::VertexRange;

    fn rgg2d_config(seed: u64, n: u64, r: f64, k: u64) -> GeneratorConfig {
        GeneratorConfig::new(Model::Rgg2d)
            .nodes(n)
            .radius(r)
            .chunks_per_dim(k)
            .seed(seed)
            .coordinates(true)
    }

    fn generate_union<const D: usize>(config: &GeneratorConfig, size: usize) -> Vec<Edge> {
        let mut union = Vec::new();
        for rank in 0..size {
            let mut graph = Rgg::<D>::new(config, rank, size).unwrap().generate().unwrap();
            for &edge in &graph.edges {
                assert!(graph.vertex_range.contains(edge.0));
            }
            union.append(&mut graph.edges);
        }
        union.sort_unstable();
        union
    }

    #[test]
    fn union_is_invariant_under_rank_count() {
        let config = rgg2d_config(1, 1000, 0.05, 4);

        let reference = generate_union::<2>(&config, 1);
        assert!(!reference.is_empty());

        for size in [2usize, 4, 7] {
            assert_eq!(generate_union::<2>(&config, size), reference);
        }
    }

    #[test]
    fn edges_match_naive_oracle() {
        for periodic in [false, true] {
            let mut config = rgg2d_config(3, 200, 0.1, 2);
            config.periodic = periodic;

            let mut generator = Rgg::<2>::new(&config, 0, 1).unwrap();
            let graph = generator.generate().unwrap();

            let Coordinates::TwoD(coords) = &graph.coordinates else {
                panic!("expected 2d coordinates");
            };
            assert_eq!(coords.len(), 200);

            let mut naive = Vec::new();
            for (u, a) in coords.iter().enumerate() {
                for (v, b) in coords.iter().enumerate() {
                    if u == v {
                        continue;
                    }
                    let mut dist_sq = 0.0;
                    for d in 0..2 {
                        let mut delta = (a[d] - b[d]).abs();
                        if periodic {
                            delta = delta.min(1.0 - delta);
                        }
                        dist_sq += delta * delta;
                    }
                    if dist_sq <= config.r * config.r {
                        naive.push(Edge(u as u64, v as u64));
                    }
                }
            }
            naive.sort_unstable();

            let mut edges = graph.edges;
            edges.sort_unstable();
            assert_eq!(edges, naive);
        }
    }

    #[test]
    fn both_directions_present() {
        let config = rgg2d_config(5, 300, 0.08, 2);
        let mut edges = generate_union::<2>(&config, 3);
        assert!(!edges.is_empty());

        edges.sort_unstable();
        for &edge in &edges {
            assert!(!edge.is_loop());
            assert!(edges.binary_search(&edge.reverse()).is_ok());
        }
    }

    #[test]
    fn coordinates_follow_vertex_ids() {
        let config = rgg2d_config(2, 500, 0.05, 4);
        let size = 4;

        let mut total = 0;
        for rank in 0..size {
            let graph = Rgg::<2>::new(&config, rank, size).unwrap().generate().unwrap();
            assert_eq!(graph.coordinates.len() as u64, graph.vertex_range.len());
            total += graph.coordinates.len() as u64;
        }
        assert_eq!(total, 500);
    }

    #[test]
    fn radius_covering_single_chunk_connects_everything() {
        // One chunk per dimension: the sweep degenerates to the single
        // cell, which still compares all pairs.
        let config = rgg2d_config(4, 30, 0.9, 1);
        let graph = Rgg::<2>::new(&config, 0, 1).unwrap().generate().unwrap();

        let mut pairs_within = 0u64;
        let Coordinates::TwoD(coords) = &graph.coordinates else {
            panic!("expected 2d coordinates");
        };
        for (u, a) in coords.iter().enumerate() {
            for (v, b) in coords.iter().enumerate() {
                if u != v {
                    let dist_sq: f64 = (0..2).map(|d| (a[d] - b[d]) * (a[d] - b[d])).sum();
                    if dist_sq <= 0.81 {
                        pairs_within += 1;
                    }
                }
            }
        }
        assert_eq!(graph.edges.len() as u64, pairs_within);
    }

    #[test]
    fn rejects_radius_beyond_chunk_size() {
        let config = rgg2d_config(1, 100, 0.3, 4);
        assert!(Rgg::<2>::new(&config, 0, 1).is_err());
    }

    #[test]
    fn rgg3d_ranks_all_emit() {
        let config = GeneratorConfig::new(Model::Rgg3d)
            .nodes(500)
            .radius(0.1)
            .chunks_per_dim(2)
            .seed(42);

        let mut union = Vec::new();
        for rank in 0..8 {
            let graph = Rgg::<3>::new(&config, rank, 8).unwrap().generate().unwrap();
            assert!(graph.number_of_local_edges() >= 1);
            union.extend(graph.edges);
        }

        union.sort_unstable();
        let before = union.len();
        union.dedup();
        assert_eq!(union.len(), before);

        let reference = generate_union::<3>(&config, 1);
        assert_eq!(union, reference);
    }

    #[test]
    fn empty_graph_has_empty_ranges() {
        let config = rgg2d_config(1, 0, 0.1, 2);
        for rank in 0..3 {
            let graph = Rgg::<2>::new(&config, rank, 3).unwrap().generate().unwrap();
            assert!(graph.edges.is_empty());
            assert_eq!(graph.vertex_range, VertexRange::new(0, 0));
        }
    }
}
