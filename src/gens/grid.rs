/*!
# Lattice Graphs

Deterministic 2D/3D grid graphs: vertex `(x, y[, z])` is adjacent to its
axis neighbors, optionally wrapping around the boundary. Vertex ids are
row-major; ranks own balanced contiguous id ranges and emit the edges of
their own tails, so the union across ranks is symmetric without any
randomness or communication.
*/

use smallvec::SmallVec;

use crate::config::{GeneratorConfig, Model};
use crate::edge::{Edge, VertexRange};
use crate::error::Error;
use crate::gens::{Graph, GraphGenerator};

/// Lattice generator for 2 or 3 dimensions.
pub struct Grid {
    extents: [u64; 3],
    dims: usize,
    periodic: bool,
    rank: usize,
    size: usize,
}

impl Grid {
    /// Builds the generator for one rank.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        let dims = if config.model == Model::Grid3d { 3 } else { 2 };
        let extents = [
            config.grid_x,
            config.grid_y,
            if dims == 3 { config.grid_z } else { 1 },
        ];

        extents
            .iter()
            .try_fold(1u64, |acc, &e| acc.checked_mul(e))
            .ok_or_else(|| Error::config("lattice vertex count is not representable"))?;

        Ok(Self {
            extents,
            dims,
            periodic: config.periodic,
            rank,
            size,
        })
    }

    fn num_nodes(&self) -> u64 {
        self.extents.iter().product()
    }

    fn coords_of(&self, id: u64) -> [u64; 3] {
        let [_, gy, gz] = self.extents;
        [id / (gy * gz), (id / gz) % gy, id % gz]
    }

    fn id_of(&self, coords: [u64; 3]) -> u64 {
        let [_, gy, gz] = self.extents;
        (coords[0] * gy + coords[1]) * gz + coords[2]
    }

    /// Neighbor ids of a vertex; wrapped duplicates (extent 2) collapse to
    /// one edge, wrap-to-self (extent 1) yields none.
    fn neighbors(&self, coords: [u64; 3]) -> SmallVec<[u64; 6]> {
        let mut out: SmallVec<[u64; 6]> = SmallVec::new();
        for axis in 0..self.dims {
            let extent = self.extents[axis];
            for delta in [-1i64, 1] {
                let c = coords[axis] as i64 + delta;
                let wrapped = if self.periodic {
                    ((c + extent as i64) % extent as i64) as u64
                } else if (0..extent as i64).contains(&c) {
                    c as u64
                } else {
                    continue;
                };
                if wrapped == coords[axis] {
                    continue;
                }

                let mut neighbor = coords;
                neighbor[axis] = wrapped;
                out.push(self.id_of(neighbor));
            }
        }

        out.sort_unstable();
        out.dedup();
        out
    }
}

impl GraphGenerator for Grid {
    fn generate(&mut self) -> Result<Graph, Error> {
        let range = VertexRange::balanced(self.num_nodes(), self.rank, self.size);

        let mut edges = Vec::new();
        for u in range.iter() {
            let coords = self.coords_of(u);
            for v in self.neighbors(coords) {
                edges.push(Edge(u, v));
            }
        }

        Ok(Graph {
            edges,
            vertex_range: range,
            ..Graph::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_2d(x: u64, y: u64, periodic: bool) -> GeneratorConfig {
        GeneratorConfig::new(Model::Grid2d)
            .grid_extents(x, y, 0)
            .periodic(periodic)
    }

    fn union(config: &GeneratorConfig, size: usize) -> Vec<Edge> {
        let mut all = Vec::new();
        for rank in 0..size {
            let mut generator = Grid::new(config, rank, size).unwrap();
            let graph = generator.generate().unwrap();
            for &edge in &graph.edges {
                assert!(graph.vertex_range.contains(edge.0));
            }
            all.extend(graph.edges);
        }
        all.sort_unstable();
        all
    }

    #[test]
    fn periodic_grid_has_uniform_degree_four() {
        let config = config_2d(10, 10, true);
        for size in [1usize, 4] {
            let edges = union(&config, size);
            assert_eq!(edges.len(), 400);

            let mut degree = vec![0u64; 100];
            for &Edge(u, _) in &edges {
                degree[u as usize] += 1;
            }
            assert!(degree.iter().all(|&d| d == 4));
        }
    }

    #[test]
    fn open_grid_has_boundary_degrees() {
        let edges = union(&config_2d(3, 3, false), 2);

        let mut degree = vec![0u64; 9];
        for &Edge(u, _) in &edges {
            degree[u as usize] += 1;
        }
        // Corners 2, edges 3, center 4.
        assert_eq!(degree.iter().sum::<u64>(), 24);
        assert_eq!(degree[4], 4);
        assert_eq!(degree[0], 2);
    }

    #[test]
    fn union_is_symmetric_and_duplicate_free() {
        let config = GeneratorConfig::new(Model::Grid3d)
            .grid_extents(4, 3, 2)
            .periodic(true);
        let edges = union(&config, 3);

        let mut deduped = edges.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), edges.len());
        for &edge in &edges {
            assert!(!edge.is_loop());
            assert!(edges.binary_search(&edge.reverse()).is_ok());
        }
    }

    #[test]
    fn tiny_extents_do_not_double_edges() {
        // Extent 2 with wrap-around: +1 and -1 collapse to one neighbor.
        let edges = union(&config_2d(2, 2, true), 1);
        let mut deduped = edges.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), edges.len());

        let mut degree = vec![0u64; 4];
        for &Edge(u, _) in &edges {
            degree[u as usize] += 1;
        }
        assert!(degree.iter().all(|&d| d == 2));
    }
}
