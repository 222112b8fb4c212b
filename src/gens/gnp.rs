/*!
# Erdős–Rényi `G(n,p)`

Every edge slot is an independent Bernoulli trial with probability `p`.
As in [`gnm`](crate::gens::gnm), the vertex set is cut into `k` blocks of
consecutive ids; each block row range (directed) or block-pair rectangle
(undirected) carries its own slot space and its own generator, keyed by
the bin index, so the stream of successes in a bin is a pure function of
the seed and can be re-derived by every rank that owns one of its sides.

Within a bin, the successful slots are found by skipping over each run of
failures with a single `Geometric(p)` draw instead of flipping a coin per
slot.
*/

use rand_distr::{Distribution, Geometric};
use rand_pcg::Pcg64Mcg;

use crate::config::{GeneratorConfig, Model};
use crate::edge::{Edge, VertexRange};
use crate::error::Error;
use crate::gens::{Graph, GraphGenerator};
use crate::utils::Sampler;

/// Erdős–Rényi generator with independent edge probability.
pub struct Gnp {
    n: u64,
    p: f64,
    blocks: u64,
    undirected: bool,
    self_loops: bool,
    sampler: Sampler,
    rank: usize,
    size: usize,
}

impl Gnp {
    /// Builds the generator for one rank.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        Ok(Self {
            n: config.n,
            p: config.p,
            blocks: if config.k != 0 { config.k } else { size as u64 },
            undirected: config.model == Model::GnpUndirected,
            self_loops: config.self_loops,
            sampler: config.sampler(),
            rank,
            size,
        })
    }

    fn block_rows(&self, b: u64) -> VertexRange {
        VertexRange::balanced(self.n, b as usize, self.blocks as usize)
    }

    fn owned_blocks(&self) -> VertexRange {
        VertexRange::balanced(self.blocks, self.rank, self.size)
    }

    fn row_slots(&self) -> u64 {
        if self.self_loops {
            self.n
        } else {
            self.n - 1
        }
    }

    fn rect_index(&self, i: u64, j: u64) -> u64 {
        i * self.blocks - i * (i + 1) / 2 + j
    }

    /// The successful slots of a bin, derived from the bin's key alone.
    fn bin_hits(&self, bin: u64, slots: u64) -> Vec<u64> {
        if slots == 0 || self.p == 0.0 {
            return Vec::new();
        }
        if self.p == 1.0 {
            return (0..slots).collect();
        }

        geometric_hits(&mut self.sampler.rng(bin), self.p, slots)
    }

    fn directed_edge(&self, rows: VertexRange, slot: u64) -> Edge {
        let row_slots = self.row_slots();
        let tail = rows.first + slot / row_slots;
        let head_index = slot % row_slots;
        let head = if self.self_loops || head_index < tail {
            head_index
        } else {
            head_index + 1
        };
        Edge(tail, head)
    }

    fn diagonal_slots(&self, rows: u64) -> u64 {
        rows * rows.saturating_sub(1) / 2 + if self.self_loops { rows } else { 0 }
    }

    fn diagonal_edge(&self, rows: VertexRange, slot: u64) -> Edge {
        let pairs = rows.len() * (rows.len() - 1) / 2;
        if slot < pairs {
            let Edge(u, v) = Edge::from_u64_undir(slot, rows.len());
            Edge(rows.first + u, rows.first + v)
        } else {
            let u = rows.first + (slot - pairs);
            Edge(u, u)
        }
    }
}

/// Positions of the successes among `slots` Bernoulli(`p`) trials.
///
/// Each `Geometric(p)` draw is the length of the failure run before the
/// next success, so the cursor advances straight from one successful slot
/// to the next.
///
/// # Panics
/// Asserts that `0 < p < 1`; the degenerate probabilities are handled by
/// the caller.
fn geometric_hits(rng: &mut Pcg64Mcg, p: f64, slots: u64) -> Vec<u64> {
    assert!(0.0 < p && p < 1.0);
    let failure_run = Geometric::new(p).unwrap();

    let mut hits = Vec::new();
    let mut cursor = 0u64;
    loop {
        let Some(hit) = cursor.checked_add(failure_run.sample(rng)) else {
            break;
        };
        if hit >= slots {
            break;
        }
        hits.push(hit);
        cursor = hit + 1;
    }
    hits
}

impl GraphGenerator for Gnp {
    fn almost_undirected(&self) -> bool {
        self.undirected
    }

    fn generate(&mut self) -> Result<Graph, Error> {
        let owned = self.owned_blocks();
        let vertex_range = if owned.is_empty() {
            let anchor = if owned.first < self.blocks {
                self.block_rows(owned.first).first
            } else {
                self.n
            };
            VertexRange::new(anchor, anchor)
        } else {
            VertexRange::new(
                self.block_rows(owned.first).first,
                self.block_rows(owned.first_invalid - 1).first_invalid,
            )
        };

        let mut edges = Vec::new();

        if self.undirected {
            for i in 0..self.blocks {
                for j in i..self.blocks {
                    let own_i = owned.contains(i);
                    let own_j = owned.contains(j);
                    if !own_i && !own_j {
                        continue;
                    }

                    let rows_i = self.block_rows(i);
                    let rows_j = self.block_rows(j);
                    let slots = if i == j {
                        self.diagonal_slots(rows_i.len())
                    } else {
                        rows_i.len() * rows_j.len()
                    };

                    for slot in self.bin_hits(self.rect_index(i, j), slots) {
                        let Edge(u, v) = if i == j {
                            self.diagonal_edge(rows_i, slot)
                        } else {
                            Edge(
                                rows_i.first + slot / rows_j.len(),
                                rows_j.first + slot % rows_j.len(),
                            )
                        };

                        if u == v {
                            if own_i {
                                edges.push(Edge(u, u));
                            }
                            continue;
                        }
                        if own_i {
                            edges.push(Edge(u, v));
                        }
                        if own_j || (i == j && own_i) {
                            edges.push(Edge(v, u));
                        }
                    }
                }
            }
        } else {
            for b in owned.iter() {
                let rows = self.block_rows(b);
                let slots = rows.len() * self.row_slots();
                for slot in self.bin_hits(b, slots) {
                    edges.push(self.directed_edge(rows, slot));
                }
            }
        }

        Ok(Graph {
            edges,
            vertex_range,
            ..Graph::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: Model, seed: u64, n: u64, p: f64) -> GeneratorConfig {
        GeneratorConfig::new(model).nodes(n).prob(p).seed(seed)
    }

    fn union(config: &GeneratorConfig, size: usize) -> Vec<Edge> {
        let mut all = Vec::new();
        for rank in 0..size {
            let graph = Gnp::new(config, rank, size).unwrap().generate().unwrap();
            for &edge in &graph.edges {
                assert!(graph.vertex_range.contains(edge.0));
            }
            all.extend(graph.edges);
        }
        all.sort_unstable();
        all
    }

    #[test]
    fn skip_sampling_is_pure_and_ordered() {
        let sampler = Sampler::new(9);

        let a = geometric_hits(&mut sampler.rng(1), 0.3, 1000);
        let b = geometric_hits(&mut sampler.rng(1), 0.3, 1000);
        assert_eq!(a, b);

        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&slot| slot < 1000));
    }

    #[test]
    fn skip_sampling_matches_the_trial_density() {
        let sampler = Sampler::new(17);
        let hits: usize = (0..100u64)
            .map(|key| geometric_hits(&mut sampler.rng(key), 0.25, 200).len())
            .sum();

        let expected = 100.0 * 200.0 * 0.25;
        assert!((0.85 * expected..1.15 * expected).contains(&(hits as f64)));
    }

    #[test]
    fn edge_count_is_plausible() {
        let n = 200u64;
        let p = 0.05;

        let mean = (0..10u64)
            .map(|seed| union(&config(Model::GnpDirected, seed, n, p), 1).len() as f64)
            .sum::<f64>()
            / 10.0;
        let expected = (n * (n - 1)) as f64 * p;

        assert!((0.8 * expected..1.2 * expected).contains(&mean));
    }

    #[test]
    fn extreme_probabilities() {
        let empty = union(&config(Model::GnpDirected, 1, 50, 0.0), 2);
        assert!(empty.is_empty());

        let full = union(&config(Model::GnpDirected, 1, 20, 1.0), 2);
        assert_eq!(full.len(), 20 * 19);
        let mut deduped = full.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), full.len());

        let full = union(&config(Model::GnpUndirected, 1, 20, 1.0), 3);
        assert_eq!(full.len(), 20 * 19);
    }

    #[test]
    fn union_is_invariant_under_rank_count_with_fixed_blocks() {
        for model in [Model::GnpDirected, Model::GnpUndirected] {
            let mut cfg = config(model, 13, 100, 0.1);
            cfg.k = 4;

            let reference = union(&cfg, 1);
            assert!(!reference.is_empty());
            for size in [2usize, 4] {
                assert_eq!(union(&cfg, size), reference);
            }
        }
    }

    #[test]
    fn undirected_union_is_symmetric() {
        let cfg = config(Model::GnpUndirected, 21, 80, 0.1);
        let edges = union(&cfg, 4);
        assert!(!edges.is_empty());
        for &edge in &edges {
            assert!(!edge.is_loop());
            assert!(edges.binary_search(&edge.reverse()).is_ok());
        }
    }

    #[test]
    fn no_duplicates() {
        let cfg = config(Model::GnpUndirected, 2, 120, 0.2);
        let edges = union(&cfg, 3);
        let mut deduped = edges.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), edges.len());
    }
}
