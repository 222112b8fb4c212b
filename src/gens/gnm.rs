/*!
# Erdős–Rényi `G(n,m)`

Exactly `m` edges are drawn uniformly without replacement from the edge
slot space, communication-free and with no rank holding the full slot
space.

The vertex set is cut into `k` *blocks* of consecutive ids (defaulting to
one block per rank). The slot space decomposes into per-block row ranges
(directed) or block-pair rectangles (undirected); the recursive
hypergeometric splitter distributes the exact edge count over these bins
as a pure function of the seed, so any rank can derive the count of any
bin locally. Within a bin, the slots are drawn by the partial-shuffle
technique of

> *V. Batagelj and U. Brandes. Efficient Generation of Large Random
> Networks. Physical Review E 71.3 (2005): 036113.*

or, with `hash_sample`, by hash-set rejection. A cross-rank rectangle is
re-derived by both owning ranks from the same key; each side emits the
direction whose tail it owns, the undirected counterpart of the
ghost-chunk protocol.
*/

use fxhash::{FxHashMap, FxHashSet};
use rand::Rng;
use rand_pcg::Pcg64Mcg;

use crate::config::{GeneratorConfig, Model};
use crate::edge::{Edge, VertexRange};
use crate::error::Error;
use crate::gens::{Graph, GraphGenerator};
use crate::utils::Sampler;

/// Erdős–Rényi generator with an exact global edge count.
pub struct Gnm {
    n: u64,
    m: u64,
    blocks: u64,
    undirected: bool,
    self_loops: bool,
    hash_sample: bool,
    sampler: Sampler,
    rank: usize,
    size: usize,
}

impl Gnm {
    /// Builds the generator for one rank and checks that `m` fits the slot
    /// space.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        let undirected = config.model == Model::GnmUndirected;
        let blocks = if config.k != 0 { config.k } else { size as u64 };

        let generator = Self {
            n: config.n,
            m: config.m,
            blocks,
            undirected,
            self_loops: config.self_loops,
            hash_sample: config.hash_sample,
            sampler: config.sampler(),
            rank,
            size,
        };

        let total_slots = generator.total_slots();
        if generator.m > total_slots {
            return Err(Error::config(format!(
                "cannot place {} edges in a slot space of {total_slots}",
                generator.m
            )));
        }
        Ok(generator)
    }

    /// Vertex ids of block `b`.
    fn block_rows(&self, b: u64) -> VertexRange {
        VertexRange::balanced(self.n, b as usize, self.blocks as usize)
    }

    /// The blocks owned by this rank (contiguous).
    fn owned_blocks(&self) -> VertexRange {
        VertexRange::balanced(self.blocks, self.rank, self.size)
    }

    /// Slots per row in the directed slot space.
    fn row_slots(&self) -> u64 {
        if self.self_loops {
            self.n
        } else {
            self.n - 1
        }
    }

    /// Number of slots in the diagonal rectangle of a block with `rows`
    /// vertices (unordered pairs, plus loops if enabled).
    fn diagonal_slots(&self, rows: u64) -> u64 {
        rows * rows.saturating_sub(1) / 2 + if self.self_loops { rows } else { 0 }
    }

    /// Flattened rectangle index of the block pair `(i, j)`, `i <= j`.
    fn rect_index(&self, i: u64, j: u64) -> u64 {
        i * self.blocks - i * (i + 1) / 2 + j
    }

    /// Inverse of [`Gnm::rect_index`] for iteration bounds.
    fn num_rects(&self) -> u64 {
        self.blocks * (self.blocks + 1) / 2
    }

    fn total_slots(&self) -> u64 {
        if self.undirected {
            self.n * (self.n - 1) / 2 + if self.self_loops { self.n } else { 0 }
        } else {
            self.n * self.row_slots()
        }
    }

    /// Per-bin slot counts, flattened (directed: one bin per block;
    /// undirected: one bin per rectangle).
    fn bin_slots(&self) -> Vec<u64> {
        if self.undirected {
            let mut slots = Vec::with_capacity(self.num_rects() as usize);
            for i in 0..self.blocks {
                let rows_i = self.block_rows(i).len();
                slots.push(self.diagonal_slots(rows_i));
                for j in i + 1..self.blocks {
                    slots.push(rows_i * self.block_rows(j).len());
                }
            }
            slots
        } else {
            (0..self.blocks)
                .map(|b| self.block_rows(b).len() * self.row_slots())
                .collect()
        }
    }

    /// Descends the binary split tree over the bins and returns the edge
    /// count of `target`. Pure function of the seed; every rank observes
    /// identical counts for every bin.
    fn bin_count(&self, prefix: &[u64], target: usize) -> u64 {
        let bins = prefix.len() - 1;
        let mut lo = 0usize;
        let mut hi = bins;
        let mut m = self.m;

        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            let total = prefix[hi] - prefix[lo];
            let left = prefix[mid] - prefix[lo];
            let key = (lo as u64) * (bins as u64 + 1) + hi as u64;
            let left_m = self.sampler.hypergeometric(key, total, left, m);

            if target < mid {
                m = left_m;
                hi = mid;
            } else {
                m -= left_m;
                lo = mid;
            }
        }

        m
    }

    /// Key for the within-bin sampling streams, disjoint from the split
    /// tree keys.
    fn bin_key(&self, bin: u64) -> u64 {
        let bins = if self.undirected {
            self.num_rects()
        } else {
            self.blocks
        };
        (bins + 1) * (bins + 1) + bin
    }

    /// Draws `count` distinct slots from `0..slots`, deterministic in the
    /// key.
    fn sample_slots(&self, key: u64, slots: u64, count: u64) -> Vec<u64> {
        let mut rng = self.sampler.rng(key);
        if self.hash_sample {
            sample_by_rejection(&mut rng, slots, count)
        } else {
            sample_by_partial_shuffle(&mut rng, slots, count)
        }
    }

    /// Maps a directed slot inside block `b` to its edge.
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

    /// Maps a slot of the diagonal rectangle of a block to its unordered
    /// pair (or loop).
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

    fn generate_directed(&self, prefix: &[u64], edges: &mut Vec<Edge>) {
        let owned = self.owned_blocks();
        for b in owned.iter() {
            let rows = self.block_rows(b);
            let slots = rows.len() * self.row_slots();
            let count = self.bin_count(prefix, b as usize);

            for slot in self.sample_slots(self.bin_key(b), slots, count) {
                edges.push(self.directed_edge(rows, slot));
            }
        }
    }

    fn generate_undirected(&self, prefix: &[u64], edges: &mut Vec<Edge>) {
        let owned = self.owned_blocks();

        for i in 0..self.blocks {
            for j in i..self.blocks {
                let own_i = owned.contains(i);
                let own_j = owned.contains(j);
                if !own_i && !own_j {
                    continue;
                }

                let rect = self.rect_index(i, j);
                let rows_i = self.block_rows(i);
                let rows_j = self.block_rows(j);
                let slots = if i == j {
                    self.diagonal_slots(rows_i.len())
                } else {
                    rows_i.len() * rows_j.len()
                };
                let count = self.bin_count(prefix, rect as usize);

                // Both owners derive the identical slot stream from the
                // rectangle key and keep the directions they own.
                for slot in self.sample_slots(self.bin_key(rect), slots, count) {
                    let Edge(u, v) = if i == j {
                        self.diagonal_edge(rows_i, slot)
                    } else {
                        Edge(rows_i.first + slot / rows_j.len(), rows_j.first + slot % rows_j.len())
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
    }
}

impl GraphGenerator for Gnm {
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

        let slots = self.bin_slots();
        let mut prefix = Vec::with_capacity(slots.len() + 1);
        prefix.push(0u64);
        for &s in &slots {
            prefix.push(prefix.last().unwrap() + s);
        }

        let mut edges = Vec::new();
        if self.undirected {
            self.generate_undirected(&prefix, &mut edges);
        } else {
            self.generate_directed(&prefix, &mut edges);
        }

        Ok(Graph {
            edges,
            vertex_range,
            ..Graph::default()
        })
    }
}

/// The Batagelj–Brandes partial mapping: emulates a Fisher–Yates shuffle
/// on-the-fly through a sparse remap table, producing `count` distinct
/// values in `0..slots`.
fn sample_by_partial_shuffle(rng: &mut Pcg64Mcg, slots: u64, count: u64) -> Vec<u64> {
    debug_assert!(count <= slots);

    let mut map: FxHashMap<u64, u64> = FxHashMap::default();
    let mut out = Vec::with_capacity(count as usize);

    for cur in 0..count {
        let pick = rng.random_range(cur..slots);
        let value = map.get(&pick).copied().unwrap_or(pick);

        let replacement = map.get(&cur).copied().unwrap_or(cur);
        map.insert(pick, replacement);

        out.push(value);
    }

    out
}

/// Hash-set rejection ("try again") sampling of `count` distinct values in
/// `0..slots`.
fn sample_by_rejection(rng: &mut Pcg64Mcg, slots: u64, count: u64) -> Vec<u64> {
    debug_assert!(count <= slots);

    // Rejection degenerates once the sample saturates the space; fall back
    // to the shuffle in that regime.
    if count * 2 > slots {
        return sample_by_partial_shuffle(rng, slots, count);
    }

    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(count as usize);
    while (out.len() as u64) < count {
        let pick = rng.random_range(0..slots);
        if seen.insert(pick) {
            out.push(pick);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: Model, seed: u64, n: u64, m: u64) -> GeneratorConfig {
        GeneratorConfig::new(model).nodes(n).edges(m).seed(seed)
    }

    fn union(config: &GeneratorConfig, size: usize) -> Vec<Edge> {
        let mut all = Vec::new();
        let mut next_first = 0;
        for rank in 0..size {
            let graph = Gnm::new(config, rank, size).unwrap().generate().unwrap();
            assert_eq!(graph.vertex_range.first, next_first);
            next_first = graph.vertex_range.first_invalid;
            for &edge in &graph.edges {
                assert!(graph.vertex_range.contains(edge.0));
            }
            all.extend(graph.edges);
        }
        assert_eq!(next_first, config.n);
        all.sort_unstable();
        all
    }

    #[test]
    fn undirected_has_exact_count() {
        let config = config(Model::GnmUndirected, 7, 100, 300);
        for size in [1usize, 4] {
            let edges = union(&config, size);

            // Both directions of every edge, no loops, no duplicates.
            assert_eq!(edges.len(), 600);
            let mut deduped = edges.clone();
            deduped.dedup();
            assert_eq!(deduped.len(), 600);
            for &edge in &edges {
                assert!(!edge.is_loop());
                assert!(edges.binary_search(&edge.reverse()).is_ok());
            }
        }
    }

    #[test]
    fn directed_has_exact_count() {
        let config = config(Model::GnmDirected, 3, 50, 500);
        for size in [1usize, 3] {
            let edges = union(&config, size);
            assert_eq!(edges.len(), 500);
            let mut deduped = edges.clone();
            deduped.dedup();
            assert_eq!(deduped.len(), 500);
            assert!(edges.iter().all(|e| !e.is_loop()));
        }
    }

    #[test]
    fn union_is_invariant_under_rank_count_with_fixed_blocks() {
        let mut cfg = config(Model::GnmUndirected, 11, 80, 200);
        cfg.k = 8;

        let reference = union(&cfg, 1);
        for size in [2usize, 4, 8] {
            assert_eq!(union(&cfg, size), reference);
        }
    }

    #[test]
    fn hash_sampling_matches_the_contract() {
        let mut cfg = config(Model::GnmDirected, 5, 60, 400);
        cfg.hash_sample = true;

        let edges = union(&cfg, 2);
        assert_eq!(edges.len(), 400);
        let mut deduped = edges.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 400);
    }

    #[test]
    fn self_loops_are_respected() {
        let mut cfg = config(Model::GnmDirected, 9, 10, 100);
        cfg.self_loops = true;
        let edges = union(&cfg, 1);
        assert_eq!(edges.len(), 100);
        // Slot space with loops is 10 * 10 = 100: the complete graph.
        assert!(edges.iter().any(|e| e.is_loop()));
    }

    #[test]
    fn rejects_overfull_slot_space() {
        let cfg = config(Model::GnmUndirected, 1, 10, 100);
        assert!(Gnm::new(&cfg, 0, 1).is_err());
    }

    #[test]
    fn dense_case_fills_every_slot() {
        // m equals the full undirected slot space.
        let cfg = config(Model::GnmUndirected, 2, 12, 66);
        let edges = union(&cfg, 3);
        assert_eq!(edges.len(), 132);
        let mut deduped = edges.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 132);
    }
}
