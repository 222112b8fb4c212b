/*!
# Distributed Validator

Optional post-generation checks over the distributed edge list. Never
mutates state, never aborts; each check reports its diagnostic on the
error channel and the validator returns a boolean verdict. Running it
twice on the same state returns the same verdict.

Checks, in order:
1. the per-rank vertex ranges form a contiguous partition of `0..n`,
2. every edge tail is locally owned and every head is a valid vertex,
3. weight arrays, if present, match the vertex respectively edge counts,
4. no self-loops and no duplicate edges,
5. every edge has its reverse: locally when the head is owned, otherwise
   shipped to the head's owner through the communicator and checked there.

The reverse-edge search uses a per-tail bucket offset array over the
locally sorted edges and a bounded binary search within the bucket.
*/

use crate::comm::Communicator;
use crate::edge::{Vertex, VertexRange};
use crate::gens::Graph;

/// Rank owning `vertex` under `ranges`, linear scan.
fn find_owner(vertex: Vertex, ranges: &[VertexRange]) -> Option<usize> {
    ranges.iter().position(|range| range.contains(vertex))
}

/// Checks that the vertex ranges partition `0..n` and that every edge
/// endpoint is in range.
pub fn validate_vertex_ranges<C: Communicator>(graph: &Graph, comm: &C) -> bool {
    let ranges = comm.all_gather_ranges(graph.vertex_range);

    if ranges.len() != comm.size() {
        tracing::error!(
            "number of vertex ranges ({}) differs from the number of ranks ({})",
            ranges.len(),
            comm.size()
        );
        return false;
    }

    for (rank, range) in ranges.iter().enumerate() {
        if range.first > range.first_invalid {
            tracing::error!("invalid vertex range on rank {rank}: {range}");
            return false;
        }
    }

    if ranges[0].first != 0 {
        tracing::error!(
            "expected consecutive vertex ranges, but rank 0 starts at {} instead of 0",
            ranges[0].first
        );
        return false;
    }
    for (rank, window) in ranges.windows(2).enumerate() {
        if window[1].first != window[0].first_invalid {
            tracing::error!(
                "expected consecutive vertex ranges, but end of rank {rank} ({}) differs from start of rank {} ({})",
                window[0].first_invalid,
                rank + 1,
                window[1].first
            );
            return false;
        }
    }

    let local = graph.vertex_range;
    let global_n = ranges.last().expect("at least one rank").first_invalid;

    for &edge in &graph.edges {
        if !local.contains(edge.0) {
            tracing::error!("tail of edge {edge} is out of range {local}");
            return false;
        }
        if edge.1 >= global_n {
            tracing::error!("head of edge {edge} is outside the global vertex range");
            return false;
        }
    }

    true
}

/// Checks that the distributed graph is simple and symmetric.
///
/// Every rank participates in the same collectives regardless of where a
/// check fails, so the ranks never fall out of step; the verdicts are
/// folded over the communicator and all ranks return the same boolean.
pub fn validate_simple_graph<C: Communicator>(graph: &Graph, comm: &C) -> bool {
    // Broken ranges would crash the bucket construction below. The range
    // verdict is derived from gathered state and identical on all ranks.
    if !agree(comm, validate_vertex_ranges(graph, comm)) {
        return false;
    }

    let ranges = comm.all_gather_ranges(graph.vertex_range);
    let local = graph.vertex_range;

    let mut ok = true;

    if !graph.vertex_weights.is_empty() && graph.vertex_weights.len() as u64 != local.len() {
        tracing::error!(
            "there are {} vertex weights for {} vertices",
            graph.vertex_weights.len(),
            local.len()
        );
        ok = false;
    }
    if !graph.edge_weights.is_empty() && graph.edge_weights.len() != graph.edges.len() {
        tracing::error!(
            "there are {} edge weights for {} edges",
            graph.edge_weights.len(),
            graph.edges.len()
        );
        ok = false;
    }

    // Sort (tail, head, weight) triples to enable the bucket search.
    let mut sorted_edges: Vec<(Vertex, Vertex, i64)> = graph
        .edges
        .iter()
        .enumerate()
        .map(|(e, edge)| {
            let weight = graph.edge_weights.get(e).copied().unwrap_or(1);
            (edge.0, edge.1, weight)
        })
        .collect();
    sorted_edges.sort_unstable();

    for &(from, to, _) in &sorted_edges {
        if from == to {
            tracing::error!("graph contains the self-loop ({from},{to})");
            ok = false;
            break;
        }
    }

    for window in sorted_edges.windows(2) {
        if window[0].0 == window[1].0 && window[0].1 == window[1].1 {
            tracing::error!(
                "graph contains a duplicated edge: ({},{})",
                window[1].0,
                window[1].1
            );
            ok = false;
            break;
        }
    }

    // Per-tail bucket offsets over the sorted edges.
    let mut bucket_offsets = vec![0usize; local.len() as usize + 1];
    for &(from, _, _) in &sorted_edges {
        bucket_offsets[(from - local.first) as usize + 1] += 1;
    }
    for i in 1..bucket_offsets.len() {
        bucket_offsets[i] += bucket_offsets[i - 1];
    }

    let reverse_exists = |head: Vertex, tail: Vertex, weight: i64| -> bool {
        let bucket = (head - local.first) as usize;
        sorted_edges[bucket_offsets[bucket]..bucket_offsets[bucket + 1]]
            .binary_search(&(head, tail, weight))
            .is_ok()
    };

    // Reverse edges with a local head are checked in place.
    if ok {
        for &(from, to, weight) in &sorted_edges {
            if local.contains(to) && !reverse_exists(to, from, weight) {
                tracing::error!(
                    "missing reverse edge ({to},{from}) with weight {weight} (internal); it might exist with a different weight"
                );
                ok = false;
                break;
            }
        }
    }

    if !agree(comm, ok) {
        return false;
    }

    // Reverse edges with a non-local head are shipped to the head's owner
    // as (from, to, weight) triples and checked there.
    let mut queries: Vec<Vec<u64>> = vec![Vec::new(); comm.size()];
    for &(from, to, weight) in &sorted_edges {
        if !local.contains(to) {
            let owner = find_owner(to, &ranges).expect("head is inside the global range");
            queries[owner].push(from);
            queries[owner].push(to);
            queries[owner].push(weight as u64);
        }
    }

    let mut verdict = true;
    for bucket in comm.all_to_all_v(queries) {
        for triple in bucket.chunks_exact(3) {
            let (from, to, weight) = (triple[0], triple[1], triple[2] as i64);
            if !reverse_exists(to, from, weight) {
                tracing::error!(
                    "missing reverse edge ({to},{from}) with weight {weight} (external); it might exist with a different weight"
                );
                verdict = false;
            }
        }
    }

    agree(comm, verdict)
}

/// Folds per-rank verdicts so that every rank returns the same boolean.
fn agree<C: Communicator>(comm: &C, verdict: bool) -> bool {
    comm.all_gather_u64(verdict as u64).iter().all(|&v| v == 1)
}
