/*!
# Generation Statistics

Post-generation reporting at three levels: `None` stays silent, `Basic`
gathers the global vertex and edge counts, `Advanced` adds per-rank
degree figures. Reporting never mutates the graph; the gathered numbers
are also returned for programmatic use.
*/

use crate::comm::Communicator;
use crate::config::StatisticsLevel;
use crate::gens::Graph;

/// Summary of one rank's view of the generated graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStatistics {
    /// Global number of vertices
    pub global_n: u64,
    /// Global number of directed edges
    pub global_m: u64,
    /// Locally owned vertices
    pub local_n: u64,
    /// Locally emitted edges
    pub local_m: u64,
    /// Smallest local out-degree (advanced only)
    pub min_degree: u64,
    /// Largest local out-degree (advanced only)
    pub max_degree: u64,
    /// Locally owned vertices without any edge (advanced only)
    pub isolated_vertices: u64,
}

/// Gathers and logs statistics for the generated slice.
pub fn report<C: Communicator>(
    graph: &Graph,
    level: StatisticsLevel,
    comm: &C,
) -> Option<GraphStatistics> {
    if level == StatisticsLevel::None {
        return None;
    }

    let global_n = comm
        .all_gather_ranges(graph.vertex_range)
        .last()
        .map(|range| range.first_invalid)
        .unwrap_or(0);
    let global_m: u64 = comm.all_gather_u64(graph.edges.len() as u64).iter().sum();

    let mut stats = GraphStatistics {
        global_n,
        global_m,
        local_n: graph.vertex_range.len(),
        local_m: graph.edges.len() as u64,
        ..GraphStatistics::default()
    };

    tracing::info!(
        n = stats.global_n,
        m = stats.global_m,
        local_n = stats.local_n,
        local_m = stats.local_m,
        "generated graph"
    );

    if level >= StatisticsLevel::Advanced {
        let mut degrees = vec![0u64; graph.vertex_range.len() as usize];
        for edge in &graph.edges {
            degrees[(edge.0 - graph.vertex_range.first) as usize] += 1;
        }

        stats.min_degree = degrees.iter().copied().min().unwrap_or(0);
        stats.max_degree = degrees.iter().copied().max().unwrap_or(0);
        stats.isolated_vertices = degrees.iter().filter(|&&d| d == 0).count() as u64;

        tracing::info!(
            rank = comm.rank(),
            min_degree = stats.min_degree,
            max_degree = stats.max_degree,
            isolated = stats.isolated_vertices,
            "local degree statistics"
        );
    }

    Some(stats)
}
