/*!
# Static Graph Pseudo-Generator

Reloads a previously written binary edge list and redistributes it over
the current ranks (balance-vertices): every rank reads the file, keeps the
edges whose tail it owns, and reports the matching contiguous vertex
range. Together with the binary writer this closes the round-trip loop:
write, reload, revalidate.
*/

use std::path::PathBuf;

use crate::config::GeneratorConfig;
use crate::edge::VertexRange;
use crate::error::Error;
use crate::gens::{Graph, GraphGenerator};
use crate::io::edge_list::read_binary_edge_list;

/// Pseudo-generator replaying a binary edge list.
pub struct StaticGraph {
    path: PathBuf,
    rank: usize,
    size: usize,
}

impl StaticGraph {
    /// Builds the pseudo-generator for one rank.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        Ok(Self {
            path: config.input_file.clone(),
            rank,
            size,
        })
    }
}

impl GraphGenerator for StaticGraph {
    fn generate(&mut self) -> Result<Graph, Error> {
        let (n, _m, edges) = read_binary_edge_list(&self.path)?;

        let range = VertexRange::balanced(n, self.rank, self.size);
        let edges = edges
            .into_iter()
            .filter(|edge| range.contains(edge.0))
            .collect();

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
    use crate::config::Model;
    use crate::edge::Edge;
    use crate::io::edge_list::write_binary_edge_list;

    #[test]
    fn reload_partitions_by_tail() {
        let dir = std::env::temp_dir().join("dgraphs-static-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.binaryedgelist");

        let edges = vec![Edge(0, 1), Edge(1, 0), Edge(1, 2), Edge(2, 1), Edge(3, 0), Edge(0, 3)];
        write_binary_edge_list(&path, 4, &edges, 64).unwrap();

        let mut config = GeneratorConfig::new(Model::StaticGraph);
        config.input_file = path.clone();

        let mut reloaded = Vec::new();
        for rank in 0..2 {
            let graph = StaticGraph::new(&config, rank, 2)
                .unwrap()
                .generate()
                .unwrap();
            for &edge in &graph.edges {
                assert!(graph.vertex_range.contains(edge.0));
            }
            reloaded.extend(graph.edges);
        }

        reloaded.sort_unstable();
        let mut expected = edges;
        expected.sort_unstable();
        assert_eq!(reloaded, expected);

        std::fs::remove_file(path).unwrap();
    }
}
