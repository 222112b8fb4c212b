//! # Metis
//!
//! One neighborhood line per vertex, 1-indexed, preceded by a `n m`
//! header where `m` counts undirected edges. Requires the edge buffer to
//! be sorted by tail so each vertex's neighbors form one consecutive run.

use std::io::Write;

use crate::edge::Edge;
use crate::gens::Graph;

use super::{GraphWriter, WriterRequirements};

/// Writer for the METIS adjacency format.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetisWriter;

impl GraphWriter for MetisWriter {
    fn extension(&self) -> &'static str {
        "metis"
    }

    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::SORTED_EDGES
            | WriterRequirements::NO_VERTEX_WEIGHTS
            | WriterRequirements::NO_EDGE_WEIGHTS
    }

    fn append_header(&self, out: &mut dyn Write, n: u64, m: u64) -> std::io::Result<()> {
        writeln!(out, "{n} {}", m / 2)
    }

    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()> {
        let mut next_edge = 0usize;
        for vertex in graph.vertex_range.iter() {
            let mut first = true;
            while next_edge < graph.edges.len() {
                let Edge(from, to) = graph.edges[next_edge];
                if from != vertex {
                    break;
                }
                if first {
                    write!(out, "{}", to + 1)?;
                    first = false;
                } else {
                    write!(out, " {}", to + 1)?;
                }
                next_edge += 1;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::VertexRange;

    #[test]
    fn neighborhood_lines_are_one_indexed() {
        let graph = Graph {
            edges: vec![Edge(0, 1), Edge(0, 2), Edge(1, 0), Edge(2, 0)],
            vertex_range: VertexRange::new(0, 3),
            ..Graph::default()
        };

        let mut out = Vec::new();
        MetisWriter.append_header(&mut out, 3, 4).unwrap();
        MetisWriter.append_body(&mut out, &graph).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3 2\n2 3\n1\n1\n");
    }
}
