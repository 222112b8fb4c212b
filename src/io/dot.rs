//! # Dot
//!
//! The DOT language of GraphViz. Undirected graphs list each edge once
//! (`u -- v`, from the normalized copy), directed graphs list every edge
//! (`u -> v`).

use std::io::Write;

use crate::edge::Edge;
use crate::gens::Graph;

use super::{GraphWriter, WriterRequirements};

/// Writer for the DOT format.
#[derive(Debug, Clone, Copy)]
pub struct DotWriter {
    directed: bool,
}

impl DotWriter {
    /// Creates a writer for a directed or undirected graph.
    pub fn new(directed: bool) -> Self {
        Self { directed }
    }
}

impl GraphWriter for DotWriter {
    fn extension(&self) -> &'static str {
        "dot"
    }

    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::NO_VERTEX_WEIGHTS | WriterRequirements::NO_EDGE_WEIGHTS
    }

    fn append_header(&self, out: &mut dyn Write, _n: u64, _m: u64) -> std::io::Result<()> {
        if self.directed {
            writeln!(out, "digraph G {{")
        } else {
            writeln!(out, "graph G {{")
        }
    }

    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()> {
        for &edge in &graph.edges {
            let Edge(from, to) = edge;
            if self.directed {
                writeln!(out, "  {from} -> {to};")?;
            } else if edge.is_normalized() {
                writeln!(out, "  {from} -- {to};")?;
            }
        }
        Ok(())
    }

    fn append_footer(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "}}")
    }
}
