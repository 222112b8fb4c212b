//! # EdgeList
//!
//! The text format consists of a `p n m` header followed by one
//! `e u v` line per edge, 1-indexed.
//!
//! The binary format consists of two 64-bit little-endian header fields
//! `(n, m)` followed by `m` id pairs, each 64- or 32-bit unsigned
//! little-endian, no padding. [`read_binary_edge_list`] infers the pair
//! width from the payload length.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::edge::Edge;
use crate::error::Error;
use crate::gens::Graph;

use super::{GraphWriter, WriterRequirements};

/// Writer for the text edge-list format.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeListWriter;

impl GraphWriter for EdgeListWriter {
    fn extension(&self) -> &'static str {
        "edgelist"
    }

    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::NO_VERTEX_WEIGHTS | WriterRequirements::NO_EDGE_WEIGHTS
    }

    fn append_header(&self, out: &mut dyn Write, n: u64, m: u64) -> std::io::Result<()> {
        writeln!(out, "p {n} {m}")
    }

    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()> {
        for &Edge(from, to) in &graph.edges {
            writeln!(out, "e {} {}", from + 1, to + 1)?;
        }
        Ok(())
    }
}

/// Writer for the binary edge-list format, 64- or 32-bit ids.
#[derive(Debug, Clone, Copy)]
pub struct BinaryEdgeListWriter {
    width: u32,
}

impl BinaryEdgeListWriter {
    /// Creates a writer emitting `width`-bit ids (64 or 32).
    pub fn new(width: u32) -> Self {
        debug_assert!(width == 64 || width == 32);
        Self { width }
    }
}

impl GraphWriter for BinaryEdgeListWriter {
    fn extension(&self) -> &'static str {
        "binaryedgelist"
    }

    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::NO_VERTEX_WEIGHTS | WriterRequirements::NO_EDGE_WEIGHTS
    }

    fn append_header(&self, out: &mut dyn Write, n: u64, m: u64) -> std::io::Result<()> {
        out.write_all(&n.to_le_bytes())?;
        out.write_all(&m.to_le_bytes())
    }

    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()> {
        for &Edge(from, to) in &graph.edges {
            if self.width == 64 {
                out.write_all(&from.to_le_bytes())?;
                out.write_all(&to.to_le_bytes())?;
            } else {
                out.write_all(&(from as u32).to_le_bytes())?;
                out.write_all(&(to as u32).to_le_bytes())?;
            }
        }
        Ok(())
    }
}

/// Writes a complete binary edge list in one go (single-rank convenience;
/// the distributed path goes through the output driver).
pub fn write_binary_edge_list<P: AsRef<Path>>(
    path: P,
    n: u64,
    edges: &[Edge],
    width: u32,
) -> Result<(), Error> {
    let mut file = File::create(path)?;
    let writer = BinaryEdgeListWriter::new(width);
    writer.append_header(&mut file, n, edges.len() as u64)?;

    let graph = Graph {
        edges: edges.to_vec(),
        ..Graph::default()
    };
    writer.append_body(&mut file, &graph)?;
    Ok(())
}

/// Reads a binary edge list, inferring the id width from the payload
/// length. Returns `(n, m, edges)`.
pub fn read_binary_edge_list<P: AsRef<Path>>(path: P) -> Result<(u64, u64, Vec<Edge>), Error> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < 16 {
        return Err(Error::config("binary edge list is missing its header"));
    }
    let n = u64::from_le_bytes(bytes[0..8].try_into().expect("sliced eight bytes"));
    let m = u64::from_le_bytes(bytes[8..16].try_into().expect("sliced eight bytes"));

    let payload = &bytes[16..];
    let width = if payload.len() as u64 == m * 16 {
        8usize
    } else if payload.len() as u64 == m * 8 {
        4usize
    } else {
        return Err(Error::config(format!(
            "binary edge list payload of {} bytes does not match {} edges",
            payload.len(),
            m
        )));
    };

    let read_id = |offset: usize| -> u64 {
        if width == 8 {
            u64::from_le_bytes(payload[offset..offset + 8].try_into().expect("sliced"))
        } else {
            u32::from_le_bytes(payload[offset..offset + 4].try_into().expect("sliced")) as u64
        }
    };

    let edges = (0..m as usize)
        .map(|e| {
            let offset = e * 2 * width;
            Edge(read_id(offset), read_id(offset + width))
        })
        .collect();

    Ok((n, m, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::VertexRange;

    #[test]
    fn binary_roundtrip_both_widths() {
        let dir = std::env::temp_dir().join("dgraphs-edgelist-test");
        std::fs::create_dir_all(&dir).unwrap();

        let edges = vec![Edge(0, 1), Edge(1, 0), Edge(2, 3), Edge(3, 2)];
        for width in [64u32, 32] {
            let path = dir.join(format!("roundtrip-{width}.binaryedgelist"));
            write_binary_edge_list(&path, 4, &edges, width).unwrap();

            let (n, m, reloaded) = read_binary_edge_list(&path).unwrap();
            assert_eq!(n, 4);
            assert_eq!(m, 4);
            assert_eq!(reloaded, edges);

            std::fs::remove_file(path).unwrap();
        }
    }

    #[test]
    fn text_format_is_one_indexed() {
        let graph = Graph {
            edges: vec![Edge(0, 1), Edge(1, 0)],
            vertex_range: VertexRange::new(0, 2),
            ..Graph::default()
        };

        let mut out = Vec::new();
        EdgeListWriter.append_header(&mut out, 2, 2).unwrap();
        EdgeListWriter.append_body(&mut out, &graph).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "p 2 2\ne 1 2\ne 2 1\n");
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = std::env::temp_dir().join("dgraphs-edgelist-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("truncated.binaryedgelist");

        std::fs::write(&path, [0u8; 20]).unwrap();
        assert!(read_binary_edge_list(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
