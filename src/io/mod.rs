/*!
# IO

Writers for the distributed graph slices and the driver that sequences
them across ranks.

## Output Formats

- **EdgeList**: text, `p n m` header and `e u v` lines (1-indexed).
- **BinaryEdgeList**: `(n, m)` as two little-endian `u64`, followed by the
  id pairs as `u64` or `u32`, no padding.
- **Metis**: one neighborhood line per vertex (1-indexed).
- **Dot**: the [DOT language](https://graphviz.org/doc/info/lang.html) of
  [GraphViz](https://graphviz.org/).
- **Coordinates**: one `x y [z]` line per locally owned vertex.

## Driver

Every writer enumerates its needs as a [`WriterRequirements`] bit-set;
[`write_graph`] sorts the edge buffer or strips weight arrays as required
(logging a warning), rejects impossible combinations (e.g. missing
coordinates), and then lets the ranks append their slices in rank order,
separated by communicator barriers. Headers carry the global vertex and
edge counts gathered over the communicator.
*/

pub mod coordinates;
pub mod dot;
pub mod edge_list;
pub mod metis;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::ops::BitOr;
use std::path::PathBuf;

use crate::comm::Communicator;
use crate::config::{OutputConfig, OutputFormat, OutputHeader};
use crate::error::Error;
use crate::gens::{Coordinates, Graph};

pub use coordinates::CoordinatesWriter;
pub use dot::DotWriter;
pub use edge_list::{BinaryEdgeListWriter, EdgeListWriter};
pub use metis::MetisWriter;

/// Bit-set of properties a writer demands from the graph slice it is
/// handed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct WriterRequirements(u32);

impl WriterRequirements {
    /// No demands
    pub const NONE: WriterRequirements = WriterRequirements(0);
    /// Edges must be sorted by tail, then head
    pub const SORTED_EDGES: WriterRequirements = WriterRequirements(1 << 1);
    /// Two-dimensional coordinates must be attached
    pub const COORDINATES_2D: WriterRequirements = WriterRequirements(1 << 3);
    /// Three-dimensional coordinates must be attached
    pub const COORDINATES_3D: WriterRequirements = WriterRequirements(1 << 4);
    /// The format cannot carry vertex weights
    pub const NO_VERTEX_WEIGHTS: WriterRequirements = WriterRequirements(1 << 5);
    /// The format cannot carry edge weights
    pub const NO_EDGE_WEIGHTS: WriterRequirements = WriterRequirements(1 << 6);

    /// Returns `true` if all requirements in `other` are present in `self`.
    pub fn contains(self, other: WriterRequirements) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for WriterRequirements {
    type Output = WriterRequirements;

    fn bitor(self, rhs: WriterRequirements) -> WriterRequirements {
        WriterRequirements(self.0 | rhs.0)
    }
}

/// One output format: a default file extension, declared requirements,
/// and the three append phases.
pub trait GraphWriter {
    /// Default file extension of the format.
    fn extension(&self) -> &'static str;

    /// What the driver must guarantee before calling
    /// [`GraphWriter::append_body`].
    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::NONE
    }

    /// Writes a header given the global vertex and edge counts.
    fn append_header(&self, _out: &mut dyn Write, _n: u64, _m: u64) -> std::io::Result<()> {
        Ok(())
    }

    /// Writes this rank's slice.
    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()>;

    /// Writes a trailer after the last rank's slice.
    fn append_footer(&self, _out: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }
}

fn create_writer(output: &OutputConfig, directed: bool) -> Option<Box<dyn GraphWriter>> {
    match output.format {
        OutputFormat::None => None,
        OutputFormat::EdgeList => Some(Box::new(EdgeListWriter)),
        OutputFormat::BinaryEdgeList => Some(Box::new(BinaryEdgeListWriter::new(64))),
        OutputFormat::BinaryEdgeList32 => Some(Box::new(BinaryEdgeListWriter::new(32))),
        OutputFormat::Metis => Some(Box::new(MetisWriter)),
        OutputFormat::Dot => Some(Box::new(DotWriter::new(directed))),
        OutputFormat::Coordinates => Some(Box::new(CoordinatesWriter)),
    }
}

/// Prepares the slice for `writer`: sorts and strips as demanded, rejects
/// what cannot be fixed up.
fn enforce_requirements(writer: &dyn GraphWriter, graph: &mut Graph) -> Result<(), Error> {
    let requirements = writer.requirements();

    if requirements.contains(WriterRequirements::SORTED_EDGES)
        && !graph.edges.is_sorted()
    {
        if !graph.edge_weights.is_empty() {
            let mut order: Vec<usize> = (0..graph.edges.len()).collect();
            order.sort_by_key(|&i| graph.edges[i]);
            graph.edges = order.iter().map(|&i| graph.edges[i]).collect();
            graph.edge_weights = order.iter().map(|&i| graph.edge_weights[i]).collect();
        } else {
            graph.edges.sort_unstable();
        }
        tracing::warn!("sorted the edge buffer to satisfy the output format");
    }

    if requirements.contains(WriterRequirements::NO_VERTEX_WEIGHTS)
        && !graph.vertex_weights.is_empty()
    {
        tracing::warn!("output format cannot carry vertex weights; dropping them");
        graph.vertex_weights.clear();
    }
    if requirements.contains(WriterRequirements::NO_EDGE_WEIGHTS) && !graph.edge_weights.is_empty()
    {
        tracing::warn!("output format cannot carry edge weights; dropping them");
        graph.edge_weights.clear();
    }

    let needs_2d = requirements.contains(WriterRequirements::COORDINATES_2D);
    let needs_3d = requirements.contains(WriterRequirements::COORDINATES_3D);
    if needs_2d || needs_3d {
        let satisfied = (needs_2d && matches!(graph.coordinates, Coordinates::TwoD(_)))
            || (needs_3d && matches!(graph.coordinates, Coordinates::ThreeD(_)));
        if !satisfied {
            return Err(Error::config(
                "output format needs coordinates that were not generated",
            ));
        }
    }

    Ok(())
}

/// Writes the distributed graph through the configured format.
///
/// Ranks append their slices in rank order; with `single_file` disabled
/// every rank writes its own `<filename>.<extension>.<rank>` file instead.
pub fn write_graph<C: Communicator>(
    graph: &mut Graph,
    output: &OutputConfig,
    directed: bool,
    comm: &C,
) -> Result<(), Error> {
    let Some(writer) = create_writer(output, directed) else {
        return Ok(());
    };
    enforce_requirements(writer.as_ref(), graph)?;

    let global_n = comm
        .all_gather_ranges(graph.vertex_range)
        .last()
        .map(|range| range.first_invalid)
        .unwrap_or(0);
    let global_m: u64 = comm.all_gather_u64(graph.edges.len() as u64).iter().sum();

    let mut path = PathBuf::from(&output.filename);
    path.set_extension(writer.extension());

    if !output.single_file {
        let mut path = path.into_os_string();
        path.push(format!(".{}", comm.rank()));
        let file = File::create(&path)?;
        let mut out = BufWriter::new(file);
        if output.header != OutputHeader::Never {
            writer.append_header(&mut out, global_n, global_m)?;
        }
        writer.append_body(&mut out, graph)?;
        writer.append_footer(&mut out)?;
        out.flush()?;
        return Ok(());
    }

    for turn in 0..comm.size() {
        if turn == comm.rank() {
            let file = if turn == 0 {
                File::create(&path)?
            } else {
                OpenOptions::new().append(true).open(&path)?
            };
            let mut out = BufWriter::new(file);

            let write_header = match output.header {
                OutputHeader::Always => true,
                OutputHeader::Root => turn == 0,
                OutputHeader::Never => false,
            };
            if write_header {
                writer.append_header(&mut out, global_n, global_m)?;
            }
            writer.append_body(&mut out, graph)?;
            if turn + 1 == comm.size() {
                writer.append_footer(&mut out)?;
            }
            out.flush()?;
        }
        comm.barrier();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::edge::{Edge, VertexRange};

    fn sample_graph() -> Graph {
        Graph {
            edges: vec![Edge(1, 0), Edge(0, 1), Edge(1, 2), Edge(2, 1)],
            vertex_range: VertexRange::new(0, 3),
            ..Graph::default()
        }
    }

    #[test]
    fn sorting_requirement_is_enforced() {
        let mut graph = sample_graph();
        enforce_requirements(&MetisWriter, &mut graph).unwrap();
        assert!(graph.edges.is_sorted());
    }

    #[test]
    fn weight_stripping_is_enforced() {
        let mut graph = sample_graph();
        graph.edge_weights = vec![1, 2, 3, 4];
        enforce_requirements(&EdgeListWriter, &mut graph).unwrap();
        assert!(graph.edge_weights.is_empty());
    }

    #[test]
    fn missing_coordinates_are_rejected() {
        let mut graph = sample_graph();
        assert!(enforce_requirements(&CoordinatesWriter, &mut graph).is_err());

        graph.coordinates = Coordinates::TwoD(vec![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]);
        assert!(enforce_requirements(&CoordinatesWriter, &mut graph).is_ok());
    }

    #[test]
    fn driver_writes_single_rank_output() {
        let dir = std::env::temp_dir().join("dgraphs-io-test");
        std::fs::create_dir_all(&dir).unwrap();

        let mut graph = sample_graph();
        let output = OutputConfig {
            format: OutputFormat::EdgeList,
            filename: dir.join("driver"),
            ..OutputConfig::default()
        };

        write_graph(&mut graph, &output, false, &NoComm).unwrap();

        let written = std::fs::read_to_string(dir.join("driver.edgelist")).unwrap();
        assert!(written.starts_with("p 3 4\n"));
        assert_eq!(written.lines().count(), 5);

        std::fs::remove_file(dir.join("driver.edgelist")).unwrap();
    }
}
