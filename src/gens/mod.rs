/*!
# Graph Generators

Every model implements the same contract: constructed from a
[`GeneratorConfig`](crate::config::GeneratorConfig) plus this rank's
`(rank, size)`, it produces the rank's slice of an implicitly agreed
global graph, with no peer-to-peer coordination during generation. The
union of all slices is the intended graph.

Post-conditions of [`GraphGenerator::generate`]:

- every emitted edge has its tail inside the returned vertex range,
- undirected models emit both directions of an edge, each from the rank
  owning its tail,
- vertex ranges across ranks form a contiguous partition of `0..n`,
- if coordinates are requested, they are attached for each locally owned
  vertex in vertex-id order.

Model strategies are selected at construction via [`create_generator`];
declared [`Requirements`] are checked against the rank and chunk counts
before any work is done.

Supported models:
- [`geometric::rgg`]: random geometric graphs in 2D and 3D
- [`rhg`]: random hyperbolic graphs (threshold case)
- [`gnm`] / [`gnp`]: Erdős–Rényi, directed and undirected
- [`grid`]: 2D/3D lattices, optionally periodic
- [`static_graph`]: reload of a previously written binary edge list
*/

pub mod geometric;
pub mod gnm;
pub mod gnp;
pub mod grid;
pub mod rhg;
pub mod static_graph;

use std::ops::BitOr;

use crate::config::{GeneratorConfig, Model};
use crate::edge::{Edge, VertexRange};
use crate::error::Error;

/// Per-vertex coordinates of the locally owned vertices, in vertex-id
/// order. Only the geometric models attach them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Coordinates {
    /// No coordinates attached
    #[default]
    None,
    /// Unit-square positions (RGG-2D)
    TwoD(Vec<[f64; 2]>),
    /// Unit-cube positions (RGG-3D)
    ThreeD(Vec<[f64; 3]>),
}

impl Coordinates {
    /// Number of attached coordinate records.
    pub fn len(&self) -> usize {
        match self {
            Coordinates::None => 0,
            Coordinates::TwoD(c) => c.len(),
            Coordinates::ThreeD(c) => c.len(),
        }
    }

    /// Returns `true` if no coordinates are attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One rank's slice of a distributed graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Edges with locally owned tails
    pub edges: Vec<Edge>,
    /// The contiguous vertex range owned by this rank
    pub vertex_range: VertexRange,
    /// Optional coordinates of the locally owned vertices
    pub coordinates: Coordinates,
    /// Optional per-vertex weights (`|vertex_range|` entries if present)
    pub vertex_weights: Vec<i64>,
    /// Optional per-edge weights (`|edges|` entries if present)
    pub edge_weights: Vec<i64>,
}

impl Graph {
    /// Number of locally owned vertices.
    pub fn number_of_local_vertices(&self) -> u64 {
        self.vertex_range.len()
    }

    /// Number of locally emitted (directed) edges.
    pub fn number_of_local_edges(&self) -> u64 {
        self.edges.len() as u64
    }
}

/// Bit-set of structural requirements a generator declares against the
/// parallel environment.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Requirements(u32);

impl Requirements {
    /// No requirements
    pub const NONE: Requirements = Requirements(0);
    /// The rank count must be a power of two
    pub const POWER_OF_TWO_RANKS: Requirements = Requirements(1 << 0);
    /// The chunk grid must be square
    pub const SQUARE_CHUNK_GRID: Requirements = Requirements(1 << 1);
    /// The chunk grid must be cubic
    pub const CUBIC_CHUNK_GRID: Requirements = Requirements(1 << 2);
    /// Exactly one chunk per rank
    pub const ONE_CHUNK_PER_RANK: Requirements = Requirements(1 << 3);

    /// Returns `true` if all requirements in `other` are present in `self`.
    pub fn contains(self, other: Requirements) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Requirements {
    type Output = Requirements;

    fn bitor(self, rhs: Requirements) -> Requirements {
        Requirements(self.0 | rhs.0)
    }
}

/// The generator contract shared by all models.
pub trait GraphGenerator {
    /// Structural requirements of this model.
    fn requirements(&self) -> Requirements {
        Requirements::NONE
    }

    /// Total number of chunks the model decomposes its domain into;
    /// `None` for models without a chunk grid.
    fn chunk_count(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the reverse direction of a cross-rank edge lives
    /// only on the peer rank's slice (undirected models).
    fn almost_undirected(&self) -> bool {
        false
    }

    /// Generates this rank's slice.
    fn generate(&mut self) -> Result<Graph, Error>;
}

/// Checks declared requirements against the parallel environment: the
/// rank count and, for models with a chunk grid, the total chunk count.
///
/// A grid requirement declared by a model that exposes no chunk count
/// cannot be satisfied and is rejected.
pub fn check_requirements(
    requirements: Requirements,
    chunk_count: Option<u64>,
    size: usize,
) -> Result<(), Error> {
    if requirements.contains(Requirements::POWER_OF_TWO_RANKS) && !size.is_power_of_two() {
        return Err(Error::requirement(format!(
            "a power-of-two rank count is required, got {size}"
        )));
    }

    let chunks = chunk_count.unwrap_or(0);
    if requirements.contains(Requirements::SQUARE_CHUNK_GRID) && !is_perfect_power(chunks, 2) {
        return Err(Error::requirement(format!(
            "a square chunk grid is required, got {chunks} chunks"
        )));
    }
    if requirements.contains(Requirements::CUBIC_CHUNK_GRID) && !is_perfect_power(chunks, 3) {
        return Err(Error::requirement(format!(
            "a cubic chunk grid is required, got {chunks} chunks"
        )));
    }
    if requirements.contains(Requirements::ONE_CHUNK_PER_RANK) && chunks != size as u64 {
        return Err(Error::requirement(format!(
            "exactly one chunk per rank is required, got {chunks} chunks for {size} ranks"
        )));
    }

    Ok(())
}

/// Returns `true` if `value` is a perfect square (`exp = 2`) or cube
/// (`exp = 3`).
fn is_perfect_power(value: u64, exp: u32) -> bool {
    if value == 0 {
        return false;
    }
    let root = (value as f64).powf(1.0 / exp as f64).round() as u64;
    (root.saturating_sub(1)..=root.saturating_add(1))
        .any(|candidate| candidate.checked_pow(exp) == Some(value))
}

/// Creates the generator strategy for `config.model` and checks its
/// declared requirements against the parallel environment.
pub fn create_generator(
    config: &GeneratorConfig,
    rank: usize,
    size: usize,
) -> Result<Box<dyn GraphGenerator>, Error> {
    if size == 0 || rank >= size {
        return Err(Error::config(format!("invalid rank {rank} of {size}")));
    }
    config.validate()?;

    let generator: Box<dyn GraphGenerator> = match config.model {
        Model::Rgg2d => Box::new(geometric::rgg::Rgg::<2>::new(config, rank, size)?),
        Model::Rgg3d => Box::new(geometric::rgg::Rgg::<3>::new(config, rank, size)?),
        Model::Rhg => Box::new(rhg::Rhg::new(config, rank, size)?),
        Model::GnmDirected | Model::GnmUndirected => Box::new(gnm::Gnm::new(config, rank, size)?),
        Model::GnpDirected | Model::GnpUndirected => Box::new(gnp::Gnp::new(config, rank, size)?),
        Model::Grid2d | Model::Grid3d => Box::new(grid::Grid::new(config, rank, size)?),
        Model::StaticGraph => Box::new(static_graph::StaticGraph::new(config, rank, size)?),
    };

    check_requirements(generator.requirements(), generator.chunk_count(), size)?;

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_bitset() {
        let req = Requirements::SQUARE_CHUNK_GRID | Requirements::POWER_OF_TWO_RANKS;
        assert!(req.contains(Requirements::SQUARE_CHUNK_GRID));
        assert!(req.contains(Requirements::POWER_OF_TWO_RANKS));
        assert!(!req.contains(Requirements::CUBIC_CHUNK_GRID));
        assert!(req.contains(Requirements::NONE));
    }

    #[test]
    fn requirement_checks_cover_every_bit() {
        assert!(check_requirements(Requirements::NONE, None, 3).is_ok());

        assert!(check_requirements(Requirements::POWER_OF_TWO_RANKS, None, 4).is_ok());
        assert!(check_requirements(Requirements::POWER_OF_TWO_RANKS, None, 3).is_err());

        assert!(check_requirements(Requirements::SQUARE_CHUNK_GRID, Some(16), 1).is_ok());
        assert!(check_requirements(Requirements::SQUARE_CHUNK_GRID, Some(12), 1).is_err());

        assert!(check_requirements(Requirements::CUBIC_CHUNK_GRID, Some(27), 1).is_ok());
        assert!(check_requirements(Requirements::CUBIC_CHUNK_GRID, Some(16), 1).is_err());

        assert!(check_requirements(Requirements::ONE_CHUNK_PER_RANK, Some(4), 4).is_ok());
        assert!(check_requirements(Requirements::ONE_CHUNK_PER_RANK, Some(8), 4).is_err());

        // A grid requirement without a grid cannot be satisfied.
        assert!(check_requirements(Requirements::SQUARE_CHUNK_GRID, None, 1).is_err());
        assert!(check_requirements(Requirements::ONE_CHUNK_PER_RANK, None, 1).is_err());
    }

    #[test]
    fn perfect_powers() {
        assert!(is_perfect_power(1, 2));
        assert!(is_perfect_power(4, 2));
        assert!(is_perfect_power(1 << 40, 2));
        assert!(!is_perfect_power(2, 2));
        assert!(!is_perfect_power(0, 2));

        assert!(is_perfect_power(8, 3));
        assert!(is_perfect_power(1 << 30, 3));
        assert!(!is_perfect_power(4, 3));
    }

    #[test]
    fn factory_rejects_invalid_environment() {
        let config = GeneratorConfig::new(Model::Rgg2d).nodes(100).radius(0.1);
        assert!(create_generator(&config, 0, 0).is_err());
        assert!(create_generator(&config, 3, 2).is_err());
    }

    #[test]
    fn factory_checks_chunk_requirements() {
        // The geometric models expose their chunk grids; the factory sees
        // 16 = 4^2 chunks (square) and 8 = 2^3 chunks (cubic).
        let config = GeneratorConfig::new(Model::Rgg2d)
            .nodes(100)
            .radius(0.1)
            .chunks_per_dim(4);
        let generator = create_generator(&config, 0, 2).unwrap();
        assert_eq!(generator.chunk_count(), Some(16));

        let config = GeneratorConfig::new(Model::Rgg3d)
            .nodes(100)
            .radius(0.1)
            .chunks_per_dim(2);
        let generator = create_generator(&config, 0, 2).unwrap();
        assert_eq!(generator.chunk_count(), Some(8));
    }
}
