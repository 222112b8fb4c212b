/*!
# Generator Configuration

A [`GeneratorConfig`] describes the graph model, its parameters and the
sampler tuning. It is created with builder-style setters, validated once at
setup time, and then passed by reference into the generator; the sampler
captures only the fields it needs, there is no process-wide state.

Output options are collected in [`OutputConfig`] and passed through to the
writers; they do not influence generation.
*/

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::utils::{Probability, Sampler};

/// The graph model a generator instance produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Random geometric graph in the unit square
    Rgg2d,
    /// Random geometric graph in the unit cube
    Rgg3d,
    /// Random hyperbolic graph (threshold case)
    Rhg,
    /// Erdős–Rényi graph with a fixed number of directed edges
    GnmDirected,
    /// Erdős–Rényi graph with a fixed number of undirected edges
    GnmUndirected,
    /// Erdős–Rényi graph with independent directed edge probability
    GnpDirected,
    /// Erdős–Rényi graph with independent undirected edge probability
    GnpUndirected,
    /// Two-dimensional lattice
    Grid2d,
    /// Three-dimensional lattice
    Grid3d,
    /// Pseudo-generator reloading a previously written binary edge list
    StaticGraph,
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "rgg2d" => Ok(Model::Rgg2d),
            "rgg3d" => Ok(Model::Rgg3d),
            "rhg" => Ok(Model::Rhg),
            "gnm-directed" | "gnm_directed" => Ok(Model::GnmDirected),
            "gnm-undirected" | "gnm_undirected" => Ok(Model::GnmUndirected),
            "gnp-directed" | "gnp_directed" => Ok(Model::GnpDirected),
            "gnp-undirected" | "gnp_undirected" => Ok(Model::GnpUndirected),
            "grid2d" => Ok(Model::Grid2d),
            "grid3d" => Ok(Model::Grid3d),
            "static" | "static-graph" => Ok(Model::StaticGraph),
            _ => Err(Error::config(format!("unknown model: {s}"))),
        }
    }
}

/// How much statistics reporting the driver performs after generation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatisticsLevel {
    /// No reporting
    None,
    /// Global vertex and edge counts
    #[default]
    Basic,
    /// Additionally degree statistics per rank
    Advanced,
}

impl FromStr for StatisticsLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "none" => Ok(StatisticsLevel::None),
            "basic" => Ok(StatisticsLevel::Basic),
            "advanced" => Ok(StatisticsLevel::Advanced),
            _ => Err(Error::config(format!("unknown statistics level: {s}"))),
        }
    }
}

/// Output file format, passed through to the writers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// No output
    None,
    /// Text edge list (`p n m` header, `e u v` lines, 1-indexed)
    #[default]
    EdgeList,
    /// Binary edge list, 64-bit ids
    BinaryEdgeList,
    /// Binary edge list, 32-bit ids
    BinaryEdgeList32,
    /// METIS adjacency format
    Metis,
    /// DOT language of GraphViz
    Dot,
    /// Per-vertex coordinate lines
    Coordinates,
}

/// Which ranks write file headers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum OutputHeader {
    /// Every rank writes a header before its slice
    Always,
    /// Only the root rank writes a header
    #[default]
    Root,
    /// No headers at all
    Never,
}

/// Pass-through output options; not part of the generation core.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
    /// Output filename (extension appended by the writer)
    pub filename: PathBuf,
    /// Which ranks write headers
    pub header: OutputHeader,
    /// Collect all slices in a single output file
    pub single_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            filename: PathBuf::from("out"),
            header: OutputHeader::default(),
            single_file: true,
        }
    }
}

/// Configuration for one generator instance.
///
/// All fields are public; the builder-style setters exist for the common
/// ones so configurations read fluently in call sites and tests.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Graph model
    pub model: Model,
    /// Number of vertices (interpreted per model)
    pub n: u64,
    /// Number of edges (interpreted per model)
    pub m: u64,
    /// Chunks per dimension for the geometric models; `0` chooses
    /// automatically. Must be a power of two.
    pub k: u64,
    /// Edge radius (RGG) or hyperbolic disk radius (RHG, `0` derives it
    /// from the average degree)
    pub r: f64,
    /// Edge probability (G(n,p))
    pub p: f64,
    /// Target average degree (RHG, alternative parametrizations of the
    /// Erdős–Rényi models)
    pub avg_degree: f64,
    /// Power-law exponent of the degree distribution (RHG)
    pub plexp: f64,
    /// Clique threshold; accepted for interface completeness, unused by
    /// the shipped models
    pub thres: f64,
    /// Minimum degree; accepted for interface completeness, unused by the
    /// shipped models
    pub min_degree: u64,
    /// Lattice extent along x (grid models)
    pub grid_x: u64,
    /// Lattice extent along y (grid models)
    pub grid_y: u64,
    /// Lattice extent along z (Grid3d)
    pub grid_z: u64,
    /// Allow self-loops
    pub self_loops: bool,
    /// Generate a directed graph (models with both variants)
    pub directed: bool,
    /// Periodic (wrap-around) boundary for RGG and the lattices
    pub periodic: bool,
    /// Attach per-vertex coordinates to the output
    pub coordinates: bool,
    /// Use hash-rejection sampling instead of the partial-shuffle map for
    /// without-replacement draws
    pub hash_sample: bool,
    /// Approximate hypergeometric splits by binomials
    pub use_binom: bool,
    /// Mantissa bits for uniform coordinate draws
    pub precision: u64,
    /// Totals up to this size use the exact Bernoulli-count binomial path
    pub base_size: u64,
    /// Populations up to this size keep hypergeometric draws exact
    pub hyp_base: u64,
    /// Statistics reporting level
    pub statistics_level: StatisticsLevel,
    /// Seed for all deterministic draws
    pub seed: u64,
    /// Input file for the static-graph pseudo-generator
    pub input_file: PathBuf,
    /// Output options, passed through to the writers
    pub output: OutputConfig,
}

impl GeneratorConfig {
    /// Creates a configuration for `model` with all parameters at their
    /// defaults.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            n: 0,
            m: 0,
            k: 0,
            r: 0.0,
            p: 0.0,
            avg_degree: 0.0,
            plexp: 2.6,
            thres: 0.0,
            min_degree: 0,
            grid_x: 0,
            grid_y: 0,
            grid_z: 0,
            self_loops: false,
            directed: false,
            periodic: false,
            coordinates: false,
            hash_sample: false,
            use_binom: false,
            precision: 32,
            base_size: 1 << 8,
            hyp_base: 1 << 8,
            statistics_level: StatisticsLevel::default(),
            seed: 1,
            input_file: PathBuf::new(),
            output: OutputConfig::default(),
        }
    }

    /// Sets the number of vertices (builder style).
    pub fn nodes(mut self, n: u64) -> Self {
        self.n = n;
        self
    }

    /// Sets the number of edges (builder style).
    pub fn edges(mut self, m: u64) -> Self {
        self.m = m;
        self
    }

    /// Sets the number of chunks per dimension (builder style).
    pub fn chunks_per_dim(mut self, k: u64) -> Self {
        self.k = k;
        self
    }

    /// Sets the edge radius (builder style).
    pub fn radius(mut self, r: f64) -> Self {
        self.r = r;
        self
    }

    /// Sets the edge probability (builder style).
    pub fn prob(mut self, p: f64) -> Self {
        self.p = p;
        self
    }

    /// Sets the target average degree (builder style).
    pub fn avg_deg(mut self, deg: f64) -> Self {
        self.avg_degree = deg;
        self
    }

    /// Sets the seed (builder style).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the lattice extents (builder style); `grid_z = 0` for Grid2d.
    pub fn grid_extents(mut self, x: u64, y: u64, z: u64) -> Self {
        self.grid_x = x;
        self.grid_y = y;
        self.grid_z = z;
        self
    }

    /// Enables periodic boundary (builder style).
    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    /// Requests per-vertex coordinates (builder style).
    pub fn coordinates(mut self, coordinates: bool) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Allows self-loops (builder style).
    pub fn self_loops(mut self, self_loops: bool) -> Self {
        self.self_loops = self_loops;
        self
    }

    /// The sampler induced by this configuration.
    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.seed)
            .use_binom(self.use_binom)
            .base_size(self.base_size)
            .hyp_base(self.hyp_base)
            .precision(self.precision)
    }

    /// Startup-time validation of general, model-independent consistency.
    ///
    /// Model-specific geometry checks (chunk sizing against the radius)
    /// happen in the respective generator constructors once the chunk grid
    /// is resolved.
    pub fn validate(&self) -> Result<(), Error> {
        if self.k != 0 && !self.k.is_power_of_two() {
            return Err(Error::config(format!(
                "chunks per dimension must be a power of two, got {}",
                self.k
            )));
        }

        match self.model {
            Model::Rgg2d | Model::Rgg3d => {
                if !(0.0..=1.0).contains(&self.r) {
                    return Err(Error::config(format!(
                        "edge radius must lie in [0, 1], got {}",
                        self.r
                    )));
                }
            }
            Model::Rhg => {
                if self.n == 0 {
                    return Err(Error::config("hyperbolic graphs need at least one vertex"));
                }
                if self.plexp <= 2.0 {
                    return Err(Error::config(format!(
                        "power-law exponent must exceed 2, got {}",
                        self.plexp
                    )));
                }
                if self.r == 0.0 && (self.avg_degree <= 0.0 || self.avg_degree + 1.0 >= self.n as f64)
                {
                    return Err(Error::config(format!(
                        "average degree {} is invalid for {} vertices",
                        self.avg_degree, self.n
                    )));
                }
            }
            Model::GnmDirected | Model::GnmUndirected | Model::GnpDirected | Model::GnpUndirected => {
                if self.n == 0 {
                    return Err(Error::config("Erdős–Rényi models need at least one vertex"));
                }
                if self.n > 1 << 31 {
                    return Err(Error::config(format!(
                        "Erdős–Rényi slot space for n = {} is not representable",
                        self.n
                    )));
                }
                match self.model {
                    Model::GnpDirected | Model::GnpUndirected => {
                        if !self.p.is_valid_probability() {
                            return Err(Error::config(format!(
                                "edge probability must lie in [0, 1], got {}",
                                self.p
                            )));
                        }
                    }
                    _ => {}
                }
            }
            Model::Grid2d => {
                if self.grid_x == 0 || self.grid_y == 0 {
                    return Err(Error::config("lattice extents must be positive"));
                }
            }
            Model::Grid3d => {
                if self.grid_x == 0 || self.grid_y == 0 || self.grid_z == 0 {
                    return Err(Error::config("lattice extents must be positive"));
                }
            }
            Model::StaticGraph => {
                if self.input_file.as_os_str().is_empty() {
                    return Err(Error::config("static graph needs an input file"));
                }
            }
        }

        Ok(())
    }
}
