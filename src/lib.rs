/*!
`dgraphs` is a **d**istributed, **d**eterministic graph generator: given a
graph model and a rank within a parallel job of `P` processes, each
process produces its local slice of an implicitly agreed global graph;
the union across ranks equals the intended graph, with no peer-to-peer
coordination during generation.

# How it works

All randomness flows through a hash-keyed deterministic sampler
([`utils::sampling`]): any count or point set a rank needs is a pure
function of the configuration seed and a structural key, so a rank can
*re-derive* whatever a neighboring rank would have generated instead of
asking for it. For the geometric models this takes the form of a
recursive multinomial decomposition of the point set over a Morton-coded
grid of chunks and cells ([`gens::geometric`]); for the Erdős–Rényi
models, of a recursive hypergeometric split of the edge count over
per-block slot spaces ([`gens::gnm`], [`gens::gnp`]).

# Usage

```
use dgraphs::prelude::*;

let config = GeneratorConfig::new(Model::Rgg2d)
    .nodes(1000)
    .radius(0.05)
    .chunks_per_dim(4)
    .seed(1);

// One process of a 4-rank job generates its slice:
let mut generator = create_generator(&config, 0, 4).unwrap();
let graph = generator.generate().unwrap();
assert!(graph.edges.iter().all(|e| graph.vertex_range.contains(e.0)));
```

# Modules

- [`config`]: model selection and parameters, builder style
- [`gens`]: the generator contract and all model strategies
- [`comm`]: the message-passing abstraction (validation and output only;
  generation itself never communicates)
- [`validator`]: optional distributed simple-graph checks
- [`io`]: writers for edge-list, binary, METIS, DOT and coordinate output
- [`stats`]: post-generation reporting

# When to use

You should only use this library if the following apply:
- You want a graph that is reproducible from a seed, across any number of
  ranks.
- Your models are among the supported families (geometric, hyperbolic,
  Erdős–Rényi, lattices).
- Generation must scale out without communication.
*/

pub mod comm;
pub mod config;
pub mod edge;
pub mod error;
pub mod gens;
pub mod io;
pub mod stats;
pub mod utils;
pub mod validator;

/// `dgraphs::prelude` includes the configuration, the generator contract
/// and the basic graph entities.
pub mod prelude {
    pub use super::comm::{Communicator, NoComm, ThreadComm};
    pub use super::config::{GeneratorConfig, Model, StatisticsLevel};
    pub use super::edge::{Edge, NumEdges, NumNodes, Vertex, VertexRange};
    pub use super::error::Error;
    pub use super::gens::{create_generator, Coordinates, Graph, GraphGenerator, Requirements};
}
