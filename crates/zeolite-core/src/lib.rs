//! Graph data containers for message-passing relational learning.
//!
//! This crate provides the host-memory and device-ready representations a
//! GNN training loop consumes:
//!
//! - [`GraphObject`] - one graph (or a merged multigraph): node/arc feature
//!   matrices, targets, dataset masks, sample weights and the derived sparse
//!   incidence/adjacency structures
//! - [`GraphTensor`] - immutable tensor snapshot of a graph, with the sparse
//!   matrices transposed and canonicalized for sparse-dense products
//! - [`CooMatrix`] - explicit (row, col, value) sparse triplet storage
//! - [`GraphBatcher`] - seeded mini-batch iteration over a graph dataset
//! - directory persistence in binary and text codecs (see [`persist`])
//!
//! # Supervision granularity
//!
//! A graph is supervised per node, per arc, or per whole graph
//! ([`Problem`]). Masks select the active dataset split and the units whose
//! target is known; for graph problems a node-to-graph pooling matrix
//! averages node states into one readout row per sub-graph.
//!
//! # Aggregation modes
//!
//! | Mode | Incidence weight | Effect at a node |
//! |------|------------------|------------------|
//! | `sum` | 1 | sum of incoming messages |
//! | `normalized` | 1/A | sum scaled by total arc count |
//! | `average` | 1/in-degree | mean of incoming messages |
//!
//! # Example
//!
//! ```rust
//! use ndarray::array;
//! use zeolite_core::{AggregationMode, GraphObject, Problem};
//!
//! let g = GraphObject::builder(
//!     array![[1.0], [2.0], [3.0]],
//!     array![[0.0, 1.0, 0.5], [1.0, 2.0, 0.5], [0.0, 2.0, 0.5]],
//!     array![[1.0], [0.0], [1.0]],
//!     Problem::Node,
//! )
//! .aggregation(AggregationMode::Sum)
//! .build()?;
//!
//! assert_eq!(g.arc_node().shape(), (3, 3));
//! assert_eq!(g.adjacency().to_dense()[(0, 1)], 1.0);
//! # Ok::<(), zeolite_core::Error>(())
//! ```

mod batch;
mod error;
mod graph;
mod incidence;
pub mod persist;
mod sparse;
mod tensor;

pub use batch::{BatchConfig, GraphBatcher};
pub use error::{Error, Result};
pub use graph::{GraphBuilder, GraphObject, GraphSource, Problem, SampleWeights};
pub use incidence::{build_adjacency, build_arc_node, uniform_node_graph, AggregationMode};
pub use persist::TextOptions;
pub use sparse::CooMatrix;
pub use tensor::{spmm, GraphTensor};

// Re-export candle for device selection in downstream crates.
pub use candle_core;
