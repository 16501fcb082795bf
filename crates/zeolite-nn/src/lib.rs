//! Message-passing networks over zeolite graph tensors.
//!
//! This crate supplies the two collaborators the data model in
//! [`zeolite_core`] is built for:
//!
//! - [`Mlp`] - the sub-network builder, with [`state_input_dim`] /
//!   [`output_input_dim`] mapping label dimensions and problem type to layer
//!   widths
//! - [`Gnn`] - the iterative aggregation loop: per-arc messages, sparse
//!   incidence aggregation, fixed-point state refinement, and a node-, arc-
//!   or graph-level readout
//!
//! # Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device};
//! use candle_nn::{VarBuilder, VarMap};
//! use zeolite_nn::{Activation, Gnn, GnnConfig, Mlp, output_input_dim, state_input_dim};
//! use zeolite_core::Problem;
//!
//! let config = GnnConfig::default().with_dim_state(8);
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//!
//! let state_net = Mlp::new(
//!     &[state_input_dim(dim_node, dim_arc, 8), 16, 8],
//!     Activation::Tanh,
//!     Some(Activation::Tanh),
//!     vb.pp("state"),
//! )?;
//! let output_net = Mlp::new(
//!     &[output_input_dim(dim_node, dim_arc, 8, Problem::Graph), 16, dim_target],
//!     Activation::Relu,
//!     Some(Activation::Sigmoid),
//!     vb.pp("output"),
//! )?;
//! let gnn = Gnn::new(state_net, output_net, config, Problem::Graph)?;
//! let prediction = gnn.forward(&graph_tensor)?;
//! ```

mod error;
mod gnn;
mod mlp;

pub use error::{Error, Result};
pub use gnn::{Gnn, GnnConfig};
pub use mlp::{output_input_dim, state_input_dim, Activation, Mlp};
