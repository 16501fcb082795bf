//! Multi-layer perceptron sub-networks.
//!
//! The state and output networks of a GNN are plain MLPs; this module builds
//! them from a dimension chain and maps (label dimensions, problem type,
//! state size) to the input widths the message-passing loop feeds them.

use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use zeolite_core::Problem;

/// Pointwise nonlinearity between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: &Tensor) -> Result<Tensor> {
        match self {
            Self::Relu => x.relu(),
            Self::Tanh => x.tanh(),
            Self::Sigmoid => candle_nn::ops::sigmoid(x),
        }
    }
}

/// A stack of linear layers with a hidden activation and an optional output
/// activation.
pub struct Mlp {
    layers: Vec<Linear>,
    dims: Vec<usize>,
    hidden_activation: Activation,
    output_activation: Option<Activation>,
}

impl Mlp {
    /// Build from a dimension chain `[in, hidden..., out]` (at least 2 entries).
    pub fn new(
        dims: &[usize],
        hidden_activation: Activation,
        output_activation: Option<Activation>,
        vb: VarBuilder,
    ) -> Result<Self> {
        assert!(dims.len() >= 2, "an MLP needs an input and an output width");
        let mut layers = Vec::with_capacity(dims.len() - 1);
        for (i, pair) in dims.windows(2).enumerate() {
            layers.push(linear(pair[0], pair[1], vb.pp(format!("lin_{i}")))?);
        }
        Ok(Self {
            layers,
            dims: dims.to_vec(),
            hidden_activation,
            output_activation,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.dims[0]
    }

    pub fn output_dim(&self) -> usize {
        self.dims[self.dims.len() - 1]
    }

    /// Forward pass over a (rows, input_dim) batch.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if i < last {
                h = self.hidden_activation.apply(&h)?;
            } else if let Some(act) = self.output_activation {
                h = act.apply(&h)?;
            }
        }
        Ok(h)
    }
}

/// Input width of the state network: per arc, the destination label, source
/// label, arc label and source state are concatenated.
pub fn state_input_dim(dim_node_label: usize, dim_arc_label: usize, dim_state: usize) -> usize {
    2 * dim_node_label + dim_arc_label + dim_state
}

/// Input width of the output network, by supervision granularity: node and
/// graph readouts see label-plus-state rows, arc readouts see both endpoints
/// and the arc label.
pub fn output_input_dim(
    dim_node_label: usize,
    dim_arc_label: usize,
    dim_state: usize,
    problem: Problem,
) -> usize {
    match problem {
        Problem::Node | Problem::Graph => dim_node_label + dim_state,
        Problem::Arc => 2 * (dim_node_label + dim_state) + dim_arc_label,
    }
}
