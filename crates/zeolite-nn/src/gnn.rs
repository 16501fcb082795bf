//! The iterative aggregation / state-update loop.
//!
//! Each node carries a state vector, refined to a fixed point: per arc the
//! state network turns (destination label, source label, arc label, source
//! state) into a message, and the transposed incidence matrix lands the
//! aggregated messages on each destination node. Iteration stops when the
//! root-mean-square state change drops below the threshold or the iteration
//! cap is reached; the output network then reads the converged states out at
//! the problem's granularity.

use candle_core::{DType, Tensor};
use zeolite_core::{spmm, GraphTensor, Problem};

use crate::error::{Error, Result};
use crate::mlp::Mlp;

/// Fixed-point loop parameters.
#[derive(Debug, Clone)]
pub struct GnnConfig {
    /// Width of the per-node state vector (default: 4).
    pub dim_state: usize,
    /// Iteration cap (default: 5).
    pub max_iter: usize,
    /// RMS state-change threshold that ends iteration early (default: 0.01).
    pub state_threshold: f64,
}

impl Default for GnnConfig {
    fn default() -> Self {
        Self { dim_state: 4, max_iter: 5, state_threshold: 0.01 }
    }
}

impl GnnConfig {
    pub fn with_dim_state(mut self, dim_state: usize) -> Self {
        self.dim_state = dim_state;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_state_threshold(mut self, threshold: f64) -> Self {
        self.state_threshold = threshold;
        self
    }
}

/// A message-passing network over [`GraphTensor`] batches.
pub struct Gnn {
    state_net: Mlp,
    output_net: Mlp,
    config: GnnConfig,
    problem: Problem,
}

impl Gnn {
    /// Wire the two sub-networks; the state network must emit `dim_state`
    /// columns.
    pub fn new(state_net: Mlp, output_net: Mlp, config: GnnConfig, problem: Problem) -> Result<Self> {
        if state_net.output_dim() != config.dim_state {
            return Err(Error::Config(format!(
                "state network emits {} columns, configured state width is {}",
                state_net.output_dim(),
                config.dim_state
            )));
        }
        Ok(Self { state_net, output_net, config, problem })
    }

    pub fn problem(&self) -> Problem {
        self.problem
    }

    /// Run the state loop to its fixed point.
    ///
    /// Returns the (N, dim_state) state matrix and the number of iterations
    /// performed.
    pub fn state_fixed_point(&self, g: &GraphTensor) -> Result<(Tensor, usize)> {
        let device = g.nodes().device();
        let num_nodes = g.num_nodes();
        let (from, to) = endpoint_indices(g)?;
        let src_labels = g.nodes().index_select(&from, 0)?;
        let dst_labels = g.nodes().index_select(&to, 0)?;
        let arc_labels = g.arcs().narrow(1, 2, g.dim_arc_label())?;

        let mut state = Tensor::zeros((num_nodes, self.config.dim_state), DType::F32, device)?;
        let mut iterations = 0;
        for _ in 0..self.config.max_iter {
            let src_state = state.index_select(&from, 0)?;
            let message_in = Tensor::cat(&[&dst_labels, &src_labels, &arc_labels, &src_state], 1)?;
            let messages = self.state_net.forward(&message_in)?;
            let next = spmm(g.arc_node(), &messages)?;

            let delta = (&next - &state)?.sqr()?.mean_all()?.to_scalar::<f32>()?;
            state = next;
            iterations += 1;
            if f64::from(delta).sqrt() < self.config.state_threshold {
                break;
            }
        }
        Ok((state, iterations))
    }

    /// Full forward pass: converge the states, then read them out per node,
    /// per arc, or per sub-graph.
    pub fn forward(&self, g: &GraphTensor) -> Result<Tensor> {
        let (state, _) = self.state_fixed_point(g)?;
        let node_repr = Tensor::cat(&[g.nodes(), &state], 1)?;

        let readout_in = match self.problem {
            Problem::Node => node_repr,
            Problem::Arc => {
                let (from, to) = endpoint_indices(g)?;
                let arc_labels = g.arcs().narrow(1, 2, g.dim_arc_label())?;
                Tensor::cat(
                    &[
                        &node_repr.index_select(&from, 0)?,
                        &node_repr.index_select(&to, 0)?,
                        &arc_labels,
                    ],
                    1,
                )?
            }
            Problem::Graph => {
                if g.node_graph().is_degenerate() {
                    return Err(Error::Config(
                        "graph-level readout needs a node-graph pooling matrix".to_string(),
                    ));
                }
                spmm(g.node_graph(), &node_repr)?
            }
        };
        Ok(self.output_net.forward(&readout_in)?)
    }
}

fn endpoint_indices(g: &GraphTensor) -> Result<(Tensor, Tensor)> {
    let device = g.arcs().device();
    let arcs = g.arcs().to_vec2::<f32>()?;
    let from: Vec<u32> = arcs.iter().map(|row| row[0] as u32).collect();
    let to: Vec<u32> = arcs.iter().map(|row| row[1] as u32).collect();
    let len = from.len();
    Ok((
        Tensor::from_vec(from, (len,), device)?,
        Tensor::from_vec(to, (len,), device)?,
    ))
}
