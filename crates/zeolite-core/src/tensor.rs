//! Device-ready materialization of a graph.
//!
//! A [`GraphTensor`] snapshots a [`GraphObject`] into candle tensors for the
//! dense arrays and canonicalized COO matrices for the sparse ones. The
//! incidence and adjacency matrices are stored **transposed** relative to the
//! host graph, because the aggregation step computes
//! `spmm(transpose(ArcNode), messages)`: an (N, A) by (A, d) product landing
//! each arc's message on its destination node.

use std::fmt;

use candle_core::{Device, Tensor};
use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::graph::GraphObject;
use crate::incidence::AggregationMode;
use crate::sparse::CooMatrix;

/// Read-only tensor snapshot of one graph.
#[derive(Debug, Clone)]
pub struct GraphTensor {
    nodes: Tensor,
    arcs: Tensor,
    targets: Tensor,
    set_mask: Tensor,
    output_mask: Tensor,
    sample_weights: Tensor,
    adjacency: CooMatrix,
    arc_node: CooMatrix,
    node_graph: CooMatrix,
    aggregation: AggregationMode,
    set_all: bool,
}

impl GraphTensor {
    /// Materialize a host graph on `device`. The source graph is not touched.
    ///
    /// Sparse matrices come out transposed and in canonical (row-major
    /// sorted, duplicate-free) entry order, ready for [`spmm`].
    pub fn from_graph(g: &GraphObject, device: &Device) -> Result<Self> {
        Ok(Self {
            nodes: dense_to_tensor(g.nodes(), device)?,
            arcs: dense_to_tensor(g.arcs(), device)?,
            targets: dense_to_tensor(g.targets(), device)?,
            set_mask: mask_to_tensor(g.set_mask(), device)?,
            output_mask: mask_to_tensor(g.output_mask(), device)?,
            sample_weights: vector_to_tensor(g.sample_weights(), device)?,
            adjacency: g.adjacency().transposed().canonicalized(),
            arc_node: g.arc_node().transposed().canonicalized(),
            node_graph: g.node_graph().transposed().canonicalized(),
            aggregation: g.aggregation(),
            set_all: g.set_mask().iter().all(|&m| m),
        })
    }

    /// An independent snapshot: tensor storage is duplicated, not shared.
    pub fn copy(&self) -> Result<Self> {
        Ok(Self {
            nodes: self.nodes.copy()?,
            arcs: self.arcs.copy()?,
            targets: self.targets.copy()?,
            set_mask: self.set_mask.copy()?,
            output_mask: self.output_mask.copy()?,
            sample_weights: self.sample_weights.copy()?,
            adjacency: self.adjacency.clone(),
            arc_node: self.arc_node.clone(),
            node_graph: self.node_graph.clone(),
            aggregation: self.aggregation,
            set_all: self.set_all,
        })
    }

    /// Node features, (N, DIM_NODE_LABEL), F32.
    pub fn nodes(&self) -> &Tensor {
        &self.nodes
    }

    /// Arc rows `[from, to, label...]`, (A, DIM_ARC_LABEL + 2), F32.
    pub fn arcs(&self) -> &Tensor {
        &self.arcs
    }

    pub fn targets(&self) -> &Tensor {
        &self.targets
    }

    /// 0/1 membership of the active dataset split, U8.
    pub fn set_mask(&self) -> &Tensor {
        &self.set_mask
    }

    /// 0/1 marker of units with a known target, U8.
    pub fn output_mask(&self) -> &Tensor {
        &self.output_mask
    }

    pub fn sample_weights(&self) -> &Tensor {
        &self.sample_weights
    }

    /// (N, N) transposed adjacency: entry (to, from).
    pub fn adjacency(&self) -> &CooMatrix {
        &self.adjacency
    }

    /// (N, A) transposed incidence: row = destination node, col = arc ordinal.
    pub fn arc_node(&self) -> &CooMatrix {
        &self.arc_node
    }

    /// (G, N) transposed node-graph pooling matrix; degenerate for
    /// non-graph problems.
    pub fn node_graph(&self) -> &CooMatrix {
        &self.node_graph
    }

    pub fn aggregation(&self) -> AggregationMode {
        self.aggregation
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.dims2().map(|(n, _)| n).unwrap_or(0)
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.dims2().map(|(a, _)| a).unwrap_or(0)
    }

    pub fn dim_node_label(&self) -> usize {
        self.nodes.dims2().map(|(_, d)| d).unwrap_or(0)
    }

    pub fn dim_arc_label(&self) -> usize {
        self.arcs.dims2().map(|(_, d)| d.saturating_sub(2)).unwrap_or(0)
    }

    pub fn dim_target(&self) -> usize {
        self.targets.dims2().map(|(_, d)| d).unwrap_or(0)
    }
}

impl fmt::Display for GraphTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = if self.set_all { "all" } else { "mixed" };
        write!(
            f,
            "graph_tensor(n={}, a={}, ndim={}, adim={}, tdim={}, set={set}, mode={})",
            self.num_nodes(),
            self.num_arcs(),
            self.dim_node_label(),
            self.dim_arc_label(),
            self.dim_target(),
            self.aggregation
        )
    }
}

/// Sparse-dense product: `coo` (m, k) times `dense` (k, d) into a dense
/// (m, d) tensor on the right-hand side's device.
pub fn spmm(coo: &CooMatrix, dense: &Tensor) -> Result<Tensor> {
    let (m, k) = coo.shape();
    let (rhs_rows, width) = dense.dims2()?;
    if k != rhs_rows {
        return Err(Error::Validation(format!(
            "spmm shape mismatch: ({m}, {k}) x ({rhs_rows}, {width})"
        )));
    }
    let rhs = dense.to_vec2::<f32>()?;
    let mut out = vec![0.0f32; m * width];
    for (r, c, v) in coo.entries() {
        let row = &rhs[c];
        let dst = &mut out[r * width..(r + 1) * width];
        for (o, &x) in dst.iter_mut().zip(row) {
            *o += v * x;
        }
    }
    Ok(Tensor::from_vec(out, (m, width), dense.device())?)
}

fn dense_to_tensor(array: &Array2<f32>, device: &Device) -> Result<Tensor> {
    let data: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_vec(data, (array.nrows(), array.ncols()), device)?)
}

fn vector_to_tensor(array: &Array1<f32>, device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_vec(array.to_vec(), (array.len(),), device)?)
}

fn mask_to_tensor(mask: &[bool], device: &Device) -> Result<Tensor> {
    let data: Vec<u8> = mask.iter().map(|&m| u8::from(m)).collect();
    Ok(Tensor::from_vec(data, (mask.len(),), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Problem;
    use ndarray::array;

    fn fan_in() -> GraphObject {
        // Arcs into node 2 from nodes 0 and 1, plus 2 -> 0.
        GraphObject::builder(
            array![[1.0], [2.0], [3.0]],
            array![[0.0, 2.0, 1.0], [1.0, 2.0, 1.0], [2.0, 0.0, 1.0]],
            array![[0.0], [0.0], [1.0]],
            Problem::Node,
        )
        .build()
        .unwrap()
    }

    #[test]
    fn matrices_come_out_transposed() {
        let gt = GraphTensor::from_graph(&fan_in(), &Device::Cpu).unwrap();
        assert_eq!(gt.arc_node().shape(), (3, 3));
        // Transposed incidence: row = destination node.
        assert_eq!(gt.arc_node().rows(), &[0, 2, 2]);
        assert_eq!(gt.arc_node().cols(), &[2, 0, 1]);
        assert_eq!(gt.adjacency().shape(), (3, 3));
    }

    #[test]
    fn entry_order_is_canonical() {
        let gt = GraphTensor::from_graph(&fan_in(), &Device::Cpu).unwrap();
        for m in [gt.arc_node(), gt.adjacency()] {
            let coords: Vec<(usize, usize)> =
                m.rows().iter().zip(m.cols()).map(|(&r, &c)| (r, c)).collect();
            let mut sorted = coords.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(coords, sorted);
        }
    }

    #[test]
    fn spmm_matches_dense_product() {
        let g = fan_in();
        let gt = GraphTensor::from_graph(&g, &Device::Cpu).unwrap();
        // Per-arc messages: one distinct value per arc.
        let messages =
            Tensor::from_vec(vec![1.0f32, 10.0, 100.0], (3, 1), &Device::Cpu).unwrap();
        let aggregated = spmm(gt.arc_node(), &messages).unwrap();
        let got = aggregated.to_vec2::<f32>().unwrap();
        // Node 0 receives arc 2, node 2 receives arcs 0 and 1.
        assert_eq!(got, vec![vec![100.0], vec![0.0], vec![11.0]]);
    }

    #[test]
    fn spmm_rejects_shape_mismatch() {
        let g = fan_in();
        let gt = GraphTensor::from_graph(&g, &Device::Cpu).unwrap();
        let bad = Tensor::zeros((5, 1), candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(spmm(gt.arc_node(), &bad).is_err());
    }

    #[test]
    fn masks_materialize_as_unit_bytes() {
        let g = GraphObject::builder(
            array![[1.0], [2.0]],
            array![[0.0, 1.0]],
            array![[0.0], [1.0]],
            Problem::Node,
        )
        .set_mask(vec![true, false])
        .output_mask(vec![false, true])
        .build()
        .unwrap();
        let gt = GraphTensor::from_graph(&g, &Device::Cpu).unwrap();
        assert_eq!(gt.set_mask().to_vec1::<u8>().unwrap(), vec![1, 0]);
        assert_eq!(gt.output_mask().to_vec1::<u8>().unwrap(), vec![0, 1]);
    }

    #[test]
    fn copy_preserves_values() {
        let gt = GraphTensor::from_graph(&fan_in(), &Device::Cpu).unwrap();
        let c = gt.copy().unwrap();
        assert_eq!(
            gt.nodes().to_vec2::<f32>().unwrap(),
            c.nodes().to_vec2::<f32>().unwrap()
        );
        assert_eq!(gt.arc_node(), c.arc_node());
    }

    #[test]
    fn display_reports_tensor_shape() {
        let gt = GraphTensor::from_graph(&fan_in(), &Device::Cpu).unwrap();
        assert_eq!(
            format!("{gt}"),
            "graph_tensor(n=3, a=3, ndim=1, adim=1, tdim=1, set=all, mode=sum)"
        );
    }
}
