//! Incidence-matrix construction under a selectable aggregation policy.
//!
//! An arc list induces two sparse matrices: the arc-to-node incidence matrix
//! (one row per arc, nonzero at the destination column) and the node-to-node
//! adjacency matrix (the arc-collapsed form keyed by endpoint pairs).
//! Right-multiplying a per-arc message matrix by the transposed incidence
//! matrix yields the aggregated incoming message at each node; the policy
//! below fixes how those messages are weighted.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sparse::CooMatrix;

/// Weighting policy for the incoming messages of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMode {
    /// Weight 1 per arc: aggregation sums incoming messages.
    Sum,
    /// Weight 1/A per arc: messages normalized by the total arc count.
    Normalized,
    /// Weight 1/in-degree of the destination: arcs sharing a destination
    /// contribute an average (column sums are 1).
    Average,
}

impl FromStr for AggregationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            "normalized" => Ok(Self::Normalized),
            "average" => Ok(Self::Average),
            other => Err(Error::UnknownAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sum => "sum",
            Self::Normalized => "normalized",
            Self::Average => "average",
        };
        f.write_str(s)
    }
}

/// Build the (A, N) arc-to-node incidence matrix.
///
/// Row i holds a single nonzero at column `arcs[i].to`, valued by `mode`.
/// Isolated nodes keep their (all-zero) column so node ordering survives.
pub fn build_arc_node(
    arcs: &Array2<f32>,
    num_nodes: usize,
    mode: AggregationMode,
) -> Result<CooMatrix> {
    let num_arcs = arcs.nrows();
    let cols: Vec<usize> = arcs.column(1).iter().map(|&c| c as usize).collect();
    let rows: Vec<usize> = (0..num_arcs).collect();

    let values = match mode {
        AggregationMode::Sum => vec![1.0; num_arcs],
        AggregationMode::Normalized => vec![1.0 / num_arcs as f32; num_arcs],
        AggregationMode::Average => {
            let mut in_degree = vec![0u32; num_nodes];
            for &c in &cols {
                in_degree[c] += 1;
            }
            cols.iter().map(|&c| 1.0 / in_degree[c] as f32).collect()
        }
    };

    CooMatrix::new((num_arcs, num_nodes), rows, cols, values)
}

/// Build the (N, N) adjacency matrix from the incidence values.
///
/// Reuses the incidence weights keyed by (from, to) endpoint pairs; multi-arcs
/// between the same pair collapse by summing their weights.
pub fn build_adjacency(
    arcs: &Array2<f32>,
    arc_node: &CooMatrix,
    num_nodes: usize,
) -> Result<CooMatrix> {
    let rows: Vec<usize> = arcs.column(0).iter().map(|&r| r as usize).collect();
    let cols: Vec<usize> = arcs.column(1).iter().map(|&c| c as usize).collect();
    let raw = CooMatrix::new((num_nodes, num_nodes), rows, cols, arc_node.data().to_vec())?;
    Ok(raw.canonicalized())
}

/// Uniform (N, 1) node-to-graph matrix for a single graph: every node
/// contributes 1/N, so pooling node states averages them into one readout row.
pub fn uniform_node_graph(num_nodes: usize) -> CooMatrix {
    if num_nodes == 0 {
        return CooMatrix::empty();
    }
    let weight = 1.0 / num_nodes as f32;
    CooMatrix::new(
        (num_nodes, 1),
        (0..num_nodes).collect(),
        vec![0; num_nodes],
        vec![weight; num_nodes],
    )
    .expect("indices constructed in range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn triangle() -> Array2<f32> {
        // Worked example: three arcs into nodes 1, 2, 2.
        array![[0.0, 1.0, 0.5], [1.0, 2.0, 0.5], [0.0, 2.0, 0.5]]
    }

    #[test]
    fn sum_mode_places_unit_weights() {
        let an = build_arc_node(&triangle(), 3, AggregationMode::Sum).unwrap();
        assert_eq!(an.shape(), (3, 3));
        assert_eq!(an.rows(), &[0, 1, 2]);
        assert_eq!(an.cols(), &[1, 2, 2]);
        assert_eq!(an.data(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalized_mode_divides_by_arc_count() {
        let an = build_arc_node(&triangle(), 3, AggregationMode::Normalized).unwrap();
        for &v in an.data() {
            assert_eq!(v, 1.0 / 3.0);
        }
    }

    #[test]
    fn average_mode_splits_by_in_degree() {
        let an = build_arc_node(&triangle(), 3, AggregationMode::Average).unwrap();
        // Node 1 has in-degree 1, node 2 has in-degree 2.
        assert_eq!(an.data(), &[1.0, 0.5, 0.5]);
        let sums = an.col_sums();
        assert_eq!(sums[1], 1.0);
        assert_eq!(sums[2], 1.0);
    }

    #[test]
    fn adjacency_keys_by_endpoints() {
        let arcs = triangle();
        let an = build_arc_node(&arcs, 3, AggregationMode::Sum).unwrap();
        let adj = build_adjacency(&arcs, &an, 3).unwrap();
        let dense = adj.to_dense();
        assert_eq!(dense[(0, 1)], 1.0);
        assert_eq!(dense[(1, 2)], 1.0);
        assert_eq!(dense[(0, 2)], 1.0);
        assert_eq!(dense[(0, 0)], 0.0);
    }

    #[test]
    fn adjacency_collapses_multi_arcs() {
        let arcs = array![[0.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let an = build_arc_node(&arcs, 2, AggregationMode::Sum).unwrap();
        let adj = build_adjacency(&arcs, &an, 2).unwrap();
        assert_eq!(adj.nnz(), 1);
        assert_eq!(adj.data(), &[2.0]);
    }

    #[test]
    fn uniform_node_graph_averages() {
        let ng = uniform_node_graph(4);
        assert_eq!(ng.shape(), (4, 1));
        assert_eq!(ng.col_sums(), vec![1.0]);
    }

    #[test]
    fn mode_parsing_round_trips() {
        for mode in [
            AggregationMode::Sum,
            AggregationMode::Normalized,
            AggregationMode::Average,
        ] {
            assert_eq!(mode.to_string().parse::<AggregationMode>().unwrap(), mode);
        }
        assert!(matches!(
            "bogus".parse::<AggregationMode>(),
            Err(Error::UnknownAggregation(_))
        ));
    }
}
