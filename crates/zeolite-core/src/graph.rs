//! The host-memory graph container.
//!
//! A [`GraphObject`] holds one graph (or a merged multigraph) as ordered
//! feature matrices plus the derived sparse structures the aggregation loop
//! consumes. Construction goes through [`GraphBuilder`], which separates the
//! derive-everything path from the precomputed-matrix paths so each path's
//! validation obligations stay explicit.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ndarray::{concatenate, Array1, Array2, Axis};

use crate::error::{Error, Result};
use crate::incidence::{self, AggregationMode};
use crate::sparse::CooMatrix;

/// Supervision granularity: one target per node, per arc, or per sub-graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    Node,
    Arc,
    Graph,
}

impl Problem {
    /// Number of maskable units: nodes for node/graph problems, arcs for
    /// arc problems.
    fn maskable_units(self, num_nodes: usize, num_arcs: usize) -> usize {
        match self {
            Self::Node | Self::Graph => num_nodes,
            Self::Arc => num_arcs,
        }
    }
}

impl FromStr for Problem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "n" | "node" => Ok(Self::Node),
            "a" | "arc" => Ok(Self::Arc),
            "g" | "graph" => Ok(Self::Graph),
            other => Err(Error::UnknownProblem(other.to_string())),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Node => "node",
            Self::Arc => "arc",
            Self::Graph => "graph",
        };
        f.write_str(s)
    }
}

/// Per-target loss weights: a scalar broadcast over every target row, or an
/// explicit vector whose length must match the target row count.
#[derive(Debug, Clone)]
pub enum SampleWeights {
    Uniform(f32),
    PerTarget(Array1<f32>),
}

impl From<f32> for SampleWeights {
    fn from(w: f32) -> Self {
        Self::Uniform(w)
    }
}

impl From<Array1<f32>> for SampleWeights {
    fn from(w: Array1<f32>) -> Self {
        Self::PerTarget(w)
    }
}

/// One graph in host memory.
///
/// Arc rows are `[from, to, label...]`; the first two columns hold
/// integer-valued node indices. Derived matrices are rebuilt only by
/// [`GraphObject::set_aggregation`]; everything else is fixed at construction.
#[derive(Debug, Clone)]
pub struct GraphObject {
    nodes: Array2<f32>,
    arcs: Array2<f32>,
    targets: Array2<f32>,
    set_mask: Vec<bool>,
    output_mask: Vec<bool>,
    sample_weights: Array1<f32>,
    problem: Problem,
    aggregation: AggregationMode,
    arc_node: CooMatrix,
    adjacency: CooMatrix,
    node_graph: CooMatrix,
}

/// Staged construction of a [`GraphObject`].
pub struct GraphBuilder {
    nodes: Array2<f32>,
    arcs: Array2<f32>,
    targets: Array2<f32>,
    problem: Problem,
    set_mask: Option<Vec<bool>>,
    output_mask: Option<Vec<bool>>,
    sample_weights: SampleWeights,
    aggregation: AggregationMode,
}

impl GraphBuilder {
    pub fn set_mask(mut self, mask: Vec<bool>) -> Self {
        self.set_mask = Some(mask);
        self
    }

    pub fn output_mask(mut self, mask: Vec<bool>) -> Self {
        self.output_mask = Some(mask);
        self
    }

    pub fn sample_weights(mut self, weights: impl Into<SampleWeights>) -> Self {
        self.sample_weights = weights.into();
        self
    }

    pub fn aggregation(mut self, mode: AggregationMode) -> Self {
        self.aggregation = mode;
        self
    }

    /// Derive the incidence matrix from the raw arc list, and a uniform 1/N
    /// node-graph matrix for graph problems.
    pub fn build(self) -> Result<GraphObject> {
        self.finish(None, None)
    }

    /// Derive the incidence matrix, take a precomputed node-graph matrix
    /// (the load and merge path). A degenerate matrix counts as absent.
    pub fn build_with_node_graph(self, node_graph: CooMatrix) -> Result<GraphObject> {
        let ng = (!node_graph.is_degenerate()).then_some(node_graph);
        self.finish(None, ng)
    }

    /// Take both matrices precomputed. The incidence matrix must be (A, N)
    /// with exactly one entry per row, placed at that arc's destination
    /// column.
    pub fn build_with_matrices(
        self,
        arc_node: CooMatrix,
        node_graph: CooMatrix,
    ) -> Result<GraphObject> {
        let ng = (!node_graph.is_degenerate()).then_some(node_graph);
        self.finish(Some(arc_node), ng)
    }

    fn finish(
        self,
        arc_node: Option<CooMatrix>,
        node_graph: Option<CooMatrix>,
    ) -> Result<GraphObject> {
        let Self { nodes, arcs, targets, problem, set_mask, output_mask, sample_weights, aggregation } =
            self;
        let num_nodes = nodes.nrows();
        let num_arcs = arcs.nrows();

        if arcs.ncols() < 2 {
            return Err(Error::Validation(format!(
                "arc rows need at least the two endpoint columns, got width {}",
                arcs.ncols()
            )));
        }
        for (i, row) in arcs.rows().into_iter().enumerate() {
            for &endpoint in [row[0], row[1]].iter() {
                if endpoint < 0.0 || endpoint.fract() != 0.0 || endpoint as usize >= num_nodes {
                    return Err(Error::Validation(format!(
                        "arc {i} endpoint {endpoint} is not a node index < {num_nodes}"
                    )));
                }
            }
        }

        let units = problem.maskable_units(num_nodes, num_arcs);
        let set_mask = set_mask.unwrap_or_else(|| vec![true; units]);
        let output_mask = output_mask.unwrap_or_else(|| vec![true; set_mask.len()]);
        if set_mask.len() != output_mask.len() {
            return Err(Error::Validation(format!(
                "len(set_mask) = {} != len(output_mask) = {}",
                set_mask.len(),
                output_mask.len()
            )));
        }
        if set_mask.len() != units {
            return Err(Error::Validation(format!(
                "masks cover {} units but the {problem} problem has {units}",
                set_mask.len()
            )));
        }

        let sample_weights = match sample_weights {
            SampleWeights::Uniform(w) => Array1::from_elem(targets.nrows(), w),
            SampleWeights::PerTarget(w) => {
                if w.len() != targets.nrows() {
                    return Err(Error::Validation(format!(
                        "{} sample weights for {} target rows",
                        w.len(),
                        targets.nrows()
                    )));
                }
                w
            }
        };

        let arc_node = match arc_node {
            Some(an) => {
                validate_arc_node(&an, &arcs, num_nodes)?;
                an
            }
            None => incidence::build_arc_node(&arcs, num_nodes, aggregation)?,
        };
        let adjacency = incidence::build_adjacency(&arcs, &arc_node, num_nodes)?;

        let node_graph = match node_graph {
            Some(ng) => {
                if ng.shape().0 != num_nodes {
                    return Err(Error::Validation(format!(
                        "node-graph matrix has {} rows for {num_nodes} nodes",
                        ng.shape().0
                    )));
                }
                ng
            }
            None => match problem {
                Problem::Graph => incidence::uniform_node_graph(num_nodes),
                Problem::Node | Problem::Arc => CooMatrix::empty(),
            },
        };

        Ok(GraphObject {
            nodes,
            arcs,
            targets,
            set_mask,
            output_mask,
            sample_weights,
            problem,
            aggregation,
            arc_node,
            adjacency,
            node_graph,
        })
    }
}

fn validate_arc_node(arc_node: &CooMatrix, arcs: &Array2<f32>, num_nodes: usize) -> Result<()> {
    let num_arcs = arcs.nrows();
    if arc_node.shape() != (num_arcs, num_nodes) {
        return Err(Error::Validation(format!(
            "incidence matrix shape {:?}, expected ({num_arcs}, {num_nodes})",
            arc_node.shape()
        )));
    }
    let mut per_row = vec![0usize; num_arcs];
    for (r, c, _) in arc_node.entries() {
        per_row[r] += 1;
        let dest = arcs[(r, 1)] as usize;
        if c != dest {
            return Err(Error::Validation(format!(
                "incidence row {r} hits column {c}, arc destination is {dest}"
            )));
        }
    }
    if let Some(r) = per_row.iter().position(|&n| n != 1) {
        return Err(Error::Validation(format!(
            "incidence row {r} has {} entries, each arc delivers to exactly one node",
            per_row[r]
        )));
    }
    Ok(())
}

/// Input to [`GraphObject::merge_sources`]: an in-memory graph or a graph
/// directory to load with the binary codec.
pub enum GraphSource {
    Graph(GraphObject),
    Dir(PathBuf),
}

impl From<GraphObject> for GraphSource {
    fn from(g: GraphObject) -> Self {
        Self::Graph(g)
    }
}

impl From<PathBuf> for GraphSource {
    fn from(p: PathBuf) -> Self {
        Self::Dir(p)
    }
}

impl GraphObject {
    /// Start building a graph from its raw arrays.
    ///
    /// Defaults: all-true masks, unit sample weights, [`AggregationMode::Sum`].
    pub fn builder(
        nodes: Array2<f32>,
        arcs: Array2<f32>,
        targets: Array2<f32>,
        problem: Problem,
    ) -> GraphBuilder {
        GraphBuilder {
            nodes,
            arcs,
            targets,
            problem,
            set_mask: None,
            output_mask: None,
            sample_weights: SampleWeights::Uniform(1.0),
            aggregation: AggregationMode::Sum,
        }
    }

    /// A fully independent deep copy; no buffers are shared with `self`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Rebuild the incidence and adjacency matrices under a new policy.
    /// The one sanctioned in-place mutation.
    pub fn set_aggregation(&mut self, mode: AggregationMode) {
        self.aggregation = mode;
        self.arc_node = incidence::build_arc_node(&self.arcs, self.nodes.nrows(), mode)
            .expect("endpoints validated at construction");
        self.adjacency = incidence::build_adjacency(&self.arcs, &self.arc_node, self.nodes.nrows())
            .expect("endpoints validated at construction");
    }

    pub fn nodes(&self) -> &Array2<f32> {
        &self.nodes
    }

    pub fn arcs(&self) -> &Array2<f32> {
        &self.arcs
    }

    pub fn targets(&self) -> &Array2<f32> {
        &self.targets
    }

    pub fn set_mask(&self) -> &[bool] {
        &self.set_mask
    }

    pub fn output_mask(&self) -> &[bool] {
        &self.output_mask
    }

    pub fn sample_weights(&self) -> &Array1<f32> {
        &self.sample_weights
    }

    pub fn arc_node(&self) -> &CooMatrix {
        &self.arc_node
    }

    pub fn adjacency(&self) -> &CooMatrix {
        &self.adjacency
    }

    pub fn node_graph(&self) -> &CooMatrix {
        &self.node_graph
    }

    pub fn problem(&self) -> Problem {
        self.problem
    }

    pub fn aggregation(&self) -> AggregationMode {
        self.aggregation
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.nrows()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.nrows()
    }

    pub fn num_targets(&self) -> usize {
        self.targets.nrows()
    }

    pub fn dim_node_label(&self) -> usize {
        self.nodes.ncols()
    }

    pub fn dim_arc_label(&self) -> usize {
        self.arcs.ncols() - 2
    }

    pub fn dim_target(&self) -> usize {
        self.targets.ncols()
    }

    /// Concatenate many graphs into one block-diagonal multigraph.
    ///
    /// Nodes, targets, masks and weights concatenate in list order; arc
    /// endpoints shift by the cumulative node count of preceding graphs, so
    /// each input keeps its locality inside one globally valid index space.
    /// Node-graph matrices compose block-diagonally, preserving node-to-subgraph
    /// attribution.
    pub fn merge(
        graphs: &[GraphObject],
        problem: Problem,
        aggregation: AggregationMode,
    ) -> Result<GraphObject> {
        if graphs.is_empty() {
            return Err(Error::MergeInput("empty graph list".to_string()));
        }

        let mut shifted_arcs = Vec::with_capacity(graphs.len());
        let mut offset = 0.0f32;
        for g in graphs {
            let mut arcs = g.arcs.clone();
            for mut row in arcs.rows_mut() {
                row[0] += offset;
                row[1] += offset;
            }
            shifted_arcs.push(arcs);
            offset += g.num_nodes() as f32;
        }

        let nodes = concat_rows(graphs.iter().map(|g| g.nodes.view()).collect())?;
        let arcs = concat_rows(shifted_arcs.iter().map(|a| a.view()).collect())?;
        let targets = concat_rows(graphs.iter().map(|g| g.targets.view()).collect())?;

        let set_mask: Vec<bool> = graphs.iter().flat_map(|g| g.set_mask.iter().copied()).collect();
        let output_mask: Vec<bool> =
            graphs.iter().flat_map(|g| g.output_mask.iter().copied()).collect();
        let sample_weights: Array1<f32> = graphs
            .iter()
            .flat_map(|g| g.sample_weights.iter().copied())
            .collect::<Vec<f32>>()
            .into();

        let node_graphs: Vec<&CooMatrix> = graphs.iter().map(|g| &g.node_graph).collect();
        let node_graph = CooMatrix::block_diag(&node_graphs);

        Self::builder(nodes, arcs, targets, problem)
            .set_mask(set_mask)
            .output_mask(output_mask)
            .sample_weights(sample_weights)
            .aggregation(aggregation)
            .build_with_node_graph(node_graph)
    }

    /// Merge from mixed sources: in-memory graphs and graph directories
    /// (loaded with the binary codec).
    pub fn merge_sources(
        sources: Vec<GraphSource>,
        problem: Problem,
        aggregation: AggregationMode,
    ) -> Result<GraphObject> {
        let mut graphs = Vec::with_capacity(sources.len());
        for source in sources {
            match source {
                GraphSource::Graph(g) => graphs.push(g),
                GraphSource::Dir(path) => {
                    graphs.push(crate::persist::load(&path, problem, aggregation)?);
                }
            }
        }
        Self::merge(&graphs, problem, aggregation)
    }
}

fn concat_rows(views: Vec<ndarray::ArrayView2<'_, f32>>) -> Result<Array2<f32>> {
    concatenate(Axis(0), &views)
        .map_err(|e| Error::Validation(format!("row widths disagree across graphs: {e}")))
}

impl fmt::Display for GraphObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = if self.set_mask.iter().all(|&m| m) { "all" } else { "mixed" };
        write!(
            f,
            "graph(n={}, a={}, ndim={}, adim={}, tdim={}, set={set}, mode={})",
            self.num_nodes(),
            self.num_arcs(),
            self.dim_node_label(),
            self.dim_arc_label(),
            self.dim_target(),
            self.aggregation
        )
    }
}
