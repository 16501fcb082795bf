//! Mini-batch generation over a dataset of graphs.
//!
//! Each epoch the batcher walks a (optionally shuffled) permutation of the
//! dataset, merges every chunk into one block-diagonal multigraph and
//! materializes it as a [`GraphTensor`]. Shuffling is seeded per epoch so a
//! run is reproducible end to end.

use candle_core::Device;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;

use crate::error::{Error, Result};
use crate::graph::{GraphObject, Problem};
use crate::incidence::AggregationMode;
use crate::tensor::GraphTensor;

/// Batching configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Graphs per mini-batch (default: 32). The last batch may be smaller.
    pub batch_size: usize,
    /// Shuffle the dataset each epoch (default: true).
    pub shuffle: bool,
    /// Base random seed (default: 42); epoch `e` shuffles with `seed + e`.
    pub seed: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { batch_size: 32, shuffle: true, seed: 42 }
    }
}

impl BatchConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Iterates a graph dataset as merged, tensorized mini-batches.
pub struct GraphBatcher {
    graphs: Vec<GraphObject>,
    problem: Problem,
    aggregation: AggregationMode,
    config: BatchConfig,
}

impl GraphBatcher {
    pub fn new(
        graphs: Vec<GraphObject>,
        problem: Problem,
        aggregation: AggregationMode,
        config: BatchConfig,
    ) -> Result<Self> {
        if graphs.is_empty() {
            return Err(Error::Validation("batcher needs at least one graph".to_string()));
        }
        if config.batch_size == 0 {
            return Err(Error::Validation("batch size must be nonzero".to_string()));
        }
        Ok(Self { graphs, problem, aggregation, config })
    }

    pub fn num_graphs(&self) -> usize {
        self.graphs.len()
    }

    /// Batches per epoch (the trailing partial batch counts).
    pub fn num_batches(&self) -> usize {
        self.graphs.len().div_ceil(self.config.batch_size)
    }

    /// The dataset permutation used for `epoch`.
    pub fn epoch_order(&self, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.graphs.len()).collect();
        if self.config.shuffle {
            let mut rng = XorShiftRng::seed_from_u64(self.config.seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Merge and materialize every mini-batch of `epoch` on `device`.
    pub fn batches(&self, epoch: u64, device: &Device) -> Result<Vec<GraphTensor>> {
        let order = self.epoch_order(epoch);
        let mut out = Vec::with_capacity(self.num_batches());
        for chunk in order.chunks(self.config.batch_size) {
            let members: Vec<GraphObject> =
                chunk.iter().map(|&i| self.graphs[i].copy()).collect();
            let merged = GraphObject::merge(&members, self.problem, self.aggregation)?;
            out.push(GraphTensor::from_graph(&merged, device)?);
        }
        Ok(out)
    }
}
