use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in zeolite-core.
#[derive(Error, Debug)]
pub enum Error {
    /// Construction-time validation failure (mask lengths, endpoint indices,
    /// precomputed-matrix shapes).
    #[error("validation error: {0}")]
    Validation(String),
    /// Aggregation keyword outside {sum, normalized, average}.
    #[error("unknown aggregation mode: {0}")]
    UnknownAggregation(String),
    /// Problem keyword outside {n, a, g}.
    #[error("unknown problem type: {0}")]
    UnknownProblem(String),
    /// Merge received unusable input (e.g. an empty list).
    #[error("merge input: {0}")]
    MergeInput(String),
    /// Required array file absent from a graph directory.
    #[error("missing graph file: {0}")]
    MissingFile(PathBuf),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Binary codec error.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// Text codec parse failure.
    #[error("parse error: {0}")]
    Parse(String),
    /// Tensor materialization error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Result type alias for zeolite-core.
pub type Result<T> = std::result::Result<T, Error>;
