use thiserror::Error;

/// Errors that can occur in zeolite-nn.
#[derive(Error, Debug)]
pub enum Error {
    /// Graph container error.
    #[error("graph error: {0}")]
    Core(#[from] zeolite_core::Error),
    /// Tensor computation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
    /// Network configuration mismatch (layer widths, state size).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for zeolite-nn.
pub type Result<T> = std::result::Result<T, Error>;
