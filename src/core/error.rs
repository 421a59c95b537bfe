//! Error types for Kernel-BP precomputation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelBPError {
    #[error("Invalid shape: {0}")]
    Shape(String),

    #[error("Invalid parameter: {0}")]
    Parameter(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KernelBPError>;
