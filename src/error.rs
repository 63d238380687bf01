// src/error.rs

use thiserror::Error;

/// Everything that can go wrong while building, caching or exporting a kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("mesh axis {axis} has {size} cells, need at least {min}")]
    InvalidSize { axis: usize, size: usize, min: usize },
    #[error("cell size along axis {axis} must be positive and finite, got {value}")]
    InvalidCellSize { axis: usize, value: f64 },
    #[error("accuracy must be positive and finite, got {0}")]
    InvalidAccuracy(f64),
    #[error("even kernel size needed: padded axis {axis} has {size} cells")]
    OddKernelSize { axis: usize, size: usize },
    #[error("integration point count overflows at distance {distance} with accuracy {accuracy}")]
    IntegrationTooFine { distance: f64, accuracy: f64 },
    #[error("tensor component ({i}, {j}) out of range")]
    IndexOutOfRange { i: usize, j: usize },
    #[error("kernel cache does not match request: {0}")]
    CacheMismatch(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;
