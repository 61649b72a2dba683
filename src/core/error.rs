//! Error types for linear model training and persistence

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinearError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error(
        "feature nodes of instance {instance} must be sorted by index in ascending order, \
         but index {index} follows index {previous}"
    )]
    UnsortedFeatures {
        instance: usize,
        previous: usize,
        index: usize,
    },

    #[error("Feature index {index} of instance {instance} is outside 1..={max}")]
    FeatureIndexOutOfRange {
        instance: usize,
        index: usize,
        max: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed model at line {line}: {message}")]
    ModelFormat { line: usize, message: String },

    #[error("Unknown solver type: {0}")]
    UnknownSolver(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, LinearError>;
