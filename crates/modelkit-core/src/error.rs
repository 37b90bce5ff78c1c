//! Error types for modelkit

use crate::feature::{DType, Length};
use std::path::PathBuf;

/// Result type alias using modelkit's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for modelkit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or unusable configuration (bad location, unknown model, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// The model requires a fixed number of features
    #[error("{model} requires exactly {expected} {}, got {actual}", plural(.expected))]
    UnsupportedFeatureCount {
        model: String,
        expected: usize,
        actual: usize,
    },

    /// The same feature name was declared more than once
    #[error("{model} got feature '{feature}' declared more than once")]
    DuplicateFeature { model: String, feature: String },

    /// A feature's data type is not accepted by the model
    #[error(
        "{model} only supports features with these data types: [{}] (feature '{feature}' is {dtype})",
        join(.supported)
    )]
    UnsupportedDataType {
        model: String,
        feature: String,
        dtype: DType,
        supported: Vec<DType>,
    },

    /// A feature's dimensionality is not accepted by the model
    #[error(
        "{model} only supports [{}] dimensional values (feature '{feature}' has length {length})",
        join(.supported)
    )]
    UnsupportedDimensionality {
        model: String,
        feature: String,
        length: Length,
        supported: Vec<usize>,
    },

    /// Prediction requested before any usable trained state exists
    #[error("model not trained: {0}")]
    ModelNotTrained(String),

    /// train/predict called without an open scope
    #[error("{0} used outside of an open model scope")]
    ContextNotOpen(String),

    /// Reading or writing persisted model state failed
    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Records that cannot be used for training or prediction
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Data source errors
    #[error("source error: {0}")]
    Source(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not-trained error
    pub fn not_trained(msg: impl Into<String>) -> Self {
        Self::ModelNotTrained(msg.into())
    }

    /// Create a new storage error for `path`
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a new data source error
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for feature validation failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFeatureCount { .. }
                | Self::DuplicateFeature { .. }
                | Self::UnsupportedDataType { .. }
                | Self::UnsupportedDimensionality { .. }
        )
    }
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        "feature"
    } else {
        "features"
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
