//! Model trait and common types

use crate::capabilities::Capabilities;
use async_trait::async_trait;
use futures::stream::BoxStream;
use modelkit_core::{Record, Result, Sources};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Lazy, finite stream of predictions, one per input record
pub type PredictionStream<'a> = BoxStream<'a, Result<Prediction>>;

/// Trait for all models
///
/// `acquire`/`release` drive the model's loaded state and are normally
/// called through [`crate::lifecycle::Scope`], which guarantees the release.
/// `train` and `predict` are only valid while at least one scope is open.
#[async_trait]
pub trait Model: Send + Sync {
    /// Get the registered model name
    fn name(&self) -> &str;

    /// What features this model accepts
    fn capabilities(&self) -> &Capabilities;

    /// Applicable feature names, sorted
    fn features(&self) -> &[String];

    /// Where the model's state is persisted
    fn disk_path(&self) -> Result<PathBuf>;

    /// Number of currently open scopes
    fn depth(&self) -> usize;

    /// Enter a scope, loading persisted state on the first entry
    fn acquire(&mut self) -> Result<()>;

    /// Leave a scope, persisting state when the last one closes
    fn release(&mut self) -> Result<()>;

    /// Train on labeled records
    async fn train(&mut self, sources: &Sources) -> Result<()>;

    /// Predict for every record in `sources`
    ///
    /// Fails with `ModelNotTrained` before any usable state exists.
    fn predict<'a>(&'a self, sources: &'a Sources) -> Result<PredictionStream<'a>>;
}

/// Result of predicting one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The input record
    pub record: Record,

    /// Name of the predicted feature
    pub feature: String,

    /// Predicted value
    pub value: Value,

    /// Confidence score
    pub confidence: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(record: Record, feature: impl Into<String>, value: impl Into<Value>, confidence: f64) -> Self {
        Self {
            record,
            feature: feature.into(),
            value: value.into(),
            confidence,
        }
    }

    /// Key of the predicted record
    pub fn key(&self) -> &str {
        &self.record.key
    }

    /// Predicted value as a number, if it is one
    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}
