//! Models that are their own context
//!
//! A [`SimpleModel`] wires an [`Algorithm`] into the shared plumbing:
//! location normalization, feature validation, config-derived storage, and
//! the reentrant lifecycle. Algorithms only describe how to train and
//! predict given a state value.

use crate::capabilities::Capabilities;
use crate::config::{normalize_location, ModelConfig};
use crate::lifecycle::{Lifecycle, LifecycleStats};
use crate::model::{Model, Prediction, PredictionStream};
use crate::storage::{self, StateStore, JSON_EXTENSION};
use async_trait::async_trait;
use futures::StreamExt;
use modelkit_core::{Error, Record, Result, Sources};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::info;

/// Learning algorithm behind a [`SimpleModel`]
pub trait Algorithm: Send + Sync + 'static {
    /// Registered model name, also the storage file prefix
    const NAME: &'static str;

    /// Features this algorithm can consume
    const CAPABILITIES: Capabilities;

    /// Model configuration
    type Config: ModelConfig;

    /// Persisted state; `Default` is the untrained state
    type State: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Produce a new state from `records`, possibly building on `state`
    fn train(
        ctx: &AlgorithmContext<'_, Self::Config>,
        state: &Self::State,
        records: &[Record],
    ) -> Result<Self::State>;

    /// Whether `state` holds usable parameters
    fn is_trained(state: &Self::State) -> bool;

    /// Predict one record
    fn predict(
        ctx: &AlgorithmContext<'_, Self::Config>,
        state: &Self::State,
        record: Record,
    ) -> Result<Prediction>;
}

/// Read-only view handed to algorithm callbacks
#[derive(Debug)]
pub struct AlgorithmContext<'a, C> {
    /// Normalized model configuration
    pub config: &'a C,

    /// Applicable feature names, sorted
    pub features: &'a [String],
}

impl<C> Clone for AlgorithmContext<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for AlgorithmContext<'_, C> {}

/// Model whose instance doubles as its context
pub struct SimpleModel<A: Algorithm> {
    config: A::Config,
    capabilities: Capabilities,
    features: Vec<String>,
    lifecycle: Lifecycle<A::State>,
    _algorithm: PhantomData<fn() -> A>,
}

impl<A: Algorithm> SimpleModel<A> {
    /// Build a model from its configuration
    ///
    /// Normalizes the location and validates the declared features, so
    /// unusable configurations fail here rather than at train time.
    pub fn new(mut config: A::Config) -> Result<Self> {
        if let Some(location) = config.location() {
            let normalized = normalize_location(location)?;
            config.set_location(normalized);
        }

        let capabilities = A::CAPABILITIES;
        let features = match config.features() {
            Some(features) => capabilities.applicable_features(A::NAME, features)?,
            None => Vec::new(),
        };

        let path = storage::disk_path(A::NAME, &config, JSON_EXTENSION)?;
        let location = config.location().map(Path::to_path_buf);
        let lifecycle = Lifecycle::new(A::NAME, location, StateStore::new(&path));

        info!(
            model = A::NAME,
            features = ?features,
            path = %path.display(),
            "Created model"
        );

        Ok(Self {
            config,
            capabilities,
            features,
            lifecycle,
            _algorithm: PhantomData,
        })
    }

    /// Normalized configuration
    pub fn config(&self) -> &A::Config {
        &self.config
    }

    /// Current in-memory state
    pub fn state(&self) -> &A::State {
        self.lifecycle.state()
    }

    /// Load/persist counts so far
    pub fn stats(&self) -> LifecycleStats {
        self.lifecycle.stats()
    }

    fn context(&self) -> AlgorithmContext<'_, A::Config> {
        AlgorithmContext {
            config: &self.config,
            features: &self.features,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lifecycle.is_loaded() {
            Ok(())
        } else {
            Err(Error::ContextNotOpen(A::NAME.to_string()))
        }
    }
}

#[async_trait]
impl<A: Algorithm> Model for SimpleModel<A> {
    fn name(&self) -> &str {
        A::NAME
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn disk_path(&self) -> Result<PathBuf> {
        Ok(self.lifecycle.store().path().to_path_buf())
    }

    fn depth(&self) -> usize {
        self.lifecycle.depth()
    }

    fn acquire(&mut self) -> Result<()> {
        self.lifecycle.acquire()
    }

    fn release(&mut self) -> Result<()> {
        self.lifecycle.release()
    }

    async fn train(&mut self, sources: &Sources) -> Result<()> {
        self.ensure_open()?;

        let records = sources.collect_records().await?;
        let trained = A::train(&self.context(), self.lifecycle.state(), &records)?;
        *self.lifecycle.state_mut() = trained;

        info!(model = A::NAME, records = records.len(), "Trained model");
        Ok(())
    }

    fn predict<'a>(&'a self, sources: &'a Sources) -> Result<PredictionStream<'a>> {
        self.ensure_open()?;

        let state = self.lifecycle.state();
        if !A::is_trained(state) {
            return Err(Error::not_trained(format!(
                "{} has no trained state at {}",
                A::NAME,
                self.lifecycle.store().path().display()
            )));
        }

        let ctx = self.context();
        let predictions = sources
            .records()
            .map(move |record| A::predict(&ctx, state, record?))
            .boxed();
        Ok(predictions)
    }
}
