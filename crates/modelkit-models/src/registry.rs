//! Model registry: selecting a model implementation by name at runtime

use crate::config::ModelSpec;
use crate::model::Model;
use crate::simple::{Algorithm, SimpleModel};
use modelkit_core::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds a model from its raw configuration
pub type ModelFactory = Arc<dyn Fn(Value) -> Result<Box<dyn Model>> + Send + Sync>;

/// Extension point for registering models from other crates
///
/// Implement this in a plugin crate and hand it to
/// [`ModelRegistry::load_plugin`] to make its models discoverable by name.
pub trait ModelPlugin: Send + Sync {
    /// Plugin name, for logging
    fn name(&self) -> &str;

    /// Register every model the plugin provides
    fn register(&self, registry: &mut ModelRegistry);
}

/// Registry mapping model names to factories
#[derive(Clone, Default)]
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in models
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "builtin-models")]
        registry.register::<crate::slr::Slr>();

        registry
    }

    /// Register a [`SimpleModel`] backed by `A`
    pub fn register<A: Algorithm>(&mut self) {
        self.register_factory(A::NAME, |config| {
            let config: A::Config = serde_json::from_value(config)
                .map_err(|e| Error::config(format!("invalid {} config: {}", A::NAME, e)))?;
            let model = SimpleModel::<A>::new(config)?;
            Ok(Box::new(model) as Box<dyn Model>)
        });
    }

    /// Register an arbitrary factory, replacing any previous one of that name
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(Value) -> Result<Box<dyn Model>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!("Replaced previously registered model '{}'", name);
        } else {
            info!("Registered model '{}'", name);
        }
    }

    /// Let a plugin register its models
    pub fn load_plugin(&mut self, plugin: &dyn ModelPlugin) {
        let before = self.factories.len();
        plugin.register(self);
        info!(
            "Loaded plugin '{}' ({} new models)",
            plugin.name(),
            self.factories.len().saturating_sub(before)
        );
    }

    /// Build the model registered as `name`
    pub fn instantiate(&self, name: &str, config: Value) -> Result<Box<dyn Model>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::config(format!(
                "model '{}' not found in registry (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;

        factory(config)
    }

    /// Build the model described by `spec`
    pub fn instantiate_spec(&self, spec: &ModelSpec) -> Result<Box<dyn Model>> {
        self.instantiate(&spec.model, spec.config.clone())
    }

    /// Build the model described by a YAML spec file
    pub fn instantiate_file(&self, path: impl AsRef<Path>) -> Result<Box<dyn Model>> {
        let spec = ModelSpec::from_file(path)?;
        self.instantiate_spec(&spec)
    }

    /// Check if a model is registered
    pub fn has_model(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered model names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered models
    pub fn count(&self) -> usize {
        self.factories.len()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}
