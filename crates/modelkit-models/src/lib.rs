//! modelkit Models
//!
//! Pluggable machine learning models with a shared lifecycle.
//!
//! Every model goes through the same steps:
//! - Declared features are checked against what the model can consume
//! - Trained state is stored under a path derived from the model's configuration,
//!   so differently configured models never overwrite each other
//! - State is loaded when the first scope opens and persisted when the last
//!   one closes, however deeply scopes are nested
//!
//! New models implement [`Algorithm`] and are wrapped in a [`SimpleModel`], or
//! implement [`Model`] directly. Plugins register them with a [`ModelRegistry`].

pub mod capabilities;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod simple;
#[cfg(feature = "builtin-models")]
pub mod slr;
pub mod storage;

pub use capabilities::Capabilities;
pub use config::{default_location, ModelConfig, ModelSpec};
pub use lifecycle::{Lifecycle, LifecycleStats, ModelExt, Scope};
pub use model::{Model, Prediction, PredictionStream};
pub use registry::{ModelFactory, ModelPlugin, ModelRegistry};
pub use simple::{Algorithm, AlgorithmContext, SimpleModel};
#[cfg(feature = "builtin-models")]
pub use slr::{Slr, SlrConfig, SlrModel};
pub use storage::{disk_path, fingerprint, fingerprint_digest, StateStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::capabilities::Capabilities;
    pub use crate::config::{ModelConfig, ModelSpec};
    pub use crate::lifecycle::{ModelExt, Scope};
    pub use crate::model::{Model, Prediction};
    pub use crate::registry::{ModelPlugin, ModelRegistry};
    pub use crate::simple::{Algorithm, AlgorithmContext, SimpleModel};
    pub use modelkit_core::prelude::*;
}
