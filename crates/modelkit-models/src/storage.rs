//! Config-derived storage locations and state persistence
//!
//! A model's identity for storage purposes is its configuration minus the
//! `location` field, with features keyed by name. Hashing that fingerprint
//! into the file name lets differently configured models share one
//! directory, while moving a model to another directory keeps its name.

use crate::config::ModelConfig;
use modelkit_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Extension used for JSON encoded state
pub const JSON_EXTENSION: &str = ".json";

/// Semantic configuration fingerprint
pub fn fingerprint<C: ModelConfig>(config: &C) -> Result<Value> {
    let mut exported = match serde_json::to_value(config)? {
        Value::Object(map) => map,
        other => {
            return Err(Error::config(format!(
                "model config must serialize to a mapping, got {}",
                other
            )))
        }
    };

    exported.remove("location");

    if exported.contains_key("features") {
        if let Some(features) = config.features() {
            let mut sorted = Map::new();
            for feature in features {
                let spec = serde_json::json!({
                    "dtype": feature.dtype(),
                    "length": feature.length(),
                });
                if sorted.insert(feature.name().to_string(), spec).is_some() {
                    return Err(Error::config(format!(
                        "feature '{}' is declared more than once",
                        feature.name()
                    )));
                }
            }
            exported.insert("features".to_string(), Value::Object(sorted));
        }
    }

    Ok(Value::Object(exported))
}

/// Hex SHA-256 of the canonical fingerprint
pub fn fingerprint_digest<C: ModelConfig>(config: &C) -> Result<String> {
    let canonical = serde_json::to_string(&canonicalize(fingerprint(config)?))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Rebuild objects with keys in sorted order, independent of map features
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// File the model's state is stored in: `<location>/<model>-<digest><extension>`
pub fn disk_path<C: ModelConfig>(model: &str, config: &C, extension: &str) -> Result<PathBuf> {
    let location = config
        .location()
        .ok_or_else(|| Error::config(format!("{} has no location configured", model)))?;

    let digest = fingerprint_digest(config)?;
    Ok(location.join(format!("{}-{}{}", model, digest, extension)))
}

/// Reads and writes serialized state at a fixed path
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read state; `Ok(None)` only when nothing has been saved yet
    pub fn read<S: DeserializeOwned>(&self) -> Result<Option<S>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(&self.path, e)),
        };

        let state = serde_json::from_slice(&bytes).map_err(|e| {
            Error::storage(&self.path, std::io::Error::new(ErrorKind::InvalidData, e))
        })?;
        Ok(Some(state))
    }

    /// Write state, replacing any previous contents
    ///
    /// Goes through a sibling `.tmp` file renamed into place. State whose
    /// encoding would not read back (e.g. NaN written as `null` for an `f64`)
    /// is refused and the previous file is left as it was.
    pub fn write<S: Serialize + DeserializeOwned>(&self, state: &S) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        serde_json::from_slice::<S>(&bytes).map_err(|e| {
            Error::invalid_data(format!(
                "refusing to save state to {} that cannot be read back: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut tmp_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::internal(format!("state path {} has no file name", self.path.display())))?
            .to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, bytes).map_err(|e| Error::storage(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| Error::storage(&self.path, e))?;
        Ok(())
    }
}
