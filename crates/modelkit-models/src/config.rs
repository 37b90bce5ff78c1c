//! Model configuration and location handling

use modelkit_core::{Error, Features, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Environment variable overriding the default model directory
pub const MODELKIT_HOME_ENV: &str = "MODELKIT_HOME";

/// Permission bits for directories created to hold model state
pub const MODE_BITS_SECURE: u32 = 0o700;

/// Configuration every model type must expose
///
/// Configs are serialized to derive a storage fingerprint, so every field
/// that changes what the model is should be a serialized field. `location`
/// must serialize under that key so it can be left out of the fingerprint.
pub trait ModelConfig: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Directory the model's state lives in
    fn location(&self) -> Option<&Path>;

    /// Replace the location (used after normalization)
    fn set_location(&mut self, location: PathBuf);

    /// Declared input features
    fn features(&self) -> Option<&Features>;
}

/// Model selection plus its raw configuration, as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Registered model name
    pub model: String,

    /// Model-specific configuration
    #[serde(default = "empty_config")]
    pub config: serde_json::Value,
}

fn empty_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ModelSpec {
    pub fn new(model: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            model: model.into(),
            config,
        }
    }

    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid model spec: {}", e)))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read model spec {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

/// Default directory for model state
///
/// `$MODELKIT_HOME` when set, otherwise `~/.cache/modelkit/models`.
pub fn default_location() -> PathBuf {
    if let Some(home) = std::env::var_os(MODELKIT_HOME_ENV) {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache/modelkit/models")
}

/// Expand `~`, make absolute, and drop `.`/`..` components
///
/// The path does not need to exist.
pub fn normalize_location(location: &Path) -> Result<PathBuf> {
    let expanded = expand_home(location)?;

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map_err(|e| Error::config(format!("cannot resolve current directory: {}", e)))?
            .join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}

fn expand_home(location: &Path) -> Result<PathBuf> {
    let mut components = location.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir()
                .ok_or_else(|| Error::config("cannot expand '~': no home directory"))?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(location.to_path_buf()),
    }
}

/// Create `location` (and parents) with secure permissions if it is not a directory
pub fn ensure_location(location: &Path) -> Result<()> {
    if location.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(MODE_BITS_SECURE);
    }

    builder.create(location).map_err(|e| {
        Error::config(format!(
            "cannot create model location {}: {}",
            location.display(),
            e
        ))
    })?;

    tracing::debug!("Created model location {}", location.display());
    Ok(())
}
