//! Records flowing from data sources into models

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single data item with named feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique key within its source
    pub key: String,

    /// Feature values by name
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            features: BTreeMap::new(),
        }
    }

    /// Set a feature value
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    /// Get a feature value
    pub fn feature(&self, name: &str) -> Option<&Value> {
        self.features.get(name)
    }

    /// Get a feature as a number
    ///
    /// Accepts JSON numbers, booleans, and single element arrays so that
    /// length-1 features can be stored either way.
    pub fn feature_f64(&self, name: &str) -> Result<f64> {
        let value = self.feature(name).ok_or_else(|| {
            Error::invalid_data(format!("record '{}' has no feature '{}'", self.key, name))
        })?;

        as_f64(value).ok_or_else(|| {
            Error::invalid_data(format!(
                "record '{}' feature '{}' is not numeric: {}",
                self.key, name, value
            ))
        })
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Array(items) if items.len() == 1 => as_f64(&items[0]),
        _ => None,
    }
}
