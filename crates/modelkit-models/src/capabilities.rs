//! Per-model capability descriptors and the feature validator

use modelkit_core::{DType, Error, Features, Length, Result};

/// What kind of features a model implementation can consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Accepted scalar data types
    pub dtypes: &'static [DType],

    /// Exact number of features required, `None` for any number
    pub num_supported_features: Option<usize>,

    /// Accepted feature lengths, `None` (or empty) for any length
    pub supported_lengths: Option<&'static [usize]>,
}

impl Capabilities {
    /// Numeric features of any count and length
    pub const NUMERIC: Self = Self {
        dtypes: &[DType::Int, DType::Float],
        num_supported_features: None,
        supported_lengths: None,
    };

    /// Restrict to exactly `n` features
    pub const fn with_feature_count(mut self, n: usize) -> Self {
        self.num_supported_features = Some(n);
        self
    }

    /// Restrict feature lengths
    pub const fn with_lengths(mut self, lengths: &'static [usize]) -> Self {
        self.supported_lengths = Some(lengths);
        self
    }

    /// Validate `features` against these capabilities
    ///
    /// Returns the accepted feature names sorted lexicographically, so the
    /// same declarations given in a different order yield the same list.
    pub fn applicable_features(&self, model: &str, features: &Features) -> Result<Vec<String>> {
        if let Some(expected) = self.num_supported_features {
            if features.len() != expected {
                return Err(Error::UnsupportedFeatureCount {
                    model: model.to_string(),
                    expected,
                    actual: features.len(),
                });
            }
        }

        let mut usable = Vec::with_capacity(features.len());
        for feature in features {
            self.check_dtype(model, feature.name(), feature.dtype())?;
            self.check_length(model, feature.name(), feature.length())?;
            usable.push(feature.name().to_string());
        }

        usable.sort();
        if let Some(pair) = usable.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::DuplicateFeature {
                model: model.to_string(),
                feature: pair[0].clone(),
            });
        }
        Ok(usable)
    }

    fn check_dtype(&self, model: &str, feature: &str, dtype: DType) -> Result<()> {
        if self.dtypes.contains(&dtype) {
            return Ok(());
        }
        Err(Error::UnsupportedDataType {
            model: model.to_string(),
            feature: feature.to_string(),
            dtype,
            supported: self.dtypes.to_vec(),
        })
    }

    fn check_length(&self, model: &str, feature: &str, length: Length) -> Result<()> {
        let supported = match self.supported_lengths {
            Some(lengths) if !lengths.is_empty() => lengths,
            _ => return Ok(()),
        };

        match length {
            Length::Fixed(n) if supported.contains(&n) => Ok(()),
            _ => Err(Error::UnsupportedDimensionality {
                model: model.to_string(),
                feature: feature.to_string(),
                length,
                supported: supported.to_vec(),
            }),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::NUMERIC
    }
}
