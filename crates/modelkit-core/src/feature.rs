//! Feature declarations
//!
//! A feature is a named, typed, dimensioned attribute of a record. Models
//! declare which data types and lengths they can consume; the declarations
//! here are what gets checked against those capabilities.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar data type of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int,
    Float,
    Bool,
    Str,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            "str" | "string" => Ok(Self::Str),
            other => Err(Error::config(format!("unknown feature data type '{}'", other))),
        }
    }
}

/// Dimensionality of a feature
///
/// Serialized as a plain number for fixed lengths and as `"variable"`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "LengthRepr", try_from = "LengthRepr")]
pub enum Length {
    /// Exactly `n` values, `n >= 1`
    Fixed(usize),
    /// Any number of values
    Variable,
}

impl Length {
    /// Create a fixed length, rejecting zero
    pub fn fixed(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::config("feature length must be at least 1"));
        }
        Ok(Self::Fixed(n))
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Variable => f.write_str("variable"),
        }
    }
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "*" | "variable" => Ok(Self::Variable),
            other => {
                let n = other
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("invalid feature length '{}'", other)))?;
                Self::fixed(n)
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LengthRepr {
    Number(usize),
    Word(String),
}

impl From<Length> for LengthRepr {
    fn from(length: Length) -> Self {
        match length {
            Length::Fixed(n) => Self::Number(n),
            Length::Variable => Self::Word("variable".to_string()),
        }
    }
}

impl TryFrom<LengthRepr> for Length {
    type Error = Error;

    fn try_from(repr: LengthRepr) -> Result<Self> {
        match repr {
            LengthRepr::Number(n) => Length::fixed(n),
            LengthRepr::Word(word) => word.parse(),
        }
    }
}

/// A named, typed, dimensioned data attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FeatureRepr")]
pub struct Feature {
    name: String,
    dtype: DType,
    length: Length,
}

impl Feature {
    /// Declare a feature
    pub fn new(name: impl Into<String>, dtype: DType, length: Length) -> Self {
        Self {
            name: name.into(),
            dtype,
            length,
        }
    }

    /// Declare a single-valued feature
    pub fn scalar(name: impl Into<String>, dtype: DType) -> Self {
        Self::new(name, dtype, Length::Fixed(1))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn length(&self) -> Length {
        self.length
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.dtype, self.length)
    }
}

/// Parse the `name:dtype:length` short form; length defaults to 1
impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let name = parts.next().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::config(format!("feature '{}' has no name", s)));
        }

        let dtype = parts
            .next()
            .ok_or_else(|| Error::config(format!("feature '{}' has no data type", s)))?
            .parse()?;

        let length = match parts.next() {
            Some(length) => length.parse()?,
            None => Length::Fixed(1),
        };

        if parts.next().is_some() {
            return Err(Error::config(format!(
                "feature '{}' should look like name:dtype:length",
                s
            )));
        }

        Ok(Self::new(name, dtype, length))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureRepr {
    Short(String),
    Full {
        name: String,
        dtype: DType,
        #[serde(default = "default_length")]
        length: Length,
    },
}

fn default_length() -> Length {
    Length::Fixed(1)
}

impl TryFrom<FeatureRepr> for Feature {
    type Error = Error;

    fn try_from(repr: FeatureRepr) -> Result<Self> {
        match repr {
            FeatureRepr::Short(short) => short.parse(),
            FeatureRepr::Full {
                name,
                dtype,
                length,
            } => Ok(Self::new(name, dtype, length)),
        }
    }
}

/// Ordered collection of feature declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(Vec<Feature>);

impl Features {
    pub fn new(features: Vec<Feature>) -> Self {
        Self(features)
    }

    /// Parse a list of `name:dtype:length` declarations
    pub fn parse<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .map(|item| item.as_ref().parse())
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.0.iter()
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.0.iter().find(|feature| feature.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(Feature::name).collect()
    }
}

impl From<Vec<Feature>> for Features {
    fn from(features: Vec<Feature>) -> Self {
        Self(features)
    }
}

impl FromIterator<Feature> for Features {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Features {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
