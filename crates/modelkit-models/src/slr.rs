//! Simple linear regression on a single feature

use crate::capabilities::Capabilities;
use crate::config::{default_location, ModelConfig};
use crate::model::Prediction;
use crate::simple::{Algorithm, AlgorithmContext, SimpleModel};
use modelkit_core::{Error, Feature, Features, Record, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for [`Slr`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlrConfig {
    /// Directory holding the trained state
    #[serde(default = "default_location")]
    pub location: PathBuf,

    /// The single input feature
    pub features: Features,

    /// Feature to predict
    pub predict: Feature,
}

impl SlrConfig {
    pub fn new(location: impl Into<PathBuf>, features: Features, predict: Feature) -> Self {
        Self {
            location: location.into(),
            features,
            predict,
        }
    }
}

impl ModelConfig for SlrConfig {
    fn location(&self) -> Option<&Path> {
        Some(&self.location)
    }

    fn set_location(&mut self, location: PathBuf) {
        self.location = location;
    }

    fn features(&self) -> Option<&Features> {
        Some(&self.features)
    }
}

/// Fitted line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl Regression {
    /// Least squares fit of `ys` on `xs`
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::internal("x and y lengths differ"));
        }
        if xs.len() < 2 {
            return Err(Error::invalid_data(format!(
                "need at least 2 records to fit a line, got {}",
                xs.len()
            )));
        }

        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            sxx += (x - mean_x) * (x - mean_x);
            sxy += (x - mean_x) * (y - mean_y);
        }

        if sxx == 0.0 {
            return Err(Error::invalid_data(
                "all training values of the input feature are identical",
            ));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let predicted: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();

        let fitted = Self {
            slope,
            intercept,
            r_squared: r_squared(ys, &predicted),
        };
        if !(fitted.slope.is_finite() && fitted.intercept.is_finite() && fitted.r_squared.is_finite())
        {
            return Err(Error::invalid_data(
                "fit overflowed; training values are too large to regress",
            ));
        }
        Ok(fitted)
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Coefficient of determination
///
/// A constant target that is predicted exactly scores 1.0.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / n;

    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Persisted state for [`Slr`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlrState {
    pub regression: Option<Regression>,
}

/// Simple linear regression
pub struct Slr;

/// Ready-to-use simple linear regression model
pub type SlrModel = SimpleModel<Slr>;

impl Algorithm for Slr {
    const NAME: &'static str = "slr";
    const CAPABILITIES: Capabilities = Capabilities::NUMERIC
        .with_feature_count(1)
        .with_lengths(&[1]);

    type Config = SlrConfig;
    type State = SlrState;

    fn train(
        ctx: &AlgorithmContext<'_, SlrConfig>,
        _state: &SlrState,
        records: &[Record],
    ) -> Result<SlrState> {
        let feature = input_feature(ctx)?;
        let target = ctx.config.predict.name();

        let mut xs = Vec::with_capacity(records.len());
        let mut ys = Vec::with_capacity(records.len());
        for record in records {
            xs.push(record.feature_f64(feature)?);
            ys.push(record.feature_f64(target)?);
        }

        Ok(SlrState {
            regression: Some(Regression::fit(&xs, &ys)?),
        })
    }

    fn is_trained(state: &SlrState) -> bool {
        state.regression.is_some()
    }

    fn predict(
        ctx: &AlgorithmContext<'_, SlrConfig>,
        state: &SlrState,
        record: Record,
    ) -> Result<Prediction> {
        let regression = state
            .regression
            .ok_or_else(|| Error::not_trained(Self::NAME))?;
        let x = record.feature_f64(input_feature(ctx)?)?;

        Ok(Prediction::new(
            record,
            ctx.config.predict.name(),
            regression.predict(x),
            regression.r_squared,
        ))
    }
}

fn input_feature<'a>(ctx: &AlgorithmContext<'a, SlrConfig>) -> Result<&'a str> {
    ctx.features
        .first()
        .map(String::as_str)
        .ok_or_else(|| Error::config("slr needs one input feature"))
}
