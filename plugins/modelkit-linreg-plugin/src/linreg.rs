use modelkit_core::{Error, Feature, Features, Record, Result};
use modelkit_models::config::{default_location, ModelConfig};
use modelkit_models::{Algorithm, AlgorithmContext, Capabilities, Prediction, SimpleModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PIVOT_EPSILON: f64 = 1e-12;

/// Configuration for [`LinReg`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinRegConfig {
    /// Directory holding the trained state
    #[serde(default = "default_location")]
    pub location: PathBuf,

    /// Input features
    pub features: Features,

    /// Feature to predict
    pub predict: Feature,

    /// L2 penalty applied to the weights (not the intercept)
    #[serde(default)]
    pub ridge: f64,
}

impl LinRegConfig {
    pub fn new(location: impl Into<PathBuf>, features: Features, predict: Feature) -> Self {
        Self {
            location: location.into(),
            features,
            predict,
            ridge: 0.0,
        }
    }

    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge;
        self
    }
}

impl ModelConfig for LinRegConfig {
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

/// Fitted hyperplane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub intercept: f64,

    /// One weight per feature, in sorted feature order
    pub weights: Vec<f64>,

    /// r² on the training data
    pub r_squared: f64,
}

impl Coefficients {
    pub fn predict(&self, xs: &[f64]) -> f64 {
        self.intercept + self.weights.iter().zip(xs).map(|(w, x)| w * x).sum::<f64>()
    }
}

/// Persisted state for [`LinReg`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinRegState {
    pub coefficients: Option<Coefficients>,
}

/// Multiple linear regression solved through the normal equations
pub struct LinReg;

pub type LinRegModel = SimpleModel<LinReg>;

impl Algorithm for LinReg {
    const NAME: &'static str = "linreg";
    const CAPABILITIES: Capabilities = Capabilities::NUMERIC.with_lengths(&[1]);

    type Config = LinRegConfig;
    type State = LinRegState;

    fn train(
        ctx: &AlgorithmContext<'_, LinRegConfig>,
        _state: &LinRegState,
        records: &[Record],
    ) -> Result<LinRegState> {
        if ctx.config.ridge < 0.0 {
            return Err(Error::config(format!(
                "ridge penalty must not be negative, got {}",
                ctx.config.ridge
            )));
        }

        let target = ctx.config.predict.name();
        let mut rows = Vec::with_capacity(records.len());
        let mut ys = Vec::with_capacity(records.len());
        for record in records {
            rows.push(inputs(ctx.features, record)?);
            ys.push(record.feature_f64(target)?);
        }

        let coefficients = fit(&rows, &ys, ctx.config.ridge)?;
        tracing::debug!(
            intercept = coefficients.intercept,
            r_squared = coefficients.r_squared,
            "Fitted linear regression"
        );

        Ok(LinRegState {
            coefficients: Some(coefficients),
        })
    }

    fn is_trained(state: &LinRegState) -> bool {
        state.coefficients.is_some()
    }

    fn predict(
        ctx: &AlgorithmContext<'_, LinRegConfig>,
        state: &LinRegState,
        record: Record,
    ) -> Result<Prediction> {
        let coefficients = state
            .coefficients
            .as_ref()
            .ok_or_else(|| Error::not_trained(Self::NAME))?;

        if coefficients.weights.len() != ctx.features.len() {
            return Err(Error::invalid_data(format!(
                "saved model has {} weights but {} features are configured",
                coefficients.weights.len(),
                ctx.features.len()
            )));
        }

        let xs = inputs(ctx.features, &record)?;
        let value = coefficients.predict(&xs);
        let confidence = coefficients.r_squared;

        Ok(Prediction::new(record, ctx.config.predict.name(), value, confidence))
    }
}

fn inputs(features: &[String], record: &Record) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|name| record.feature_f64(name))
        .collect()
}

/// Least squares fit with an intercept and optional ridge penalty
pub fn fit(rows: &[Vec<f64>], ys: &[f64], ridge: f64) -> Result<Coefficients> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.is_empty() {
        return Err(Error::invalid_data("no records to train on"));
    }
    if rows.iter().any(|row| row.len() != width) || rows.len() != ys.len() {
        return Err(Error::internal("ragged training matrix"));
    }

    // Augmented system [XᵀX + λI | Xᵀy] with column 0 as the intercept
    let dim = width + 1;
    let mut system = vec![vec![0.0; dim + 1]; dim];
    for (row, y) in rows.iter().zip(ys) {
        let x: Vec<f64> = std::iter::once(1.0).chain(row.iter().copied()).collect();
        for i in 0..dim {
            for j in 0..dim {
                system[i][j] += x[i] * x[j];
            }
            system[i][dim] += x[i] * y;
        }
    }
    for (i, row) in system.iter_mut().enumerate().skip(1) {
        row[i] += ridge;
    }

    let solution = solve(system)?;
    let coefficients = Coefficients {
        intercept: solution[0],
        weights: solution[1..].to_vec(),
        r_squared: 0.0,
    };

    let predicted: Vec<f64> = rows.iter().map(|row| coefficients.predict(row)).collect();
    let fitted = Coefficients {
        r_squared: r_squared(ys, &predicted),
        ..coefficients
    };

    let finite = fitted.intercept.is_finite()
        && fitted.r_squared.is_finite()
        && fitted.weights.iter().all(|w| w.is_finite());
    if !finite {
        return Err(Error::invalid_data(
            "fit overflowed; training values are too large to regress",
        ));
    }
    Ok(fitted)
}

/// Gaussian elimination with partial pivoting on an augmented matrix
fn solve(mut system: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let n = system.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
            .unwrap_or(col);
        if system[pivot][col].abs() < PIVOT_EPSILON {
            return Err(Error::invalid_data(
                "features are linearly dependent or constant; add records or set a ridge penalty",
            ));
        }
        system.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = system[row][col] / system[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                system[row][k] -= factor * system[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| system[row][k] * solution[k]).sum();
        solution[row] = (system[row][n] - tail) / system[row][row];
    }
    Ok(solution)
}

fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_two_features() {
        // y = 1 + 2a - 3b
        let rows = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 1.0],
            vec![3.0, 5.0],
        ];
        let ys: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] - 3.0 * r[1]).collect();

        let c = fit(&rows, &ys, 0.0).unwrap();
        assert!(close(c.intercept, 1.0));
        assert!(close(c.weights[0], 2.0));
        assert!(close(c.weights[1], -3.0));
        assert!(close(c.r_squared, 1.0));
    }

    #[test]
    fn test_collinear_features_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let err = fit(&rows, &[1.0, 2.0, 3.0], 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_ridge_makes_collinear_features_solvable() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let c = fit(&rows, &[1.0, 2.0, 3.0], 0.1).unwrap();
        assert_eq!(c.weights.len(), 2);
        assert!(c.r_squared > 0.99);
    }

    #[test]
    fn test_ridge_shrinks_weights() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let ys: Vec<f64> = (0..10).map(|i| 4.0 * i as f64).collect();

        let plain = fit(&rows, &ys, 0.0).unwrap();
        let shrunk = fit(&rows, &ys, 50.0).unwrap();
        assert!(shrunk.weights[0].abs() < plain.weights[0].abs());
    }

    #[test]
    fn test_overflowing_input_is_rejected() {
        let rows = vec![vec![0.0], vec![1e200], vec![2e200]];
        let err = fit(&rows, &[0.0, 1e200, 2e200], 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_no_records() {
        assert!(matches!(fit(&[], &[], 0.0), Err(Error::InvalidData(_))));
    }
}
