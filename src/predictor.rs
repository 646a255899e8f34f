// src/predictor.rs
use crate::core::{Dataset, ExplainError, Result};
use crate::traits::Predictor;
use ndarray::Array1;

/// A fitted linear regressor over encoded features: `x . coefficients + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearPredictor {
    pub fn new(coefficients: impl Into<Array1<f64>>, intercept: f64) -> Self {
        LinearPredictor {
            coefficients: coefficients.into(),
            intercept,
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
        if instances.ncols() != self.coefficients.len() {
            return Err(ExplainError::prediction(format!(
                "model expects {} features, got {}",
                self.coefficients.len(),
                instances.ncols()
            )));
        }
        Ok(instances.dot(&self.coefficients) + self.intercept)
    }

    fn num_features(&self) -> usize {
        self.coefficients.len()
    }
}
