// src/traits.rs

//! Contracts for the collaborators the explanation core consumes but does not
//! implement: the fitted feature transformer, the fitted regressor, and a
//! source of representative raw cases.

use crate::core::{Dataset, ExplainError, Instance, RawCase, Result};
use ndarray::Array1;
use std::sync::Arc;

/// How a semantic feature is encoded by a fitted [`Preprocessor`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// One scaled output dimension.
    Numeric,
    /// One output dimension per fitted category, in the order given.
    Categorical { categories: Vec<String> },
}

/// A semantic feature together with its fitted encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn numeric(name: impl Into<String>) -> Self {
        FeatureSpec {
            name: name.into(),
            kind: FeatureKind::Numeric,
        }
    }

    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        FeatureSpec {
            name: name.into(),
            kind: FeatureKind::Categorical {
                categories: categories.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Number of encoded dimensions this feature occupies.
    pub fn width(&self) -> usize {
        match &self.kind {
            FeatureKind::Numeric => 1,
            FeatureKind::Categorical { categories } => categories.len(),
        }
    }
}

/// A fitted, immutable feature transformer.
pub trait Preprocessor: Send + Sync {
    /// Fitted features in the exact order `transform` emits them.
    fn features(&self) -> &[FeatureSpec];

    /// Encode one raw case into a model-ready vector.
    fn transform(&self, case: &RawCase) -> Result<Instance>;

    fn output_dim(&self) -> usize {
        self.features().iter().map(FeatureSpec::width).sum()
    }

    fn transform_batch(&self, cases: &[RawCase]) -> Result<Dataset> {
        let mut rows: Vec<f64> = Vec::new();
        let mut width = None;
        for case in cases {
            let row = self.transform(case)?;
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(ExplainError::SchemaMismatch {
                        component: "preprocessor batch",
                        expected: w,
                        actual: row.len(),
                    })
                }
                Some(_) => {}
            }
            rows.extend(row.iter());
        }
        let width = width.unwrap_or_else(|| self.output_dim());
        Ok(Dataset::from_shape_vec((cases.len(), width), rows)?)
    }
}

/// A fitted regression model. Must be pure: identical input, identical output.
pub trait Predictor: Send + Sync {
    /// One prediction per row of `instances`.
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>>;

    /// Expected number of columns.
    fn num_features(&self) -> usize;
}

impl<P: Predictor + ?Sized> Predictor for Arc<P> {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
        (**self).predict(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
        (**self).predict(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

/// Somewhere to draw representative raw cases from.
pub trait CaseSource: Send + Sync {
    fn sample(&self, n: usize) -> Result<Vec<RawCase>>;
}
