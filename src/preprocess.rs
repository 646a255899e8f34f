// src/preprocess.rs

//! Column-wise feature transformer: standard scaling for numeric columns,
//! one-hot encoding for categorical columns. Numeric outputs come first,
//! then categorical groups, each in declaration order.

use crate::core::{ExplainError, Instance, RawCase, Result};
use crate::traits::{FeatureKind, FeatureSpec, Preprocessor};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct NumericScaler {
    pub name: String,
    pub mean: f64,
    pub scale: f64,
}

/// Fitted column transformer. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPreprocessor {
    scalers: Vec<NumericScaler>,
    features: Vec<FeatureSpec>,
}

impl ColumnPreprocessor {
    /// Fits scalers (population standard deviation) and category lists
    /// (sorted) on `cases`.
    pub fn fit(cases: &[RawCase], numeric: &[&str], categorical: &[&str]) -> Result<Self> {
        if cases.is_empty() {
            return Err(ExplainError::invalid_input("cases", "cannot fit on an empty batch"));
        }

        let mut scalers = Vec::with_capacity(numeric.len());
        for &name in numeric {
            let values = cases
                .iter()
                .map(|case| numeric_field(case, name))
                .collect::<Result<Vec<f64>>>()?;
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            scalers.push(NumericScaler {
                name: name.to_string(),
                mean,
                scale: if std > 0.0 { std } else { 1.0 },
            });
        }

        let mut categories = Vec::with_capacity(categorical.len());
        for &name in categorical {
            let seen = cases
                .iter()
                .map(|case| categorical_field(case, name))
                .collect::<Result<BTreeSet<String>>>()?;
            categories.push((name.to_string(), seen.into_iter().collect::<Vec<_>>()));
        }

        Ok(Self::from_parts(scalers, categories))
    }

    /// Rebuilds a transformer from previously fitted state.
    pub fn from_parts(scalers: Vec<NumericScaler>, categories: Vec<(String, Vec<String>)>) -> Self {
        let features = scalers
            .iter()
            .map(|s| FeatureSpec::numeric(s.name.clone()))
            .chain(
                categories
                    .into_iter()
                    .map(|(name, cats)| FeatureSpec::categorical(name, cats)),
            )
            .collect();
        ColumnPreprocessor { scalers, features }
    }

    pub fn scalers(&self) -> &[NumericScaler] {
        &self.scalers
    }
}

impl Preprocessor for ColumnPreprocessor {
    fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    fn transform(&self, case: &RawCase) -> Result<Instance> {
        let mut out = Vec::with_capacity(self.output_dim());
        for scaler in &self.scalers {
            let v = numeric_field(case, &scaler.name)?;
            out.push((v - scaler.mean) / scaler.scale);
        }
        for spec in &self.features {
            if let FeatureKind::Categorical { categories } = &spec.kind {
                let value = categorical_field(case, &spec.name)?;
                // Unseen categories encode as all zeros.
                out.extend(categories.iter().map(|c| if *c == value { 1.0 } else { 0.0 }));
            }
        }
        Ok(Instance::from(out))
    }
}

pub(crate) fn numeric_field(case: &RawCase, name: &str) -> Result<f64> {
    let value = case
        .get(name)
        .ok_or_else(|| ExplainError::invalid_input(name, "required field is missing"))?;
    let number = value
        .as_number()
        .ok_or_else(|| ExplainError::invalid_input(name, format!("'{}' is not a number", value)))?;
    if !number.is_finite() {
        return Err(ExplainError::invalid_input(name, "value must be finite"));
    }
    Ok(number)
}

pub(crate) fn categorical_field(case: &RawCase, name: &str) -> Result<String> {
    case.get(name)
        .map(|v| v.as_category())
        .ok_or_else(|| ExplainError::invalid_input(name, "required field is missing"))
}
