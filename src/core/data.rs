// src/core/data.rs
use crate::core::{ExplainError, Result};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single encoded instance (one row of model-ready features).
pub type Instance = Array1<f64>;

/// A numeric matrix of encoded instances, one per row.
pub type Dataset = Array2<f64>;

/// One semantic input value, before any transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value. Text is parsed; `None` if it does not parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Categorical view of the value. Numbers are formatted.
    pub fn as_category(&self) -> String {
        match self {
            FeatureValue::Number(v) => v.to_string(),
            FeatureValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Number(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One voyage's semantic inputs, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCase {
    values: BTreeMap<String, FeatureValue>,
}

impl RawCase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for RawCase {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut case = RawCase::new();
        for (k, v) in iter {
            case.insert(k, v);
        }
        case
    }
}

/// Reference population of encoded vectors used as the attribution baseline.
/// Never mutated after creation.
#[derive(Debug, Clone)]
pub struct BackgroundSet {
    data: Dataset,
}

impl BackgroundSet {
    pub fn new(data: Dataset) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(ExplainError::Initialization {
                reason: format!(
                    "background set must be non-empty, got {}x{}",
                    data.nrows(),
                    data.ncols()
                ),
            });
        }
        Ok(BackgroundSet { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }
}

/// Ordered feature name → signed contribution entries.
///
/// Entry order is the declaration order of the features and is what ties are
/// broken by when ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionMap {
    entries: Vec<(String, f64)>,
}

impl ContributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Sum of all contributions.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ContributionMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        ContributionMap {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Per-encoded-dimension attribution for one query case.
#[derive(Debug, Clone)]
pub struct EncodedAttribution {
    /// Contribution of each encoded dimension, in encoded order.
    pub values: Array1<f64>,
    /// E[f(x)] over the background set.
    pub expected_value: f64,
    /// f(x) for the query case.
    pub predicted_value: f64,
}

impl EncodedAttribution {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `expected_value + sum(values) - predicted_value`; zero when additive.
    pub fn additivity_gap(&self) -> f64 {
        self.expected_value + self.values.sum() - self.predicted_value
    }
}

impl fmt::Display for EncodedAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Attribution:")?;
        writeln!(f, "  Expected Value (Base): {:.4}", self.expected_value)?;
        writeln!(f, "  Actual Prediction:     {:.4}", self.predicted_value)?;
        for (i, val) in self.values.iter().enumerate() {
            writeln!(f, "    Dimension {}: {:.4}", i, val)?;
        }
        Ok(())
    }
}

/// The explanation returned to the boundary layer for one request.
#[derive(Debug, Clone)]
pub struct ExplanationResult {
    pub predicted_value: f64,
    /// One entry per semantic feature.
    pub contributions: ContributionMap,
    pub narrative: Vec<String>,
}

/// Wire shape of an [`ExplanationResult`], rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationReport {
    #[serde(rename = "predicted_fuel_tons")]
    pub predicted_value: f64,
    pub contributions: BTreeMap<String, f64>,
    #[serde(rename = "text_explanation")]
    pub narrative: Vec<String>,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ExplanationResult {
    pub fn report(&self) -> ExplanationReport {
        ExplanationReport {
            predicted_value: round2(self.predicted_value),
            contributions: self
                .contributions
                .iter()
                .map(|(n, v)| (n.to_string(), round2(v)))
                .collect(),
            narrative: self.narrative.clone(),
        }
    }

    pub fn narrative_text(&self) -> String {
        self.narrative.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.report())?)
    }
}

impl fmt::Display for ExplanationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.narrative {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
