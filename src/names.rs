// src/names.rs

//! Maps encoded dimensions back to names a reader recognises.
//!
//! Names are derived from the fitted [`FeatureSpec`]s only, so a category seen
//! at fit time always has a name and nothing else does. Each encoded dimension
//! also records which semantic feature owns it; aggregation uses that tag
//! rather than parsing the name.

use crate::core::{ContributionMap, EncodedAttribution, ExplainError, Result};
use crate::traits::{FeatureKind, FeatureSpec, Preprocessor};
use tracing::warn;

/// One encoded dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFeature {
    /// `"<feature>"` for numeric dims, `"<feature>=<category>"` for one-hot dims.
    pub name: String,
    /// Index into [`FeatureNameReconciler::semantic_features`].
    pub owner: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNameReconciler {
    semantic: Vec<String>,
    encoded: Vec<EncodedFeature>,
}

impl FeatureNameReconciler {
    pub fn from_features(features: &[FeatureSpec]) -> Self {
        let mut semantic = Vec::with_capacity(features.len());
        let mut encoded = Vec::new();
        for (owner, spec) in features.iter().enumerate() {
            semantic.push(spec.name.clone());
            match &spec.kind {
                FeatureKind::Numeric => encoded.push(EncodedFeature {
                    name: spec.name.clone(),
                    owner,
                }),
                FeatureKind::Categorical { categories } => {
                    encoded.extend(categories.iter().map(|category| EncodedFeature {
                        name: format!("{}={}", spec.name, category),
                        owner,
                    }))
                }
            }
        }
        FeatureNameReconciler { semantic, encoded }
    }

    pub fn from_preprocessor(preprocessor: &dyn Preprocessor) -> Self {
        Self::from_features(preprocessor.features())
    }

    /// Encoded names, in encoded order.
    pub fn names(&self) -> Vec<&str> {
        self.encoded.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn encoded(&self) -> &[EncodedFeature] {
        &self.encoded
    }

    /// Semantic feature names, in declaration order.
    pub fn semantic_features(&self) -> &[String] {
        &self.semantic
    }

    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    /// Fails with [`ExplainError::SchemaMismatch`] unless `actual` equals the
    /// number of encoded names.
    pub fn check_len(&self, component: &'static str, actual: usize) -> Result<()> {
        if actual != self.encoded.len() {
            warn!(
                component,
                expected = self.encoded.len(),
                actual,
                "encoded dimensionality disagrees with feature names"
            );
            return Err(ExplainError::SchemaMismatch {
                component,
                expected: self.encoded.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Pairs each encoded contribution with its name.
    pub fn name_attribution(&self, attribution: &EncodedAttribution) -> Result<ContributionMap> {
        self.check_len("attribution output", attribution.len())?;
        Ok(self
            .encoded
            .iter()
            .zip(attribution.values.iter())
            .map(|(feature, &value)| (feature.name.clone(), value))
            .collect())
    }
}
