// src/background.rs

//! Builds the reference population the attribution is measured against.
//!
//! A single all-zero row sits at the origin of the scaled space and drags every
//! attribution towards it, so the baseline is a small batch of realistic
//! cases instead: `pool_size` raw cases are drawn, transformed, and the first
//! `size` rows kept in the order the source produced them.

use crate::config::BackgroundConfig;
use crate::core::{BackgroundSet, ExplainError, Result};
use crate::traits::{CaseSource, Preprocessor};
use ndarray::s;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundSampler {
    pool_size: usize,
    size: usize,
}

impl Default for BackgroundSampler {
    fn default() -> Self {
        Self::new(&BackgroundConfig::default())
    }
}

impl BackgroundSampler {
    pub fn new(config: &BackgroundConfig) -> Self {
        BackgroundSampler {
            pool_size: config.pool_size,
            size: config.size,
        }
    }

    /// Any failure here is an [`ExplainError::Initialization`].
    pub fn build(&self, preprocessor: &dyn Preprocessor, source: &dyn CaseSource) -> Result<BackgroundSet> {
        let cases = source.sample(self.pool_size).map_err(|e| ExplainError::Initialization {
            reason: format!("case source unavailable: {}", e),
        })?;
        if cases.is_empty() {
            return Err(ExplainError::Initialization {
                reason: "case source returned no cases".to_string(),
            });
        }

        let transformed = preprocessor
            .transform_batch(&cases)
            .map_err(|e| ExplainError::Initialization {
                reason: format!("failed to transform background cases: {}", e),
            })?;

        let keep = self.size.min(transformed.nrows());
        if keep < self.size {
            warn!(
                requested = self.size,
                available = transformed.nrows(),
                "case source returned fewer cases than the background size"
            );
        }
        let background = BackgroundSet::new(transformed.slice(s![..keep, ..]).to_owned())?;

        info!(
            rows = background.rows(),
            dims = background.dim(),
            pool = cases.len(),
            "background set built"
        );
        Ok(background)
    }
}
