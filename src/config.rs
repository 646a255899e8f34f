// src/config.rs
use crate::algorithms::{KernelShapConfig, KernelShapSamples};
use crate::core::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BACKGROUND_POOL_SIZE: usize = 50;
pub const DEFAULT_BACKGROUND_SIZE: usize = 20;
pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// How the attribution baseline is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Raw cases requested from the case source.
    pub pool_size: usize,
    /// Leading transformed cases kept as the baseline.
    pub size: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_BACKGROUND_POOL_SIZE,
            size: DEFAULT_BACKGROUND_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Coalitions per explanation. `None` means `2 * M + 2048`.
    pub samples: Option<usize>,
    pub seed: Option<u64>,
}

impl AttributionConfig {
    pub fn kernel_shap(&self) -> KernelShapConfig {
        KernelShapConfig {
            n_samples: match self.samples {
                Some(n) => KernelShapSamples::Fixed(n),
                None => KernelShapSamples::Auto,
            },
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub top_n: usize,
    pub unit: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            unit: "tons".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    pub background: BackgroundConfig,
    pub attribution: AttributionConfig,
    pub narrative: NarrativeConfig,
    /// Upper bound on one timed explanation.
    pub timeout_ms: u64,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            background: BackgroundConfig::default(),
            attribution: AttributionConfig::default(),
            narrative: NarrativeConfig::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ExplainerConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ExplainError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.background.size == 0 {
            return Err(ExplainError::config("background.size must be at least 1"));
        }
        if self.background.size > self.background.pool_size {
            return Err(ExplainError::config(format!(
                "background.size ({}) exceeds background.pool_size ({})",
                self.background.size, self.background.pool_size
            )));
        }
        if self.attribution.samples == Some(0) {
            return Err(ExplainError::config("attribution.samples must be positive"));
        }
        if self.narrative.top_n == 0 {
            return Err(ExplainError::config("narrative.top_n must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(ExplainError::config("timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
