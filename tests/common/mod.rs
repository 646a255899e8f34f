//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use ndarray::Array1;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use voyage_xai::schema::{CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use voyage_xai::{
    Artifacts, CaseSource, ColumnPreprocessor, Dataset, ExplainerConfig, ExplainerService, Predictor,
    Preprocessor, RawCase, Result, SyntheticVoyageSource,
};

/// Counts how often the background population is requested.
pub struct CountingSource {
    inner: SyntheticVoyageSource,
    pub calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(seed: u64) -> Self {
        CountingSource {
            inner: SyntheticVoyageSource::seeded(seed),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaseSource for CountingSource {
    fn sample(&self, n: usize) -> Result<Vec<RawCase>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for concurrent first requests.
        std::thread::sleep(std::time::Duration::from_millis(20));
        self.inner.sample(n)
    }
}

/// Smooth non-linear stand-in for the fitted fuel regressor.
pub struct QuadraticFuelModel {
    pub weights: Array1<f64>,
}

impl QuadraticFuelModel {
    pub fn new(dims: usize) -> Self {
        QuadraticFuelModel {
            weights: (0..dims).map(|j| 1.0 + (j % 4) as f64 * 2.5).collect(),
        }
    }
}

impl Predictor for QuadraticFuelModel {
    fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
        Ok(instances
            .rows()
            .into_iter()
            .map(|row| {
                let linear = row.dot(&self.weights);
                // Speed-like cubic term on dimension 3 and one interaction.
                400.0 + 35.0 * linear + 6.0 * row[3].powi(3) + 4.0 * row[0] * row[7]
            })
            .collect())
    }

    fn num_features(&self) -> usize {
        self.weights.len()
    }
}

pub fn fitted_preprocessor(seed: u64) -> ColumnPreprocessor {
    let pool = SyntheticVoyageSource::seeded(seed).sample(200).unwrap();
    ColumnPreprocessor::fit(&pool, NUMERIC_FEATURES, CATEGORICAL_FEATURES).unwrap()
}

pub fn fast_config() -> ExplainerConfig {
    let mut config = ExplainerConfig::default();
    config.background.size = 8;
    config.attribution.samples = Some(256);
    config.attribution.seed = Some(17);
    config
}

pub fn voyage_service(source: Arc<dyn CaseSource>) -> ExplainerService {
    let pre = fitted_preprocessor(3);
    let model = QuadraticFuelModel::new(pre.output_dim());
    let artifacts = Artifacts::new(Arc::new(pre), Arc::new(model));
    ExplainerService::new(Some(artifacts), source, fast_config()).unwrap()
}

pub fn calm_voyage() -> RawCase {
    RawCase::new()
        .with("Ship_Type", "Bulker")
        .with("DWT", 82_000.0)
        .with("Engine_Power_kW", 12_300.0)
        .with("Design_Speed", 14.5)
        .with("Avg_Speed_Knots", 12.0)
        .with("Distance_NM", 2_400.0)
        .with("Draft_Percentage", 85.0)
        .with("Wind_Beaufort", 6.0)
        .with("Wave_Height_m", 4.5)
        .with("Current_Speed_Knots", 1.2)
        .with("Current_Direction", "Head")
        .with("Season", "Southwest Monsoon")
}
