// src/algorithms/kernel_shap.rs

use crate::core::{BackgroundSet, Dataset, EncodedAttribution, ExplainError, Instance, Result};
use crate::traits::Predictor;
use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

/// Relative tolerance for `expected_value + sum(phi) == prediction`.
pub const ADDITIVITY_TOLERANCE: f64 = 1e-3;

/// Largest number of varying dimensions for which full enumeration is considered.
const MAX_ENUMERATED_FEATURES: usize = 30;

/// Configuration for the KernelSHAP explainer.
#[derive(Debug, Clone, Default)]
pub struct KernelShapConfig {
    pub n_samples: KernelShapSamples,
    /// Seed for coalition sampling. `None` draws from entropy on every call.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KernelShapSamples {
    /// `2 * M + 2048` coalitions for `M` encoded dimensions.
    #[default]
    Auto,
    Fixed(usize),
}

#[derive(Debug)]
pub struct KernelExplainer<M: Predictor> {
    model: M,
    background: BackgroundSet,
    expected_value: f64,
    num_features: usize,
    config: KernelShapConfig,
}

impl<M: Predictor> KernelExplainer<M> {
    pub fn new(model: M, background: BackgroundSet, config: Option<KernelShapConfig>) -> Result<Self> {
        let num_features = model.num_features();

        if background.dim() != num_features {
            warn!(
                expected = num_features,
                actual = background.dim(),
                "background width disagrees with the model"
            );
            return Err(ExplainError::SchemaMismatch {
                component: "background set",
                expected: num_features,
                actual: background.dim(),
            });
        }

        let background_predictions = model.predict(background.data())?;
        if background_predictions.len() != background.rows()
            || background_predictions.iter().any(|v| !v.is_finite())
        {
            return Err(ExplainError::Initialization {
                reason: format!(
                    "model returned {} usable predictions for {} background rows",
                    background_predictions.iter().filter(|v| v.is_finite()).count(),
                    background.rows()
                ),
            });
        }
        let expected_value = background_predictions.mean().ok_or_else(|| ExplainError::Initialization {
            reason: "failed to calculate mean of background predictions".to_string(),
        })?;

        debug!(
            rows = background.rows(),
            dims = num_features,
            expected_value,
            "kernel explainer ready"
        );

        Ok(KernelExplainer {
            model,
            background,
            expected_value,
            num_features,
            config: config.unwrap_or_default(),
        })
    }

    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn background(&self) -> &BackgroundSet {
        &self.background
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &KernelShapConfig {
        &self.config
    }

    /// Attributes `model(instance) - expected_value` across the encoded dimensions.
    pub fn shap_values(&self, instance: &Instance) -> Result<EncodedAttribution> {
        if instance.len() != self.num_features {
            return Err(ExplainError::SchemaMismatch {
                component: "attribution query",
                expected: self.num_features,
                actual: instance.len(),
            });
        }

        let single = instance.view().insert_axis(ndarray::Axis(0)).to_owned();
        let full_prediction = self.predict_rows(&single, instance.len())?[0];
        let gap = full_prediction - self.expected_value;

        let varying = self.varying_features(instance);
        let mut shap_values = Array1::zeros(self.num_features);

        match varying.len() {
            0 => {}
            1 => shap_values[varying[0]] = gap,
            m => {
                let n_samples = match self.config.n_samples {
                    KernelShapSamples::Auto => 2 * self.num_features + 2048,
                    KernelShapSamples::Fixed(n) => n,
                };
                let (coalitions, weights) = self.generate_coalitions(m, n_samples)?;
                debug!(
                    varying = m,
                    coalitions = coalitions.nrows(),
                    "evaluating coalitions"
                );
                let coalition_values = self.evaluate_coalitions(instance, &varying, &coalitions)?;
                let phi = self.solve_constrained(&coalitions, &coalition_values, &weights, gap, instance.len())?;
                for (slot, &feat_idx) in varying.iter().enumerate() {
                    shap_values[feat_idx] = phi[slot];
                }
            }
        }

        let explanation = EncodedAttribution {
            values: shap_values,
            expected_value: self.expected_value,
            predicted_value: full_prediction,
        };

        if explanation.values.iter().any(|v| !v.is_finite()) {
            return Err(self.failure("non-finite contribution", instance.len()));
        }
        let tolerance = ADDITIVITY_TOLERANCE * full_prediction.abs().max(1.0);
        if explanation.additivity_gap().abs() > tolerance {
            return Err(self.failure(
                format!(
                    "contributions miss the prediction by {:.6} (tolerance {:.6})",
                    explanation.additivity_gap(),
                    tolerance
                ),
                instance.len(),
            ));
        }
        Ok(explanation)
    }

    /// Dimensions where the query differs from at least one background row.
    /// The rest cannot move the prediction and receive exactly zero.
    fn varying_features(&self, instance: &Instance) -> Vec<usize> {
        let data = self.background.data();
        (0..self.num_features)
            .filter(|&j| {
                let x = instance[j];
                data.column(j)
                    .iter()
                    .any(|&b| (b - x).abs() > 1e-12 + 1e-9 * x.abs())
            })
            .collect()
    }

    /// Coalition masks over `m` varying dimensions plus their regression weights.
    /// Empty and full coalitions are never produced; the efficiency constraint
    /// covers them.
    fn generate_coalitions(&self, m: usize, n_samples: usize) -> Result<(Dataset, Array1<f64>)> {
        let proper_coalitions = if m < MAX_ENUMERATED_FEATURES {
            Some((1_usize << m) - 2)
        } else {
            None
        };

        if let Some(total) = proper_coalitions.filter(|&total| total <= n_samples) {
            let mut coalitions = Dataset::zeros((total, m));
            let mut weights = Array1::zeros(total);
            for (row, mask) in (1..(1_usize << m) - 1).enumerate() {
                let mut size = 0;
                for j in 0..m {
                    if (mask >> j) & 1 == 1 {
                        coalitions[[row, j]] = 1.0;
                        size += 1;
                    }
                }
                weights[row] = Self::kernel_weight(size, m);
            }
            return Ok((coalitions, weights));
        }

        // Sizes drawn in proportion to their total kernel mass, each draw paired
        // with its complement; every sampled row then carries equal weight.
        let size_mass: Vec<f64> = (1..m)
            .map(|k| (m - 1) as f64 / (k * (m - k)) as f64)
            .collect();
        let size_dist = WeightedIndex::new(&size_mass)
            .map_err(|e| self.failure(format!("invalid coalition size weights: {}", e), self.num_features))?;
        let n_pairs = (n_samples / 2).max(m);
        let mut rng = self.rng();
        let indices: Vec<usize> = (0..m).collect();
        let mut coalitions = Dataset::zeros((2 * n_pairs, m));
        for pair in 0..n_pairs {
            let k = size_dist.sample(&mut rng) + 1;
            for &idx in indices.choose_multiple(&mut rng, k) {
                coalitions[[2 * pair, idx]] = 1.0;
            }
            for j in 0..m {
                coalitions[[2 * pair + 1, j]] = 1.0 - coalitions[[2 * pair, j]];
            }
        }
        Ok((coalitions, Array1::ones(2 * n_pairs)))
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Mean model output per coalition: coalition members take the query's
    /// value, everything else comes from each background row in turn.
    fn evaluate_coalitions(
        &self,
        instance: &Instance,
        varying: &[usize],
        coalitions: &Dataset,
    ) -> Result<Array1<f64>> {
        let data = self.background.data();
        let n_background = data.nrows();
        let n_coalitions = coalitions.nrows();

        let mut perturbed = Dataset::zeros((n_coalitions * n_background, self.num_features));
        for c in 0..n_coalitions {
            let mask = coalitions.row(c);
            for bg_idx in 0..n_background {
                let mut row = perturbed.row_mut(c * n_background + bg_idx);
                row.assign(&data.row(bg_idx));
                for (slot, &feat_idx) in varying.iter().enumerate() {
                    if mask[slot] == 1.0 {
                        row[feat_idx] = instance[feat_idx];
                    }
                }
            }
        }

        let outputs = self.predict_rows(&perturbed, instance.len())?;
        let averaged = outputs
            .into_shape((n_coalitions, n_background))?
            .mean_axis(ndarray::Axis(1))
            .ok_or_else(|| self.failure("empty coalition batch", instance.len()))?;
        Ok(averaged)
    }

    /// Weighted least squares under `sum(phi) == gap`: the last varying
    /// dimension is eliminated and recovered from the constraint.
    fn solve_constrained(
        &self,
        coalitions: &Dataset,
        coalition_values: &Array1<f64>,
        weights: &Array1<f64>,
        gap: f64,
        query_len: usize,
    ) -> Result<Array1<f64>> {
        let n = coalitions.nrows();
        let m = coalitions.ncols();
        let last = m - 1;

        let mut design = Array2::zeros((n, last));
        let mut target = Array1::zeros(n);
        for c in 0..n {
            let z_last = coalitions[[c, last]];
            for j in 0..last {
                design[[c, j]] = coalitions[[c, j]] - z_last;
            }
            target[c] = coalition_values[c] - self.expected_value - z_last * gap;
        }

        let beta = Self::solve_weighted_least_squares(&design, &target, weights).ok_or_else(|| {
            self.failure(
                format!("least squares over {} coalitions and {} dimensions is singular", n, m),
                query_len,
            )
        })?;

        let mut phi = Array1::zeros(m);
        for j in 0..last {
            phi[j] = beta[j];
        }
        phi[last] = gap - beta.sum();
        Ok(phi)
    }

    #[cfg(not(feature = "linalg"))]
    fn solve_weighted_least_squares(
        design: &Array2<f64>,
        target: &Array1<f64>,
        weights: &Array1<f64>,
    ) -> Option<Array1<f64>> {
        crate::utils::weighted_least_squares(design, target, weights)
    }

    #[cfg(feature = "linalg")]
    fn solve_weighted_least_squares(
        design: &Array2<f64>,
        target: &Array1<f64>,
        weights: &Array1<f64>,
    ) -> Option<Array1<f64>> {
        // Using SVD based least squares for more robustness
        use ndarray_linalg::LeastSquaresSvd;
        let sqrt_w = weights.mapv(f64::sqrt);
        let x_w = design * &sqrt_w.view().insert_axis(ndarray::Axis(1));
        let y_w = target * &sqrt_w;
        let results = x_w.least_squares(&y_w).ok()?;
        if results.rank < design.ncols() as i32 {
            return None;
        }
        Some(results.solution)
    }

    fn predict_rows(&self, rows: &Dataset, query_len: usize) -> Result<Array1<f64>> {
        let outputs = self
            .model
            .predict(rows)
            .map_err(|e| self.failure(format!("model prediction failed: {}", e), query_len))?;
        if outputs.len() != rows.nrows() {
            return Err(self.failure(
                format!("model returned {} outputs for {} rows", outputs.len(), rows.nrows()),
                query_len,
            ));
        }
        if outputs.iter().any(|v| !v.is_finite()) {
            return Err(self.failure("model returned a non-finite output", query_len));
        }
        Ok(outputs)
    }

    fn failure(&self, reason: impl Into<String>, query_len: usize) -> ExplainError {
        ExplainError::AttributionFailure {
            reason: reason.into(),
            query_len,
            background_rows: self.background.rows(),
            background_cols: self.background.dim(),
        }
    }

    /// Calculates the SHAP kernel weight for a coalition.
    /// Paper formula: pi_x(z') = (M-1) / (C(M, |z'|) * |z'| * (M-|z'|))
    /// where M is num_features, |z'| is coalition_size.
    fn kernel_weight(coalition_size: usize, num_features: usize) -> f64 {
        if coalition_size == 0 || coalition_size >= num_features {
            return 0.0;
        }
        let denominator = Self::n_choose_k(num_features, coalition_size)
            * coalition_size as f64
            * (num_features - coalition_size) as f64;
        (num_features - 1) as f64 / denominator
    }

    /// Helper for combinations C(n, k) = n! / (k! * (n-k)!)
    fn n_choose_k(n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        if k == 0 || k == n {
            return 1.0;
        }
        // Exploit symmetry C(n, k) = C(n, n-k) to keep k small for precision/performance
        let eff_k = if k > n / 2 { n - k } else { k };

        let mut res = 1.0;
        for i in 0..eff_k {
            res *= (n - i) as f64;
            res /= (i + 1) as f64;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Result;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::{array, Array1};

    #[derive(Debug)]
    struct SimpleLinearModel {
        coefficients: Array1<f64>,
        intercept: f64,
    }

    impl SimpleLinearModel {
        fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
            SimpleLinearModel {
                coefficients: Array1::from(coefficients),
                intercept,
            }
        }
    }

    impl Predictor for SimpleLinearModel {
        fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
            Ok(instances.dot(&self.coefficients) + self.intercept)
        }

        fn num_features(&self) -> usize {
            self.coefficients.len()
        }
    }

    /// sum of pairwise products of neighbouring dims plus a square term.
    #[derive(Debug)]
    struct InteractionModel {
        dims: usize,
    }

    impl Predictor for InteractionModel {
        fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
            Ok(instances
                .rows()
                .into_iter()
                .map(|r| {
                    let pairs: f64 = (1..r.len()).map(|j| r[j - 1] * r[j]).sum();
                    pairs + r[0] * r[0] + 1.5
                })
                .collect())
        }

        fn num_features(&self) -> usize {
            self.dims
        }
    }

    #[derive(Debug)]
    struct BrokenModel;

    impl Predictor for BrokenModel {
        fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
            if instances.nrows() == 1 {
                Ok(array![f64::NAN])
            } else {
                Ok(Array1::zeros(instances.nrows()))
            }
        }

        fn num_features(&self) -> usize {
            2
        }
    }

    fn background(rows: Vec<Vec<f64>>) -> BackgroundSet {
        let n = rows.len();
        let m = rows[0].len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        BackgroundSet::new(Dataset::from_shape_vec((n, m), flat).unwrap()).unwrap()
    }

    #[test]
    fn test_kernel_explainer_simple_linear_model() -> Result<()> {
        // Model: f(x1, x2) = 2*x1 + 3*x2 + 5
        let model = SimpleLinearModel::new(vec![2.0, 3.0], 5.0);
        let bg = background(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
        let explainer = KernelExplainer::new(model, bg, None)?;

        // Predictions on background: 5, 7, 8
        assert_abs_diff_eq!(explainer.expected_value(), 20.0 / 3.0, epsilon = 1e-9);

        let explanation = explainer.shap_values(&array![2.0, 1.0])?;
        assert_eq!(explanation.len(), 2);
        assert_abs_diff_eq!(explanation.predicted_value, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(explanation.additivity_gap(), 0.0, epsilon = 1e-9);

        // For a linear model SHAP_i = coeff_i * (x_i - E[background_i]).
        assert_abs_diff_eq!(explanation.values[0], 2.0 * (2.0 - 1.0 / 3.0), epsilon = 1e-9);
        assert_abs_diff_eq!(explanation.values[1], 3.0 * (1.0 - 1.0 / 3.0), epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn pure_interaction_is_split_evenly() -> Result<()> {
        struct Product;
        impl Predictor for Product {
            fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
                Ok(instances.rows().into_iter().map(|r| r[0] * r[1]).collect())
            }
            fn num_features(&self) -> usize {
                2
            }
        }
        let explainer = KernelExplainer::new(Product, background(vec![vec![0.0, 0.0]]), None)?;
        let explanation = explainer.shap_values(&array![1.0, 1.0])?;
        assert_abs_diff_eq!(explanation.values[0], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(explanation.values[1], 0.5, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn sampled_coalitions_stay_additive() -> Result<()> {
        let dims = 14;
        let bg_rows: Vec<Vec<f64>> = (0..5)
            .map(|r| (0..dims).map(|j| ((r * 7 + j * 3) % 5) as f64 * 0.4 - 0.8).collect())
            .collect();
        let config = KernelShapConfig {
            n_samples: KernelShapSamples::Fixed(300),
            seed: Some(7),
        };
        let explainer = KernelExplainer::new(InteractionModel { dims }, background(bg_rows), Some(config))?;
        let query: Instance = (0..dims).map(|j| j as f64 * 0.1 + 0.3).collect();
        let explanation = explainer.shap_values(&query)?;

        assert_relative_eq!(
            explanation.expected_value + explanation.values.sum(),
            explanation.predicted_value,
            max_relative = ADDITIVITY_TOLERANCE
        );
        Ok(())
    }

    #[test]
    fn sampled_coalitions_recover_linear_contributions() -> Result<()> {
        let dims = 16;
        let coefficients: Vec<f64> = (0..dims).map(|j| (j as f64 - 7.5) * 0.8).collect();
        let model = SimpleLinearModel::new(coefficients.clone(), 1.0);
        let bg_rows: Vec<Vec<f64>> = (0..4)
            .map(|r| (0..dims).map(|j| ((r * 3 + j) % 5) as f64 - 2.0).collect())
            .collect();
        let means: Vec<f64> = (0..dims)
            .map(|j| bg_rows.iter().map(|row| row[j]).sum::<f64>() / 4.0)
            .collect();
        // 2^16 - 2 proper coalitions, far above the budget: sampling mode.
        let config = KernelShapConfig {
            n_samples: KernelShapSamples::Fixed(200),
            seed: Some(3),
        };
        let explainer = KernelExplainer::new(model, background(bg_rows), Some(config))?;
        let query: Instance = (0..dims).map(|j| 2.5 - j as f64 * 0.3).collect();
        let explanation = explainer.shap_values(&query)?;

        for j in 0..dims {
            let expected = coefficients[j] * (query[j] - means[j]);
            assert_abs_diff_eq!(explanation.values[j], expected, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn seeded_sampling_is_reproducible() -> Result<()> {
        let dims = 13;
        let bg_rows: Vec<Vec<f64>> = (0..3)
            .map(|r| (0..dims).map(|j| (r + j) as f64 * 0.2).collect())
            .collect();
        let config = KernelShapConfig {
            n_samples: KernelShapSamples::Fixed(100),
            seed: Some(42),
        };
        let explainer = KernelExplainer::new(InteractionModel { dims }, background(bg_rows), Some(config))?;
        let query: Instance = Array1::from_elem(dims, 1.0);
        let first = explainer.shap_values(&query)?;
        let second = explainer.shap_values(&query)?;
        assert_eq!(first.values, second.values);
        Ok(())
    }

    #[test]
    fn constant_dimensions_receive_zero() -> Result<()> {
        let model = SimpleLinearModel::new(vec![1.0, 4.0, -2.0], 0.0);
        // Dimension 1 matches the query in every background row.
        let bg = background(vec![vec![0.0, 1.0, 0.0], vec![2.0, 1.0, 1.0]]);
        let explainer = KernelExplainer::new(model, bg, None)?;
        let explanation = explainer.shap_values(&array![3.0, 1.0, 2.0])?;
        assert_eq!(explanation.values[1], 0.0);
        assert_abs_diff_eq!(explanation.values[0], 1.0 * (3.0 - 1.0), epsilon = 1e-9);
        assert_abs_diff_eq!(explanation.values[2], -2.0 * (2.0 - 0.5), epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn single_varying_dimension_takes_whole_gap() -> Result<()> {
        let model = SimpleLinearModel::new(vec![1.0, 1.0], 0.0);
        let bg = background(vec![vec![0.0, 5.0], vec![2.0, 5.0]]);
        let explainer = KernelExplainer::new(model, bg, None)?;
        let explanation = explainer.shap_values(&array![4.0, 5.0])?;
        assert_abs_diff_eq!(explanation.values[0], 3.0, epsilon = 1e-12);
        assert_eq!(explanation.values[1], 0.0);
        Ok(())
    }

    #[test]
    fn query_length_mismatch_is_a_schema_error() {
        let model = SimpleLinearModel::new(vec![1.0, 1.0], 0.0);
        let explainer = KernelExplainer::new(model, background(vec![vec![0.0, 0.0]]), None).unwrap();
        let err = explainer.shap_values(&array![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ExplainError::SchemaMismatch { expected: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn background_width_must_match_model() {
        let model = SimpleLinearModel::new(vec![1.0, 1.0, 1.0], 0.0);
        let err = KernelExplainer::new(model, background(vec![vec![0.0, 0.0]]), None).unwrap_err();
        assert!(matches!(err, ExplainError::SchemaMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn non_finite_prediction_is_an_attribution_failure() {
        let explainer = KernelExplainer::new(BrokenModel, background(vec![vec![0.0, 0.0], vec![1.0, 1.0]]), None).unwrap();
        let err = explainer.shap_values(&array![3.0, 3.0]).unwrap_err();
        match err {
            ExplainError::AttributionFailure {
                query_len,
                background_rows,
                background_cols,
                ..
            } => {
                assert_eq!(query_len, 2);
                assert_eq!((background_rows, background_cols), (2, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn kernel_weight_is_symmetric() {
        type E = KernelExplainer<SimpleLinearModel>;
        assert_abs_diff_eq!(E::kernel_weight(1, 4), E::kernel_weight(3, 4), epsilon = 1e-12);
        assert_eq!(E::kernel_weight(0, 4), 0.0);
        assert_eq!(E::n_choose_k(5, 2), 10.0);
    }
}
