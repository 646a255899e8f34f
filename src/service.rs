// src/service.rs

//! The explanation service: owns the fitted artifacts, the lazily built
//! attribution baseline, and the request pipeline
//! raw case → encode → predict → attribute → name → aggregate → narrate.

use crate::aggregate::ContributionAggregator;
use crate::algorithms::KernelExplainer;
use crate::background::BackgroundSampler;
use crate::config::ExplainerConfig;
use crate::core::{
    BackgroundSet, Dataset, EncodedAttribution, ExplainError, ExplanationResult, Instance, RawCase, Result,
};
use crate::names::FeatureNameReconciler;
use crate::narrative::NarrativeGenerator;
use crate::preprocess::{categorical_field, numeric_field};
use crate::traits::{CaseSource, FeatureKind, Predictor, Preprocessor};
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub type SharedPreprocessor = Arc<dyn Preprocessor>;
pub type SharedPredictor = Arc<dyn Predictor>;

/// Fitted collaborators the service explains with.
#[derive(Clone)]
pub struct Artifacts {
    preprocessor: SharedPreprocessor,
    predictor: SharedPredictor,
    reconciler: FeatureNameReconciler,
}

impl Artifacts {
    /// Feature names are derived from the fitted preprocessor.
    pub fn new(preprocessor: SharedPreprocessor, predictor: SharedPredictor) -> Self {
        let reconciler = FeatureNameReconciler::from_preprocessor(preprocessor.as_ref());
        Artifacts {
            preprocessor,
            predictor,
            reconciler,
        }
    }

    /// Pins feature names shipped separately from the preprocessor.
    pub fn with_reconciler(mut self, reconciler: FeatureNameReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn preprocessor(&self) -> &SharedPreprocessor {
        &self.preprocessor
    }

    pub fn predictor(&self) -> &SharedPredictor {
        &self.predictor
    }

    pub fn reconciler(&self) -> &FeatureNameReconciler {
        &self.reconciler
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
}

pub struct ExplainerService {
    artifacts: Option<Artifacts>,
    source: Arc<dyn CaseSource>,
    config: ExplainerConfig,
    sampler: BackgroundSampler,
    narrator: NarrativeGenerator,
    /// Outcome of the one background build, success or failure.
    explainer: OnceLock<Result<KernelExplainer<SharedPredictor>>>,
}

impl ExplainerService {
    /// `artifacts == None` starts the service in the not-ready state.
    pub fn new(artifacts: Option<Artifacts>, source: Arc<dyn CaseSource>, config: ExplainerConfig) -> Result<Self> {
        config.validate()?;
        match &artifacts {
            Some(a) => info!(
                features = a.reconciler.semantic_features().len(),
                encoded = a.reconciler.len(),
                "explainer service ready"
            ),
            None => warn!("model artifacts not found; explanations unavailable until loaded"),
        }
        Ok(ExplainerService {
            artifacts,
            source,
            sampler: BackgroundSampler::new(&config.background),
            narrator: NarrativeGenerator::new(config.narrative.top_n, config.narrative.unit.clone()),
            config,
            explainer: OnceLock::new(),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "operational",
            model_loaded: self.is_ready(),
        }
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    /// The cached baseline, once the first explanation (or [`warm_up`](Self::warm_up)) built it.
    pub fn background(&self) -> Option<&BackgroundSet> {
        self.built().map(KernelExplainer::background)
    }

    /// Builds the baseline now instead of on the first request.
    pub fn warm_up(&self) -> Result<()> {
        let artifacts = self.artifacts()?;
        self.explainer(artifacts).map(|_| ())
    }

    /// Point estimate only.
    pub fn predict(&self, case: &RawCase) -> Result<f64> {
        let artifacts = self.artifacts()?;
        let encoded = self.encode(artifacts, case)?;
        Self::point_estimate(artifacts, &encoded)
    }

    /// Per-encoded-dimension attribution for `case`.
    pub fn attribute(&self, case: &RawCase) -> Result<EncodedAttribution> {
        let artifacts = self.artifacts()?;
        let encoded = self.encode(artifacts, case)?;
        self.attribute_encoded(artifacts, &encoded)
    }

    #[instrument(skip_all)]
    pub fn explain(&self, case: &RawCase) -> Result<ExplanationResult> {
        let artifacts = self.artifacts()?;
        let encoded = self.encode(artifacts, case)?;
        let predicted_value = Self::point_estimate(artifacts, &encoded)?;

        let attribution = self.attribute_encoded(artifacts, &encoded)?;
        let named = artifacts.reconciler.name_attribution(&attribution)?;
        let contributions = ContributionAggregator::new(&artifacts.reconciler).aggregate(&named)?;
        let narrative = self.narrator.render(&contributions, predicted_value, case);

        info!(
            predicted_value,
            expected_value = attribution.expected_value,
            encoded = attribution.len(),
            features = contributions.len(),
            "explanation complete"
        );
        Ok(ExplanationResult {
            predicted_value,
            contributions,
            narrative,
        })
    }

    /// Runs [`explain`](Self::explain) on a worker thread and gives up after
    /// `timeout`. An abandoned worker finishes in the background and its
    /// result is dropped.
    #[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
    pub fn explain_with_timeout(self: &Arc<Self>, case: RawCase, timeout: Duration) -> Result<ExplanationResult> {
        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(self);
        thread::Builder::new()
            .name("voyage-xai-explain".to_string())
            .spawn(move || {
                // The receiver is gone if the caller timed out.
                let _ = tx.send(service.explain(&case));
            })
            .map_err(|e| ExplainError::Worker {
                reason: format!("failed to start explanation worker: {}", e),
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!("explanation timed out");
                Err(ExplainError::Timeout {
                    waited_ms: timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExplainError::Worker {
                reason: "explanation worker exited without a result".to_string(),
            }),
        }
    }

    /// [`explain_with_timeout`](Self::explain_with_timeout) with the configured timeout.
    pub fn explain_timed(self: &Arc<Self>, case: RawCase) -> Result<ExplanationResult> {
        let timeout = self.config.timeout();
        self.explain_with_timeout(case, timeout)
    }

    /// Teardown hook: releases the artifacts and the cached baseline.
    pub fn shutdown(self) {
        info!(
            background_built = self.built().is_some(),
            "explainer service shut down"
        );
    }

    fn artifacts(&self) -> Result<&Artifacts> {
        self.artifacts.as_ref().ok_or_else(|| {
            warn!("explanation requested before model artifacts were loaded");
            ExplainError::not_ready("model artifacts are not loaded; try again later")
        })
    }

    /// Validates `case` against the fitted schema, then transforms it.
    fn encode(&self, artifacts: &Artifacts, case: &RawCase) -> Result<Instance> {
        for spec in artifacts.preprocessor.features() {
            match spec.kind {
                FeatureKind::Numeric => {
                    numeric_field(case, &spec.name)?;
                }
                FeatureKind::Categorical { .. } => {
                    categorical_field(case, &spec.name)?;
                }
            }
        }
        let encoded = artifacts.preprocessor.transform(case)?;
        artifacts.reconciler.check_len("preprocessor output", encoded.len())?;
        Ok(encoded)
    }

    fn point_estimate(artifacts: &Artifacts, encoded: &Instance) -> Result<f64> {
        let row: Dataset = encoded.view().insert_axis(ndarray::Axis(0)).to_owned();
        let prediction = artifacts.predictor.predict(&row)?;
        match (prediction.len(), prediction.get(0).copied()) {
            (1, Some(value)) if value.is_finite() => Ok(value),
            _ => Err(ExplainError::prediction(format!(
                "expected one finite prediction, got {:?}",
                prediction.to_vec()
            ))),
        }
    }

    fn attribute_encoded(&self, artifacts: &Artifacts, encoded: &Instance) -> Result<EncodedAttribution> {
        let explainer = self.explainer(artifacts)?;
        let attribution = explainer.shap_values(encoded)?;
        artifacts.reconciler.check_len("attribution output", attribution.len())?;
        debug!(
            gap = attribution.additivity_gap(),
            "attribution computed"
        );
        Ok(attribution)
    }

    fn built(&self) -> Option<&KernelExplainer<SharedPredictor>> {
        self.explainer.get().and_then(|built| built.as_ref().ok())
    }

    /// The first caller builds the baseline while concurrent callers wait.
    /// The outcome is kept for the lifetime of the service: a failed build is
    /// reported again on every later request without touching the source.
    fn explainer(&self, artifacts: &Artifacts) -> Result<&KernelExplainer<SharedPredictor>> {
        match self.explainer.get_or_init(|| self.build_explainer(artifacts)) {
            Ok(explainer) => Ok(explainer),
            Err(ExplainError::SchemaMismatch {
                component,
                expected,
                actual,
            }) => Err(ExplainError::SchemaMismatch {
                component: *component,
                expected: *expected,
                actual: *actual,
            }),
            Err(e) => Err(ExplainError::Initialization {
                reason: match e {
                    ExplainError::Initialization { reason } => reason.clone(),
                    other => other.to_string(),
                },
            }),
        }
    }

    fn build_explainer(&self, artifacts: &Artifacts) -> Result<KernelExplainer<SharedPredictor>> {
        let built = self
            .sampler
            .build(artifacts.preprocessor.as_ref(), self.source.as_ref())
            .and_then(|background| {
                artifacts.reconciler.check_len("background set", background.dim())?;
                KernelExplainer::new(
                    Arc::clone(&artifacts.predictor),
                    background,
                    Some(self.config.attribution.kernel_shap()),
                )
            });
        if let Err(e) = &built {
            warn!(error = %e, "background build failed; explanations stay unavailable");
        }
        built
    }
}
