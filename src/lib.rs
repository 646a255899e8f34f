// src/lib.rs

//! `voyage_xai` estimates a vessel's voyage fuel consumption with an opaque
//! regression model and explains the estimate in plain language.
//!
//! The explanation runs in four steps:
//!
//! 1. [`KernelExplainer`] attributes the prediction across the model's encoded
//!    (scaled + one-hot) dimensions with a sampled Shapley approximation,
//!    measured against a small [`BackgroundSet`] of realistic cases.
//! 2. [`FeatureNameReconciler`] names each encoded dimension from the fitted
//!    preprocessor state.
//! 3. [`ContributionAggregator`] folds one-hot groups back into their semantic
//!    feature.
//! 4. [`NarrativeGenerator`] ranks the features and writes the sentences.
//!
//! [`ExplainerService`] wires these together behind a lazily built, shared
//! baseline.

pub mod aggregate;
pub mod algorithms;
pub mod background;
pub mod config;
pub mod core;
pub mod names;
pub mod narrative;
pub mod predictor;
pub mod preprocess;
pub mod schema;
pub mod service;
pub mod synthetic;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::aggregate::ContributionAggregator;
pub use crate::algorithms::{KernelExplainer, KernelShapConfig, KernelShapSamples};
pub use crate::background::BackgroundSampler;
pub use crate::config::ExplainerConfig;
pub use crate::core::{
    BackgroundSet, ContributionMap, Dataset, EncodedAttribution, ErrorKind, ExplainError, ExplanationReport,
    ExplanationResult, FeatureValue, Instance, RawCase, Result,
};
pub use crate::names::{EncodedFeature, FeatureNameReconciler};
pub use crate::narrative::NarrativeGenerator;
pub use crate::predictor::LinearPredictor;
pub use crate::preprocess::ColumnPreprocessor;
pub use crate::service::{Artifacts, ExplainerService, HealthStatus};
pub use crate::synthetic::SyntheticVoyageSource;
pub use crate::traits::{CaseSource, FeatureKind, FeatureSpec, Predictor, Preprocessor};
