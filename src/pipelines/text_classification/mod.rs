//! Train, evaluate and serve linear text classifiers.
//!
//! A [`Pipeline`] declares featurization steps without touching data. Appending a trainer gives an
//! [`Estimator`], and fitting that against a training partition yields an immutable
//! [`TrainedModel`], which can be evaluated or bound to a [`PredictionEngine`].

/// Label types and key mapping
pub mod labels;

/// Text featurization
pub mod featurizer;

/// Pipeline declaration and fitting
pub mod pipeline;

/// Batcher
pub mod batcher;

/// Linear classifier module
pub mod model;

/// Training
pub mod training;

/// Inference
pub mod inference;

/// Evaluation metrics
pub mod evaluation;

pub use batcher::Batcher;
pub use evaluation::{
    evaluate, BinaryClassificationMetrics, EvaluationError, Evaluate,
    MulticlassClassificationMetrics,
};
pub use featurizer::{FeatureSpace, TextFeaturizerConfig};
pub use inference::{Prediction, PredictionEngine, PredictionError, TrainedModel};
pub use labels::{KeyMap, Label, Objective};
pub use model::{Config as ModelConfig, Model};
pub use pipeline::{Estimator, Pipeline, PipelineError};
pub use training::{train, Config as TrainerConfig};
