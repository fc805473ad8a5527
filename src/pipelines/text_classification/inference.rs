use std::sync::Arc;

use burn::{
    data::dataloader::batcher::Batcher as BatcherTrait,
    tensor::backend::Backend,
};
use serde::Serialize;

use crate::{
    datasets::{TextDataset, TextInput},
    utils::{classes::argmax, tensors},
};

use super::{
    batcher::{Batcher, Infer},
    featurizer::FeatureSpace,
    labels::{KeyMap, Label, Objective},
    model::Model,
};

/// Rows scored per forward pass when transforming a whole dataset
const TRANSFORM_BATCH_SIZE: usize = 1024;

/// An immutable fitted pipeline: featurizers, label keys and classifier weights
pub struct TrainedModel<L: Label, B: Backend> {
    features: Arc<FeatureSpace>,
    keys: KeyMap<L>,
    classifier: Model<B>,
    batcher: Batcher<B>,
    n_fields: usize,
}

impl<L: Label, B: Backend> TrainedModel<L, B> {
    pub(crate) fn new(
        features: Arc<FeatureSpace>,
        keys: KeyMap<L>,
        classifier: Model<B>,
        n_fields: usize,
        device: B::Device,
    ) -> Self {
        let batcher = Batcher::new(features.clone(), device);

        Self {
            features,
            keys,
            classifier,
            batcher,
            n_fields,
        }
    }

    /// The label keys fitted on the training partition
    pub fn key_map(&self) -> &KeyMap<L> {
        &self.keys
    }

    /// The length of the feature vector
    pub fn n_features(&self) -> usize {
        self.features.dim()
    }

    /// The number of text fields every input must carry
    pub fn n_fields(&self) -> usize {
        self.n_fields
    }

    /// Bind the model to a prediction function
    pub fn prediction_engine(&self) -> PredictionEngine<'_, L, B> {
        PredictionEngine { model: self }
    }

    /// Score every row of a dataset, returning predictions in row order
    pub fn transform(&self, data: &TextDataset<L>) -> Result<Vec<Prediction<L>>, PredictionError> {
        let inputs: Vec<TextInput> = data.examples().map(|row| row.text).collect();
        let engine = self.prediction_engine();

        let mut predictions = Vec::with_capacity(inputs.len());
        for chunk in inputs.chunks(TRANSFORM_BATCH_SIZE) {
            predictions.extend(engine.predict_batch(chunk)?);
        }

        Ok(predictions)
    }
}

/// The outcome of scoring one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction<L> {
    /// The text that was scored
    pub text: TextInput,

    /// The label mapped back from the winning key
    pub predicted_label: L,

    /// Probability of the predicted label
    pub probability: f32,

    /// Raw logit: the positive-class margin for binary labels, the predicted class logit
    /// otherwise
    pub score: f32,

    /// Probability of every class, indexed by label key
    pub class_probabilities: Vec<f32>,
}

impl Prediction<bool> {
    /// Probability that the input belongs to the positive class
    pub fn positive_probability(&self) -> f32 {
        self.class_probabilities.get(1).copied().unwrap_or_default()
    }
}

/// A prediction function bound to a trained model
pub struct PredictionEngine<'a, L: Label, B: Backend> {
    model: &'a TrainedModel<L, B>,
}

impl<'a, L: Label, B: Backend> PredictionEngine<'a, L, B> {
    /// Predict a single input
    pub fn predict(&self, input: &TextInput) -> Result<Prediction<L>, PredictionError> {
        self.predict_batch(std::slice::from_ref(input))?
            .pop()
            .ok_or(PredictionError::MissingOutput)
    }

    /// Predict a batch of inputs with one forward pass. Results follow the input order.
    pub fn predict_batch(&self, inputs: &[TextInput]) -> Result<Vec<Prediction<L>>, PredictionError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let expected = self.model.n_fields;
        if let Some(input) = inputs.iter().find(|input| input.len() != expected) {
            return Err(PredictionError::FieldCount {
                expected,
                found: input.len(),
            });
        }

        let batch: Infer<B> = BatcherTrait::<TextInput, Infer<B>>::batch(
            &self.model.batcher,
            inputs.to_vec(),
        );
        let (probabilities, logits) = self.model.classifier.infer(batch, L::OBJECTIVE);

        let [_, n_classes] = probabilities.dims();
        let [_, n_outputs] = logits.dims();

        self.collect(
            inputs,
            &tensors::to_vec(probabilities),
            n_classes,
            &tensors::to_vec(logits),
            n_outputs,
        )
    }

    /// Map row-major class probabilities and logits back to labelled predictions
    fn collect(
        &self,
        inputs: &[TextInput],
        probabilities: &[f32],
        n_classes: usize,
        logits: &[f32],
        n_outputs: usize,
    ) -> Result<Vec<Prediction<L>>, PredictionError> {
        if let Some(&value) = probabilities.iter().chain(logits).find(|v| !v.is_finite()) {
            return Err(PredictionError::NonFinite(value));
        }

        inputs
            .iter()
            .zip(probabilities.chunks(n_classes))
            .zip(logits.chunks(n_outputs))
            .map(|((input, probabilities), logits)| {
                let key = argmax(probabilities).ok_or(PredictionError::MissingOutput)?;

                let predicted_label = self
                    .model
                    .keys
                    .value(key)
                    .cloned()
                    .ok_or(PredictionError::UnknownKey(key))?;

                let score = match L::OBJECTIVE {
                    Objective::Logistic => logits[0],
                    Objective::MaximumEntropy => logits[key],
                };

                Ok(Prediction {
                    text: input.clone(),
                    predicted_label,
                    probability: probabilities[key],
                    score,
                    class_probabilities: probabilities.to_vec(),
                })
            })
            .collect()
    }
}

/// Prediction Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PredictionError {
    /// The input carries a different number of text fields than the training rows
    #[error("expected {expected} text field(s), found {found}")]
    FieldCount {
        /// Fields the pipeline reads
        expected: usize,

        /// Fields the input carries
        found: usize,
    },

    /// The classifier picked a key with no label
    #[error("predicted key {0} does not map to a training label")]
    UnknownKey(usize),

    /// The classifier produced no scores for an input
    #[error("the classifier produced no output")]
    MissingOutput,

    /// A probability or logit is NaN or infinite
    #[error("the classifier produced a non-finite score ({0})")]
    NonFinite(f32),
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use crate::{
        datasets::{Example, Schema},
        pipelines::text_classification::{Pipeline, TextFeaturizerConfig, TrainerConfig},
    };

    use super::*;

    type B = Autodiff<NdArray>;

    fn fitted() -> TrainedModel<bool, NdArray> {
        let rows = [
            ("the food was great", true),
            ("great service and great food", true),
            ("i loved it", true),
            ("the food was awful", false),
            ("awful service", false),
            ("i hated it", false),
        ];
        let train = TextDataset::new(
            rows.iter()
                .map(|(text, label)| Example::new(None, *label, TextInput::from(*text)))
                .collect(),
        );
        let schema = Schema::new().text(0, "Text").label(1, "Label");

        Pipeline::new()
            .featurize_text(schema.text_field("Text").unwrap(), TextFeaturizerConfig::new())
            .append_trainer(TrainerConfig::new().with_num_epochs(30).with_batch_size(2))
            .fit::<B>(&train, &Default::default())
            .unwrap()
    }

    #[test]
    fn test_predict_batch_preserves_order() {
        let model = fitted();
        let engine = model.prediction_engine();

        let inputs = vec![
            TextInput::from("great food"),
            TextInput::from("awful food"),
            TextInput::from("great great great"),
        ];

        let predictions = engine.predict_batch(&inputs).unwrap();

        assert_eq!(predictions.len(), 3);
        for (input, prediction) in inputs.iter().zip(&predictions) {
            assert_eq!(&prediction.text, input);
            assert!((0.0..=1.0).contains(&prediction.probability));
            assert!(prediction.probability >= 0.5);
        }

        assert!(predictions[0].predicted_label);
        assert!(!predictions[1].predicted_label);
    }

    #[test]
    fn test_single_prediction_matches_batch() {
        let model = fitted();
        let engine = model.prediction_engine();
        let input = TextInput::from("awful food");

        let single = engine.predict(&input).unwrap();
        let batch = engine.predict_batch(&[input]).unwrap();

        assert_eq!(single, batch[0]);
        assert!((single.positive_probability() + single.probability - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_score_sign_matches_label() {
        let model = fitted();
        let engine = model.prediction_engine();

        let positive = engine.predict(&TextInput::from("great food")).unwrap();
        let negative = engine.predict(&TextInput::from("awful food")).unwrap();

        assert!(positive.score > 0.0);
        assert!(negative.score < 0.0);
    }

    #[test]
    fn test_empty_batch() {
        let model = fitted();

        assert_eq!(model.prediction_engine().predict_batch(&[]).unwrap(), vec![]);
    }

    #[test]
    fn test_extra_field_is_an_error() {
        let model = fitted();
        let input = TextInput::new(vec!["great food".to_string(), "awful food".to_string()]);

        let result = model.prediction_engine().predict(&input);

        assert_eq!(
            result,
            Err(PredictionError::FieldCount {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_non_finite_scores_are_an_error() {
        let model = fitted();
        let engine = model.prediction_engine();
        let inputs = [TextInput::from("great food")];

        let result = engine.collect(&inputs, &[0.9, f32::NAN], 2, &[0.3], 1);
        assert!(matches!(result, Err(PredictionError::NonFinite(v)) if v.is_nan()));

        let result = engine.collect(&inputs, &[0.1, 0.9], 2, &[f32::INFINITY], 1);
        assert_eq!(result, Err(PredictionError::NonFinite(f32::INFINITY)));

        let predictions = engine.collect(&inputs, &[0.1, 0.9], 2, &[2.2], 1).unwrap();
        assert!(predictions[0].predicted_label);
        assert_eq!(predictions[0].probability, 0.9);
    }

    #[test]
    fn test_fitted_scores_are_finite() {
        let model = fitted();
        let predictions = model
            .prediction_engine()
            .predict_batch(&[TextInput::from("great food"), TextInput::from("zzz")])
            .unwrap();

        for prediction in &predictions {
            assert!(prediction.score.is_finite());
            assert!(prediction.class_probabilities.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let model = fitted();

        let result = model.prediction_engine().predict(&TextInput::default());

        assert_eq!(
            result,
            Err(PredictionError::FieldCount {
                expected: 1,
                found: 0
            })
        );
    }
}
