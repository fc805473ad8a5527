use std::{marker::PhantomData, sync::Arc};

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::{Dataset as _, InMemDataset},
    },
    module::AutodiffModule,
    tensor::backend::AutodiffBackend,
};

use crate::datasets::{Example, TextDataset, TextField};

use super::{
    batcher::{Batcher, Featurized, Pending, Train},
    featurizer::{FeatureSpace, TextFeaturizerConfig},
    inference::TrainedModel,
    labels::{Label, Objective},
    model,
    training::{self, Config as TrainerConfig},
};

/// An unfit declaration of the featurization steps for a label type.
///
/// Declaring a pipeline has no side effects. Text fields are bound through [`TextField`] values
/// obtained from a [`crate::datasets::Schema`], so a step can't refer to a column that doesn't
/// exist.
#[derive(Debug, Clone)]
pub struct Pipeline<L: Label> {
    featurizers: Vec<(TextField, TextFeaturizerConfig)>,
    cache: bool,
    _label: PhantomData<L>,
}

impl<L: Label> Default for Pipeline<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label> Pipeline<L> {
    /// Start an empty declaration
    pub fn new() -> Self {
        Self {
            featurizers: Vec::new(),
            cache: false,
            _label: PhantomData,
        }
    }

    /// Featurize a text field into a numeric vector. Fields are concatenated into the feature
    /// vector in the order they are declared.
    pub fn featurize_text(mut self, field: TextField, config: TextFeaturizerConfig) -> Self {
        self.featurizers.push((field, config));
        self
    }

    /// Featurize the training rows once and keep them in memory across epochs.
    ///
    /// This trades memory for speed and is not suited to very large datasets.
    pub fn append_cache_checkpoint(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Append the trainer implied by the label type
    pub fn append_trainer(self, trainer: TrainerConfig) -> Estimator<L> {
        Estimator {
            pipeline: self,
            trainer,
        }
    }
}

/// A pipeline declaration with its trainer, ready to be fit
#[derive(Debug, Clone)]
pub struct Estimator<L: Label> {
    pipeline: Pipeline<L>,
    trainer: TrainerConfig,
}

impl<L: Label> Estimator<L> {
    /// The trainer hyperparameters
    pub fn trainer(&self) -> &TrainerConfig {
        &self.trainer
    }

    /// Render the declared steps, e.g. for logging
    pub fn describe(&self) -> String {
        let mut steps = Vec::new();

        if L::OBJECTIVE == Objective::MaximumEntropy {
            steps.push("MapValueToKey(Label)".to_string());
        }

        for (field, _) in &self.pipeline.featurizers {
            steps.push(format!("FeaturizeText({field})"));
        }

        if self.pipeline.featurizers.len() > 1 {
            steps.push("Concatenate(Features)".to_string());
        }

        if self.pipeline.cache {
            steps.push("AppendCacheCheckpoint".to_string());
        }

        steps.push(match L::OBJECTIVE {
            Objective::Logistic => "LogisticRegression".to_string(),
            Objective::MaximumEntropy => "MaximumEntropy".to_string(),
        });

        if L::OBJECTIVE == Objective::MaximumEntropy {
            steps.push("MapKeyToValue(PredictedLabel)".to_string());
        }

        steps.join(" -> ")
    }

    /// Fit the pipeline against a training partition and return the trained model
    pub fn fit<B: AutodiffBackend>(
        &self,
        train: &TextDataset<L>,
        device: &B::Device,
    ) -> Result<TrainedModel<L, B::InnerBackend>, PipelineError> {
        if self.pipeline.featurizers.is_empty() {
            return Err(PipelineError::NoFeaturizers);
        }

        if train.is_empty() {
            return Err(PipelineError::EmptyPartition);
        }

        log::info!("Fitting {} on {} rows", self.describe(), train.len());

        let examples: Vec<Example<L>> = train.examples().collect();
        let n_fields = examples.first().map_or(0, |row| row.text.len());

        let keys = L::fit_key_map(examples.iter().map(|row| &row.label));
        if keys.len() < 2 {
            return Err(PipelineError::SingleClass(keys.len()));
        }

        let features = FeatureSpace::fit(
            &self.pipeline.featurizers,
            examples.iter().map(|row| &row.text),
        );
        if features.dim() == 0 {
            return Err(PipelineError::NoFeatures);
        }

        log::info!(
            "Fitted {} classes over {} features",
            keys.len(),
            features.dim()
        );

        let targets = examples
            .iter()
            .map(|row| {
                keys.key(&row.label)
                    .ok_or_else(|| PipelineError::UnmappedLabel(row.label.display()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let features = Arc::new(features);
        let batcher = Batcher::<B>::new(features.clone(), device.clone());

        let dataloader: Arc<dyn DataLoader<Train<B>>> = if self.pipeline.cache {
            let rows: Vec<Featurized> = examples
                .iter()
                .zip(&targets)
                .map(|(row, &key)| Featurized::new(features.transform(&row.text), key))
                .collect();

            log::debug!("Cached {} featurized rows", rows.len());

            DataLoaderBuilder::<Featurized, Train<B>>::new(batcher)
                .batch_size(self.trainer.batch_size)
                .shuffle(self.trainer.seed)
                .build(InMemDataset::new(rows))
        } else {
            let rows: Vec<Pending> = examples
                .into_iter()
                .zip(targets)
                .map(|(row, key)| Pending::new(row.text, key))
                .collect();

            DataLoaderBuilder::<Pending, Train<B>>::new(batcher)
                .batch_size(self.trainer.batch_size)
                .shuffle(self.trainer.seed)
                .build(InMemDataset::new(rows))
        };

        let classifier = training::train::<B>(
            dataloader,
            model::Config::new(features.dim(), keys.n_outputs()),
            L::OBJECTIVE,
            &self.trainer,
            device,
        );

        Ok(TrainedModel::new(
            features,
            keys,
            classifier.valid(),
            n_fields,
            device.clone(),
        ))
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    /// The declaration has nothing to featurize
    #[error("the pipeline declares no text featurization steps")]
    NoFeaturizers,

    /// There are no training rows
    #[error("the training partition is empty")]
    EmptyPartition,

    /// Classification needs at least two classes
    #[error("the training partition has {0} label class(es), at least 2 are required")]
    SingleClass(usize),

    /// Featurization produced an empty vocabulary
    #[error("featurization produced no features")]
    NoFeatures,

    /// A training label has no key
    #[error("label {0} has no key")]
    UnmappedLabel(String),

    /// The schema has no text column with the given name
    #[error(transparent)]
    Schema(#[from] crate::datasets::SchemaError),
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use crate::datasets::{Schema, TextInput};

    use super::*;

    type B = Autodiff<NdArray>;

    fn sentiment_rows(rows: &[(&str, bool)]) -> TextDataset<bool> {
        TextDataset::new(
            rows.iter()
                .map(|(text, label)| Example::new(None, *label, TextInput::from(*text)))
                .collect(),
        )
    }

    fn estimator() -> Estimator<bool> {
        let schema = Schema::new().text(0, "SentimentText").label(1, "Label");

        Pipeline::new()
            .featurize_text(
                schema.text_field("SentimentText").unwrap(),
                TextFeaturizerConfig::new(),
            )
            .append_trainer(TrainerConfig::new().with_num_epochs(2))
    }

    #[test]
    fn test_describe_binary() {
        assert_eq!(
            estimator().describe(),
            "FeaturizeText(SentimentText) -> LogisticRegression"
        );
    }

    #[test]
    fn test_describe_multiclass() {
        let schema = Schema::new()
            .id(0, "ID")
            .label(1, "Area")
            .text(2, "Title")
            .text(3, "Description");

        let estimator = Pipeline::<String>::new()
            .featurize_text(
                schema.text_field("Title").unwrap(),
                TextFeaturizerConfig::new(),
            )
            .featurize_text(
                schema.text_field("Description").unwrap(),
                TextFeaturizerConfig::new(),
            )
            .append_cache_checkpoint()
            .append_trainer(TrainerConfig::new());

        assert_eq!(
            estimator.describe(),
            "MapValueToKey(Label) -> FeaturizeText(Title) -> FeaturizeText(Description) \
             -> Concatenate(Features) -> AppendCacheCheckpoint -> MaximumEntropy \
             -> MapKeyToValue(PredictedLabel)"
        );
    }

    #[test]
    fn test_fit_rejects_empty_partition() {
        let result = estimator().fit::<B>(&sentiment_rows(&[]), &Default::default());

        assert_eq!(result.err(), Some(PipelineError::EmptyPartition));
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let train = sentiment_rows(&[("great food", true), ("lovely staff", true)]);

        let result = estimator().fit::<B>(&train, &Default::default());

        assert_eq!(result.err(), Some(PipelineError::SingleClass(1)));
    }

    #[test]
    fn test_fit_rejects_missing_featurizers() {
        let train = sentiment_rows(&[("great food", true), ("awful food", false)]);

        let result = Pipeline::<bool>::new()
            .append_trainer(TrainerConfig::new())
            .fit::<B>(&train, &Default::default());

        assert_eq!(result.err(), Some(PipelineError::NoFeaturizers));
    }
}
