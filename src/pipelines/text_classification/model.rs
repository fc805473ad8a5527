use burn::{
    module::Module,
    nn::{loss::CrossEntropyLossConfig, Initializer, Linear, LinearConfig},
    tensor::{
        activation::{sigmoid, softmax},
        backend::Backend,
        Tensor,
    },
    train::ClassificationOutput,
};

use super::{batcher, labels::Objective};

/// The classifier configuration
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Length of the concatenated feature vector
    pub n_features: usize,

    /// One output for logistic regression, one per class for maximum entropy
    pub n_outputs: usize,
}

impl Config {
    /// Initialize a zero-weight classifier so training is fully determined by the data order
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let output = LinearConfig::new(self.n_features, self.n_outputs)
            .with_initializer(Initializer::Zeros)
            .init(device);

        Model {
            output,
            n_outputs: self.n_outputs,
        }
    }
}

/// A linear model over featurized text
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Weights and bias mapping features to logits
    pub output: Linear<B>,

    /// Total number of outputs
    pub n_outputs: usize,
}

impl<B: Backend> Model<B> {
    /// Raw logits: [batch_size, n_outputs]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(features)
    }

    /// Defines forward pass for training
    pub fn forward_classification(
        &self,
        item: batcher::Train<B>,
        objective: Objective,
    ) -> ClassificationOutput<B> {
        let output = self.forward(item.features);
        let targets = item.targets;

        let loss = match objective {
            Objective::Logistic => {
                // A fixed zero logit for the negative class turns the single margin into a
                // two-class softmax: softmax([0, z])[1] = sigmoid(z)
                let logits = Tensor::cat(vec![output.zeros_like(), output.clone()], 1);

                CrossEntropyLossConfig::new()
                    .init(&logits.device())
                    .forward(logits, targets.clone())
            }
            Objective::MaximumEntropy => CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output.clone(), targets.clone()),
        };

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }

    /// Defines forward pass for inference: class probabilities, [batch_size, n_classes], and logits
    pub fn infer(&self, input: batcher::Infer<B>, objective: Objective) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let logits = self.forward(input.features);

        let probabilities = match objective {
            Objective::Logistic => {
                let positive = sigmoid(logits.clone());
                let negative = positive.clone().neg().add_scalar(1.0);

                Tensor::cat(vec![negative, positive], 1)
            }
            Objective::MaximumEntropy => softmax(logits.clone(), 1),
        };

        (probabilities, logits)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{AdamWConfig, GradientsParams, Optimizer},
        tensor::{ElementConversion, Int},
    };

    use pretty_assertions::assert_eq;

    use crate::utils::tensors;

    use super::*;

    type B = Autodiff<NdArray>;

    fn batch(device: &<B as Backend>::Device) -> batcher::Train<B> {
        batcher::Train::new(
            Tensor::<B, 2>::from_floats([[1.0, 0.0], [0.0, 1.0], [1.0, 0.0]], device),
            Tensor::<B, 1, Int>::from_ints([1, 0, 1], device),
        )
    }

    fn loss(model: &Model<B>, objective: Objective, device: &<B as Backend>::Device) -> f32 {
        model
            .forward_classification(batch(device), objective)
            .loss
            .into_scalar()
            .elem::<f32>()
    }

    fn fit_steps(n_outputs: usize, objective: Objective) -> (f32, f32, Vec<f32>) {
        let device = Default::default();
        let mut model = Config::new(2, n_outputs).init::<B>(&device);
        let mut optimizer = AdamWConfig::new().init::<B, Model<B>>();

        let initial = loss(&model, objective, &device);

        for _ in 0..10 {
            let output = model.forward_classification(batch(&device), objective);
            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optimizer.step(5e-2, model, grads);
        }

        let weights = tensors::to_vec(model.output.weight.val());

        (initial, loss(&model, objective, &device), weights)
    }

    #[test]
    fn test_logistic_training_from_zero_weights() {
        let (initial, trained, weights) = fit_steps(1, Objective::Logistic);

        // Every logit starts at zero, so the first loss is ln 2
        assert!((initial - std::f32::consts::LN_2).abs() < 1e-5);
        assert!(weights.iter().all(|w| w.is_finite()));
        assert!(trained.is_finite());
        assert!(trained < initial);
    }

    #[test]
    fn test_maximum_entropy_training_from_zero_weights() {
        let (initial, trained, weights) = fit_steps(2, Objective::MaximumEntropy);

        assert!(weights.iter().all(|w| w.is_finite()));
        assert!(trained < initial);
    }

    #[test]
    fn test_logistic_probabilities_sum_to_one() {
        let device = Default::default();
        let model = Config::new(2, 1).init::<B>(&device);
        let features = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);

        let (probabilities, logits) =
            model.infer(batcher::Infer::new(features), Objective::Logistic);

        assert_eq!(probabilities.dims(), [1, 2]);
        assert_eq!(logits.dims(), [1, 1]);
        assert_eq!(tensors::to_vec(probabilities), vec![0.5, 0.5]);
    }
}
