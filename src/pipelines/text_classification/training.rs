use std::sync::Arc;

use burn::{
    data::dataloader::DataLoader,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
    LearningRate,
};

use super::{
    batcher::Train,
    labels::Objective,
    model::{self, Model},
};

/// Define configuration struct for the trainer
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Number of passes over the training partition
    #[config(default = 20)]
    pub num_epochs: usize,

    /// Batch size
    #[config(default = 32)]
    pub batch_size: usize,

    /// Learning rate
    #[config(default = 5e-2)]
    pub learning_rate: LearningRate,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// Decoupled weight decay (L2 regularization)
    #[config(default = 1e-4)]
    pub weight_decay: f32,

    /// Seed for the batch order
    #[config(default = 0)]
    pub seed: u64,
}

/// Fit a linear classifier on batches from the given loader
pub fn train<B: AutodiffBackend>(
    dataloader: Arc<dyn DataLoader<Train<B>>>,
    model_config: model::Config,
    objective: Objective,
    config: &Config,
    device: &B::Device,
) -> Model<B> {
    let mut model = model_config.init::<B>(device);

    // Initialize optimizer
    let mut optimizer = AdamWConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_weight_decay(config.weight_decay)
        .init::<B, Model<B>>();

    log::info!(
        "Training {} over {} features and {} output(s): {} epochs, batch size {}, learning rate {}",
        objective.trainer_name(),
        model_config.n_features,
        model_config.n_outputs,
        config.num_epochs,
        config.batch_size,
        config.learning_rate
    );

    for epoch in 1..=config.num_epochs {
        let mut total_loss = 0.0;
        let mut batches = 0usize;

        for batch in dataloader.iter() {
            let output = model.forward_classification(batch, objective);

            total_loss += output.loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);

            model = optimizer.step(config.learning_rate, model, grads);
        }

        log::info!(
            "Epoch {epoch}/{} - loss {:.4}",
            config.num_epochs,
            total_loss / batches.max(1) as f64
        );
    }

    model
}
