use std::sync::Arc;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::{datasets::TextInput, utils::tensors};

use super::featurizer::{FeatureSpace, SparseVector};

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Dense features: [batch_size, n_features]
    pub features: Tensor<B, 2>,
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Dense features: [batch_size, n_features]
    pub features: Tensor<B, 2>,

    /// Label keys for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// A training row whose text is featurized when it is batched
#[derive(Clone, Debug, new)]
pub struct Pending {
    /// The raw text fields
    pub text: TextInput,

    /// The label key
    pub key: usize,
}

/// A training row featurized ahead of time
#[derive(Clone, Debug, new)]
pub struct Featurized {
    /// The concatenated feature vector
    pub features: SparseVector,

    /// The label key
    pub key: usize,
}

/// Struct for batching text classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// The fitted featurizers
    features: Arc<FeatureSpace>,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(features: Arc<FeatureSpace>, device: B::Device) -> Self {
        Self { features, device }
    }

    fn train_batch<'a, I>(&self, rows: I) -> Train<B>
    where
        I: IntoIterator<Item = (&'a SparseVector, usize)>,
    {
        let (rows, keys): (Vec<&SparseVector>, Vec<usize>) = rows.into_iter().unzip();

        Train {
            features: tensors::dense::<B>(&rows, self.features.dim(), &self.device),
            targets: tensors::keys::<B>(&keys, &self.device),
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<TextInput, Infer<B>> for Batcher<B> {
    /// Collects a vector of text inputs into an inference batch
    fn batch(&self, items: Vec<TextInput>) -> Infer<B> {
        let rows: Vec<SparseVector> = items
            .iter()
            .map(|input| self.features.transform(input))
            .collect();
        let rows: Vec<&SparseVector> = rows.iter().collect();

        Infer {
            features: tensors::dense::<B>(&rows, self.features.dim(), &self.device),
        }
    }
}

/// Implement Batcher trait for Batcher struct for training without a cache checkpoint
impl<B: Backend> dataloader::batcher::Batcher<Pending, Train<B>> for Batcher<B> {
    /// Featurizes and collects a vector of rows into a training batch
    fn batch(&self, items: Vec<Pending>) -> Train<B> {
        let rows: Vec<(SparseVector, usize)> = items
            .iter()
            .map(|item| (self.features.transform(&item.text), item.key))
            .collect();

        self.train_batch(rows.iter().map(|(row, key)| (row, *key)))
    }
}

/// Implement Batcher trait for Batcher struct for training from a cache checkpoint
impl<B: Backend> dataloader::batcher::Batcher<Featurized, Train<B>> for Batcher<B> {
    /// Collects a vector of featurized rows into a training batch
    fn batch(&self, items: Vec<Featurized>) -> Train<B> {
        self.train_batch(items.iter().map(|item| (&item.features, item.key)))
    }
}
