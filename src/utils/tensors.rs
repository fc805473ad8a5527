use burn::tensor::{backend::Backend, Data, Int, Shape, Tensor};

use crate::pipelines::text_classification::featurizer::SparseVector;

/// Stack sparse rows into a dense float tensor: [rows.len(), dim]
pub fn dense<B: Backend>(rows: &[&SparseVector], dim: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut values = vec![0.0f32; rows.len() * dim];

    for (row, chunk) in rows.iter().zip(values.chunks_mut(dim.max(1))) {
        row.scatter_into(chunk);
    }

    Tensor::from_data(
        Data::new(values, Shape::new([rows.len(), dim])).convert::<B::FloatElem>(),
        device,
    )
}

/// Build an integer target tensor from label keys: [keys.len()]
pub fn keys<B: Backend>(keys: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = keys.iter().map(|&key| key as i64).collect();

    Tensor::from_data(
        Data::new(values, Shape::new([keys.len()])).convert::<B::IntElem>(),
        device,
    )
}

/// Copy a float tensor back to the host as a row-major vector
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().value
}
