/// Dataset selection
pub mod datasets;
