pub mod activation_functions;
pub mod extractor;
pub mod models;
pub mod pooling;
pub mod weight_loader;

pub type WeightPrecision = f32;
pub type ImagePrecision = f32;
