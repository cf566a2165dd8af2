pub mod color;
pub mod ray;
pub mod sampler;
