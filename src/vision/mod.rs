//! Product image processing

pub mod embedder;
pub mod preprocess;

pub use embedder::OnnxImageEmbedder;
pub use preprocess::{decode_rgb, ImagePreprocessor, PreparedImage, INPUT_SIZE};
