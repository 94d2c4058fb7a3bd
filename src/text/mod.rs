//! Description text processing

pub mod normalizer;
pub mod tfidf;

pub use normalizer::TextNormalizer;
pub use tfidf::TfidfVectorizer;
