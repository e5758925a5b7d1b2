//! Inference layer: fitted TF-IDF vectorizers, tree/linear/stacked
//! classifiers, artifact loading, and the prediction pipeline.

pub mod artifacts;
pub mod classifier;
mod error;
pub mod labels;
pub mod linear;
pub mod pipeline;
pub mod sparse;
pub mod stacking;
pub mod tree;
pub mod vectorizer;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use artifacts::{ArtifactPaths, ArtifactSet, ArtifactSummary};
pub use classifier::{Classifier, Estimator};
pub use error::ArtifactError;
pub use labels::LabelEncoder;
pub use pipeline::Pipeline;
pub use sparse::SparseRow;
pub use vectorizer::TfidfVectorizer;
