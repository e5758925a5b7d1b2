pub mod error;
pub mod input;
pub mod layout;
pub mod prediction;

pub use error::PipelineError;
pub use input::EmailText;
pub use layout::FeatureLayout;
pub use prediction::{
    ClassProbability, DEFAULT_PHISHING_LABEL, PROBABILITY_TOLERANCE, Prediction, Verdict, argmax,
};
