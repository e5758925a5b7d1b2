//! The demo artifact set shipped under `artifacts/demo/`, for tests.
//!
//! A six-term word vocabulary, a four-trigram char vocabulary, and a stack of
//! logistic regression, random forest, and gradient boosting under a
//! logistic-regression final estimator.

use crate::artifacts::ArtifactSet;
use crate::classifier::Estimator;
use crate::labels::LabelEncoder;
use crate::pipeline::Pipeline;
use crate::vectorizer::TfidfVectorizer;

pub const WORD_VECTORIZER_JSON: &str =
    include_str!("../../../artifacts/demo/word_vectorizer.json");
pub const CHAR_VECTORIZER_JSON: &str =
    include_str!("../../../artifacts/demo/char_vectorizer.json");
pub const STACKED_MODEL_JSON: &str = include_str!("../../../artifacts/demo/stacked_model.json");
pub const LABEL_ENCODER_JSON: &str = include_str!("../../../artifacts/demo/label_encoder.json");

/// Classified as `Phishing Email` by the demo set.
pub const PHISHING_EXAMPLE: &str = "Please verify your account password immediately";

/// Classified as `Safe Email` by the demo set.
pub const SAFE_EXAMPLE: &str = "Are we still on for lunch after the meeting tomorrow?";

/// Parse the embedded demo artifacts.
///
/// Panics if the checked-in files are malformed; they are test data.
pub fn demo_artifacts() -> ArtifactSet {
    let word: TfidfVectorizer =
        serde_json::from_str(WORD_VECTORIZER_JSON).expect("demo word vectorizer");
    let chars: TfidfVectorizer =
        serde_json::from_str(CHAR_VECTORIZER_JSON).expect("demo char vectorizer");
    let model: Estimator = serde_json::from_str(STACKED_MODEL_JSON).expect("demo model");
    let labels: LabelEncoder = serde_json::from_str(LABEL_ENCODER_JSON).expect("demo labels");

    ArtifactSet::from_parts(word, chars, Box::new(model), labels)
        .unwrap_or_else(|e| panic!("demo artifacts are inconsistent: {e}"))
}

pub fn demo_pipeline() -> Pipeline {
    Pipeline::new(demo_artifacts())
}
