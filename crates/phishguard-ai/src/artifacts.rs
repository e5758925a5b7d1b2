//! Loading and cross-checking the four model artifacts.
//!
//! The artifacts are read once at startup from a directory:
//!
//! | File | Contents |
//! |---|---|
//! | `word_vectorizer.json` | word-level [`TfidfVectorizer`] |
//! | `char_vectorizer.json` | character-level [`TfidfVectorizer`] |
//! | `stacked_model.json` | [`Estimator`] (or `stacked_model.onnx` with the `onnx` feature) |
//! | `label_encoder.json` | [`LabelEncoder`] |
//!
//! All four must come from the same training run; [`ArtifactSet::from_parts`]
//! refuses invalid parts and sets whose widths or class counts disagree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::classifier::{Classifier, Estimator};
use crate::error::ArtifactError;
use crate::labels::LabelEncoder;
use crate::vectorizer::{Analyzer, TfidfVectorizer};

pub const WORD_VECTORIZER_FILE: &str = "word_vectorizer.json";
pub const CHAR_VECTORIZER_FILE: &str = "char_vectorizer.json";
pub const MODEL_FILE: &str = "stacked_model.json";
pub const ONNX_MODEL_FILE: &str = "stacked_model.onnx";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";

/// Locations of the individual artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub word_vectorizer: PathBuf,
    pub char_vectorizer: PathBuf,
    pub model: PathBuf,
    pub label_encoder: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside `dir`.
    ///
    /// The JSON model is preferred; `stacked_model.onnx` is picked only when
    /// it exists and the JSON model does not.
    pub fn in_dir(dir: &Path) -> Self {
        let json_model = dir.join(MODEL_FILE);
        let onnx_model = dir.join(ONNX_MODEL_FILE);
        let model = if !json_model.exists() && onnx_model.exists() {
            onnx_model
        } else {
            json_model
        };
        Self {
            word_vectorizer: dir.join(WORD_VECTORIZER_FILE),
            char_vectorizer: dir.join(CHAR_VECTORIZER_FILE),
            model,
            label_encoder: dir.join(LABEL_ENCODER_FILE),
        }
    }
}

/// The loaded, mutually consistent artifacts.
///
/// Never mutated after construction; share it behind an `Arc`.
pub struct ArtifactSet {
    word: TfidfVectorizer,
    chars: TfidfVectorizer,
    model: Box<dyn Classifier>,
    labels: LabelEncoder,
}

/// Human-readable description of a loaded [`ArtifactSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub word_features: usize,
    pub word_analyzer: Analyzer,
    pub word_ngram_range: (usize, usize),
    pub char_features: usize,
    pub char_analyzer: Analyzer,
    pub char_ngram_range: (usize, usize),
    pub model_kind: &'static str,
    pub model_features: usize,
    pub classes: Vec<String>,
}

impl ArtifactSet {
    /// Load the standard artifact files from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        Self::load_paths(&ArtifactPaths::in_dir(dir))
    }

    /// Load artifacts from explicit paths.
    pub fn load_paths(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let word = load_vectorizer(&paths.word_vectorizer, "word vectorizer")?;
        let chars = load_vectorizer(&paths.char_vectorizer, "char vectorizer")?;

        let labels: LabelEncoder = read_json(&paths.label_encoder)?;

        let model = load_model(&paths.model, word.n_features() + chars.n_features(), labels.len())?;

        let set = Self::from_parts(word, chars, model, labels)?;
        let summary = set.summary();
        info!(
            word_features = summary.word_features,
            char_features = summary.char_features,
            model = summary.model_kind,
            classes = ?summary.classes,
            "loaded artifacts"
        );
        Ok(set)
    }

    /// Assemble a set from already-loaded parts.
    ///
    /// Each part is validated on its own before widths and class counts are
    /// compared, so deserialized parts can be passed in unchecked.
    pub fn from_parts(
        word: TfidfVectorizer,
        chars: TfidfVectorizer,
        model: Box<dyn Classifier>,
        labels: LabelEncoder,
    ) -> Result<Self, ArtifactError> {
        word.validate()
            .map_err(|e| ArtifactError::invalid("word vectorizer", e))?;
        chars
            .validate()
            .map_err(|e| ArtifactError::invalid("char vectorizer", e))?;
        labels
            .validate()
            .map_err(|e| ArtifactError::invalid("label encoder", e))?;
        model
            .validate()
            .map_err(|e| ArtifactError::invalid("classifier", e))?;

        let combined = word.n_features() + chars.n_features();
        if model.n_features() != combined {
            return Err(ArtifactError::Inconsistent(format!(
                "vectorizers produce {} + {} = {combined} features, classifier expects {}",
                word.n_features(),
                chars.n_features(),
                model.n_features()
            )));
        }
        if model.n_classes() != labels.len() {
            return Err(ArtifactError::Inconsistent(format!(
                "classifier predicts {} classes, label encoder has {}",
                model.n_classes(),
                labels.len()
            )));
        }
        Ok(Self {
            word,
            chars,
            model,
            labels,
        })
    }

    pub fn word_vectorizer(&self) -> &TfidfVectorizer {
        &self.word
    }

    pub fn char_vectorizer(&self) -> &TfidfVectorizer {
        &self.chars
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            word_features: self.word.n_features(),
            word_analyzer: self.word.analyzer(),
            word_ngram_range: self.word.ngram_range(),
            char_features: self.chars.n_features(),
            char_analyzer: self.chars.analyzer(),
            char_ngram_range: self.chars.ngram_range(),
            model_kind: self.model.kind(),
            model_features: self.model.n_features(),
            classes: self.labels.classes().to_vec(),
        }
    }
}

fn load_vectorizer(path: &Path, artifact: &'static str) -> Result<TfidfVectorizer, ArtifactError> {
    let vectorizer: TfidfVectorizer = read_json(path)?;
    debug!(
        path = %path.display(),
        features = vectorizer.n_features(),
        analyzer = ?vectorizer.analyzer(),
        "loaded {artifact}"
    );
    Ok(vectorizer)
}

#[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
fn load_model(
    path: &Path,
    n_features: usize,
    n_classes: usize,
) -> Result<Box<dyn Classifier>, ArtifactError> {
    if path.extension().is_some_and(|ext| ext == "onnx") {
        #[cfg(feature = "onnx")]
        {
            let model = crate::onnx::OnnxClassifier::load(path, n_features, n_classes)?;
            return Ok(Box::new(model));
        }
        #[cfg(not(feature = "onnx"))]
        return Err(ArtifactError::invalid(
            "classifier",
            format!(
                "{} is an ONNX model but this build lacks the `onnx` feature",
                path.display()
            ),
        ));
    }

    let model: Estimator = read_json(path)?;
    Ok(Box::new(model))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn write_demo(dir: &Path) {
        fs::write(dir.join(WORD_VECTORIZER_FILE), fixtures::WORD_VECTORIZER_JSON).unwrap();
        fs::write(dir.join(CHAR_VECTORIZER_FILE), fixtures::CHAR_VECTORIZER_JSON).unwrap();
        fs::write(dir.join(MODEL_FILE), fixtures::STACKED_MODEL_JSON).unwrap();
        fs::write(dir.join(LABEL_ENCODER_FILE), fixtures::LABEL_ENCODER_JSON).unwrap();
    }

    #[test]
    fn load_demo_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());

        let set = ArtifactSet::load(dir.path()).unwrap();
        let summary = set.summary();
        assert_eq!(summary.word_features, 6);
        assert_eq!(summary.char_features, 4);
        assert_eq!(summary.model_kind, "stacking");
        assert_eq!(summary.model_features, 10);
        assert_eq!(summary.classes, vec!["Phishing Email", "Safe Email"]);
        assert_eq!(summary.char_analyzer, Analyzer::CharWb);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        fs::remove_file(dir.path().join(LABEL_ENCODER_FILE)).unwrap();

        match ArtifactSet::load(dir.path()) {
            Err(ArtifactError::NotFound(path)) => {
                assert!(path.ends_with(LABEL_ENCODER_FILE));
            }
            Err(other) => panic!("expected NotFound, got {other}"),
            Ok(_) => panic!("expected NotFound, got a loaded set"),
        }
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        fs::write(dir.path().join(MODEL_FILE), b"\x80\x04\x95 not json").unwrap();

        assert!(matches!(
            ArtifactSet::load(dir.path()),
            Err(ArtifactError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_vectorizer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        fs::write(
            dir.path().join(WORD_VECTORIZER_FILE),
            r#"{"analyzer": "word", "ngram_range": [1, 1], "vocabulary": {"a": 0}, "idf": [1.0, 2.0]}"#,
        )
        .unwrap();

        match ArtifactSet::load(dir.path()) {
            Err(ArtifactError::Invalid { artifact, .. }) => assert_eq!(artifact, "word vectorizer"),
            Err(other) => panic!("expected Invalid, got {other}"),
            Ok(_) => panic!("expected Invalid, got a loaded set"),
        }
    }

    #[test]
    fn vectorizers_from_another_run_are_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        // A char vectorizer with one extra column.
        fs::write(
            dir.path().join(CHAR_VECTORIZER_FILE),
            r#"{"analyzer": "char_wb", "ngram_range": [3, 3],
                "vocabulary": {"ver": 0, "pas": 1, "mee": 2, "lun": 3, "acc": 4}}"#,
        )
        .unwrap();

        let err = ArtifactSet::load(dir.path()).err().expect("load should fail");
        assert!(matches!(err, ArtifactError::Inconsistent(_)));
        assert!(err.to_string().contains("6 + 5 = 11"), "{err}");
    }

    #[test]
    fn label_count_must_match_classifier() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        fs::write(
            dir.path().join(LABEL_ENCODER_FILE),
            r#"{"classes": ["Phishing Email", "Safe Email", "Spam"]}"#,
        )
        .unwrap();

        let err = ArtifactSet::load(dir.path()).err().expect("load should fail");
        assert!(err.to_string().contains("label encoder has 3"), "{err}");
    }

    #[test]
    fn from_parts_validates_vectorizers() {
        let demo = fixtures::demo_artifacts();
        // Six vocabulary terms but a single idf weight.
        let word: TfidfVectorizer = serde_json::from_str(
            r#"{"analyzer": "word", "ngram_range": [1, 1],
                "vocabulary": {"account": 0, "verify": 1, "password": 2,
                               "meeting": 3, "lunch": 4, "tomorrow": 5},
                "idf": [1.0]}"#,
        )
        .unwrap();
        let model: Estimator = serde_json::from_str(fixtures::STACKED_MODEL_JSON).unwrap();

        match ArtifactSet::from_parts(
            word,
            demo.char_vectorizer().clone(),
            Box::new(model),
            demo.labels().clone(),
        ) {
            Err(ArtifactError::Invalid { artifact, reason }) => {
                assert_eq!(artifact, "word vectorizer");
                assert!(reason.contains("idf has 1 weights"), "{reason}");
            }
            Err(other) => panic!("expected Invalid, got {other}"),
            Ok(_) => panic!("expected Invalid, got an assembled set"),
        }
    }

    #[test]
    fn from_parts_validates_model() {
        let demo = fixtures::demo_artifacts();
        let model: Estimator = serde_json::from_str(
            r#"{"type": "logistic_regression", "coef": [], "intercept": []}"#,
        )
        .unwrap();

        match ArtifactSet::from_parts(
            demo.word_vectorizer().clone(),
            demo.char_vectorizer().clone(),
            Box::new(model),
            demo.labels().clone(),
        ) {
            Err(ArtifactError::Invalid { artifact, .. }) => assert_eq!(artifact, "classifier"),
            Err(other) => panic!("expected Invalid, got {other}"),
            Ok(_) => panic!("expected Invalid, got an assembled set"),
        }
    }

    #[test]
    fn from_parts_validates_labels() {
        let demo = fixtures::demo_artifacts();
        let labels: LabelEncoder =
            serde_json::from_str(r#"{"classes": ["Safe Email", "Safe Email"]}"#).unwrap();
        let model: Estimator = serde_json::from_str(fixtures::STACKED_MODEL_JSON).unwrap();

        match ArtifactSet::from_parts(
            demo.word_vectorizer().clone(),
            demo.char_vectorizer().clone(),
            Box::new(model),
            labels,
        ) {
            Err(ArtifactError::Invalid { artifact, .. }) => assert_eq!(artifact, "label encoder"),
            Err(other) => panic!("expected Invalid, got {other}"),
            Ok(_) => panic!("expected Invalid, got an assembled set"),
        }
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn onnx_model_needs_feature() {
        let dir = tempfile::tempdir().unwrap();
        write_demo(dir.path());
        fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();
        fs::write(dir.path().join(ONNX_MODEL_FILE), b"onnx").unwrap();

        let paths = ArtifactPaths::in_dir(dir.path());
        assert!(paths.model.ends_with(ONNX_MODEL_FILE));
        let err = ArtifactSet::load_paths(&paths).err().expect("load should fail");
        assert!(err.to_string().contains("`onnx` feature"), "{err}");
    }
}
