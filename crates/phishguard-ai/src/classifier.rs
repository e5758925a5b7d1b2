//! The classifier capability and the serialized estimator family.

use phishguard_core::PipelineError;
use serde::{Deserialize, Serialize};

use crate::linear::LogisticRegression;
use crate::sparse::SparseRow;
use crate::stacking::StackingClassifier;
use crate::tree::{GradientBoosting, RandomForest};

/// A fitted probabilistic classifier over fixed-width feature rows.
///
/// Implementations are immutable after load and shared across requests.
pub trait Classifier: Send + Sync {
    /// Input width the model was fitted on.
    fn n_features(&self) -> usize;

    /// Number of output columns of [`predict_proba`](Self::predict_proba).
    fn n_classes(&self) -> usize;

    /// Short name of the model family, for summaries and logs.
    fn kind(&self) -> &'static str;

    /// Class probabilities for one row, in the model's class order.
    ///
    /// Rows whose width differs from [`n_features`](Self::n_features) fail
    /// with [`PipelineError::FeatureMismatch`].
    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError>;

    /// Check the fitted parameters. A model that fails must not be asked
    /// for predictions.
    fn validate(&self) -> Result<(), String>;
}

pub(crate) fn check_width(
    context: &'static str,
    expected: usize,
    row: &SparseRow,
) -> Result<(), PipelineError> {
    if row.width() != expected {
        return Err(PipelineError::width_mismatch(context, expected, row.width()));
    }
    Ok(())
}

/// Any estimator that can appear in a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Stacking(StackingClassifier),
}

impl Estimator {
    /// Check parameters after deserialization, recursing into ensembles.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::LogisticRegression(m) => m.validate(),
            Self::RandomForest(m) => m.validate(),
            Self::GradientBoosting(m) => m.validate(),
            Self::Stacking(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::Stacking(m) => m,
        }
    }
}

impl Classifier for Estimator {
    fn validate(&self) -> Result<(), String> {
        Estimator::validate(self)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn n_classes(&self) -> usize {
        self.inner().n_classes()
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        self.inner().predict_proba(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_estimators() {
        let json = r#"{
            "type": "stacking",
            "estimators": [
                {"name": "lr", "estimator": {
                    "type": "logistic_regression",
                    "coef": [[1.0, -1.0]],
                    "intercept": [0.0]
                }},
                {"name": "rf", "estimator": {
                    "type": "random_forest",
                    "n_features": 2,
                    "n_classes": 2,
                    "trees": [{
                        "children_left": [1, -1, -1],
                        "children_right": [2, -1, -1],
                        "feature": [0, -2, -2],
                        "threshold": [0.5, -2.0, -2.0],
                        "value": [[5, 5], [1, 4], [4, 1]]
                    }]
                }}
            ],
            "final_estimator": {
                "type": "logistic_regression",
                "coef": [[1.0, 1.0]],
                "intercept": [-1.0]
            }
        }"#;
        let model: Estimator = serde_json::from_str(json).unwrap();
        model.validate().unwrap();
        assert_eq!(model.kind(), "stacking");
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.n_classes(), 2);

        let probs = model.predict_proba(&SparseRow::from_dense(&[1.0, 0.0])).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let json = r#"{"type": "svm", "coef": []}"#;
        assert!(serde_json::from_str::<Estimator>(json).is_err());
    }

    #[test]
    fn validate_reports_nested_errors() {
        let json = r#"{
            "type": "stacking",
            "estimators": [
                {"name": "bad", "estimator": {
                    "type": "logistic_regression",
                    "coef": [[1.0]],
                    "intercept": []
                }}
            ],
            "final_estimator": {"type": "logistic_regression", "coef": [[1.0]], "intercept": [0.0]}
        }"#;
        let model: Estimator = serde_json::from_str(json).unwrap();
        let err = model.validate().unwrap_err();
        assert!(err.contains("\"bad\""), "{err}");
    }
}
