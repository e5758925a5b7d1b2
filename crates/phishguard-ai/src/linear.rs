//! Logistic regression.

use phishguard_core::PipelineError;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, check_width};
use crate::sparse::SparseRow;

/// How per-class scores of a multiclass model become probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    /// Softmax over all class scores.
    #[default]
    Multinomial,
    /// One-vs-rest: independent sigmoids, normalised to sum to one.
    Ovr,
}

/// A fitted logistic regression.
///
/// One coefficient row means a binary model over classes `[0, 1]`; `k >= 3`
/// rows mean one row per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    multi_class: MultiClass,
}

impl LogisticRegression {
    pub fn new(coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self, String> {
        let model = Self {
            coef,
            intercept,
            multi_class: MultiClass::default(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_multi_class(mut self, multi_class: MultiClass) -> Self {
        self.multi_class = multi_class;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let rows = self.coef.len();
        if rows == 0 {
            return Err("logistic regression has no coefficient rows".into());
        }
        if rows == 2 {
            return Err("binary logistic regression must have a single coefficient row".into());
        }
        if self.intercept.len() != rows {
            return Err(format!(
                "{} intercepts for {rows} coefficient rows",
                self.intercept.len()
            ));
        }
        let width = self.coef[0].len();
        if width == 0 {
            return Err("logistic regression has zero features".into());
        }
        if let Some((i, row)) = self.coef.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(format!(
                "coefficient row {i} has {} features, row 0 has {width}",
                row.len()
            ));
        }
        let finite = self
            .coef
            .iter()
            .flatten()
            .chain(&self.intercept)
            .all(|v| v.is_finite());
        if !finite {
            return Err("logistic regression has non-finite parameters".into());
        }
        Ok(())
    }

    /// Raw decision function, one score per coefficient row.
    pub fn decision_function(&self, row: &SparseRow) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| row.dot(w) + b)
            .collect()
    }
}

impl Classifier for LogisticRegression {
    fn validate(&self) -> Result<(), String> {
        LogisticRegression::validate(self)
    }

    fn n_features(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        if self.coef.len() == 1 { 2 } else { self.coef.len() }
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        check_width("logistic regression input", self.n_features(), row)?;
        let scores = self.decision_function(row);
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(match self.multi_class {
            MultiClass::Multinomial => softmax(&scores),
            MultiClass::Ovr => {
                let mut probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                let total: f64 = probs.iter().sum();
                for p in &mut probs {
                    *p /= total;
                }
                probs
            }
        })
    }
}

/// Logistic function, stable for large negative inputs.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Softmax with max-subtraction.
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
