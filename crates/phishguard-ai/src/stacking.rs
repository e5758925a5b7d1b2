//! Stacked ensemble: base estimators feed a final estimator.

use phishguard_core::PipelineError;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, Estimator, check_width};
use crate::sparse::SparseRow;

/// A base estimator with the name it was trained under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEstimator {
    pub name: String,
    pub estimator: Estimator,
}

/// Stacking classifier.
///
/// The final estimator sees one block of meta-features per base estimator:
/// its class probabilities, reduced to the positive-class column when there
/// are exactly two classes. With `passthrough` the original row is appended
/// after the meta-features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingClassifier {
    estimators: Vec<NamedEstimator>,
    final_estimator: Box<Estimator>,
    #[serde(default)]
    passthrough: bool,
}

impl StackingClassifier {
    pub fn new(
        estimators: Vec<NamedEstimator>,
        final_estimator: Estimator,
        passthrough: bool,
    ) -> Result<Self, String> {
        let model = Self {
            estimators,
            final_estimator: Box::new(final_estimator),
            passthrough,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn estimators(&self) -> &[NamedEstimator] {
        &self.estimators
    }

    fn columns_per_estimator(&self) -> usize {
        let n_classes = self.final_estimator.n_classes();
        if n_classes == 2 { 1 } else { n_classes }
    }

    /// Width of the row handed to the final estimator.
    pub fn meta_width(&self) -> usize {
        let passthrough = if self.passthrough { self.n_features() } else { 0 };
        self.estimators.len() * self.columns_per_estimator() + passthrough
    }

    pub fn validate(&self) -> Result<(), String> {
        let Some(first) = self.estimators.first() else {
            return Err("stacking has no base estimators".into());
        };
        self.final_estimator
            .validate()
            .map_err(|e| format!("final estimator: {e}"))?;

        for named in &self.estimators {
            named
                .estimator
                .validate()
                .map_err(|e| format!("estimator {:?}: {e}", named.name))?;
        }

        let n_features = first.estimator.n_features();
        let n_classes = self.final_estimator.n_classes();
        for named in &self.estimators {
            if named.estimator.n_features() != n_features {
                return Err(format!(
                    "estimator {:?} takes {} features, {:?} takes {n_features}",
                    named.name,
                    named.estimator.n_features(),
                    first.name
                ));
            }
            if named.estimator.n_classes() != n_classes {
                return Err(format!(
                    "estimator {:?} predicts {} classes, final estimator predicts {n_classes}",
                    named.name,
                    named.estimator.n_classes()
                ));
            }
        }

        let meta_width = self.meta_width();
        if self.final_estimator.n_features() != meta_width {
            return Err(format!(
                "final estimator takes {} features, stacking produces {meta_width}",
                self.final_estimator.n_features()
            ));
        }
        Ok(())
    }

    /// Meta-feature row for the final estimator.
    pub fn meta_features(&self, row: &SparseRow) -> Result<SparseRow, PipelineError> {
        let per_estimator = self.columns_per_estimator();
        let mut meta = Vec::with_capacity(self.estimators.len() * per_estimator);
        for named in &self.estimators {
            let probs = named.estimator.predict_proba(row)?;
            if per_estimator == 1 {
                meta.push(probs[1]);
            } else {
                meta.extend_from_slice(&probs);
            }
        }

        let meta = SparseRow::from_dense(&meta);
        if self.passthrough {
            Ok(SparseRow::hstack(&meta, row))
        } else {
            Ok(meta)
        }
    }
}

impl Classifier for StackingClassifier {
    fn validate(&self) -> Result<(), String> {
        StackingClassifier::validate(self)
    }

    fn n_features(&self) -> usize {
        self.estimators
            .first()
            .map(|e| e.estimator.n_features())
            .unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        self.final_estimator.n_classes()
    }

    fn kind(&self) -> &'static str {
        "stacking"
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        check_width("stacking input", self.n_features(), row)?;
        let meta = self.meta_features(row)?;
        self.final_estimator.predict_proba(&meta)
    }
}
