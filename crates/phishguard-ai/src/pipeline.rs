//! Inference pipeline: word features ‖ char features → classifier → label.

use std::time::Instant;

use phishguard_core::{EmailText, FeatureLayout, PipelineError, Prediction};
use tracing::debug;

use crate::artifacts::{ArtifactSet, ArtifactSummary};
use crate::classifier::Classifier;
use crate::sparse::SparseRow;

/// Stateless request path over one immutable [`ArtifactSet`].
///
/// `Pipeline` is `Send + Sync`; build it once at startup and share it
/// behind an `Arc`.
pub struct Pipeline {
    artifacts: ArtifactSet,
    layout: FeatureLayout,
}

impl Pipeline {
    pub fn new(artifacts: ArtifactSet) -> Self {
        let layout = FeatureLayout::single(artifacts.word_vectorizer().n_features())
            .concat(&FeatureLayout::single(artifacts.char_vectorizer().n_features()));
        Self { artifacts, layout }
    }

    /// Classify one email.
    ///
    /// Identical text over the same artifacts always yields the identical
    /// prediction. Either a complete prediction is returned or an error.
    pub fn predict(&self, text: &EmailText) -> Result<Prediction, PipelineError> {
        let start = Instant::now();
        let row = self.featurize(text)?;
        let prediction = self.predict_row(&row)?;
        debug!(
            chars = text.char_count(),
            nnz = row.nnz(),
            label = %prediction.label,
            confidence = prediction.confidence(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "classified email"
        );
        Ok(prediction)
    }

    /// Vectorize with both extractors and stack word features first.
    pub fn featurize(&self, text: &EmailText) -> Result<SparseRow, PipelineError> {
        let word_vectorizer = self.artifacts.word_vectorizer();
        let char_vectorizer = self.artifacts.char_vectorizer();

        let word = word_vectorizer.transform(text.as_str());
        if word.width() != word_vectorizer.n_features() {
            return Err(PipelineError::width_mismatch(
                "word features",
                word_vectorizer.n_features(),
                word.width(),
            ));
        }

        let chars = char_vectorizer.transform(text.as_str());
        if chars.width() != char_vectorizer.n_features() {
            return Err(PipelineError::width_mismatch(
                "char features",
                char_vectorizer.n_features(),
                chars.width(),
            ));
        }

        Ok(SparseRow::hstack(&word, &chars))
    }

    /// Classify an already stacked feature row.
    ///
    /// The row's layout must be exactly `[word width | char width]`; a row
    /// stacked in the other order has the right total width but is rejected.
    pub fn predict_row(&self, row: &SparseRow) -> Result<Prediction, PipelineError> {
        if row.layout() != &self.layout {
            return Err(PipelineError::FeatureMismatch {
                context: "combined features",
                expected: self.layout.clone(),
                actual: row.layout().clone(),
            });
        }

        let probabilities = self.artifacts.classifier().predict_proba(row)?;
        Prediction::from_distribution(self.artifacts.labels().classes(), probabilities)
    }

    /// Expected layout of combined rows.
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Class names in distribution order.
    pub fn classes(&self) -> &[String] {
        self.artifacts.labels().classes()
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn summary(&self) -> ArtifactSummary {
        self.artifacts.summary()
    }
}
