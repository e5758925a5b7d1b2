use thiserror::Error;

use crate::layout::FeatureLayout;

/// Failures of a single inference request.
///
/// None of these are retried: the pipeline is a pure function of its input
/// and the loaded artifacts, so a second attempt would fail the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Submitted text was empty or whitespace-only.
    ///
    /// Raised by input validation in front of the pipeline; the UI turns it
    /// into a warning rather than a failure.
    #[error("email text is empty")]
    EmptyInput,

    /// Artifacts disagree about feature or class dimensions.
    #[error("feature mismatch in {context}: expected {expected}, got {actual}")]
    FeatureMismatch {
        context: &'static str,
        expected: FeatureLayout,
        actual: FeatureLayout,
    },

    /// Text could not be decoded for vectorization.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Classifier produced no usable distribution.
    #[error("model error: {0}")]
    Model(String),
}

impl PipelineError {
    /// Shorthand for a mismatch between two flat widths.
    pub fn width_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::FeatureMismatch {
            context,
            expected: FeatureLayout::single(expected),
            actual: FeatureLayout::single(actual),
        }
    }

    /// Stable machine-readable name, used in API error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::FeatureMismatch { .. } => "feature_mismatch",
            Self::InvalidInput(_) => "invalid_input",
            Self::Model(_) => "model_error",
        }
    }

    /// Message safe to show to the person who submitted the email.
    ///
    /// Operator-facing detail (dimensions, model internals) stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Please paste or enter email content before clicking Detect.",
            Self::InvalidInput(_) => {
                "The email text could not be processed. Check that it is plain text and try again."
            }
            Self::FeatureMismatch { .. } | Self::Model(_) => {
                "Detection is unavailable right now. The operator has been notified."
            }
        }
    }

    /// Whether this error points at a deployment problem rather than bad input.
    pub fn is_operator_fault(&self) -> bool {
        matches!(self, Self::FeatureMismatch { .. } | Self::Model(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_shows_both_layouts() {
        let err = PipelineError::FeatureMismatch {
            context: "combined row",
            expected: FeatureLayout::new(vec![6, 4]),
            actual: FeatureLayout::new(vec![4, 6]),
        };
        assert_eq!(
            err.to_string(),
            "feature mismatch in combined row: expected [6 | 4], got [4 | 6]"
        );
    }

    #[test]
    fn width_mismatch_uses_single_blocks() {
        let err = PipelineError::width_mismatch("classifier input", 10, 9);
        assert_eq!(
            err.to_string(),
            "feature mismatch in classifier input: expected [10], got [9]"
        );
    }

    #[test]
    fn operator_faults() {
        assert!(PipelineError::width_mismatch("x", 1, 2).is_operator_fault());
        assert!(PipelineError::Model("nan".into()).is_operator_fault());
        assert!(!PipelineError::EmptyInput.is_operator_fault());
        assert!(!PipelineError::InvalidInput("bad utf-8".into()).is_operator_fault());
    }

    #[test]
    fn user_message_hides_internals() {
        let err = PipelineError::width_mismatch("classifier input", 10, 9);
        assert!(!err.user_message().contains("10"));
        assert_eq!(err.kind(), "feature_mismatch");
    }
}
