//! Prediction results: label, ordered class distribution, and verdict.

use serde::Serialize;

use crate::error::PipelineError;

/// Allowed deviation of a distribution's sum from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Class name the stock artifacts use for phishing mail.
pub const DEFAULT_PHISHING_LABEL: &str = "Phishing Email";

/// Probability assigned to one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f64,
}

/// Outcome of one inference request.
///
/// `distribution` is in label-encoder order, which is fixed by the training
/// run and is not necessarily alphabetical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub label_index: usize,
    pub distribution: Vec<ClassProbability>,
}

impl Prediction {
    /// Pair `probabilities` with `classes` and pick the arg-max label.
    ///
    /// Rejects distributions whose length differs from the class count, that
    /// contain negative or non-finite values, or that do not sum to 1.
    pub fn from_distribution(
        classes: &[String],
        probabilities: Vec<f64>,
    ) -> Result<Self, PipelineError> {
        if probabilities.len() != classes.len() || classes.is_empty() {
            return Err(PipelineError::width_mismatch(
                "class distribution",
                classes.len(),
                probabilities.len(),
            ));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(PipelineError::Model(format!(
                "distribution contains invalid probability {bad}"
            )));
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(PipelineError::Model(format!(
                "distribution sums to {total}, not 1"
            )));
        }

        // Non-empty and finite, so there is always a maximum.
        let label_index = argmax(&probabilities).unwrap_or(0);
        let distribution = classes
            .iter()
            .zip(probabilities)
            .map(|(class, probability)| ClassProbability {
                class: class.clone(),
                probability,
            })
            .collect();

        Ok(Self {
            label: classes[label_index].clone(),
            label_index,
            distribution,
        })
    }

    /// Probability of the predicted label.
    pub fn confidence(&self) -> f64 {
        self.distribution[self.label_index].probability
    }

    /// Probability assigned to `class`, if it is one of the known classes.
    pub fn probability_of(&self, class: &str) -> Option<f64> {
        self.distribution
            .iter()
            .find(|c| c.class == class)
            .map(|c| c.probability)
    }

    pub fn verdict(&self, phishing_label: &str) -> Verdict {
        Verdict::from_label(&self.label, phishing_label)
    }
}

/// Index of the largest value; ties go to the first occurrence.
///
/// NaN never compares greater, so it is only chosen when every value is NaN.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            None => best = Some((i, v)),
            Some((_, b)) if v > b || (b.is_nan() && !v.is_nan()) => best = Some((i, v)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Presentation-level reading of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Phishing,
    Safe,
}

impl Verdict {
    pub fn from_label(label: &str, phishing_label: &str) -> Self {
        if label == phishing_label {
            Self::Phishing
        } else {
            Self::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phishing => "phishing",
            Self::Safe => "safe",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::Phishing => "Phishing Email Detected!",
            Self::Safe => "No Phishing Detected",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Phishing => "Do NOT click on any links or provide personal information.",
            Self::Safe => "This email appears safe, but always double-check!",
        }
    }
}
