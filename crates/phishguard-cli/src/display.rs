//! Terminal result card and artifact summary.
//!
//! Renders a prediction as a short vertical card: verdict headline, advice,
//! one line per class with a percentage and a bar, then the review note.

use std::fmt;

use phishguard_ai::ArtifactSummary;
use phishguard_core::{Prediction, Verdict};

const BAR_WIDTH: usize = 30;

pub const REVIEW_NOTE: &str = "If you believe this is a false positive/negative, please review the email carefully and report as needed.";

// ── Public API ──

/// Print a prediction as a result card.
pub fn print_result_card(prediction: &Prediction, phishing_label: &str) {
    print!(
        "{}",
        ResultCard {
            prediction,
            phishing_label,
        }
    );
}

/// Print what was loaded from the artifact directory.
pub fn print_summary(summary: &ArtifactSummary) {
    print!("{}", Summary(summary));
}

// ── Rendering ──

pub struct ResultCard<'a> {
    pub prediction: &'a Prediction,
    pub phishing_label: &'a str,
}

impl fmt::Display for ResultCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = self.prediction.verdict(self.phishing_label);
        let marker = match verdict {
            Verdict::Phishing => "[!]",
            Verdict::Safe => "[ok]",
        };

        writeln!(f, "=== Detection Result ===")?;
        writeln!(f, "{marker} {}", verdict.headline())?;
        writeln!(f, "    {}", verdict.advice())?;
        writeln!(f)?;
        writeln!(f, "Confidence")?;

        let name_width = self
            .prediction
            .distribution
            .iter()
            .map(|c| c.class.chars().count())
            .max()
            .unwrap_or(0);
        for class in &self.prediction.distribution {
            writeln!(
                f,
                "  {:<name_width$}  {:>7}  {}",
                class.class,
                format_percent(class.probability),
                bar(class.probability),
            )?;
        }

        writeln!(f)?;
        writeln!(f, "{REVIEW_NOTE}")
    }
}

pub struct Summary<'a>(pub &'a ArtifactSummary);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "=== Artifacts ===")?;
        writeln!(
            f,
            "  {:<16} {} features, {:?} {}",
            "word vectorizer",
            s.word_features,
            s.word_analyzer,
            ngram_range(s.word_ngram_range),
        )?;
        writeln!(
            f,
            "  {:<16} {} features, {:?} {}",
            "char vectorizer",
            s.char_features,
            s.char_analyzer,
            ngram_range(s.char_ngram_range),
        )?;
        writeln!(
            f,
            "  {:<16} {} over {} features",
            "model", s.model_kind, s.model_features,
        )?;
        writeln!(f, "  {:<16} {}", "classes", s.classes.join(", "))
    }
}

// ── Helpers ──

/// Probability as a percentage with two decimals.
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

fn bar(probability: f64) -> String {
    let filled = (probability.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn ngram_range((min_n, max_n): (usize, usize)) -> String {
    if min_n == max_n {
        format!("{min_n}-grams")
    } else {
        format!("{min_n}..={max_n}-grams")
    }
}
