//! Fitted TF-IDF text vectorizers.
//!
//! Reproduces the analysis of the training tool the artifacts were fitted
//! with: lowercasing, word tokens of two or more word characters, word or
//! character n-grams, optional sublinear term frequency, idf weighting, and
//! row normalisation. Only `transform` is provided; vocabularies and idf
//! weights come from the artifact file.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::sparse::SparseRow;

/// How text is split into terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Word n-grams.
    Word,
    /// Character n-grams over the whole (whitespace-collapsed) text.
    Char,
    /// Character n-grams inside space-padded words only.
    CharWb,
}

/// Row normalisation applied after weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    #[default]
    #[serde(rename = "l2")]
    L2,
    #[serde(rename = "l1")]
    L1,
    #[serde(rename = "none")]
    Unnormalized,
}

/// A fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    analyzer: Analyzer,
    ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default)]
    binary: bool,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default)]
    norm: Norm,
    #[serde(default)]
    stop_words: HashSet<String>,
    vocabulary: HashMap<String, usize>,
    #[serde(default)]
    idf: Option<Vec<f64>>,
}

fn default_true() -> bool {
    true
}

impl TfidfVectorizer {
    /// Build a vectorizer from its fitted state, checking consistency.
    pub fn new(
        analyzer: Analyzer,
        ngram_range: (usize, usize),
        vocabulary: HashMap<String, usize>,
        idf: Option<Vec<f64>>,
    ) -> Result<Self, String> {
        let vectorizer = Self {
            analyzer,
            ngram_range,
            lowercase: true,
            binary: false,
            sublinear_tf: false,
            norm: Norm::L2,
            stop_words: HashSet::new(),
            vocabulary,
            idf,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Check the fitted state after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({min_n}, {max_n})"));
        }
        let n = self.vocabulary.len();
        if n == 0 {
            return Err("vocabulary is empty".into());
        }
        let mut seen = vec![false; n];
        for (term, &col) in &self.vocabulary {
            if col >= n {
                return Err(format!(
                    "term {term:?} maps to column {col}, vocabulary has {n} columns"
                ));
            }
            if std::mem::replace(&mut seen[col], true) {
                return Err(format!("column {col} is assigned to more than one term"));
            }
        }
        if let Some(idf) = &self.idf {
            if idf.len() != n {
                return Err(format!(
                    "idf has {} weights, vocabulary has {n} terms",
                    idf.len()
                ));
            }
            if let Some(w) = idf.iter().find(|w| !w.is_finite()) {
                return Err(format!("idf contains non-finite weight {w}"));
            }
        }
        Ok(())
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.ngram_range
    }

    /// Output width (vocabulary size).
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Vectorize one document into a single-block row of width
    /// [`n_features`](Self::n_features).
    pub fn transform(&self, text: &str) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in self.analyze(text) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let weighted = counts.into_iter().map(|(col, count)| {
            let mut tf = if self.binary { 1.0 } else { count };
            if self.sublinear_tf {
                tf = tf.ln() + 1.0;
            }
            if let Some(weight) = self.idf.as_ref().and_then(|idf| idf.get(col)) {
                tf *= weight;
            }
            (col, tf)
        });

        let mut row = SparseRow::from_pairs(self.n_features(), weighted);
        match self.norm {
            Norm::L2 => row.l2_normalize(),
            Norm::L1 => row.l1_normalize(),
            Norm::Unnormalized => {}
        }
        row
    }

    /// Vectorize several documents, one row each.
    pub fn transform_batch<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseRow> {
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    /// Split a document into the terms that are looked up in the vocabulary.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let (min_n, max_n) = self.ngram_range;
        match self.analyzer {
            Analyzer::Word => {
                let tokens: Vec<&str> = word_tokens(&text)
                    .filter(|t| !self.stop_words.contains(*t))
                    .collect();
                word_ngrams(&tokens, min_n, max_n)
            }
            Analyzer::Char => char_ngrams(&collapse_whitespace(&text), min_n, max_n),
            Analyzer::CharWb => char_wb_ngrams(&collapse_whitespace(&text), min_n, max_n),
        }
    }
}

/// Word characters for tokenisation: alphanumerics and `_`.
///
/// `char::is_alphanumeric` also accepts combining marks that carry the
/// Other_Alphabetic property (Indic vowel signs), which the
/// training tokenizer's `\w` treats as separators. Scripts that rely on
/// those marks therefore tokenize into longer words than at fit time and
/// mostly miss the vocabulary; Latin, Cyrillic, Greek and CJK text is
/// unaffected.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Maximal runs of word characters that are at least two characters long.
fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|t| t.chars().nth(1).is_some())
}

fn word_ngrams(tokens: &[&str], min_n: usize, max_n: usize) -> Vec<String> {
    let mut grams = Vec::new();
    for n in min_n..=max_n.min(tokens.len()) {
        for window in tokens.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}

/// Replace every run of two or more whitespace characters with one space.
///
/// A lone whitespace character (a single newline, say) is kept as is.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

fn char_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut grams = Vec::new();
    for n in min_n..=max_n.min(chars.len()) {
        for window in chars.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

fn char_wb_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let mut grams = Vec::new();
    for word in text.split_whitespace() {
        let mut padded: Vec<char> = Vec::with_capacity(word.len() + 2);
        padded.push(' ');
        padded.extend(word.chars());
        padded.push(' ');

        for n in min_n..=max_n {
            if padded.len() <= n {
                // Too short for this n: the whole padded word counts once
                // and longer n-grams are skipped.
                grams.push(padded.iter().collect());
                break;
            }
            for window in padded.windows(n) {
                grams.push(window.iter().collect());
            }
        }
    }
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> HashMap<String, usize> {
        terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect()
    }

    fn word(terms: &[&str]) -> TfidfVectorizer {
        TfidfVectorizer::new(Analyzer::Word, (1, 1), vocab(terms), None).unwrap()
    }

    #[test]
    fn word_tokens_need_two_word_chars() {
        let v = word(&["x"]);
        assert_eq!(
            v.analyze("A quick_fix: call 1-800, I'm ok!"),
            vec!["quick_fix", "call", "800", "ok"]
        );
    }

    #[test]
    fn word_tokens_are_unicode_aware() {
        let v = word(&["x"]);
        assert_eq!(v.analyze("Überprüfen Sie Ihr Konto"), vec![
            "überprüfen",
            "sie",
            "ihr",
            "konto"
        ]);
    }

    #[test]
    fn word_bigrams_follow_unigrams() {
        let v = TfidfVectorizer::new(Analyzer::Word, (1, 2), vocab(&["x"]), None).unwrap();
        assert_eq!(v.analyze("click the link"), vec![
            "click",
            "the",
            "link",
            "click the",
            "the link"
        ]);
    }

    #[test]
    fn stop_words_removed_before_ngrams() {
        let v = TfidfVectorizer::new(Analyzer::Word, (2, 2), vocab(&["x"]), None)
            .unwrap()
            .with_stop_words(["the"]);
        assert_eq!(v.analyze("click the link"), vec!["click link"]);
    }

    #[test]
    fn char_ngrams_collapse_whitespace_runs() {
        let v = TfidfVectorizer::new(Analyzer::Char, (2, 2), vocab(&["x"]), None).unwrap();
        assert_eq!(v.analyze("ab  c"), vec!["ab", "b ", " c"]);
        // A single newline survives.
        assert_eq!(v.analyze("a\nb"), vec!["a\n", "\nb"]);
    }

    #[test]
    fn char_ngrams_shorter_than_n_yield_nothing() {
        let v = TfidfVectorizer::new(Analyzer::Char, (3, 4), vocab(&["x"]), None).unwrap();
        assert!(v.analyze("ab").is_empty());
        assert_eq!(v.analyze("abcd"), vec!["abc", "bcd", "abcd"]);
    }

    #[test]
    fn char_wb_pads_each_word() {
        let v = TfidfVectorizer::new(Analyzer::CharWb, (3, 3), vocab(&["x"]), None).unwrap();
        assert_eq!(v.analyze("Hi  you"), vec![" hi", "hi ", " yo", "you", "ou "]);
    }

    #[test]
    fn char_wb_short_word_counted_once() {
        let v = TfidfVectorizer::new(Analyzer::CharWb, (2, 5), vocab(&["x"]), None).unwrap();
        // " a " has length 3: bigrams, then the whole padded word once for n=3.
        assert_eq!(v.analyze("a"), vec![" a", "a ", " a "]);
    }

    #[test]
    fn transform_l2_normalizes_counts() {
        let v = word(&["verify", "account", "password"]);
        let row = v.transform("Verify account, verify now");
        assert_eq!(row.width(), 3);
        let dense = row.to_dense();
        // counts [2, 1, 0] -> [2, 1, 0] / sqrt(5)
        assert!((dense[0] - 2.0 / 5f64.sqrt()).abs() < 1e-12);
        assert!((dense[1] - 1.0 / 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(dense[2], 0.0);
    }

    #[test]
    fn transform_applies_idf_and_sublinear_tf() {
        let v = TfidfVectorizer::new(
            Analyzer::Word,
            (1, 1),
            vocab(&["urgent", "invoice"]),
            Some(vec![2.0, 1.0]),
        )
        .unwrap()
        .with_sublinear_tf(true)
        .with_norm(Norm::Unnormalized);

        let row = v.transform("urgent urgent urgent invoice");
        let dense = row.to_dense();
        assert!((dense[0] - 2.0 * (3f64.ln() + 1.0)).abs() < 1e-12);
        assert!((dense[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn transform_binary_and_l1() {
        let v = word(&["win", "prize"])
            .with_binary(true)
            .with_norm(Norm::L1);
        let dense = v.transform("win win win prize").to_dense();
        assert_eq!(dense, vec![0.5, 0.5]);
    }

    #[test]
    fn out_of_vocabulary_text_gives_zero_row() {
        let v = word(&["password"]);
        let row = v.transform("hello there");
        assert_eq!(row.width(), 1);
        assert_eq!(row.nnz(), 0);
    }

    #[test]
    fn lowercase_can_be_disabled() {
        let v = word(&["URGENT"]).with_lowercase(false);
        assert_eq!(v.transform("URGENT urgent").to_dense(), vec![1.0]);
    }

    #[test]
    fn validate_rejects_bad_state() {
        assert!(TfidfVectorizer::new(Analyzer::Word, (1, 1), HashMap::new(), None).is_err());
        assert!(TfidfVectorizer::new(Analyzer::Word, (2, 1), vocab(&["a"]), None).is_err());
        assert!(TfidfVectorizer::new(Analyzer::Word, (0, 1), vocab(&["a"]), None).is_err());

        let mut gap = HashMap::new();
        gap.insert("a".to_string(), 0);
        gap.insert("b".to_string(), 2);
        assert!(TfidfVectorizer::new(Analyzer::Word, (1, 1), gap, None).is_err());

        let mut dup = HashMap::new();
        dup.insert("a".to_string(), 0);
        dup.insert("b".to_string(), 0);
        assert!(TfidfVectorizer::new(Analyzer::Word, (1, 1), dup, None).is_err());

        let err = TfidfVectorizer::new(Analyzer::Word, (1, 1), vocab(&["a", "b"]), Some(vec![1.0]))
            .unwrap_err();
        assert!(err.contains("idf has 1 weights"), "{err}");
    }

    #[test]
    fn transform_tolerates_short_idf() {
        let json = r#"{
            "analyzer": "word",
            "ngram_range": [1, 1],
            "vocabulary": {"verify": 0, "account": 1},
            "idf": [2.0],
            "norm": "none"
        }"#;
        let v: TfidfVectorizer = serde_json::from_str(json).unwrap();
        assert!(v.validate().is_err());

        let row = v.transform("verify account");
        assert_eq!(row.get(0), Some(2.0));
        assert_eq!(row.get(1), Some(1.0));
    }

    #[test]
    fn other_alphabetic_marks_stay_in_word_tokens() {
        let v = TfidfVectorizer::new(Analyzer::Word, (1, 1), vocab(&["café"]), None).unwrap();
        // U+0301 COMBINING ACUTE ACCENT is a Mn without Other_Alphabetic.
        assert_eq!(v.analyze("cafe\u{301} ok"), vec!["cafe", "ok"]);
        // U+093F DEVANAGARI VOWEL SIGN I carries Other_Alphabetic.
        assert_eq!(v.analyze("\u{915}\u{93F}\u{924}"), vec!["\u{915}\u{93F}\u{924}"]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "analyzer": "char_wb",
            "ngram_range": [3, 5],
            "vocabulary": {"ver": 0, "pas": 1}
        }"#;
        let v: TfidfVectorizer = serde_json::from_str(json).unwrap();
        v.validate().unwrap();
        assert_eq!(v.analyzer(), Analyzer::CharWb);
        assert_eq!(v.ngram_range(), (3, 5));
        assert_eq!(v.n_features(), 2);
        assert!(v.lowercase);
        assert_eq!(v.norm, Norm::L2);
    }
}
