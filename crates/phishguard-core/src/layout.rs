//! Block structure of horizontally stacked feature rows.

use std::fmt;

use serde::Serialize;

/// Ordered widths of the blocks a feature row was stacked from.
///
/// Two rows can share a total width and still be incompatible: `[6 | 4]`
/// (word then char) is not `[4 | 6]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FeatureLayout(Vec<usize>);

impl FeatureLayout {
    pub fn new(blocks: Vec<usize>) -> Self {
        Self(blocks)
    }

    /// Layout of a row produced by a single extractor.
    pub fn single(width: usize) -> Self {
        Self(vec![width])
    }

    pub fn blocks(&self) -> &[usize] {
        &self.0
    }

    /// Total number of columns.
    pub fn width(&self) -> usize {
        self.0.iter().sum()
    }

    /// Layout of `self` stacked to the left of `other`.
    pub fn concat(&self, other: &FeatureLayout) -> FeatureLayout {
        let mut blocks = Vec::with_capacity(self.0.len() + other.0.len());
        blocks.extend_from_slice(&self.0);
        blocks.extend_from_slice(&other.0);
        FeatureLayout(blocks)
    }
}

impl fmt::Display for FeatureLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, width) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{width}")?;
        }
        f.write_str("]")
    }
}
