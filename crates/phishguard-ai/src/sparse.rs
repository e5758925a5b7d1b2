//! Single-row sparse feature vectors and horizontal stacking.

use phishguard_core::FeatureLayout;

/// One sparse feature row.
///
/// Indices are strictly increasing and below `layout.width()`. Columns not
/// listed are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    layout: FeatureLayout,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseRow {
    /// An all-zero row of the given width.
    pub fn zeros(width: usize) -> Self {
        Self {
            layout: FeatureLayout::single(width),
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a single-block row from `(column, value)` pairs.
    ///
    /// Pairs may arrive in any order; duplicates are summed, explicit zeros
    /// and out-of-range columns are dropped.
    pub fn from_pairs(width: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut pairs: Vec<(usize, f64)> = pairs.into_iter().filter(|(i, _)| *i < width).collect();
        pairs.sort_by_key(|(i, _)| *i);

        let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            if indices.last() == Some(&i) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(i);
                values.push(v);
            }
        }

        let mut row = Self {
            layout: FeatureLayout::single(width),
            indices,
            values,
        };
        row.drop_zeros();
        row
    }

    /// Build a single-block row from a dense slice.
    pub fn from_dense(dense: &[f64]) -> Self {
        Self::from_pairs(dense.len(), dense.iter().copied().enumerate())
    }

    /// Stack `left` and `right` along the feature axis.
    ///
    /// `right`'s columns are shifted by `left`'s width, and the layout
    /// records both blocks in order.
    pub fn hstack(left: &SparseRow, right: &SparseRow) -> SparseRow {
        let offset = left.width();
        let mut indices = Vec::with_capacity(left.nnz() + right.nnz());
        let mut values = Vec::with_capacity(left.nnz() + right.nnz());
        indices.extend_from_slice(&left.indices);
        values.extend_from_slice(&left.values);
        indices.extend(right.indices.iter().map(|i| i + offset));
        values.extend_from_slice(&right.values);

        SparseRow {
            layout: left.layout.concat(&right.layout),
            indices,
            values,
        }
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.layout.width()
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `column`, or `None` if it is not stored.
    pub fn get(&self, column: usize) -> Option<f64> {
        self.indices
            .binary_search(&column)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Value at `column`, treating unstored entries as zero.
    pub fn value(&self, column: usize) -> f64 {
        self.get(column).unwrap_or(0.0)
    }

    /// Dot product with a dense weight vector.
    ///
    /// Columns beyond `weights.len()` contribute nothing; callers check
    /// widths first.
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.iter()
            .filter_map(|(i, v)| weights.get(i).map(|w| w * v))
            .sum()
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.width()];
        for (i, v) in self.iter() {
            dense[i] = v;
        }
        dense
    }

    /// Scale to unit Euclidean norm. Zero rows are left unchanged.
    pub fn l2_normalize(&mut self) {
        let norm = self.values.iter().map(|v| v * v).sum::<f64>().sqrt();
        self.scale_by_inverse(norm);
    }

    /// Scale so absolute values sum to one. Zero rows are left unchanged.
    pub fn l1_normalize(&mut self) {
        let norm: f64 = self.values.iter().map(|v| v.abs()).sum();
        self.scale_by_inverse(norm);
    }

    fn scale_by_inverse(&mut self, norm: f64) {
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    fn drop_zeros(&mut self) {
        if self.values.iter().all(|v| *v != 0.0) {
            return;
        }
        let (indices, values): (Vec<usize>, Vec<f64>) = self
            .indices
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .filter(|(_, v)| *v != 0.0)
            .unzip();
        self.indices = indices;
        self.values = values;
    }
}
