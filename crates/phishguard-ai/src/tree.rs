//! Decision-tree ensembles: random forests and gradient-boosted trees.
//!
//! Trees are stored as parallel node arrays. Node 0 is the root; a node whose
//! `children_left` is negative is a leaf. Internal nodes send a row left when
//! its value at `feature` passes the split test against `threshold`.

use phishguard_core::PipelineError;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, check_width};
use crate::linear::{sigmoid, softmax};
use crate::sparse::SparseRow;

/// Comparison used at internal nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// `x <= threshold` goes left.
    #[default]
    LessEqual,
    /// `x < threshold` goes left.
    Less,
}

/// A single fitted decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    /// Per-node output: class counts for forests, one leaf weight for boosting.
    value: Vec<Vec<f64>>,
    #[serde(default)]
    split: SplitRule,
    /// Branch taken when the split feature is absent from a sparse row.
    /// Empty means absent features compare as zero.
    #[serde(default)]
    missing_left: Vec<bool>,
}

impl Tree {
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
            split: SplitRule::default(),
            missing_left: Vec::new(),
        }
    }

    pub fn with_split(mut self, split: SplitRule) -> Self {
        self.split = split;
        self
    }

    pub fn with_missing_left(mut self, missing_left: Vec<bool>) -> Self {
        self.missing_left = missing_left;
        self
    }

    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] < 0
    }

    /// Check array shapes, child links, and feature indices.
    ///
    /// `value_width` is the required length of every node's value vector.
    pub fn validate(&self, n_features: usize, value_width: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        let lengths = [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ];
        if lengths.iter().any(|&l| l != n) {
            return Err(format!("tree node arrays differ in length ({n} vs {lengths:?})"));
        }
        if !self.missing_left.is_empty() && self.missing_left.len() != n {
            return Err(format!(
                "missing_left has {} entries for {n} nodes",
                self.missing_left.len()
            ));
        }
        for node in 0..n {
            if self.value[node].len() != value_width {
                return Err(format!(
                    "node {node} has {} values, expected {value_width}",
                    self.value[node].len()
                ));
            }
            if self.is_leaf(node) {
                continue;
            }
            let (left, right) = (self.children_left[node], self.children_right[node]);
            // Children must point forward; this also rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {node} has invalid child {child}"));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(format!(
                    "node {node} splits on feature {feature}, model has {n_features}"
                ));
            }
            if self.threshold[node].is_nan() {
                return Err(format!("node {node} has a NaN threshold"));
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf this row falls into.
    pub fn leaf_value(&self, row: &SparseRow) -> &[f64] {
        let mut node = 0usize;
        while !self.is_leaf(node) {
            let feature = self.feature[node] as usize;
            let go_left = match row.get(feature) {
                None if !self.missing_left.is_empty() => self.missing_left[node],
                stored => {
                    let x = stored.unwrap_or(0.0);
                    match self.split {
                        SplitRule::LessEqual => x <= self.threshold[node],
                        SplitRule::Less => x < self.threshold[node],
                    }
                }
            };
            node = if go_left {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        &self.value[node]
    }
}

/// Averaged class-probability trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(n_features: usize, n_classes: usize, trees: Vec<Tree>) -> Result<Self, String> {
        let forest = Self {
            n_features,
            n_classes,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes < 2 {
            return Err(format!("random forest needs at least 2 classes, has {}", self.n_classes));
        }
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn validate(&self) -> Result<(), String> {
        RandomForest::validate(self)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        check_width("random forest input", self.n_features, row)?;
        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let counts = tree.leaf_value(row);
            let total: f64 = counts.iter().sum();
            for (p, c) in probs.iter_mut().zip(counts) {
                *p += if total > 0.0 {
                    c / total
                } else {
                    1.0 / self.n_classes as f64
                };
            }
        }
        let n_trees = self.trees.len() as f64;
        for p in &mut probs {
            *p /= n_trees;
        }
        Ok(probs)
    }
}

/// One boosting round's tree and the output group it adds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTree {
    #[serde(default)]
    class_index: usize,
    tree: Tree,
}

impl BoostedTree {
    pub fn new(class_index: usize, tree: Tree) -> Self {
        Self { class_index, tree }
    }
}

/// Additive tree model producing logits.
///
/// Binary models have a single output group passed through a sigmoid;
/// multiclass models have one group per class passed through a softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_features: usize,
    n_classes: usize,
    base_margin: Vec<f64>,
    trees: Vec<BoostedTree>,
}

impl GradientBoosting {
    pub fn new(
        n_features: usize,
        n_classes: usize,
        base_margin: Vec<f64>,
        trees: Vec<BoostedTree>,
    ) -> Result<Self, String> {
        let model = Self {
            n_features,
            n_classes,
            base_margin,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    fn n_groups(&self) -> usize {
        if self.n_classes == 2 { 1 } else { self.n_classes }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes < 2 {
            return Err(format!(
                "gradient boosting needs at least 2 classes, has {}",
                self.n_classes
            ));
        }
        let groups = self.n_groups();
        if self.base_margin.len() != groups {
            return Err(format!(
                "base_margin has {} entries, expected {groups}",
                self.base_margin.len()
            ));
        }
        for (i, boosted) in self.trees.iter().enumerate() {
            if boosted.class_index >= groups {
                return Err(format!(
                    "tree {i} targets group {}, model has {groups}",
                    boosted.class_index
                ));
            }
            boosted
                .tree
                .validate(self.n_features, 1)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    /// Summed margins per output group.
    pub fn margins(&self, row: &SparseRow) -> Vec<f64> {
        let mut margins = self.base_margin.clone();
        for boosted in &self.trees {
            margins[boosted.class_index] += boosted.tree.leaf_value(row)[0];
        }
        margins
    }
}

impl Classifier for GradientBoosting {
    fn validate(&self) -> Result<(), String> {
        GradientBoosting::validate(self)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn kind(&self) -> &'static str {
        "gradient_boosting"
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        check_width("gradient boosting input", self.n_features, row)?;
        let margins = self.margins(row);
        if margins.len() == 1 {
            let p = sigmoid(margins[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&margins))
    }
}
