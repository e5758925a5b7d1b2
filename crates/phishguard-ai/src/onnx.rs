//! ONNX Runtime classifier for models exported from the training environment.
//!
//! Expects a converted classifier with one float input of shape
//! `[batch, n_features]` whose last output is the `[batch, n_classes]`
//! probability tensor (the layout of converters run without zipmap).

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use phishguard_core::PipelineError;
use tracing::info;

use crate::classifier::{Classifier, check_width};
use crate::error::ArtifactError;
use crate::sparse::SparseRow;

/// Classifier backed by an ONNX Runtime session.
///
/// The session needs exclusive access to run, so concurrent requests are
/// serialised on a mutex; the model itself is never modified.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    probabilities_output: usize,
    n_features: usize,
    n_classes: usize,
}

impl OnnxClassifier {
    /// Load `path`, expecting `n_features` inputs and `n_classes` outputs.
    ///
    /// Static shapes in the model are checked against both; dynamic ones
    /// are checked on every run.
    pub fn load(path: &Path, n_features: usize, n_classes: usize) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }
        let session = Session::builder()?.commit_from_file(path)?;

        if let Some(width) = infer_last_dim(session.inputs()[0].dtype())
            && width != n_features
        {
            return Err(ArtifactError::Inconsistent(format!(
                "onnx model takes {width} features, vectorizers produce {n_features}"
            )));
        }

        let probabilities_output = session.outputs().len().saturating_sub(1);
        if let Some(classes) = infer_last_dim(session.outputs()[probabilities_output].dtype())
            && classes != n_classes
        {
            return Err(ArtifactError::Inconsistent(format!(
                "onnx model predicts {classes} classes, label encoder has {n_classes}"
            )));
        }

        info!(model = %path.display(), n_features, n_classes, "loaded onnx classifier");
        Ok(Self {
            session: Mutex::new(session),
            probabilities_output,
            n_features,
            n_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn validate(&self) -> Result<(), String> {
        // Shapes were checked against the session in `load`.
        Ok(())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn predict_proba(&self, row: &SparseRow) -> Result<Vec<f64>, PipelineError> {
        check_width("onnx input", self.n_features, row)?;

        let dense: Vec<f32> = row.to_dense().into_iter().map(|v| v as f32).collect();
        let shape = [1i64, self.n_features as i64];
        let input = Tensor::from_array((shape, dense.into_boxed_slice()))
            .map_err(|e| PipelineError::Model(format!("build input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::Model("onnx session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| PipelineError::Model(format!("onnx run: {e}")))?;

        let (out_shape, data) = outputs[self.probabilities_output]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Model(format!("read probabilities: {e}")))?;
        let dims: &[i64] = out_shape;
        if dims.len() != 2 || dims[0] != 1 || dims[1] as usize != self.n_classes {
            return Err(PipelineError::Model(format!(
                "unexpected probability shape {dims:?}, expected [1, {}]",
                self.n_classes
            )));
        }

        // Renormalise in f64 so single-precision rounding stays inside tolerance.
        let probs: Vec<f64> = data.iter().map(|&p| f64::from(p)).collect();
        let total: f64 = probs.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(PipelineError::Model(format!(
                "probabilities sum to {total}"
            )));
        }
        Ok(probs.into_iter().map(|p| p / total).collect())
    }
}

fn infer_last_dim(value_type: &ort::value::ValueType) -> Option<usize> {
    match value_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
