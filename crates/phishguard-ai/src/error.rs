use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the model artifacts at startup.
///
/// Any of these is fatal: a process that cannot load a consistent artifact
/// set must not serve predictions.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {artifact}: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },

    #[error("artifacts do not come from one training run: {0}")]
    Inconsistent(String),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Onnx(#[from] ort::Error),
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}
