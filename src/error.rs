use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("malformed artifact {path}: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("question {question_id} is missing from {source_name}")]
    KeyCoverageGap {
        question_id: String,
        source_name: String,
    },

    #[error("no aggregated answerability score for question {question_id}")]
    MissingKey { question_id: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("metric evaluation failed: {0}")]
    MetricFailure(String),
}

impl EnsembleError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EnsembleError>;
