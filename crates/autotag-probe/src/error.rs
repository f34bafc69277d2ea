use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("resample failed: {0}")]
    Resample(String),

    #[error("audio is too short or silent: {0}")]
    EmptyAudio(String),

    #[error("model `{path}`: {reason}")]
    Model { path: String, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("metadata `{path}`: {reason}")]
    Metadata { path: String, reason: String },
}

impl Error {
    pub(crate) fn model(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Error::Model {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn metadata(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Error::Metadata {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
