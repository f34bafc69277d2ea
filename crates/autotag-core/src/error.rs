use thiserror::Error;

/// Errores de una definición de pipeline mal formada. Abortan la ejecución
/// antes de cargar cualquier modelo.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error("pipeline #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("pipeline `{pipeline}`: {reason}")]
    InvalidValue { pipeline: String, reason: String },

    #[error("pipeline name `{0}` is used more than once")]
    DuplicateName(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("score matrix has {columns} columns but {labels} labels were provided")]
    ShapeMismatch { columns: usize, labels: usize },
}

/// Fallos al escribir metadatos en un fichero concreto. Nunca afectan a otros ficheros.
#[derive(Debug, Error)]
pub enum TagWriteError {
    #[error("could not determine the container of {0}")]
    UnknownContainer(String),

    #[error("container `{0}` does not support tag writing")]
    UnsupportedContainer(String),

    #[error("file is read-only: {0}")]
    ReadOnly(String),

    #[error("tag backend error: {0}")]
    Backend(String),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}
