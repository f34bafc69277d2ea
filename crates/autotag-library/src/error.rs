use std::path::PathBuf;

use autotag_core::SpecError;
use thiserror::Error;

/// Errores que abortan la ejecución antes de procesar nada.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Invalid pipeline: {0}")]
    Spec(#[from] SpecError),
}

/// Etapa en la que se produjo un problema no fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Carga del modelo de embeddings, de una cabeza o de sus metadatos, o acceso a la carpeta.
    ResourceLoad,
    /// Decodificación, embeddings, inferencia o análisis de un fichero.
    FileProcessing,
    TagWrite,
    Report,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResourceLoad => "resource-load",
            Stage::FileProcessing => "file-processing",
            Stage::TagWrite => "tag-write",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Problema no fatal registrado durante la ejecución.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: Stage,
    /// Clave del grupo, legible.
    pub group: String,
    pub pipeline: Option<String>,
    pub file: Option<PathBuf>,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stage)?;
        if let Some(pipeline) = &self.pipeline {
            write!(f, " {pipeline}")?;
        }
        if let Some(file) = &self.file {
            write!(f, " {}", file.display())?;
        }
        write!(f, ": {}", self.message)
    }
}
