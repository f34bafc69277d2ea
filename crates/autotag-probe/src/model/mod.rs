pub mod metadata;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::path::{Path, PathBuf};

use autotag_core::{EmbeddingBatch, ScoreMatrix};
use ndarray::ArrayView2;

use crate::{audio::MonoAudio, error::Error};

pub use metadata::{ModelMetadata, load_metadata};

/// Modelo compartido por un grupo: audio mono -> embeddings (segmentos × dim).
pub trait EmbeddingModel {
    fn embed(&self, audio: &MonoAudio) -> Result<EmbeddingBatch, Error>;
}

/// Cabeza de un pipeline: embeddings -> puntuaciones (segmentos × etiquetas).
pub trait ClassifierHead {
    fn classify(&self, embeddings: ArrayView2<'_, f32>) -> Result<ScoreMatrix, Error>;
}

/// Dónde y cómo cargar la cabeza de un pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSpec {
    pub path: PathBuf,
    pub input_node: String,
    pub output_node: String,
}

/// Carga modelos desde disco. Un backend por runtime de inferencia.
pub trait ModelBackend {
    fn load_embedding(
        &self,
        path: &Path,
        output: Option<&str>,
    ) -> Result<Box<dyn EmbeddingModel + Send + Sync>, Error>;

    fn load_head(&self, spec: &HeadSpec) -> Result<Box<dyn ClassifierHead + Send + Sync>, Error>;
}

/// Backend por defecto cuando no se compiló ningún runtime.
pub struct NoopBackend;

impl ModelBackend for NoopBackend {
    fn load_embedding(
        &self,
        _path: &Path,
        _output: Option<&str>,
    ) -> Result<Box<dyn EmbeddingModel + Send + Sync>, Error> {
        Err(Error::Unsupported("no inference backend compiled in"))
    }

    fn load_head(&self, _spec: &HeadSpec) -> Result<Box<dyn ClassifierHead + Send + Sync>, Error> {
        Err(Error::Unsupported("no inference backend compiled in"))
    }
}
