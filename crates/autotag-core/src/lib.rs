//! Crate `autotag_core`: modelo de datos, agrupación de pipelines, agregación
//! de predicciones y codificación de tags.

pub mod analysis;
pub mod encoding;
pub mod error;
pub mod grouping;
pub mod pipeline;
pub mod sink;
pub mod tagset;

pub use analysis::{Analysis, AnalysisParams, LabelReport, LabelStat, analyze, summarize_regression};
pub use encoding::{
    ContainerKind, EncodeReport, EncodingStrategy, FieldTarget, TagIdentifier, TagSink, TagWrite,
    TagWritePlan, WriteOutcome, encode_value, plan_writes,
};
pub use error::{AnalysisError, SpecError, TagWriteError};
pub use grouping::{GroupKey, PipelineGroup, group_pipelines};
pub use pipeline::{PipelineKind, PipelineSpec, PipelineSpecBuilder};
pub use sink::MemoryTagSink;
pub use tagset::{TAG_SEPARATOR, TagSet, format_tag_value};

/// Lote de embeddings de un fichero (segmentos × dimensión).
pub type EmbeddingBatch = ndarray::Array2<f32>;

/// Puntuaciones de una cabeza (segmentos × etiquetas).
pub type ScoreMatrix = ndarray::Array2<f32>;
