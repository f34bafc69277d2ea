use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::SpecError;

pub const DEFAULT_TAG: &str = "GENRE_AUTO";
pub const DEFAULT_THRESHOLD: f32 = 0.1;
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_RESAMPLE_QUALITY: u8 = 4;
pub const DEFAULT_INPUT_NODE: &str = "serving_default_model_Placeholder";
pub const DEFAULT_OUTPUT_NODE: &str = "PartitionedCall";
pub const DEFAULT_EMPTY_TAG_VALUE: &str = "nan";

/// Cómo se interpreta la salida de la cabeza del pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Una columna por etiqueta; se filtra y se ordena.
    #[default]
    Classification,
    /// Valores continuos promediados por columna (arousal/valence, etc).
    Regression,
}

impl PipelineKind {
    /// Deducción por nombre para configuraciones que no declaran `kind`.
    pub fn infer_from_name(name: &str) -> Self {
        if name.to_ascii_lowercase().contains("arousal_valence") {
            PipelineKind::Regression
        } else {
            PipelineKind::Classification
        }
    }
}

/// Definición inmutable de un pipeline de etiquetado.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct PipelineSpec {
    pub name: String,
    pub data_folder: PathBuf,
    pub embedding_model_path: PathBuf,
    pub prediction_model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub result_file_path: PathBuf,
    pub tags_to_write: Vec<String>,
    pub threshold: f32,
    pub min_freq: usize,
    pub min_score: f32,
    pub max_labels: Option<usize>,
    pub sample_rate: u32,
    pub resample_quality: u8,
    pub input_node: String,
    pub output_node: String,
    /// Nombre de la salida del modelo de embeddings; `None` = última salida.
    pub embedding_output: Option<String>,
    pub kind: PipelineKind,
    /// Valor escrito cuando no se selecciona ninguna etiqueta. `None` = no escribir.
    pub empty_tag_value: Option<String>,
}

impl Default for PipelineSpec {
    fn default() -> Self {
        PipelineSpec {
            name: String::new(),
            data_folder: PathBuf::new(),
            embedding_model_path: PathBuf::new(),
            prediction_model_path: PathBuf::new(),
            metadata_path: PathBuf::new(),
            result_file_path: PathBuf::new(),
            tags_to_write: vec![DEFAULT_TAG.to_string()],
            threshold: DEFAULT_THRESHOLD,
            min_freq: 0,
            min_score: 0.0,
            max_labels: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            resample_quality: DEFAULT_RESAMPLE_QUALITY,
            input_node: DEFAULT_INPUT_NODE.to_string(),
            output_node: DEFAULT_OUTPUT_NODE.to_string(),
            embedding_output: None,
            kind: PipelineKind::Classification,
            empty_tag_value: Some(DEFAULT_EMPTY_TAG_VALUE.to_string()),
        }
    }
}

impl PipelineSpec {
    pub fn builder() -> PipelineSpecBuilder {
        PipelineSpecBuilder::default()
    }

    /// Comprueba campos obligatorios y rangos. `index` es la posición en la configuración.
    pub fn validate(&self, index: usize) -> Result<(), SpecError> {
        let missing = |field: &'static str| SpecError::MissingField { index, field };

        if self.name.trim().is_empty() {
            return Err(missing("name"));
        }
        let required_paths = [
            ("data_folder", &self.data_folder),
            ("embedding_model_path", &self.embedding_model_path),
            ("prediction_model_path", &self.prediction_model_path),
            ("metadata_path", &self.metadata_path),
            ("result_file_path", &self.result_file_path),
        ];
        for (field, path) in required_paths {
            if path.as_os_str().is_empty() {
                return Err(missing(field));
            }
        }

        let invalid = |reason: String| SpecError::InvalidValue {
            pipeline: self.name.clone(),
            reason,
        };

        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be greater than 0".into()));
        }
        if self.max_labels == Some(0) {
            return Err(invalid("max_labels must be at least 1 when present".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid(format!("threshold {} is outside [0, 1]", self.threshold)));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(invalid(format!("min_score {} is outside [0, 1]", self.min_score)));
        }
        if self.resample_quality > 4 {
            return Err(invalid(format!(
                "resample_quality {} is outside 0..=4",
                self.resample_quality
            )));
        }

        Ok(())
    }
}
