use std::path::{Path, PathBuf};

use autotag_core::{
    PipelineKind, PipelineSpec, SpecError,
    pipeline::{
        DEFAULT_EMPTY_TAG_VALUE, DEFAULT_INPUT_NODE, DEFAULT_OUTPUT_NODE, DEFAULT_RESAMPLE_QUALITY,
        DEFAULT_SAMPLE_RATE, DEFAULT_TAG, DEFAULT_THRESHOLD,
    },
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::ConfigError,
    extensions::{SupportedExtension, default_extensions},
};

/// Prefijo de las variables de entorno que sobrescriben ajustes globales
/// (`AUTOTAG__INTRA_THREADS=4`).
pub const ENV_PREFIX: &str = "AUTOTAG";

fn default_enabled() -> bool {
    true
}

fn default_tags() -> Vec<String> {
    vec![DEFAULT_TAG.to_string()]
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_resample_quality() -> u8 {
    DEFAULT_RESAMPLE_QUALITY
}

fn default_input_node() -> String {
    DEFAULT_INPUT_NODE.to_string()
}

fn default_output_node() -> String {
    DEFAULT_OUTPUT_NODE.to_string()
}

fn default_empty_tag_value() -> Option<String> {
    Some(DEFAULT_EMPTY_TAG_VALUE.to_string())
}

fn default_intra_threads() -> usize {
    1
}

/// Un pipeline tal como aparece en el fichero. Los campos obligatorios son
/// opcionales aquí para poder señalar cuál falta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineEntry {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_folder: Option<PathBuf>,
    #[serde(default)]
    pub embedding_model_path: Option<PathBuf>,
    #[serde(default)]
    pub prediction_model_path: Option<PathBuf>,
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,
    #[serde(default)]
    pub result_file_path: Option<PathBuf>,
    #[serde(default = "default_tags")]
    pub tags_to_write: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub min_freq: usize,
    #[serde(default)]
    pub min_score: f32,
    /// Con signo para poder rechazar `0` y negativos con un mensaje claro.
    #[serde(default)]
    pub max_labels: Option<i64>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_resample_quality")]
    pub resample_quality: u8,
    #[serde(default = "default_input_node")]
    pub input_node: String,
    #[serde(default = "default_output_node")]
    pub output_node: String,
    #[serde(default)]
    pub embedding_output: Option<String>,
    #[serde(default)]
    pub kind: Option<PipelineKind>,
    #[serde(default = "default_empty_tag_value")]
    pub empty_tag_value: Option<String>,
}

impl PipelineEntry {
    /// `index` es la posición del pipeline en la lista del fichero.
    pub fn to_spec(&self, index: usize) -> Result<PipelineSpec, SpecError> {
        let required = |value: &Option<PathBuf>, field: &'static str| {
            value
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or(SpecError::MissingField { index, field })
        };

        let name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or(SpecError::MissingField { index, field: "name" })?;

        let max_labels = match self.max_labels {
            None => None,
            Some(n) if n >= 1 => Some(n as usize),
            Some(n) => {
                return Err(SpecError::InvalidValue {
                    pipeline: name,
                    reason: format!("max_labels must be at least 1, got {n}"),
                });
            }
        };

        let spec = PipelineSpec {
            kind: self.kind.unwrap_or_else(|| PipelineKind::infer_from_name(&name)),
            data_folder: required(&self.data_folder, "data_folder")?,
            embedding_model_path: required(&self.embedding_model_path, "embedding_model_path")?,
            prediction_model_path: required(&self.prediction_model_path, "prediction_model_path")?,
            metadata_path: required(&self.metadata_path, "metadata_path")?,
            result_file_path: required(&self.result_file_path, "result_file_path")?,
            tags_to_write: self.tags_to_write.clone(),
            threshold: self.threshold,
            min_freq: self.min_freq,
            min_score: self.min_score,
            max_labels,
            sample_rate: self.sample_rate,
            resample_quality: self.resample_quality,
            input_node: self.input_node.clone(),
            output_node: self.output_node.clone(),
            embedding_output: self.embedding_output.clone(),
            empty_tag_value: self.empty_tag_value.clone(),
            name,
        };
        spec.validate(index)?;
        Ok(spec)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub pipelines: Vec<PipelineEntry>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<SupportedExtension>,
    /// Hilos por sesión de inferencia.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("configuration file not found: {}", path.display()),
            )));
        }

        let path = path.to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Json))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let app = cfg.try_deserialize::<AppConfig>()?;
        debug!(path = %path, pipelines = app.pipelines.len(), "configuración leída");
        Ok(app)
    }

    /// Pipelines habilitados, validados y con valores por defecto, en el orden del fichero.
    pub fn enabled_pipelines(&self) -> Result<Vec<PipelineSpec>, ConfigError> {
        let mut specs = Vec::new();
        for (index, entry) in self.pipelines.iter().enumerate() {
            if !entry.enabled {
                info!(
                    pipeline = entry.name.as_deref().unwrap_or("<unnamed>"),
                    "pipeline deshabilitado, se ignora"
                );
                continue;
            }
            specs.push(entry.to_spec(index)?);
        }

        if specs.is_empty() {
            warn!("no hay pipelines habilitados");
        }
        Ok(specs)
    }
}
