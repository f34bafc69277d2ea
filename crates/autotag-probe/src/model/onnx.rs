use std::path::{Path, PathBuf};
use std::sync::Mutex;

use autotag_core::{EmbeddingBatch, ScoreMatrix};
use ndarray::{Array2, ArrayView2, s};
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, trace};

use crate::analysis::mel::{MelConfig, mel_spectrogram, patches};
use crate::audio::MonoAudio;
use crate::error::Error;
use crate::model::{ClassifierHead, EmbeddingModel, HeadSpec, ModelBackend};

/// Parches por llamada al runtime.
const BATCH_SIZE: usize = 64;

/// Modelos ONNX ejecutados con ONNX Runtime.
#[derive(Debug, Clone, Copy)]
pub struct OnnxBackend {
    intra_threads: usize,
}

impl OnnxBackend {
    pub fn new() -> Self {
        OnnxBackend { intra_threads: 1 }
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads.max(1);
        self
    }

    fn open(&self, path: &Path) -> Result<Session, Error> {
        if !path.is_file() {
            return Err(Error::model(path, "file not found"));
        }
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(self.intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| Error::model(path, e))?;
        debug!(path = %path.display(), "sesión ONNX abierta");
        Ok(session)
    }
}

impl Default for OnnxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBackend for OnnxBackend {
    fn load_embedding(
        &self,
        path: &Path,
        output: Option<&str>,
    ) -> Result<Box<dyn EmbeddingModel + Send + Sync>, Error> {
        Ok(Box::new(OnnxEmbeddingModel {
            session: Mutex::new(self.open(path)?),
            path: path.to_path_buf(),
            output: output.map(str::to_string),
            mel: MelConfig::default(),
        }))
    }

    fn load_head(&self, spec: &HeadSpec) -> Result<Box<dyn ClassifierHead + Send + Sync>, Error> {
        Ok(Box::new(OnnxClassifierHead {
            session: Mutex::new(self.open(&spec.path)?),
            path: spec.path.clone(),
            input_node: spec.input_node.clone(),
            output_node: spec.output_node.clone(),
        }))
    }
}

/// Extractor de embeddings: espectrograma mel -> parches -> modelo.
///
/// Sin nombre de salida se toma la última, que en los exports de EffNet y
/// MusiCNN es la capa de embeddings (la primera son las activaciones).
pub struct OnnxEmbeddingModel {
    // `run` necesita `&mut Session`
    session: Mutex<Session>,
    path: PathBuf,
    output: Option<String>,
    mel: MelConfig,
}

impl EmbeddingModel for OnnxEmbeddingModel {
    fn embed(&self, audio: &MonoAudio) -> Result<EmbeddingBatch, Error> {
        let mel = mel_spectrogram(&audio.samples, audio.sample_rate, &self.mel);
        let patches = patches(&mel, &self.mel);
        let total = patches.len_of(ndarray::Axis(0));

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Inference("embedding session poisoned".into()))?;

        let mut rows = RowCollector::default();
        for start in (0..total).step_by(BATCH_SIZE) {
            let end = (start + BATCH_SIZE).min(total);
            let batch = patches.slice(s![start..end, .., ..]).to_owned();
            let tensor = Tensor::from_array(batch).map_err(|e| Error::Inference(e.to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| Error::Inference(e.to_string()))?;
            let names: Vec<String> = outputs.iter().map(|(name, _)| name.to_string()).collect();
            let index = pick_output(&names, self.output.as_deref(), Pick::Last)?;
            let (_, value) = outputs
                .iter()
                .nth(index)
                .ok_or_else(|| Error::Inference("output vanished".into()))?;
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(e.to_string()))?;
            rows.push(data, end - start, &self.path)?;
        }

        trace!(path = %self.path.display(), patches = total, "embeddings calculados");
        rows.finish()
    }
}

pub struct OnnxClassifierHead {
    session: Mutex<Session>,
    path: PathBuf,
    input_node: String,
    output_node: String,
}

impl ClassifierHead for OnnxClassifierHead {
    fn classify(&self, embeddings: ArrayView2<'_, f32>) -> Result<ScoreMatrix, Error> {
        let total = embeddings.nrows();
        if total == 0 {
            return Ok(Array2::zeros((0, 0)));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Inference("head session poisoned".into()))?;

        let mut rows = RowCollector::default();
        for start in (0..total).step_by(BATCH_SIZE) {
            let end = (start + BATCH_SIZE).min(total);
            let batch = embeddings.slice(s![start..end, ..]).to_owned();
            let tensor = Tensor::from_array(batch).map_err(|e| Error::Inference(e.to_string()))?;

            let outputs = session
                .run(ort::inputs![self.input_node.as_str() => tensor])
                .map_err(|e| Error::Inference(e.to_string()))?;
            let names: Vec<String> = outputs.iter().map(|(name, _)| name.to_string()).collect();
            let index = pick_output(&names, Some(self.output_node.as_str()), Pick::First)?;
            let (_, value) = outputs
                .iter()
                .nth(index)
                .ok_or_else(|| Error::Inference("output vanished".into()))?;
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(e.to_string()))?;
            rows.push(data, end - start, &self.path)?;
        }

        rows.finish()
    }
}

#[derive(Clone, Copy)]
enum Pick {
    First,
    Last,
}

/// Índice de la salida `name`; si no existe, la primera o la última.
fn pick_output(names: &[String], name: Option<&str>, fallback: Pick) -> Result<usize, Error> {
    if let Some(i) = name.and_then(|n| names.iter().position(|k| k == n)) {
        return Ok(i);
    }
    if names.is_empty() {
        return Err(Error::Inference("model produced no outputs".into()));
    }
    let i = match fallback {
        Pick::First => 0,
        Pick::Last => names.len() - 1,
    };
    trace!(requested = ?name, using = %names[i], "salida no encontrada, uso la de respaldo");
    Ok(i)
}

/// Junta las filas de varios lotes en una sola matriz.
#[derive(Default)]
struct RowCollector {
    flat: Vec<f32>,
    rows: usize,
    width: Option<usize>,
}

impl RowCollector {
    fn push(&mut self, data: &[f32], rows: usize, path: &Path) -> Result<(), Error> {
        if rows == 0 || data.len() % rows != 0 {
            return Err(Error::model(path, format!("{} values for {rows} rows", data.len())));
        }
        let width = data.len() / rows;
        match self.width {
            Some(w) if w != width => {
                return Err(Error::model(path, format!("output width changed from {w} to {width}")));
            }
            _ => self.width = Some(width),
        }
        self.flat.extend_from_slice(data);
        self.rows += rows;
        Ok(())
    }

    fn finish(self) -> Result<Array2<f32>, Error> {
        let width = self.width.unwrap_or(0);
        Array2::from_shape_vec((self.rows, width), self.flat)
            .map_err(|e| Error::Inference(e.to_string()))
    }
}
