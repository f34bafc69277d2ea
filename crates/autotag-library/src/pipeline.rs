use std::path::Path;

use autotag_core::{
    Analysis, AnalysisError, AnalysisParams, PipelineKind, PipelineSpec, TAG_SEPARATOR, TagSink, TagWriteError,
    analyze, encode_value, encoding::SkippedTag, summarize_regression,
};
use autotag_probe::{ClassifierHead, HeadSpec, Probe};
use ndarray::ArrayView2;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{error::Stage, report::ReportContext, traits::ReportWriter};

/// Fallo de un pipeline con un fichero. No afecta a los demás pipelines.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("inference: {0}")]
    Inference(#[from] autotag_probe::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("tag write: {0}")]
    TagWrite(#[from] TagWriteError),

    #[error("report: {0:#}")]
    Report(anyhow::Error),
}

impl ProcessError {
    pub fn stage(&self) -> Stage {
        match self {
            ProcessError::Inference(_) | ProcessError::Analysis(_) => Stage::FileProcessing,
            ProcessError::TagWrite(_) => Stage::TagWrite,
            ProcessError::Report(_) => Stage::Report,
        }
    }
}

/// Resultado de un pipeline con un fichero.
#[derive(Debug)]
pub struct FileOutcome {
    pub analysis: Analysis,
    /// Valor a escribir, `None` si no había nada que escribir.
    pub value: Option<String>,
    /// Campos que cambiaron en el fichero.
    pub tags_written: usize,
    pub skipped: Vec<SkippedTag>,
    /// Informe o escritura de tags que fallaron. Uno no impide el otro.
    pub failures: Vec<ProcessError>,
}

/// Pipeline con su cabeza y sus etiquetas ya cargadas, listo para recibir embeddings.
pub struct PreparedPipeline {
    spec: PipelineSpec,
    head: Box<dyn ClassifierHead + Send + Sync>,
    labels: Vec<String>,
}

impl PreparedPipeline {
    /// Carga metadatos y cabeza. Un fallo aquí deja fuera solo a este pipeline.
    #[instrument(skip_all, fields(pipeline = %spec.name))]
    pub fn prepare(probe: &Probe, spec: &PipelineSpec) -> Result<Self, autotag_probe::Error> {
        let metadata = probe.load_metadata(&spec.metadata_path)?;
        let head = probe.load_head(&HeadSpec {
            path: spec.prediction_model_path.clone(),
            input_node: spec.input_node.clone(),
            output_node: spec.output_node.clone(),
        })?;
        debug!(labels = metadata.classes.len(), "pipeline preparado");

        Ok(PreparedPipeline {
            spec: spec.clone(),
            head,
            labels: metadata.classes,
        })
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Puntuaciones -> análisis. Sin efectos secundarios.
    pub fn analyze(&self, embeddings: ArrayView2<'_, f32>) -> Result<Analysis, ProcessError> {
        let scores = self.head.classify(embeddings)?;
        let analysis = match self.spec.kind {
            PipelineKind::Classification => {
                analyze(scores.view(), &self.labels, &AnalysisParams::from(&self.spec))?
            }
            PipelineKind::Regression => summarize_regression(scores.view(), &self.labels),
        };
        Ok(analysis)
    }

    /// Valor a escribir: las etiquetas formateadas o `empty_tag_value` tal cual.
    /// Las salidas de regresión (`"valence: -0.2500"`) se unen sin reformatear.
    pub fn tag_value(&self, analysis: &Analysis) -> Option<String> {
        if analysis.tags.is_empty() {
            return self.spec.empty_tag_value.clone();
        }
        match self.spec.kind {
            PipelineKind::Classification => Some(analysis.tags.to_value()),
            PipelineKind::Regression => Some(analysis.tags.iter().collect::<Vec<_>>().join(TAG_SEPARATOR)),
        }
    }

    /// Analiza un fichero con los embeddings compartidos del grupo, añade su
    /// bloque al informe y escribe los tags. Solo la inferencia y el análisis
    /// devuelven `Err`; los fallos de informe o de tags van en `failures`.
    pub fn process(
        &self,
        path: &Path,
        embeddings: ArrayView2<'_, f32>,
        sink: &dyn TagSink,
        reports: &dyn ReportWriter,
    ) -> Result<FileOutcome, ProcessError> {
        let analysis = self.analyze(embeddings)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let ctx = ReportContext {
            pipeline: &self.spec.name,
            file_name: &file_name,
            params: AnalysisParams::from(&self.spec),
        };
        let mut failures = Vec::new();
        if let Err(e) = reports.append(&self.spec.result_file_path, &ctx, &analysis) {
            warn!(pipeline = %self.spec.name, file = %file_name, "no se pudo escribir el informe: {e:#}");
            failures.push(ProcessError::Report(e));
        }

        let value = self.tag_value(&analysis);
        let (tags_written, skipped) = match &value {
            Some(v) if !self.spec.tags_to_write.is_empty() => {
                match encode_value(sink, path, &self.spec.tags_to_write, v) {
                    Ok(report) => (report.outcome.changed, report.skipped),
                    Err(e) => {
                        failures.push(ProcessError::TagWrite(e));
                        (0, Vec::new())
                    }
                }
            }
            _ => (0, Vec::new()),
        };

        debug!(
            pipeline = %self.spec.name,
            file = %file_name,
            labels = analysis.tags.len(),
            tags_written,
            "fichero procesado"
        );
        Ok(FileOutcome {
            analysis,
            value,
            tags_written,
            skipped,
            failures,
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use autotag_core::{EmbeddingBatch, ScoreMatrix};
    use autotag_probe::{AudioLoader, EmbeddingModel, ModelBackend, MonoAudio};
    use ndarray::Array2;

    use super::*;

    /// Devuelve un segundo de silencio, salvo para las rutas marcadas como rotas.
    #[derive(Default, Clone)]
    pub struct FakeLoader {
        pub broken: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl AudioLoader for FakeLoader {
        fn load(&self, path: &Path, sample_rate: u32, _quality: u8) -> Result<MonoAudio, autotag_probe::Error> {
            if self.broken.lock().unwrap().iter().any(|p| p == path) {
                return Err(autotag_probe::Error::Decode(format!("corrupt stream in {}", path.display())));
            }
            Ok(MonoAudio {
                samples: vec![0.0; sample_rate as usize],
                sample_rate,
            })
        }
    }

    /// Embeddings fijos; cuenta cuántas veces se le llama.
    pub struct CountingEmbedder {
        pub calls: Arc<AtomicUsize>,
        pub segments: usize,
    }

    impl EmbeddingModel for CountingEmbedder {
        fn embed(&self, _audio: &MonoAudio) -> Result<EmbeddingBatch, autotag_probe::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Array2::from_elem((self.segments, 4), 0.5))
        }
    }

    /// Cabeza que devuelve siempre la misma matriz de puntuaciones.
    pub struct FixedHead(pub ScoreMatrix);

    impl ClassifierHead for FixedHead {
        fn classify(&self, embeddings: ArrayView2<'_, f32>) -> Result<ScoreMatrix, autotag_probe::Error> {
            assert_eq!(embeddings.nrows(), self.0.nrows());
            Ok(self.0.clone())
        }
    }

    /// Backend en memoria: modelos de embeddings por ruta, cabezas por ruta.
    #[derive(Default, Clone)]
    pub struct FakeBackend {
        pub embed_calls: Arc<AtomicUsize>,
        pub embedding_loads: Arc<AtomicUsize>,
        pub segments: usize,
        pub heads: HashMap<PathBuf, ScoreMatrix>,
    }

    impl ModelBackend for FakeBackend {
        fn load_embedding(
            &self,
            path: &Path,
            _output: Option<&str>,
        ) -> Result<Box<dyn EmbeddingModel + Send + Sync>, autotag_probe::Error> {
            if path.to_string_lossy().contains("missing") {
                return Err(autotag_probe::Error::Model {
                    path: path.display().to_string(),
                    reason: "file not found".into(),
                });
            }
            self.embedding_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingEmbedder {
                calls: self.embed_calls.clone(),
                segments: self.segments,
            }))
        }

        fn load_head(&self, spec: &HeadSpec) -> Result<Box<dyn ClassifierHead + Send + Sync>, autotag_probe::Error> {
            match self.heads.get(&spec.path) {
                Some(scores) => Ok(Box::new(FixedHead(scores.clone()))),
                None => Err(autotag_probe::Error::Model {
                    path: spec.path.display().to_string(),
                    reason: "file not found".into(),
                }),
            }
        }
    }

    /// Informes que nunca se pueden escribir.
    #[derive(Default, Clone, Copy)]
    pub struct ReadOnlyReports;

    impl ReportWriter for ReadOnlyReports {
        fn reset(&self, _path: &Path) -> anyhow::Result<bool> {
            Ok(false)
        }

        fn append(&self, path: &Path, _ctx: &ReportContext<'_>, _analysis: &Analysis) -> anyhow::Result<()> {
            anyhow::bail!("results dir is read-only: {}", path.display())
        }
    }

    /// Comparte un `MemoryTagSink` con el test después de pasarlo al `Probe`.
    #[derive(Default, Clone)]
    pub struct SharedSink(pub Arc<autotag_core::MemoryTagSink>);

    impl TagSink for SharedSink {
        fn detect(&self, path: &Path) -> Result<autotag_core::ContainerKind, TagWriteError> {
            self.0.detect(path)
        }

        fn apply(
            &self,
            path: &Path,
            container: autotag_core::ContainerKind,
            writes: &[autotag_core::TagWrite],
        ) -> Result<autotag_core::WriteOutcome, TagWriteError> {
            self.0.apply(path, container, writes)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use autotag_core::{FieldTarget, MemoryTagSink};
    use ndarray::{Array2, array};
    use tempfile::tempdir;

    use super::fakes::*;
    use super::*;
    use crate::report::TextReportWriter;

    fn setup(kind: PipelineKind, scores: Array2<f32>, classes: &str) -> (tempfile::TempDir, PipelineSpec, Probe) {
        let tmp = tempdir().unwrap();
        let meta = tmp.path().join("head.json");
        fs::write(&meta, format!(r#"{{"classes": {classes}}}"#)).unwrap();
        let head = PathBuf::from("/models/head.onnx");

        let spec = PipelineSpec::builder()
            .name("genre")
            .data_folder("/music")
            .embedding_model_path("/models/effnet.onnx")
            .prediction_model_path(head.clone())
            .metadata_path(meta)
            .result_file_path(tmp.path().join("genre.txt"))
            .tags_to_write(vec!["GENRE_AUTO".to_string()])
            .min_freq(1usize)
            .kind(kind)
            .build()
            .unwrap();

        let backend = FakeBackend {
            segments: scores.nrows(),
            heads: [(head, scores)].into_iter().collect(),
            ..FakeBackend::default()
        };
        let probe = Probe::builder()
            .with_backend(backend)
            .with_sink(MemoryTagSink::default())
            .build();
        (tmp, spec, probe)
    }

    #[test]
    fn writes_formatted_labels_and_report() {
        let scores = array![[0.9_f32, 0.05], [0.8, 0.02]];
        let (_tmp, spec, probe) = setup(
            PipelineKind::Classification,
            scores,
            r#"["Classical---Chamber Music", "Rock"]"#,
        );
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();
        let sink = MemoryTagSink::default();
        let path = Path::new("/music/a.flac");

        let out = pipeline
            .process(path, Array2::zeros((2, 4)).view(), &sink, &TextReportWriter)
            .unwrap();
        assert_eq!(out.value.as_deref(), Some("Classical ; Chamber Music"));
        assert_eq!(out.tags_written, 1);
        assert_eq!(
            sink.field(path, &FieldTarget::VorbisComment { key: "GENRE_AUTO".into() })
                .as_deref(),
            Some("Classical ; Chamber Music")
        );

        let report = fs::read_to_string(&spec.result_file_path).unwrap();
        assert!(report.contains("--- Analysed file: a.flac ---"));
    }

    #[test]
    fn nothing_selected_writes_empty_value_verbatim() {
        let scores = array![[0.01_f32], [0.02]];
        let (_tmp, mut spec, probe) = setup(PipelineKind::Classification, scores, r#"["Rock"]"#);
        spec.min_score = 0.5;
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();
        let sink = MemoryTagSink::default();
        let path = Path::new("/music/a.mp3");

        let out = pipeline
            .process(path, Array2::zeros((2, 4)).view(), &sink, &TextReportWriter)
            .unwrap();
        assert!(out.analysis.tags.is_empty());
        assert_eq!(
            sink.field(path, &FieldTarget::UserText { description: "GENRE_AUTO".into() })
                .as_deref(),
            Some("nan")
        );
    }

    #[test]
    fn regression_heads_average_outputs() {
        let scores = array![[0.2_f32, 0.6], [0.4, 0.8]];
        let (_tmp, spec, probe) = setup(PipelineKind::Regression, scores, r#"["arousal", "valence"]"#);
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();

        let analysis = pipeline.analyze(Array2::zeros((2, 4)).view()).unwrap();
        let tags: Vec<&str> = analysis.tags.iter().collect();
        assert_eq!(tags, ["arousal: 0.3000", "valence: 0.7000"]);
    }

    #[test]
    fn negative_regression_means_are_written_with_their_sign() {
        let scores = array![[-0.5_f32, 0.1], [0.0, 0.1]];
        let (_tmp, spec, probe) = setup(PipelineKind::Regression, scores, r#"["valence", "arousal"]"#);
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();
        let sink = MemoryTagSink::default();
        let path = Path::new("/music/a.flac");

        let out = pipeline
            .process(path, Array2::zeros((2, 4)).view(), &sink, &TextReportWriter)
            .unwrap();
        assert!(out.failures.is_empty());
        assert_eq!(
            sink.field(path, &FieldTarget::VorbisComment { key: "GENRE_AUTO".into() })
                .as_deref(),
            Some("valence: -0.2500 ; arousal: 0.1000")
        );
    }

    #[test]
    fn report_failure_does_not_block_tags() {
        let scores = array![[0.9_f32], [0.8]];
        let (_tmp, spec, probe) = setup(PipelineKind::Classification, scores, r#"["Rock"]"#);
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();
        let sink = MemoryTagSink::default();
        let path = Path::new("/music/a.flac");

        let out = pipeline
            .process(path, Array2::zeros((2, 4)).view(), &sink, &ReadOnlyReports)
            .unwrap();
        assert_eq!(out.tags_written, 1);
        assert_eq!(
            sink.field(path, &FieldTarget::VorbisComment { key: "GENRE_AUTO".into() })
                .as_deref(),
            Some("Rock")
        );
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].stage(), Stage::Report);
    }

    #[test]
    fn tag_failure_still_writes_the_report() {
        let scores = array![[0.9_f32], [0.8]];
        let (_tmp, spec, probe) = setup(PipelineKind::Classification, scores, r#"["Rock"]"#);
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();

        let out = pipeline
            .process(
                Path::new("/music/a.xyz"),
                Array2::zeros((2, 4)).view(),
                &MemoryTagSink::default(),
                &TextReportWriter,
            )
            .unwrap();
        assert_eq!(out.tags_written, 0);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].stage(), Stage::TagWrite);
        let report = fs::read_to_string(&spec.result_file_path).unwrap();
        assert!(report.contains("--- Analysed file: a.xyz ---"));
    }

    #[test]
    fn label_count_mismatch_is_an_analysis_error() {
        let scores = array![[0.9_f32, 0.1]];
        let (_tmp, spec, probe) = setup(PipelineKind::Classification, scores, r#"["Rock"]"#);
        let pipeline = PreparedPipeline::prepare(&probe, &spec).unwrap();

        let err = pipeline.analyze(Array2::zeros((1, 4)).view()).unwrap_err();
        assert_eq!(err.stage(), Stage::FileProcessing);
        assert!(matches!(err, ProcessError::Analysis(AnalysisError::ShapeMismatch { .. })));
    }

    #[test]
    fn missing_metadata_fails_preparation() {
        let (_tmp, mut spec, probe) = setup(PipelineKind::Classification, array![[0.5_f32]], r#"["Rock"]"#);
        spec.metadata_path = PathBuf::from("/nonexistent/meta.json");
        assert!(PreparedPipeline::prepare(&probe, &spec).is_err());
    }
}
