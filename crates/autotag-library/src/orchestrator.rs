use std::path::Path;
use std::time::Instant;

use autotag_core::{PipelineGroup, PipelineSpec, SpecError, group_pipelines};
use autotag_probe::{EmbeddingModel, Probe};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, instrument, warn};

use crate::{
    error::{Diagnostic, Stage},
    pipeline::PreparedPipeline,
    report::TextReportWriter,
    scanner::DirScanner,
    traits::{FileDiscovery, ReportWriter},
};

/// Contadores de una ejecución y los problemas no fatales encontrados.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub groups_processed: usize,
    pub groups_skipped: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub tags_written: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.stage {
            Stage::TagWrite | Stage::Report => warn!(%diagnostic, "problema no fatal"),
            _ => error!(%diagnostic, "problema no fatal"),
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Ejecuta los grupos de pipelines uno tras otro: un modelo de embeddings y
/// un recorrido de la carpeta por grupo, un embedding por fichero.
pub struct Orchestrator {
    probe: Probe,
    discovery: Box<dyn FileDiscovery + Send + Sync>,
    reports: Box<dyn ReportWriter + Send + Sync>,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(probe: Probe) -> Self {
        Orchestrator {
            probe,
            discovery: Box::new(DirScanner::default()),
            reports: Box::new(TextReportWriter),
            show_progress: false,
        }
    }

    pub fn with_discovery<D: FileDiscovery + Send + Sync + 'static>(mut self, d: D) -> Self {
        self.discovery = Box::new(d);
        self
    }

    pub fn with_reports<R: ReportWriter + Send + Sync + 'static>(mut self, r: R) -> Self {
        self.reports = Box::new(r);
        self
    }

    pub fn show_progress(mut self, yes: bool) -> Self {
        self.show_progress = yes;
        self
    }

    /// Solo una definición mal formada corta la ejecución, y lo hace antes de cargar nada.
    #[instrument(skip_all, fields(pipelines = specs.len()))]
    pub fn run(&self, specs: &[PipelineSpec]) -> Result<RunSummary, SpecError> {
        let groups = group_pipelines(specs)?;
        let mut summary = RunSummary::default();
        let start = Instant::now();

        self.reset_reports(specs, &mut summary);

        for group in &groups {
            self.run_group(group, &mut summary);
        }

        info!(
            groups = summary.groups_processed,
            skipped = summary.groups_skipped,
            files = summary.files_processed,
            failed = summary.files_failed,
            tags = summary.tags_written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ejecución terminada"
        );
        Ok(summary)
    }

    fn reset_reports(&self, specs: &[PipelineSpec], summary: &mut RunSummary) {
        for spec in specs {
            match self.reports.reset(&spec.result_file_path) {
                Ok(true) => info!(path = %spec.result_file_path.display(), "informe anterior borrado"),
                Ok(false) => {}
                Err(e) => summary.record(Diagnostic {
                    stage: Stage::Report,
                    group: String::new(),
                    pipeline: Some(spec.name.clone()),
                    file: Some(spec.result_file_path.clone()),
                    message: format!("{e:#}"),
                }),
            }
        }
    }

    #[instrument(skip_all, fields(group = %group.key))]
    fn run_group(&self, group: &PipelineGroup, summary: &mut RunSummary) {
        let key = &group.key;
        let group_name = key.to_string();
        let names: Vec<&str> = group.members.iter().map(|m| m.name.as_str()).collect();
        info!(pipelines = ?names, "procesando grupo");

        let group_fatal = |summary: &mut RunSummary, message: String| {
            summary.record(Diagnostic {
                stage: Stage::ResourceLoad,
                group: group_name.clone(),
                pipeline: None,
                file: None,
                message,
            });
            summary.groups_skipped += 1;
        };

        // El primer miembro decide la salida del modelo y la calidad del remuestreo.
        let lead = &group.members[0];

        let model = match self
            .probe
            .load_embedding_model(&key.embedding_model_path, lead.embedding_output.as_deref())
        {
            Ok(m) => m,
            Err(e) => return group_fatal(summary, format!("embedding model: {e}")),
        };

        let files = match self.discovery.discover(&key.data_folder) {
            Ok(f) => f,
            Err(e) => return group_fatal(summary, format!("{e:#}")),
        };

        let mut prepared = Vec::with_capacity(group.members.len());
        for spec in &group.members {
            match PreparedPipeline::prepare(&self.probe, spec) {
                Ok(p) => prepared.push(p),
                Err(e) => summary.record(Diagnostic {
                    stage: Stage::ResourceLoad,
                    group: group_name.clone(),
                    pipeline: Some(spec.name.clone()),
                    file: None,
                    message: e.to_string(),
                }),
            }
        }
        if prepared.is_empty() {
            warn!("ningún pipeline del grupo pudo cargarse, se omite");
            summary.groups_skipped += 1;
            return;
        }

        if files.is_empty() {
            warn!(folder = %key.data_folder.display(), "no hay ficheros de audio");
            summary.groups_processed += 1;
            return;
        }

        let bar = self.progress_bar(files.len() as u64, &names);
        for path in &files {
            bar.set_message(file_label(path));
            self.run_file(path, group, &group_name, model.as_ref(), &prepared, lead.resample_quality, summary);
            bar.inc(1);
        }
        bar.finish_and_clear();

        summary.groups_processed += 1;
    }

    #[allow(clippy::too_many_arguments)]
    fn run_file(
        &self,
        path: &Path,
        group: &PipelineGroup,
        group_name: &str,
        model: &(dyn EmbeddingModel + Send + Sync),
        prepared: &[PreparedPipeline],
        quality: u8,
        summary: &mut RunSummary,
    ) {
        let embeddings = self
            .probe
            .load_audio(path, group.key.sample_rate, quality)
            .and_then(|audio| model.embed(&audio));

        let embeddings = match embeddings {
            Ok(e) => e,
            Err(e) => {
                summary.files_failed += 1;
                summary.record(Diagnostic {
                    stage: Stage::FileProcessing,
                    group: group_name.to_string(),
                    pipeline: None,
                    file: Some(path.to_path_buf()),
                    message: e.to_string(),
                });
                return;
            }
        };

        for pipeline in prepared {
            match pipeline.process(path, embeddings.view(), self.probe.sink(), self.reports.as_ref()) {
                Ok(outcome) => {
                    summary.tags_written += outcome.tags_written;
                    for skipped in outcome.skipped {
                        summary.record(Diagnostic {
                            stage: Stage::TagWrite,
                            group: group_name.to_string(),
                            pipeline: Some(pipeline.name().to_string()),
                            file: Some(path.to_path_buf()),
                            message: format!("tag `{}` skipped: {}", skipped.identifier, skipped.reason),
                        });
                    }
                    for failure in outcome.failures {
                        summary.record(Diagnostic {
                            stage: failure.stage(),
                            group: group_name.to_string(),
                            pipeline: Some(pipeline.name().to_string()),
                            file: Some(path.to_path_buf()),
                            message: failure.to_string(),
                        });
                    }
                }
                Err(e) => summary.record(Diagnostic {
                    stage: e.stage(),
                    group: group_name.to_string(),
                    pipeline: Some(pipeline.name().to_string()),
                    file: Some(path.to_path_buf()),
                    message: e.to_string(),
                }),
            }
        }
        summary.files_processed += 1;
    }

    fn progress_bar(&self, len: u64, names: &[&str]) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(names.join("/"));
        bar
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
