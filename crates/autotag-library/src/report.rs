use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use autotag_core::{Analysis, AnalysisParams, LabelReport};
use autotag_paths::fs_utils::{ensure_parent, remove_if_exists};

use crate::traits::ReportWriter;

const RULE_WIDTH: usize = 80;

/// Lo que el bloque necesita saber aparte del análisis.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub pipeline: &'a str,
    /// Nombre del fichero, sin carpeta.
    pub file_name: &'a str,
    pub params: AnalysisParams,
}

/// Informes en texto plano UTF-8, un fichero por pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReportWriter;

impl ReportWriter for TextReportWriter {
    fn reset(&self, path: &Path) -> Result<bool> {
        remove_if_exists(path).with_context(|| format!("cannot remove {}", path.display()))
    }

    fn append(&self, path: &Path, ctx: &ReportContext<'_>, analysis: &Analysis) -> Result<()> {
        ensure_parent(path).with_context(|| format!("cannot create parent of {}", path.display()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        file.write_all(render_block(ctx, analysis).as_bytes())
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Bloque de un fichero: cabecera, parámetros, tabla, etiquetas asignadas y cierre.
pub fn render_block(ctx: &ReportContext<'_>, analysis: &Analysis) -> String {
    let mut out = String::new();
    let header = format!("--- Analysed file: {} ---", ctx.file_name);
    let params = &ctx.params;
    let max_labels = params
        .max_labels
        .map_or_else(|| "None".to_string(), |n| n.to_string());

    // write! sobre String no falla
    let _ = write!(out, "\n\n{header}\n");
    let _ = writeln!(
        out,
        "Parameters (threshold={}, min_freq={}, min_score={}, max_labels={}):",
        params.threshold, params.min_freq, params.min_score, max_labels
    );

    match &analysis.report {
        LabelReport::NoData => {
            out.push_str("No data: the file produced no segments.\n");
        }
        LabelReport::Classification { num_segments, stats } => {
            let _ = writeln!(out, "All labels over {num_segments} segments (* = written, ranked first):");
            let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            let _ = writeln!(
                out,
                "  {:<38} | {:>15} | {:>9} | {:>12}",
                "Label", "Segments > Thr", "Freq (%)", "Mean score"
            );
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
            for stat in stats {
                let mark = if stat.selected { '*' } else { ' ' };
                let _ = writeln!(
                    out,
                    "{mark} {:<38} | {:>15} | {:>9.2} | {:>12.4}",
                    stat.label, stat.frequency, stat.frequency_pct, stat.mean_score
                );
            }
            let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            if analysis.tags.is_empty() {
                out.push_str("No label passed the filters.\n");
            }
        }
        LabelReport::Regression { num_segments, outputs } => {
            let _ = writeln!(out, "Mean output values over {num_segments} segments:");
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
            for (name, value) in outputs {
                let _ = writeln!(out, "{name:<40} : {value:.4}");
            }
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        }
    }

    let title = format!("{} assigned", capitalize(ctx.pipeline));
    let assigned = if analysis.tags.is_empty() {
        "None".to_string()
    } else {
        analysis.tags.to_value()
    };
    let _ = writeln!(out, "{title:<25}: {assigned}");
    let _ = writeln!(out, "{}", "=".repeat(header.chars().count()));
    out
}
