use std::cmp::Ordering;

use ndarray::{ArrayView2, Axis};

use crate::{error::AnalysisError, pipeline::PipelineSpec, tagset::TagSet};

/// Parámetros de filtrado de un pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    /// Puntuación mínima para que un segmento cuente a favor de una etiqueta.
    pub threshold: f32,
    /// Segmentos mínimos por encima de `threshold`.
    pub min_freq: usize,
    /// Media mínima sobre todos los segmentos.
    pub min_score: f32,
    /// `None` = sin límite.
    pub max_labels: Option<usize>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            threshold: crate::pipeline::DEFAULT_THRESHOLD,
            min_freq: 0,
            min_score: 0.0,
            max_labels: None,
        }
    }
}

impl From<&PipelineSpec> for AnalysisParams {
    fn from(spec: &PipelineSpec) -> Self {
        AnalysisParams {
            threshold: spec.threshold,
            min_freq: spec.min_freq,
            min_score: spec.min_score,
            max_labels: spec.max_labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStat {
    /// Columna de la etiqueta en la matriz de puntuaciones.
    pub index: usize,
    pub label: String,
    pub frequency: usize,
    /// `frequency / num_segments * 100`
    pub frequency_pct: f32,
    /// Media sobre todos los segmentos, no solo los que superan el umbral.
    pub mean_score: f32,
    pub selected: bool,
}

/// Informe completo de un (pipeline, fichero).
#[derive(Debug, Clone, PartialEq)]
pub enum LabelReport {
    /// La matriz no tenía segmentos.
    NoData,
    /// Todas las etiquetas: primero las seleccionadas en orden de ranking, luego el resto.
    Classification {
        num_segments: usize,
        stats: Vec<LabelStat>,
    },
    /// Media por salida de una cabeza de regresión.
    Regression {
        num_segments: usize,
        outputs: Vec<(String, f32)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub tags: TagSet,
    pub report: LabelReport,
}

impl Analysis {
    fn no_data() -> Self {
        Analysis {
            tags: TagSet::new(),
            report: LabelReport::NoData,
        }
    }
}

/// Mayor media primero; empate por mayor frecuencia; luego por columna.
fn rank(a: &LabelStat, b: &LabelStat) -> Ordering {
    b.mean_score
        .total_cmp(&a.mean_score)
        .then_with(|| b.frequency.cmp(&a.frequency))
        .then_with(|| a.index.cmp(&b.index))
}

/// Convierte la matriz de puntuaciones (segmentos × etiquetas) en el conjunto
/// final de etiquetas y en el informe completo.
pub fn analyze(
    scores: ArrayView2<'_, f32>,
    labels: &[String],
    params: &AnalysisParams,
) -> Result<Analysis, AnalysisError> {
    let (num_segments, columns) = scores.dim();
    if num_segments == 0 {
        return Ok(Analysis::no_data());
    }
    if columns != labels.len() {
        return Err(AnalysisError::ShapeMismatch {
            columns,
            labels: labels.len(),
        });
    }

    let mut stats: Vec<LabelStat> = scores
        .axis_iter(Axis(1))
        .zip(labels)
        .enumerate()
        .map(|(index, (column, label))| {
            let frequency = column.iter().filter(|&&s| s >= params.threshold).count();
            let sum: f64 = column.iter().map(|&s| s as f64).sum();
            let mean_score = (sum / num_segments as f64) as f32;
            LabelStat {
                index,
                label: label.clone(),
                frequency,
                frequency_pct: frequency as f32 / num_segments as f32 * 100.0,
                mean_score,
                selected: frequency >= params.min_freq && mean_score >= params.min_score,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.selected.cmp(&a.selected).then_with(|| rank(a, b)));

    let limit = params.max_labels.unwrap_or(usize::MAX);
    let mut tags = TagSet::new();
    for stat in stats.iter_mut().filter(|s| s.selected) {
        if tags.len() >= limit {
            // recortada por max_labels: sigue en el informe, pero no se escribe
            stat.selected = false;
            continue;
        }
        tags.push(stat.label.clone());
    }

    Ok(Analysis {
        tags,
        report: LabelReport::Classification {
            num_segments,
            stats,
        },
    })
}

/// Resumen de una cabeza de regresión: media por columna, sin umbrales.
///
/// Si `names` no coincide con el número de columnas se usan `Output_<n>`.
pub fn summarize_regression(outputs: ArrayView2<'_, f32>, names: &[String]) -> Analysis {
    let (num_segments, columns) = outputs.dim();
    if num_segments == 0 {
        return Analysis::no_data();
    }

    let means: Vec<(String, f32)> = outputs
        .axis_iter(Axis(1))
        .enumerate()
        .map(|(i, column)| {
            let name = if names.len() == columns {
                names[i].clone()
            } else {
                format!("Output_{}", i + 1)
            };
            let sum: f64 = column.iter().map(|&v| v as f64).sum();
            (name, (sum / num_segments as f64) as f32)
        })
        .collect();

    let tags = means
        .iter()
        .map(|(name, value)| format!("{name}: {value:.4}"))
        .collect();

    Analysis {
        tags,
        report: LabelReport::Regression {
            num_segments,
            outputs: means,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn params(threshold: f32, min_freq: usize, min_score: f32, max_labels: Option<usize>) -> AnalysisParams {
        AnalysisParams {
            threshold,
            min_freq,
            min_score,
            max_labels,
        }
    }

    fn stats(report: &LabelReport) -> &[LabelStat] {
        match report {
            LabelReport::Classification { stats, .. } => stats,
            other => panic!("esperaba informe de clasificación, obtuve {other:?}"),
        }
    }

    /// 10 segmentos, 8 por encima de 0.5 y media 0.82.
    fn eight_of_ten() -> Array2<f32> {
        let mut column = vec![0.95_f32; 8];
        column.extend([0.3, 0.3]);
        Array2::from_shape_vec((10, 1), column).unwrap()
    }

    #[test]
    fn frequency_counts_qualifying_segments_and_mean_uses_all() {
        let scores = eight_of_ten();
        let result = analyze(scores.view(), &labels(&["Rock"]), &params(0.5, 5, 0.0, None)).unwrap();

        let stat = &stats(&result.report)[0];
        assert_eq!(stat.frequency, 8);
        assert!((stat.mean_score - 0.82).abs() < 1e-5);
        assert!((stat.frequency_pct - 80.0).abs() < 1e-4);
        assert!(stat.selected);
        assert_eq!(result.tags.as_slice(), ["Rock"]);

        let result = analyze(scores.view(), &labels(&["Rock"]), &params(0.5, 9, 0.0, None)).unwrap();
        assert!(result.tags.is_empty());
        assert!(!stats(&result.report)[0].selected);
    }

    #[test]
    fn low_threshold_with_min_score() {
        // threshold 0.1 y min_score 0.07: 8 de 10 segmentos cuentan, media 0.82
        let mut column = vec![1.025_f32; 8];
        column.extend([0.0, 0.0]);
        let scores = Array2::from_shape_vec((10, 1), column).unwrap();

        let result = analyze(scores.view(), &labels(&["Rock"]), &params(0.1, 5, 0.07, None)).unwrap();
        let stat = &stats(&result.report)[0];
        assert_eq!(stat.frequency, 8);
        assert!((stat.mean_score - 0.82).abs() < 1e-5);
        assert_eq!(result.tags.as_slice(), ["Rock"]);

        let result = analyze(scores.view(), &labels(&["Rock"]), &params(0.1, 9, 0.07, None)).unwrap();
        assert!(result.tags.is_empty());
    }

    #[test]
    fn tie_at_082_is_broken_by_frequency() {
        // misma suma exacta: "Jazz" supera 0.1 en 6 segmentos, "Rock" en 8
        let a = 1.025_f32;
        let jazz = [a, a, a, a, 2.0 * a, 2.0 * a, 0.0, 0.0, 0.0, 0.0];
        let rock = [a, a, a, a, a, a, a, a, 0.0, 0.0];
        let mut scores = Array2::<f32>::zeros((10, 2));
        for i in 0..10 {
            scores[[i, 0]] = jazz[i];
            scores[[i, 1]] = rock[i];
        }

        let result = analyze(
            scores.view(),
            &labels(&["Jazz", "Rock"]),
            &params(0.1, 0, 0.07, None),
        )
        .unwrap();
        let stats = stats(&result.report);
        assert_eq!(stats[0].mean_score, stats[1].mean_score);
        assert!((stats[0].mean_score - 0.82).abs() < 1e-5);
        assert_eq!(result.tags.as_slice(), ["Rock", "Jazz"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let scores = array![[0.5_f32], [0.25], [0.5]];
        let result = analyze(scores.view(), &labels(&["Jazz"]), &params(0.5, 0, 0.0, None)).unwrap();
        assert_eq!(stats(&result.report)[0].frequency, 2);
    }

    #[test]
    fn min_score_filters_on_mean() {
        let scores = array![[0.75_f32, 0.25], [0.75, 0.25]];
        let result = analyze(
            scores.view(),
            &labels(&["Pop", "Folk"]),
            &params(0.1, 0, 0.5, None),
        )
        .unwrap();
        assert_eq!(result.tags.as_slice(), ["Pop"]);
        // el informe sigue listando las dos
        assert_eq!(stats(&result.report).len(), 2);
    }

    #[test]
    fn equal_means_are_ranked_by_frequency() {
        // ambas con media 0.75; "B" supera el umbral en 8 segmentos, "A" en 6
        let mut scores = Array2::<f32>::zeros((10, 2));
        for i in 0..10 {
            scores[[i, 0]] = if i < 6 { 1.0 } else { 0.375 };
            scores[[i, 1]] = if i < 8 { 0.875 } else { 0.25 };
        }
        let result = analyze(scores.view(), &labels(&["A", "B"]), &params(0.5, 0, 0.0, None)).unwrap();
        assert_eq!(result.tags.as_slice(), ["B", "A"]);
    }

    #[test]
    fn full_ties_fall_back_to_column_order() {
        let scores = array![[0.5_f32, 0.5, 0.5], [0.5, 0.5, 0.5]];
        let result = analyze(scores.view(), &labels(&["x", "y", "z"]), &params(0.1, 0, 0.0, None)).unwrap();
        assert_eq!(result.tags.as_slice(), ["x", "y", "z"]);

        // determinista entre ejecuciones
        let again = analyze(scores.view(), &labels(&["x", "y", "z"]), &params(0.1, 0, 0.0, None)).unwrap();
        assert_eq!(result, again);
    }

    #[test]
    fn max_labels_truncates_tags_but_not_report() {
        let row: Vec<f32> = (0..7).map(|i| 0.9 - i as f32 * 0.1).collect();
        let scores = Array2::from_shape_vec((2, 7), [row.clone(), row].concat()).unwrap();
        let names = labels(&["l0", "l1", "l2", "l3", "l4", "l5", "l6"]);

        let result = analyze(scores.view(), &names, &params(0.0, 0, 0.0, Some(5))).unwrap();
        assert_eq!(result.tags.as_slice(), ["l0", "l1", "l2", "l3", "l4"]);

        let stats = stats(&result.report);
        assert_eq!(stats.len(), 7);
        assert_eq!(stats.iter().filter(|s| s.selected).count(), 5);
    }

    #[test]
    fn zero_segments_yield_no_data() {
        let scores = Array2::<f32>::zeros((0, 3));
        let result = analyze(scores.view(), &labels(&["a", "b", "c"]), &AnalysisParams::default()).unwrap();
        assert!(result.tags.is_empty());
        assert_eq!(result.report, LabelReport::NoData);
    }

    #[test]
    fn column_mismatch_is_an_error() {
        let scores = Array2::<f32>::zeros((4, 3));
        let err = analyze(scores.view(), &labels(&["a", "b"]), &AnalysisParams::default()).unwrap_err();
        assert_eq!(err, AnalysisError::ShapeMismatch { columns: 3, labels: 2 });
    }

    #[test]
    fn regression_averages_each_output() {
        let outputs = array![[5.0_f32, 4.0], [6.0, 5.0]];
        let result = summarize_regression(outputs.view(), &labels(&["valence", "arousal"]));
        assert_eq!(result.tags.as_slice(), ["valence: 5.5000", "arousal: 4.5000"]);

        let unnamed = summarize_regression(outputs.view(), &[]);
        assert_eq!(unnamed.tags.as_slice(), ["Output_1: 5.5000", "Output_2: 4.5000"]);
    }
}
