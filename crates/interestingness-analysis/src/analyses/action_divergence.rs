use std::{ops::Range, path::Path};

use interestingness_stats::{descriptive::DescriptiveStats, divergence::jensen_shannon};
use serde::{Deserialize, Serialize};

use crate::{
    archive::Archivable,
    config::AnalysisConfiguration,
    engine::{
        Analysis, AnalysisBase, Element, ElementNames, PersistentAnalysis, PlotLabels,
        SeriesResult,
    },
    error::{AnalysisError, SequenceError},
    export::{self, Column},
    record::{InteractionRecord, Records},
};

const ELEMENTS: ElementNames = ElementNames {
    high: "high-divergence",
    low: "low-divergence",
    neutral: "divergence",
};

const LABELS: PlotLabels<'static> = PlotLabels {
    stem: "action-factor-divergence",
    title: "Action Factor Divergence",
    y_label: "Mean JS divergence",
    high_label: "High divergence",
    low_label: "Low divergence",
};

const MEAN_COLUMN: &str = "Mean";

/// Flags timesteps where the ensemble's policies disagree about the action.
///
/// For every action factor, the divergence at a timestep is the generalized
/// Jensen-Shannon divergence between the ensemble members' distributions over
/// the factor's sub-actions. The scalar criterion is the mean over factors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionFactorDivergenceAnalysis {
    base: AnalysisBase,
    result: Option<DivergenceResult>,
}

/// Per-factor divergences of an analyzed trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceResult {
    /// Factor names, constant across the trace
    pub factors: Vec<String>,
    /// `factor_series[f][t]`: divergence of factor `f` at timestep `t`
    pub factor_series: Vec<Vec<f64>>,
    /// Mean divergence of each factor over the trace
    pub factor_means: Vec<f64>,
    /// Mean over factors, with its outliers
    pub mean: SeriesResult,
}

impl ActionFactorDivergenceAnalysis {
    #[must_use]
    pub fn new(records: Records, config: AnalysisConfiguration, image_format: &str) -> Self {
        Self {
            base: AnalysisBase::new(records, config, image_format),
            result: None,
        }
    }

    /// Per-factor results of the last run, if any.
    #[must_use]
    pub fn divergences(&self) -> Option<&DivergenceResult> {
        self.result.as_ref()
    }

    fn result(&self) -> Result<&DivergenceResult, AnalysisError> {
        self.result.as_ref().ok_or_else(|| AnalysisError::NotAnalyzed {
            analysis: Self::KIND.to_owned(),
        })
    }

    /// Divergence of every factor at every timestep, one episode per task.
    fn compute(
        &self,
        records: &Records,
        ranges: Vec<Range<usize>>,
        factors: &[String],
    ) -> Result<Vec<Vec<f64>>, AnalysisError> {
        let results = self.base.pool().execute(ranges, |_, range| {
            records[range.clone()]
                .iter()
                .zip(range)
                .map(|(record, t)| record_divergences(record, Some(t), factors))
                .collect::<Result<Vec<_>, _>>()
        });

        let mut factor_series = vec![Vec::with_capacity(records.len()); factors.len()];
        for result in results {
            let rows = result
                .map_err(|source| AnalysisError::Panicked {
                    analysis: Self::KIND.to_owned(),
                    source,
                })?
                .map_err(|e| AnalysisError::malformed(Self::KIND, e))?;
            for row in rows {
                for (series, divergence) in factor_series.iter_mut().zip(row) {
                    series.push(divergence);
                }
            }
        }
        Ok(factor_series)
    }

    fn write_reports(&self, dir: &Path, result: &DivergenceResult) -> Result<(), AnalysisError> {
        self.base.prepare_output(dir)?;

        let columns = result
            .factors
            .iter()
            .zip(&result.factor_series)
            .map(|(name, series)| Column::new(name, series))
            .chain([Column::new(MEAN_COLUMN, &result.mean.series)])
            .collect::<Vec<_>>();
        export::write_time_table(
            &dir.join("action-factor-divergence-time.csv"),
            &result.mean.episodes,
            &columns,
        )?;

        self.base.plot_series(dir, &result.mean, &LABELS)?;
        if self.base.config().params().render_plots {
            let bars = result
                .factors
                .iter()
                .map(String::as_str)
                .zip(result.factor_means.iter().copied())
                .collect::<Vec<_>>();
            self.base.renderer().render_bars(
                dir,
                "action-factor-divergence-factors",
                "Mean Action Factor Divergence",
                "Mean JS divergence",
                &bars,
            )?;
        }
        Ok(())
    }
}

/// Divergence of each factor of a single record, in factor order.
fn record_divergences(
    record: &InteractionRecord,
    t: Option<usize>,
    factors: &[String],
) -> Result<Vec<f64>, SequenceError> {
    if !record.factor_names().eq(factors.iter().map(String::as_str)) {
        return Err(SequenceError::FactorMismatch {
            t,
            expected: factors.to_vec(),
            found: record.factor_names().map(str::to_owned).collect(),
        });
    }
    record
        .action_factors
        .iter()
        .map(|factor| {
            jensen_shannon(&factor.distributions).ok_or_else(|| {
                SequenceError::InvalidDistributions {
                    t,
                    factor: factor.name.clone(),
                }
            })
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl Analysis for ActionFactorDivergenceAnalysis {
    fn name(&self) -> &'static str {
        Self::KIND
    }

    fn analyze(&mut self, output_dir: &Path) -> Result<(), AnalysisError> {
        let records = self.base.records(Self::KIND)?;
        let episodes = self.base.episodes(Self::KIND)?;
        let factors = records[0]
            .factor_names()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if factors.is_empty() {
            return Err(AnalysisError::malformed(
                Self::KIND,
                SequenceError::NoActionFactors,
            ));
        }

        let factor_series = self.compute(&records, episodes.ranges().collect(), &factors)?;
        let mean_series = (0..records.len())
            .map(|t| mean(&factor_series.iter().map(|s| s[t]).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        let factor_means = factor_series
            .iter()
            .map(|s| DescriptiveStats::finite(s.iter().copied()).map_or(f64::NAN, |d| d.mean))
            .collect();
        let rule = self.base.config().params().divergence_thresholds;
        let result = DivergenceResult {
            factors,
            factor_series,
            factor_means,
            mean: SeriesResult::detect(episodes, mean_series, rule),
        };
        tracing::info!(
            analysis = Self::KIND,
            factors = result.factors.len(),
            timesteps = result.mean.series.len(),
            high = result.mean.detection.outliers.above.len(),
            low = result.mean.detection.outliers.below.len(),
            "computed action factor divergences"
        );

        self.write_reports(output_dir, &result)?;
        self.result = Some(result);
        Ok(())
    }

    fn get_element_time(&self, t: usize) -> Result<Element, AnalysisError> {
        let result = self.result()?;
        let value = result.mean.value_at(Self::KIND, t)?;
        Ok(ELEMENTS.classify(result.mean.thresholds(), value))
    }

    fn get_element_datapoint(&self, record: &InteractionRecord) -> Result<Element, AnalysisError> {
        let result = self.result()?;
        let divergences = record_divergences(record, None, &result.factors)
            .map_err(|e| AnalysisError::malformed(Self::KIND, e))?;
        Ok(ELEMENTS.classify(result.mean.thresholds(), mean(&divergences)))
    }

    fn series(&self) -> Option<&SeriesResult> {
        self.result.as_ref().map(|r| &r.mean)
    }
}

impl Archivable for ActionFactorDivergenceAnalysis {
    const KIND: &'static str = "action-factor-divergence";
}

impl PersistentAnalysis for ActionFactorDivergenceAnalysis {
    fn base(&self) -> &AnalysisBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnalysisBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{AnalysisParams, ThresholdRule},
        record::ActionFactor,
    };

    use super::*;

    fn factor(name: &str, distributions: Vec<Vec<f64>>) -> ActionFactor {
        ActionFactor {
            name: name.to_owned(),
            action: 0,
            distributions,
        }
    }

    /// Two factors; `agree` picks identical or disjoint ensemble members.
    fn record(agree: bool, new_episode: bool) -> InteractionRecord {
        let second = if agree { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
        InteractionRecord {
            action_factors: vec![
                factor("move", vec![vec![1.0, 0.0], second]),
                factor("camera", vec![vec![0.5, 0.5], vec![0.5, 0.5]]),
            ],
            new_episode,
            ..Default::default()
        }
    }

    fn analysis(records: Vec<InteractionRecord>) -> ActionFactorDivergenceAnalysis {
        let params = AnalysisParams {
            num_workers: 3,
            divergence_thresholds: ThresholdRule::Absolute {
                high: Some(0.3),
                low: Some(0.0),
            },
            render_plots: false,
            ..Default::default()
        };
        let config = AnalysisConfiguration::new(params).unwrap();
        ActionFactorDivergenceAnalysis::new(records.into(), config, "png")
    }

    #[test]
    fn test_factor_divergences() {
        let dir = tempfile::tempdir().unwrap();
        let mut analysis = analysis(vec![
            record(true, false),
            record(false, false),
            record(true, true),
            record(false, false),
            record(false, true),
        ]);
        analysis.analyze(dir.path()).unwrap();

        let result = analysis.divergences().unwrap();
        assert_eq!(result.factors, vec!["move", "camera"]);
        let ln2 = 2f64.ln();
        for (t, expected) in [0.0, ln2, 0.0, ln2, ln2].into_iter().enumerate() {
            assert!((result.factor_series[0][t] - expected).abs() < 1e-12);
            assert_eq!(result.factor_series[1][t], 0.0);
        }
        assert!((result.factor_means[0] - 0.6 * ln2).abs() < 1e-12);

        assert_eq!(analysis.get_element_time(0).unwrap().name, "low-divergence");
        let element = analysis.get_element_time(1).unwrap();
        assert_eq!(element.name, "high-divergence");
        assert!((element.value - ln2 / 2.0).abs() < 1e-12);

        let csv = std::fs::read_to_string(dir.path().join("action-factor-divergence-time.csv")).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Episode,Timestep,move,camera,Mean");
        assert_eq!(lines.len(), 6);
        assert!(lines[5].starts_with("2,0,"));
    }

    #[test]
    fn test_factor_names_must_be_constant() {
        let dir = tempfile::tempdir().unwrap();
        let mut renamed = record(true, false);
        renamed.action_factors[1].name = "jump".to_owned();
        let mut analysis = analysis(vec![record(true, false), record(true, true), renamed]);
        let err = analysis.analyze(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MalformedSequence {
                source: SequenceError::FactorMismatch { t: Some(2), .. },
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_distributions() {
        let dir = tempfile::tempdir().unwrap();
        let mut ragged = record(true, false);
        ragged.action_factors[0].distributions[1] = vec![1.0];
        let mut analysis = analysis(vec![record(true, false), ragged]);
        let err = analysis.analyze(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MalformedSequence {
                source: SequenceError::InvalidDistributions { t: Some(1), .. },
                ..
            }
        ));
    }

    #[test]
    fn test_trace_without_factors() {
        let dir = tempfile::tempdir().unwrap();
        let mut analysis = analysis(vec![InteractionRecord::default()]);
        assert!(matches!(
            analysis.analyze(dir.path()),
            Err(AnalysisError::MalformedSequence {
                source: SequenceError::NoActionFactors,
                ..
            })
        ));
    }

    #[test]
    fn test_datapoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut analysis = analysis(vec![record(true, false), record(false, false)]);
        analysis.analyze(dir.path()).unwrap();
        assert_eq!(
            analysis.get_element_datapoint(&record(false, false)).unwrap().name,
            "high-divergence"
        );
        assert!(matches!(
            analysis.get_element_datapoint(&InteractionRecord::default()),
            Err(AnalysisError::MalformedSequence {
                source: SequenceError::FactorMismatch { t: None, .. },
                ..
            })
        ));
    }
}
