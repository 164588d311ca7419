use std::path::Path;

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
    high: "high-value",
    low: "low-value",
    neutral: "value",
};

const LABELS: PlotLabels<'static> = PlotLabels {
    stem: "value",
    title: "Value",
    y_label: "Value",
    high_label: "High value",
    low_label: "Low value",
};

/// Flags timesteps where the agent's value estimate is unusually high or low.
///
/// The derived series is the mean over each record's value estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueAnalysis {
    base: AnalysisBase,
    result: Option<SeriesResult>,
}

impl ValueAnalysis {
    #[must_use]
    pub fn new(records: Records, config: AnalysisConfiguration, image_format: &str) -> Self {
        Self {
            base: AnalysisBase::new(records, config, image_format),
            result: None,
        }
    }

    fn result(&self) -> Result<&SeriesResult, AnalysisError> {
        self.result.as_ref().ok_or_else(|| AnalysisError::NotAnalyzed {
            analysis: Self::KIND.to_owned(),
        })
    }
}

fn value_series(records: &[InteractionRecord]) -> Result<Vec<f64>, SequenceError> {
    records
        .iter()
        .enumerate()
        .map(|(t, record)| record.mean_value().ok_or(SequenceError::MissingValue { t: Some(t) }))
        .collect()
}

impl Analysis for ValueAnalysis {
    fn name(&self) -> &'static str {
        Self::KIND
    }

    fn analyze(&mut self, output_dir: &Path) -> Result<(), AnalysisError> {
        let records = self.base.records(Self::KIND)?;
        let episodes = self.base.episodes(Self::KIND)?;
        let series =
            value_series(&records).map_err(|e| AnalysisError::malformed(Self::KIND, e))?;
        let rule = self.base.config().params().value_thresholds;
        let result = SeriesResult::detect(episodes, series, rule);
        tracing::info!(
            analysis = Self::KIND,
            timesteps = result.series.len(),
            episodes = result.episodes.count(),
            high = result.detection.outliers.above.len(),
            low = result.detection.outliers.below.len(),
            "computed value outliers"
        );

        self.base.prepare_output(output_dir)?;
        export::write_time_table(
            &output_dir.join("value-time.csv"),
            &result.episodes,
            &[Column::new("Value", &result.series)],
        )?;
        self.base.plot_series(output_dir, &result, &LABELS)?;

        self.result = Some(result);
        Ok(())
    }

    fn get_element_time(&self, t: usize) -> Result<Element, AnalysisError> {
        let result = self.result()?;
        let value = result.value_at(Self::KIND, t)?;
        Ok(ELEMENTS.classify(result.thresholds(), value))
    }

    fn get_element_datapoint(&self, record: &InteractionRecord) -> Result<Element, AnalysisError> {
        let result = self.result()?;
        let value = record
            .mean_value()
            .ok_or_else(|| AnalysisError::malformed(Self::KIND, SequenceError::MissingValue { t: None }))?;
        Ok(ELEMENTS.classify(result.thresholds(), value))
    }

    fn series(&self) -> Option<&SeriesResult> {
        self.result.as_ref()
    }
}

impl Archivable for ValueAnalysis {
    const KIND: &'static str = "value";
}

impl PersistentAnalysis for ValueAnalysis {
    fn base(&self) -> &AnalysisBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnalysisBase {
        &mut self.base
    }
}
