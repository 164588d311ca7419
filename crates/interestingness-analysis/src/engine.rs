//! The contract every analysis implements, and the services it composes
//!
//! An analysis is built from a shared record trace and configuration, computes
//! a derived series in [`Analysis::analyze`], and afterwards answers element
//! queries from that series alone. The shared services (segmentation,
//! detection, rendering, export, worker pool) are reached through the
//! [`AnalysisBase`] each analysis embeds.
//!
//! # Persistence
//!
//! [`PersistentAnalysis::save`] writes the derived state through
//! [`archive`](crate::archive). The record trace is detached for the duration
//! of the encoding and re-attached afterwards, on success and on failure
//! alike. A loaded analysis has no records: element queries work, `analyze`
//! fails with [`AnalysisError::MissingRecords`] until
//! [`PersistentAnalysis::attach_records`] is called.

use std::{fs, ops::Deref, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    archive::{self, Archivable},
    config::{AnalysisConfiguration, ThresholdRule},
    episode::Episodes,
    error::AnalysisError,
    pool::WorkerPool,
    record::{InteractionRecord, Records},
    render::{ReportRenderer, SeriesPlot},
    threshold::{Detection, Side, Thresholds},
};

/// A named interestingness element with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub name: &'static str,
    pub value: f64,
}

/// Element names of a scalar criterion, per threshold side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementNames {
    pub high: &'static str,
    pub low: &'static str,
    pub neutral: &'static str,
}

impl ElementNames {
    /// Names `value` by where it lies relative to `thresholds`.
    #[must_use]
    pub fn classify(&self, thresholds: &Thresholds, value: f64) -> Element {
        let name = match thresholds.classify(value) {
            Side::Above => self.high,
            Side::Below => self.low,
            Side::Within => self.neutral,
        };
        Element { name, value }
    }
}

pub trait Analysis: Send {
    /// Stable identifier, also used as the archive kind and output sub-directory.
    fn name(&self) -> &'static str;

    /// Computes the derived series and writes every report under `output_dir`.
    ///
    /// Re-running overwrites the previous artifacts.
    fn analyze(&mut self, output_dir: &Path) -> Result<(), AnalysisError>;

    /// Element at global timestep `t` of the analyzed trace.
    fn get_element_time(&self, t: usize) -> Result<Element, AnalysisError>;

    /// Element of a single record judged against the fitted thresholds.
    fn get_element_datapoint(&self, record: &InteractionRecord) -> Result<Element, AnalysisError>;

    /// Derived scalar series of the last run, if any.
    fn series(&self) -> Option<&SeriesResult>;
}

/// Derived scalar series of an analysis run with its detected outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub episodes: Episodes,
    pub series: Vec<f64>,
    pub detection: Detection,
}

impl SeriesResult {
    #[must_use]
    pub fn detect(episodes: Episodes, series: Vec<f64>, rule: ThresholdRule) -> Self {
        let detection = Detection::detect(&series, rule);
        Self {
            episodes,
            series,
            detection,
        }
    }

    /// Value at `t`, never clamped.
    pub fn value_at(&self, analysis: &str, t: usize) -> Result<f64, AnalysisError> {
        self.series
            .get(t)
            .copied()
            .ok_or_else(|| AnalysisError::OutOfRange {
                analysis: analysis.to_owned(),
                t,
                len: self.series.len(),
            })
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.detection.thresholds
    }
}

/// Labels used when plotting a [`SeriesResult`].
#[derive(Debug, Clone, Copy)]
pub struct PlotLabels<'a> {
    pub stem: &'a str,
    pub title: &'a str,
    pub y_label: &'a str,
    pub high_label: &'a str,
    pub low_label: &'a str,
}

/// State and services shared by every analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBase {
    config: AnalysisConfiguration,
    image_format: String,
    records: Option<Records>,
}

impl AnalysisBase {
    #[must_use]
    pub fn new(records: Records, config: AnalysisConfiguration, image_format: &str) -> Self {
        Self {
            config,
            image_format: image_format.to_owned(),
            records: Some(records),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfiguration {
        &self.config
    }

    #[must_use]
    pub fn image_format(&self) -> &str {
        &self.image_format
    }

    #[must_use]
    pub fn has_records(&self) -> bool {
        self.records.is_some()
    }

    /// The attached trace, or [`AnalysisError::MissingRecords`].
    pub fn records(&self, analysis: &str) -> Result<Records, AnalysisError> {
        self.records
            .clone()
            .ok_or_else(|| AnalysisError::MissingRecords {
                analysis: analysis.to_owned(),
            })
    }

    /// Segments the attached trace into episodes.
    pub fn episodes(&self, analysis: &str) -> Result<Episodes, AnalysisError> {
        let records = self.records(analysis)?;
        Episodes::from_records(&records).map_err(|e| AnalysisError::malformed(analysis, e))
    }

    pub fn attach(&mut self, records: Records) {
        self.records = Some(records);
    }

    pub fn detach(&mut self) -> Option<Records> {
        self.records.take()
    }

    #[must_use]
    pub fn pool(&self) -> WorkerPool {
        WorkerPool::from_config(&self.config)
    }

    #[must_use]
    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::new(&self.config, &self.image_format)
    }

    /// Creates `dir` (and its parents) if needed.
    pub fn prepare_output(&self, dir: &Path) -> Result<(), AnalysisError> {
        fs::create_dir_all(dir).map_err(|source| AnalysisError::Io {
            path: dir.to_owned(),
            source,
        })
    }

    /// Draws the timeline and multi-panel figures of `result`, unless
    /// plotting is disabled.
    pub fn plot_series(
        &self,
        dir: &Path,
        result: &SeriesResult,
        labels: &PlotLabels<'_>,
    ) -> Result<(), AnalysisError> {
        if !self.config.params().render_plots {
            tracing::debug!(stem = labels.stem, "plotting disabled");
            return Ok(());
        }
        let plot = SeriesPlot {
            title: labels.title,
            y_label: labels.y_label,
            high_label: labels.high_label,
            low_label: labels.low_label,
            series: &result.series,
            thresholds: result.thresholds(),
        };
        let renderer = self.renderer();
        renderer.render_timeline(dir, labels.stem, &plot, &result.episodes)?;
        renderer.render_episodes(dir, labels.stem, &plot, &result.episodes, &self.pool())?;
        Ok(())
    }
}

/// An analysis whose derived state can be archived and reloaded.
pub trait PersistentAnalysis: Analysis + Archivable + Sized {
    fn base(&self) -> &AnalysisBase;

    fn base_mut(&mut self) -> &mut AnalysisBase;

    /// Archives the analysis at `path`, without its record trace.
    fn save(&mut self, path: &Path) -> Result<(), AnalysisError> {
        let detached = Detached::new(self);
        archive::save::<Self>(&detached, path)?;
        Ok(())
    }

    /// Restores an archived analysis; the result has no records attached.
    fn load(path: &Path) -> Result<Self, AnalysisError> {
        Ok(archive::load(path)?)
    }

    /// Re-binds the analysis to a record trace.
    fn attach_records(&mut self, records: Records) {
        self.base_mut().attach(records);
    }
}

/// Object-safe persistence, so boxed analyses can be archived too.
pub trait DynPersistentAnalysis: Analysis {
    fn save_archive(&mut self, path: &Path) -> Result<(), AnalysisError>;
}

impl<T> DynPersistentAnalysis for T
where
    T: PersistentAnalysis,
{
    fn save_archive(&mut self, path: &Path) -> Result<(), AnalysisError> {
        self.save(path)
    }
}

/// Holds an analysis with its records taken out; puts them back on drop.
struct Detached<'a, T>
where
    T: PersistentAnalysis,
{
    analysis: &'a mut T,
    records: Option<Records>,
}

impl<'a, T> Detached<'a, T>
where
    T: PersistentAnalysis,
{
    fn new(analysis: &'a mut T) -> Self {
        let records = analysis.base_mut().detach();
        Self { analysis, records }
    }
}

impl<T> Deref for Detached<'_, T>
where
    T: PersistentAnalysis,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.analysis
    }
}

impl<T> Drop for Detached<'_, T>
where
    T: PersistentAnalysis,
{
    fn drop(&mut self) {
        if let Some(records) = self.records.take() {
            self.analysis.base_mut().attach(records);
        }
    }
}
