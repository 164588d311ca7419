//! Report figures
//!
//! [`ReportRenderer`] draws three kinds of figures with `plotters`:
//!
//! - a single timeline over the whole rollout ([`ReportRenderer::render_timeline`])
//! - batches of per-episode panels sharing a y axis
//!   ([`ReportRenderer::render_episodes`])
//! - a bar chart with one bar per category ([`ReportRenderer::render_bars`])
//!
//! Threshold lines and outlier markers are drawn only for the limits that are
//! defined. The image format tag doubles as the file extension: `svg` selects
//! the vector backend and every other tag the bitmap backend.

use std::{
    error::Error,
    path::{Path, PathBuf},
};

use plotters::{coord::Shift, prelude::*};

use self::{
    bar::BarChart,
    layout::FigurePlan,
    timeline::{EpisodePanels, Timeline},
};
use crate::{
    config::{AnalysisConfiguration, MIN_PANEL_WIDTH},
    episode::Episodes,
    pool::{TaskPanicked, WorkerPool},
    threshold::Thresholds,
};

mod bar;
pub mod layout;
mod timeline;

const HIGH_COLOR: RGBColor = RGBColor(214, 39, 40);
const LOW_COLOR: RGBColor = RGBColor(44, 160, 44);
const MEAN_COLOR: RGBColor = RGBColor(31, 119, 180);
const SERIES_COLOR: RGBColor = RGBColor(255, 127, 14);

const BAR_WIDTH: u32 = 80;
const MIN_BAR_FIGURE_WIDTH: u32 = 640;
const BAR_FIGURE_HEIGHT: u32 = 480;

type DrawResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RenderError {
    #[display("failed to draw figure {}: {message}", path.display())]
    Draw { path: PathBuf, message: String },
    #[display("figure task failed: {_0}")]
    Panicked(TaskPanicked),
}

/// A scalar series with its detected thresholds and legend labels.
#[derive(Debug, Clone, Copy)]
pub struct SeriesPlot<'a> {
    pub title: &'a str,
    pub y_label: &'a str,
    pub high_label: &'a str,
    pub low_label: &'a str,
    pub series: &'a [f64],
    pub thresholds: &'a Thresholds,
}

/// Something that can draw itself onto any `plotters` backend.
trait Figure {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRenderer {
    format: String,
    width: u32,
    height: u32,
    panel_width: u32,
    episodes_per_figure: usize,
}

impl ReportRenderer {
    #[must_use]
    pub fn new(config: &AnalysisConfiguration, image_format: &str) -> Self {
        let params = config.params();
        Self {
            format: image_format.to_owned(),
            width: params.figure_width,
            height: params.figure_height,
            panel_width: params.episode_panel_width,
            episodes_per_figure: params.episodes_per_figure,
        }
    }

    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Path of a figure named `name` inside `dir`.
    #[must_use]
    pub fn figure_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{}", self.format))
    }

    /// Multi-panel layout the renderer uses for `episodes`.
    #[must_use]
    pub fn plan(&self, episodes: &Episodes) -> Vec<FigurePlan> {
        layout::plan_figures(
            episodes,
            self.episodes_per_figure,
            self.panel_width,
            MIN_PANEL_WIDTH,
        )
    }

    /// Draws the whole series as one timeline into `<dir>/<stem>-time.<fmt>`.
    pub fn render_timeline(
        &self,
        dir: &Path,
        stem: &str,
        plot: &SeriesPlot<'_>,
        episodes: &Episodes,
    ) -> Result<PathBuf, RenderError> {
        let path = self.figure_path(dir, &format!("{stem}-time"));
        let figure = Timeline {
            plot,
            boundaries: episodes.boundaries(),
            y_range: layout::value_range(plot.series, plot.thresholds),
        };
        draw_to(&path, (self.width, self.height), &figure)?;
        Ok(path)
    }

    /// Draws one multi-panel figure per episode batch into
    /// `<dir>/<stem>-episodes-<first>-<last>.<fmt>`.
    ///
    /// Figures are drawn concurrently on `pool`; the returned paths follow
    /// episode order.
    pub fn render_episodes(
        &self,
        dir: &Path,
        stem: &str,
        plot: &SeriesPlot<'_>,
        episodes: &Episodes,
        pool: &WorkerPool,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let plans = self.plan(episodes);
        let results = pool.map(&plans, |_, plan| {
            let name = format!(
                "{stem}-episodes-{}-{}",
                plan.first_episode(),
                plan.last_episode()
            );
            let path = self.figure_path(dir, &name);
            let timesteps = plan.timesteps();
            let figure = EpisodePanels {
                plot,
                plan,
                y_range: layout::value_range(&plot.series[timesteps], plot.thresholds),
            };
            draw_to(&path, (plan.width, self.height), &figure).map(|()| path)
        });
        results
            .into_iter()
            .map(|result| result.map_err(RenderError::Panicked)?)
            .collect()
    }

    /// Draws one bar per `(category, value)` into `<dir>/<name>.<fmt>`.
    pub fn render_bars(
        &self,
        dir: &Path,
        name: &str,
        title: &str,
        y_label: &str,
        bars: &[(&str, f64)],
    ) -> Result<PathBuf, RenderError> {
        let path = self.figure_path(dir, name);
        let count = u32::try_from(bars.len()).unwrap_or(u32::MAX);
        let width = BAR_WIDTH.saturating_mul(count).max(MIN_BAR_FIGURE_WIDTH);
        let figure = BarChart {
            title,
            y_label,
            bars,
        };
        draw_to(&path, (width, BAR_FIGURE_HEIGHT), &figure)?;
        Ok(path)
    }
}

fn draw_to<F>(path: &Path, size: (u32, u32), figure: &F) -> Result<(), RenderError>
where
    F: Figure,
{
    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let result = if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        figure
            .draw(&root)
            .and_then(|()| root.present().map_err(Into::into))
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        figure
            .draw(&root)
            .and_then(|()| root.present().map_err(Into::into))
    };
    result.map_err(|e| RenderError::Draw {
        path: path.to_owned(),
        message: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), width = size.0, height = size.1, "saved figure");
    Ok(())
}
