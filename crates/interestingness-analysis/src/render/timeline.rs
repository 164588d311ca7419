use std::{iter, ops::Range};

use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
};

use super::{
    DrawResult, Figure, HIGH_COLOR, LOW_COLOR, MEAN_COLOR, SERIES_COLOR, SeriesPlot,
    layout::FigurePlan,
};

const MEAN_LABEL: &str = "Overall mean";
const MARKER_SIZE: i32 = 3;
const HEADER_HEIGHT: u32 = 70;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// The whole series on one time axis with episode separators.
pub(super) struct Timeline<'a> {
    pub(super) plot: &'a SeriesPlot<'a>,
    pub(super) boundaries: &'a [usize],
    pub(super) y_range: Range<f64>,
}

impl Figure for Timeline<'_> {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let plot = self.plot;
        root.fill(&WHITE)?;

        #[expect(clippy::cast_precision_loss)]
        let x_max = plot.series.len().max(1) as f64;
        let mut chart = ChartBuilder::on(root)
            .caption(plot.title, ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, self.y_range.clone())?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Timesteps")
            .y_desc(plot.y_label)
            .draw()?;

        // episode separators
        for &start in self.boundaries.iter().skip(1) {
            #[expect(clippy::cast_precision_loss)]
            let x = start as f64;
            chart.draw_series(iter::once(PathElement::new(
                vec![(x, self.y_range.start), (x, self.y_range.end)],
                BLACK.mix(0.25),
            )))?;
        }

        draw_series(&mut chart, plot, 0, plot.series, 0.0..x_max, true)?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    }
}

/// One panel per episode of a [`FigurePlan`], sharing the y axis and a
/// single legend header.
pub(super) struct EpisodePanels<'a> {
    pub(super) plot: &'a SeriesPlot<'a>,
    pub(super) plan: &'a FigurePlan,
    pub(super) y_range: Range<f64>,
}

impl Figure for EpisodePanels<'_> {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let plot = self.plot;
        root.fill(&WHITE)?;

        let (header, body) = root.split_vertically(HEADER_HEIGHT);
        let title = format!(
            "{} Across Episodes {}-{}",
            plot.title,
            self.plan.first_episode(),
            self.plan.last_episode()
        );
        draw_legend_header(&header, &title, plot)?;

        let mut rest = body;
        let mut areas = Vec::with_capacity(self.plan.panels.len());
        for panel in &self.plan.panels[..self.plan.panels.len() - 1] {
            let (left, right) = rest.split_horizontally(panel.width);
            areas.push(left);
            rest = right;
        }
        areas.push(rest);

        for (i, (area, panel)) in areas.iter().zip(&self.plan.panels).enumerate() {
            let values = &plot.series[panel.range.clone()];
            #[expect(clippy::cast_precision_loss)]
            let x_max = values.len().max(1) as f64;
            let mut chart = ChartBuilder::on(area)
                .caption(format!("Episode {}", panel.episode), ("sans-serif", 14))
                .margin(4)
                .x_label_area_size(30)
                .y_label_area_size(if i == 0 { 50 } else { 0 })
                .build_cartesian_2d(0.0..x_max, self.y_range.clone())?;

            let mut mesh = chart.configure_mesh();
            mesh.disable_x_mesh().x_labels(3);
            if i == 0 {
                mesh.y_desc(plot.y_label);
            }
            mesh.draw()?;

            draw_series(&mut chart, plot, panel.range.start, values, 0.0..x_max, false)?;
        }
        Ok(())
    }
}

/// Draws a series slice starting at global timestep `offset`, with the
/// global reference lines and the outliers inside the slice.
fn draw_series<DB>(
    chart: &mut Chart<'_, DB>,
    plot: &SeriesPlot<'_>,
    offset: usize,
    values: &[f64],
    x: Range<f64>,
    legend: bool,
) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let thresholds = plot.thresholds;
    #[expect(clippy::cast_precision_loss)]
    let points = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(t, &v)| (t as f64, v))
        .collect::<Vec<_>>();
    let anno = chart.draw_series(LineSeries::new(points.iter().copied(), SERIES_COLOR.stroke_width(2)))?;
    if legend {
        anno.label(plot.y_label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SERIES_COLOR));
    }

    let references = [
        (thresholds.high, HIGH_COLOR, plot.high_label),
        (thresholds.low, LOW_COLOR, plot.low_label),
        (Some(thresholds.mean).filter(|m| m.is_finite()), MEAN_COLOR, MEAN_LABEL),
    ];
    for (level, color, label) in references {
        let Some(level) = level else {
            continue;
        };
        let anno = chart.draw_series(iter::once(PathElement::new(
            vec![(x.start, level), (x.end, level)],
            color.stroke_width(1),
        )))?;
        if legend {
            anno.label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    // outliers are judged with the global thresholds, not per slice
    let above = points
        .iter()
        .filter(|&&(_, v)| thresholds.is_above(v))
        .map(|&p| Circle::new(p, MARKER_SIZE, HIGH_COLOR.filled()));
    chart.draw_series(above)?;
    let below = points
        .iter()
        .filter(|&&(_, v)| thresholds.is_below(v))
        .map(|&p| Circle::new(p, MARKER_SIZE, LOW_COLOR.filled()));
    chart.draw_series(below)?;

    tracing::trace!(offset, points = points.len(), "drew series slice");
    Ok(())
}

/// Title plus one legend entry per drawn line, shared by all panels.
fn draw_legend_header<DB>(area: &DrawingArea<DB, Shift>, title: &str, plot: &SeriesPlot<'_>) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let body = area.titled(title, ("sans-serif", 22))?;
    let thresholds = plot.thresholds;
    let entries = [
        Some((plot.y_label, SERIES_COLOR)),
        thresholds.high.map(|_| (plot.high_label, HIGH_COLOR)),
        thresholds.low.map(|_| (plot.low_label, LOW_COLOR)),
        thresholds.mean.is_finite().then_some((MEAN_LABEL, MEAN_COLOR)),
    ];

    let mut x = 20;
    let y = 15;
    for (label, color) in entries.into_iter().flatten() {
        body.draw(&PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)))?;
        body.draw(&Text::new(label.to_owned(), (x + 26, y - 7), ("sans-serif", 14)))?;
        let label_width = i32::try_from(label.len()).unwrap_or(i32::MAX / 8) * 8;
        x += 40 + label_width;
    }
    Ok(())
}
