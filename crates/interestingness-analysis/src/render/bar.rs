use plotters::{coord::Shift, prelude::*};

use super::{DrawResult, Figure};

/// One bar per category, each in its own color.
pub(super) struct BarChart<'a> {
    pub(super) title: &'a str,
    pub(super) y_label: &'a str,
    pub(super) bars: &'a [(&'a str, f64)],
}

impl Figure for BarChart<'_> {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;

        let count = self.bars.len();
        let y_max = self
            .bars
            .iter()
            .map(|&(_, v)| v)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

        let mut chart = ChartBuilder::on(root)
            .caption(self.title, ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d((0..count).into_segmented(), 0.0..y_max)?;

        let category = |value: &SegmentValue<usize>| match value {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => self
                .bars
                .get(*i)
                .map(|&(name, _)| name.to_owned())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(count)
            .x_label_formatter(&category)
            .y_desc(self.y_label)
            .draw()?;

        let bars = self
            .bars
            .iter()
            .enumerate()
            .filter(|(_, (_, v))| v.is_finite())
            .collect::<Vec<_>>();
        chart.draw_series(bars.iter().map(|&(i, &(_, v))| {
            let corners = [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)];
            Rectangle::new(corners, distinct_color(i, count).filled())
        }))?;
        chart.draw_series(bars.iter().map(|&(i, &(_, v))| {
            let corners = [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)];
            Rectangle::new(corners, BLACK.stroke_width(1))
        }))?;
        Ok(())
    }
}

/// Evenly spaced hues, so neighbouring categories never share a color.
fn distinct_color(index: usize, count: usize) -> HSLColor {
    #[expect(clippy::cast_precision_loss)]
    let hue = index as f64 / count.max(1) as f64;
    HSLColor(hue, 0.65, 0.5)
}
