//! Figure layout planning
//!
//! Everything here is pure arithmetic over episode lengths: which episodes go
//! into which figure, how many pixels each episode panel gets, and which y
//! range a figure shares. Drawing code only follows the plan.

use std::ops::Range;

use crate::{episode::Episodes, threshold::Thresholds};

/// One episode panel inside a multi-panel figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelPlan {
    /// Global episode index
    pub episode: usize,
    /// Global timestep range of the episode
    pub range: Range<usize>,
    /// Panel width in pixels
    pub width: u32,
}

/// One multi-panel figure covering a batch of consecutive episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigurePlan {
    pub panels: Vec<PanelPlan>,
    /// Total width in pixels; equal to the sum of the panel widths
    pub width: u32,
}

impl FigurePlan {
    /// Index of the first episode in the figure.
    #[must_use]
    pub fn first_episode(&self) -> usize {
        self.panels[0].episode
    }

    /// Index of the last episode in the figure.
    #[must_use]
    pub fn last_episode(&self) -> usize {
        self.panels[self.panels.len() - 1].episode
    }

    /// Global timestep range covered by the figure.
    #[must_use]
    pub fn timesteps(&self) -> Range<usize> {
        self.panels[0].range.start..self.panels[self.panels.len() - 1].range.end
    }
}

/// Groups episodes into figures of at most `per_figure` panels.
///
/// Each figure is `panels * panel_width` pixels wide. Every panel gets at
/// least `min_panel_width` pixels, and the rest of the figure width is shared
/// in proportion to episode length.
///
/// # Panics
///
/// Panics if `per_figure` is zero or `panel_width < min_panel_width`.
#[must_use]
pub fn plan_figures(
    episodes: &Episodes,
    per_figure: usize,
    panel_width: u32,
    min_panel_width: u32,
) -> Vec<FigurePlan> {
    assert!(per_figure > 0, "a figure needs at least one panel");
    assert!(panel_width >= min_panel_width);

    let ranges = episodes.ranges().collect::<Vec<_>>();
    ranges
        .chunks(per_figure)
        .enumerate()
        .map(|(batch, ranges)| {
            let count = u32::try_from(ranges.len()).unwrap_or(u32::MAX);
            let width = panel_width.saturating_mul(count);
            let lengths = ranges.iter().map(ExactSizeIterator::len).collect::<Vec<_>>();
            let widths = share_widths(&lengths, width, min_panel_width);
            let panels = ranges
                .iter()
                .zip(widths)
                .enumerate()
                .map(|(i, (range, width))| PanelPlan {
                    episode: batch * per_figure + i,
                    range: range.clone(),
                    width,
                })
                .collect();
            FigurePlan { panels, width }
        })
        .collect()
}

/// Splits `total` pixels over `lengths`: `min` each, remainder proportional.
///
/// Rounding leftovers go to the panels with the largest fractional share, so
/// the widths always sum to `total`.
fn share_widths(lengths: &[usize], total: u32, min: u32) -> Vec<u32> {
    let count = u32::try_from(lengths.len()).unwrap_or(u32::MAX);
    let spare = u64::from(total.saturating_sub(min.saturating_mul(count)));
    let sum = lengths.iter().map(|&len| len as u64).sum::<u64>().max(1);

    let mut widths = Vec::with_capacity(lengths.len());
    let mut fractions = Vec::with_capacity(lengths.len());
    let mut assigned = 0;
    for (i, &len) in lengths.iter().enumerate() {
        let share = spare * len as u64;
        let whole = share / sum;
        widths.push(min + u32::try_from(whole).unwrap_or(0));
        fractions.push((share % sum, i));
        assigned += whole;
    }

    fractions.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let leftover = usize::try_from(spare - assigned).unwrap_or(0);
    for &(_, i) in fractions.iter().take(leftover) {
        widths[i] += 1;
    }
    widths
}

/// Padded y range enclosing the finite values and the defined references.
///
/// A degenerate range (no finite data, or a constant series) is widened to
/// keep the axis drawable.
#[must_use]
pub fn value_range(values: &[f64], thresholds: &Thresholds) -> Range<f64> {
    let references = [thresholds.high, thresholds.low, Some(thresholds.mean)];
    let (lo, hi) = values
        .iter()
        .copied()
        .chain(references.into_iter().flatten())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if lo > hi {
        return -1.0..1.0;
    }
    let span = hi - lo;
    let pad = if span > f64::EPSILON {
        span * 0.05
    } else {
        lo.abs().max(1.0) * 0.1
    };
    (lo - pad)..(hi + pad)
}
