//! Threshold placement and outlier classification
//!
//! Thresholds are computed once over the **entire** derived series, never per
//! episode: a spike inside a short episode is judged against the statistics
//! of the whole rollout. Rendering and element lookup reuse the stored
//! [`Thresholds`] instead of rescanning the series.
//!
//! Ties are inclusive: `series[t] >= high` is an above outlier and
//! `series[t] <= low` a below outlier. A missing threshold yields no outliers
//! on its side. Non-finite samples are ignored by the statistics; `NaN`
//! samples are never classified.
//!
//! ```
//! use interestingness_analysis::{config::ThresholdRule, threshold::Detection};
//!
//! let series = [0.0, 1.0, 0.0, 1.0, 10.0, 0.0];
//! let rule = ThresholdRule::Absolute { high: Some(1.0), low: None };
//! let detection = Detection::detect(&series, rule);
//! assert_eq!(detection.outliers.above, vec![1, 3, 4]);
//! assert!(detection.outliers.below.is_empty());
//! ```

use interestingness_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};
use serde::{Deserialize, Serialize};

use crate::config::ThresholdRule;

/// Where a value lies relative to a pair of thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
    Within,
}

/// High/low limits of a series plus its global mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub high: Option<f64>,
    pub low: Option<f64>,
    /// Mean of the finite samples (`NaN` if there are none)
    pub mean: f64,
}

impl Thresholds {
    /// Places thresholds over `series` according to `rule`.
    #[must_use]
    pub fn compute(series: &[f64], rule: ThresholdRule) -> Self {
        let finite = series
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        let stats = DescriptiveStats::new(finite.iter().copied());
        let mean = stats.as_ref().map_or(f64::NAN, |s| s.mean);

        let (high, low) = match rule {
            ThresholdRule::None => (None, None),
            ThresholdRule::Absolute { high, low } => (high, low),
            ThresholdRule::StdDev { high, low } => match &stats {
                Some(s) => (
                    high.map(|k| s.mean + k * s.std_dev),
                    low.map(|k| s.mean - k * s.std_dev),
                ),
                None => (None, None),
            },
            ThresholdRule::Percentile { high, low } => {
                if finite.is_empty() {
                    (None, None)
                } else {
                    let points = high.into_iter().chain(low).collect::<Vec<_>>();
                    let percentiles = Percentiles::new(&finite, &points);
                    (
                        high.and_then(|p| percentiles.get(p)),
                        low.and_then(|p| percentiles.get(p)),
                    )
                }
            }
        };
        Self { high, low, mean }
    }

    #[must_use]
    pub fn is_above(&self, value: f64) -> bool {
        self.high.is_some_and(|high| value >= high)
    }

    #[must_use]
    pub fn is_below(&self, value: f64) -> bool {
        self.low.is_some_and(|low| value <= low)
    }

    /// Classifies a single value; the high side wins if both limits match.
    #[must_use]
    pub fn classify(&self, value: f64) -> Side {
        if self.is_above(value) {
            Side::Above
        } else if self.is_below(value) {
            Side::Below
        } else {
            Side::Within
        }
    }

    /// Indices of every above and below outlier in `series`.
    #[must_use]
    pub fn outliers(&self, series: &[f64]) -> Outliers {
        let mut outliers = Outliers::default();
        for (t, &value) in series.iter().enumerate() {
            if self.is_above(value) {
                outliers.above.push(t);
            }
            if self.is_below(value) {
                outliers.below.push(t);
            }
        }
        outliers
    }
}

/// Ordered outlier indices of a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outliers {
    pub above: Vec<usize>,
    pub below: Vec<usize>,
}

/// Thresholds of a series together with the outliers they select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub thresholds: Thresholds,
    pub outliers: Outliers,
}

impl Detection {
    #[must_use]
    pub fn detect(series: &[f64], rule: ThresholdRule) -> Self {
        let thresholds = Thresholds::compute(series, rule);
        let outliers = thresholds.outliers(series);
        tracing::debug!(
            high = ?thresholds.high,
            low = ?thresholds.low,
            above = outliers.above.len(),
            below = outliers.below.len(),
            "detected outliers"
        );
        Self {
            thresholds,
            outliers,
        }
    }
}
