/// Descriptive statistics summarizing a series.
///
/// This structure contains the measures of central tendency and dispersion
/// used to place thresholds over a derived series of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of samples in the series.
    pub count: usize,
    /// The minimum value in the series.
    pub min: f64,
    /// The maximum value in the series.
    pub max: f64,
    /// The arithmetic mean of the series.
    pub mean: f64,
    /// The median value of the series.
    pub median: f64,
    /// The population variance of the series.
    pub variance: f64,
    /// The population standard deviation of the series.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// The values are collected and sorted internally.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the series contains at least one value
    /// * `None` - if the series is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use interestingness_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics over the finite values only.
    ///
    /// `NaN` and infinite samples are skipped, so a series with gaps still
    /// yields usable statistics.
    ///
    /// ```
    /// # use interestingness_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::finite([1.0, f64::NAN, 3.0]).unwrap();
    /// assert_eq!(stats.count, 2);
    /// assert_eq!(stats.mean, 2.0);
    /// ```
    #[must_use]
    pub fn finite<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        Self::new(values.into_iter().filter(|v| v.is_finite()))
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = sorted_values[count / 2];
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
        })
    }
}
