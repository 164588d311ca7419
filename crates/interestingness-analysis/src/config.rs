//! Analysis configuration
//!
//! [`AnalysisParams`] is the raw, deserializable parameter set (every field
//! has a default, so a partial JSON file is accepted). It becomes an
//! [`AnalysisConfiguration`] only through [`AnalysisConfiguration::new`],
//! which validates every field and resolves the effective worker count once.
//!
//! Deserializing an [`AnalysisConfiguration`] (for example from an archive)
//! goes through the same validation, and the worker count is resolved again
//! on the current host.
//!
//! The validated configuration is immutable and shared by all analyses of a
//! run. An analysis that needs a different degree of parallelism asks for an
//! overridden copy with [`AnalysisConfiguration::with_workers`].
//!
//! # Example
//!
//! ```
//! use interestingness_analysis::config::{AnalysisConfiguration, AnalysisParams, ThresholdRule};
//!
//! let params = AnalysisParams {
//!     value_thresholds: ThresholdRule::Percentile { high: Some(95.0), low: Some(5.0) },
//!     episodes_per_figure: 5,
//!     ..AnalysisParams::default()
//! };
//! let config = AnalysisConfiguration::new(params).unwrap();
//! assert_eq!(config.params().episodes_per_figure, 5);
//! assert!(config.workers().get() >= 1);
//! ```

use std::{num::NonZeroUsize, thread};

use serde::{Deserialize, Serialize};

/// Upper bound on the number of worker threads a configuration may request.
pub const MAX_WORKERS: usize = 1024;
/// Smallest accepted figure dimension, in pixels.
pub const MIN_FIGURE_SIZE: u32 = 100;
/// Largest accepted figure dimension, in pixels. Also bounds the width of a
/// full multi-panel figure.
pub const MAX_FIGURE_SIZE: u32 = 16_384;
/// Smallest accepted per-episode panel width, in pixels.
pub const MIN_PANEL_WIDTH: u32 = 20;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("parameter `{field}` {reason}")]
pub struct ConfigurationError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigurationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// How the high and low thresholds of a derived series are placed.
///
/// A side whose parameter is `None` has no threshold and never yields
/// outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// No thresholds on either side
    None,
    /// `mean ± k·σ` over the whole series
    StdDev { high: Option<f64>, low: Option<f64> },
    /// Nearest-rank percentiles in `[0, 100]` over the whole series
    Percentile { high: Option<f64>, low: Option<f64> },
    /// Fixed values
    Absolute { high: Option<f64>, low: Option<f64> },
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self::StdDev {
            high: Some(2.0),
            low: Some(2.0),
        }
    }
}

impl ThresholdRule {
    fn validate(self, field: &'static str) -> Result<(), ConfigurationError> {
        match self {
            Self::None => {}
            Self::StdDev { high, low } => {
                for k in high.into_iter().chain(low) {
                    if !k.is_finite() || k < 0.0 {
                        return Err(ConfigurationError::new(
                            field,
                            format!("std-dev multiplier must be finite and non-negative, got {k}"),
                        ));
                    }
                }
            }
            Self::Percentile { high, low } => {
                for p in high.into_iter().chain(low) {
                    if !(0.0..=100.0).contains(&p) {
                        return Err(ConfigurationError::new(
                            field,
                            format!("percentile must be within [0, 100], got {p}"),
                        ));
                    }
                }
                check_ordered(field, high, low)?;
            }
            Self::Absolute { high, low } => {
                for v in high.into_iter().chain(low) {
                    if !v.is_finite() {
                        return Err(ConfigurationError::new(
                            field,
                            format!("threshold must be finite, got {v}"),
                        ));
                    }
                }
                check_ordered(field, high, low)?;
            }
        }
        Ok(())
    }
}

fn check_ordered(
    field: &'static str,
    high: Option<f64>,
    low: Option<f64>,
) -> Result<(), ConfigurationError> {
    if let (Some(high), Some(low)) = (high, low)
        && low > high
    {
        return Err(ConfigurationError::new(
            field,
            format!("low bound {low} exceeds high bound {high}"),
        ));
    }
    Ok(())
}

/// Raw analysis parameters, as read from a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Worker threads for parallel work; non-positive uses every available core
    pub num_workers: i64,
    /// Thresholds applied to the value series
    pub value_thresholds: ThresholdRule,
    /// Thresholds applied to the action-factor divergence series
    pub divergence_thresholds: ThresholdRule,
    /// Number of episode panels per multi-panel figure
    pub episodes_per_figure: usize,
    /// Whether `analyze` renders plots (tables are always written)
    pub render_plots: bool,
    /// Width of single-panel and bar-chart figures
    pub figure_width: u32,
    /// Height of every figure
    pub figure_height: u32,
    /// Width of a panel holding an average-length episode in multi-panel figures
    pub episode_panel_width: u32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            num_workers: 0,
            value_thresholds: ThresholdRule::default(),
            divergence_thresholds: ThresholdRule::default(),
            episodes_per_figure: 10,
            render_plots: true,
            figure_width: 1800,
            figure_height: 400,
            episode_panel_width: 180,
        }
    }
}

/// Validated analysis configuration shared by all analyses of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnalysisParams", into = "AnalysisParams")]
pub struct AnalysisConfiguration {
    params: AnalysisParams,
    workers: NonZeroUsize,
}

impl AnalysisConfiguration {
    /// Validates `params` and resolves the effective worker count.
    pub fn new(params: AnalysisParams) -> Result<Self, ConfigurationError> {
        params.value_thresholds.validate("value_thresholds")?;
        params
            .divergence_thresholds
            .validate("divergence_thresholds")?;
        if params.episodes_per_figure == 0 {
            return Err(ConfigurationError::new(
                "episodes_per_figure",
                "must be at least 1",
            ));
        }
        for (field, size) in [
            ("figure_width", params.figure_width),
            ("figure_height", params.figure_height),
        ] {
            if !(MIN_FIGURE_SIZE..=MAX_FIGURE_SIZE).contains(&size) {
                return Err(ConfigurationError::new(
                    field,
                    format!(
                        "must be within [{MIN_FIGURE_SIZE}, {MAX_FIGURE_SIZE}] pixels, got {size}"
                    ),
                ));
            }
        }
        if !(MIN_PANEL_WIDTH..=MAX_FIGURE_SIZE).contains(&params.episode_panel_width) {
            return Err(ConfigurationError::new(
                "episode_panel_width",
                format!(
                    "must be within [{MIN_PANEL_WIDTH}, {MAX_FIGURE_SIZE}] pixels, got {}",
                    params.episode_panel_width
                ),
            ));
        }
        let row_width = u64::from(params.episode_panel_width)
            .saturating_mul(u64::try_from(params.episodes_per_figure).unwrap_or(u64::MAX));
        if row_width > u64::from(MAX_FIGURE_SIZE) {
            return Err(ConfigurationError::new(
                "episodes_per_figure",
                format!(
                    "{} panels of {} pixels exceed the maximum figure width {MAX_FIGURE_SIZE}",
                    params.episodes_per_figure, params.episode_panel_width
                ),
            ));
        }
        let workers = resolve_workers(params.num_workers)?;
        tracing::debug!(workers = workers.get(), "resolved analysis worker count");

        Ok(Self { params, workers })
    }

    #[must_use]
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Effective number of worker threads.
    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Returns a copy of this configuration using `workers` threads.
    ///
    /// The receiver is left untouched, so sibling analyses sharing it keep
    /// their own worker count.
    #[must_use]
    pub fn with_workers(&self, workers: NonZeroUsize) -> Self {
        Self {
            params: AnalysisParams {
                num_workers: i64::try_from(workers.get()).unwrap_or(i64::MAX),
                ..self.params.clone()
            },
            workers,
        }
    }
}

impl TryFrom<AnalysisParams> for AnalysisConfiguration {
    type Error = ConfigurationError;

    fn try_from(params: AnalysisParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

impl From<AnalysisConfiguration> for AnalysisParams {
    fn from(config: AnalysisConfiguration) -> Self {
        config.params
    }
}

impl Default for AnalysisConfiguration {
    fn default() -> Self {
        Self {
            params: AnalysisParams::default(),
            workers: available_workers(),
        }
    }
}

fn resolve_workers(requested: i64) -> Result<NonZeroUsize, ConfigurationError> {
    if requested <= 0 {
        return Ok(available_workers());
    }
    match usize::try_from(requested).ok().and_then(NonZeroUsize::new) {
        Some(n) if n.get() <= MAX_WORKERS => Ok(n),
        _ => Err(ConfigurationError::new(
            "num_workers",
            format!("must be at most {MAX_WORKERS}, got {requested}"),
        )),
    }
}

fn available_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfiguration::new(AnalysisParams::default()).unwrap();
        assert_eq!(config.params().episodes_per_figure, 10);
        assert_eq!(config.workers(), available_workers());
    }

    #[test]
    fn test_non_positive_workers_use_host_parallelism() {
        for requested in [0, -1, -16] {
            let params = AnalysisParams {
                num_workers: requested,
                ..AnalysisParams::default()
            };
            let config = AnalysisConfiguration::new(params).unwrap();
            assert_eq!(config.workers(), available_workers());
        }
    }

    #[test]
    fn test_explicit_workers() {
        let params = AnalysisParams {
            num_workers: 3,
            ..AnalysisParams::default()
        };
        assert_eq!(
            AnalysisConfiguration::new(params).unwrap().workers().get(),
            3
        );
    }

    #[test]
    fn test_too_many_workers() {
        let params = AnalysisParams {
            num_workers: 100_000,
            ..AnalysisParams::default()
        };
        let err = AnalysisConfiguration::new(params).unwrap_err();
        assert_eq!(err.field, "num_workers");
    }

    #[test]
    fn test_with_workers_leaves_shared_config_untouched() {
        let params = AnalysisParams {
            num_workers: 2,
            ..AnalysisParams::default()
        };
        let shared = AnalysisConfiguration::new(params).unwrap();
        let single = shared.with_workers(NonZeroUsize::MIN);
        assert_eq!(single.workers().get(), 1);
        assert_eq!(single.params().num_workers, 1);
        assert_eq!(shared.workers().get(), 2);
        assert_eq!(shared.params().num_workers, 2);
        assert_eq!(single.params().value_thresholds, shared.params().value_thresholds);
    }

    #[test]
    fn test_invalid_threshold_rules() {
        let bad_rules = [
            ThresholdRule::StdDev {
                high: Some(-1.0),
                low: None,
            },
            ThresholdRule::StdDev {
                high: Some(f64::NAN),
                low: None,
            },
            ThresholdRule::Percentile {
                high: Some(101.0),
                low: None,
            },
            ThresholdRule::Percentile {
                high: Some(10.0),
                low: Some(90.0),
            },
            ThresholdRule::Absolute {
                high: Some(0.0),
                low: Some(1.0),
            },
        ];
        for rule in bad_rules {
            let params = AnalysisParams {
                value_thresholds: rule,
                ..AnalysisParams::default()
            };
            let err = AnalysisConfiguration::new(params).unwrap_err();
            assert_eq!(err.field, "value_thresholds", "{rule:?}");
        }
    }

    #[test]
    fn test_zero_episodes_per_figure() {
        let params = AnalysisParams {
            episodes_per_figure: 0,
            ..AnalysisParams::default()
        };
        let err = AnalysisConfiguration::new(params).unwrap_err();
        assert_eq!(err.field, "episodes_per_figure");
    }

    #[test]
    fn test_small_figure() {
        let params = AnalysisParams {
            figure_height: 10,
            ..AnalysisParams::default()
        };
        let err = AnalysisConfiguration::new(params).unwrap_err();
        assert_eq!(err.field, "figure_height");
    }

    #[test]
    fn test_oversized_figures() {
        let oversized = [
            AnalysisParams {
                figure_width: u32::MAX,
                ..AnalysisParams::default()
            },
            AnalysisParams {
                episode_panel_width: MAX_FIGURE_SIZE + 1,
                ..AnalysisParams::default()
            },
            AnalysisParams {
                episodes_per_figure: 1_000_000,
                ..AnalysisParams::default()
            },
        ];
        let fields = oversized
            .into_iter()
            .map(|params| AnalysisConfiguration::new(params).unwrap_err().field)
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            vec!["figure_width", "episode_panel_width", "episodes_per_figure"]
        );

        let widest = AnalysisParams {
            episodes_per_figure: 16,
            episode_panel_width: 1024,
            ..AnalysisParams::default()
        };
        assert!(AnalysisConfiguration::new(widest).is_ok());
    }

    #[test]
    fn test_deserialized_config_is_validated() {
        let err = serde_json::from_str::<AnalysisConfiguration>(
            r#"{"episodes_per_figure": 0, "num_workers": 2}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("episodes_per_figure"), "{err}");

        let err = serde_json::from_str::<AnalysisConfiguration>(r#"{"num_workers": 4096}"#)
            .unwrap_err();
        assert!(err.to_string().contains("num_workers"), "{err}");
    }

    #[test]
    fn test_deserialized_config_resolves_workers_on_host() {
        let config = serde_json::from_str::<AnalysisConfiguration>(r#"{"num_workers": 0}"#).unwrap();
        assert_eq!(config.workers(), available_workers());

        let explicit = AnalysisConfiguration::new(AnalysisParams {
            num_workers: 3,
            ..AnalysisParams::default()
        })
        .unwrap();
        let json = serde_json::to_string(&explicit).unwrap();
        let restored = serde_json::from_str::<AnalysisConfiguration>(&json).unwrap();
        assert_eq!(restored, explicit);

        let single = explicit.with_workers(NonZeroUsize::MIN);
        let json = serde_json::to_string(&single).unwrap();
        let restored = serde_json::from_str::<AnalysisConfiguration>(&json).unwrap();
        assert_eq!(restored.workers().get(), 1);
    }

    #[test]
    fn test_partial_json_params() {
        let params: AnalysisParams = serde_json::from_str(
            r#"{"num_workers": 4, "value_thresholds": {"percentile": {"high": 90.0}}}"#,
        )
        .unwrap();
        assert_eq!(params.num_workers, 4);
        assert_eq!(
            params.value_thresholds,
            ThresholdRule::Percentile {
                high: Some(90.0),
                low: None
            }
        );
        assert_eq!(params.episodes_per_figure, 10);
    }

    #[test]
    fn test_none_rule_from_json() {
        let params: AnalysisParams =
            serde_json::from_str(r#"{"divergence_thresholds": "none"}"#).unwrap();
        assert_eq!(params.divergence_thresholds, ThresholdRule::None);
    }
}
