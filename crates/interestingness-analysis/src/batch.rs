//! Running several analyses side by side
//!
//! Each analysis writes into its own sub-directory `<output_dir>/<name>/`, so
//! concurrent runs never touch the same file. A failing or panicking analysis
//! is reported in its own [`BatchOutcome`]; the others still run.

use std::path::Path;

use crate::{engine::Analysis, error::AnalysisError, pool::WorkerPool};

#[derive(Debug)]
pub struct BatchOutcome {
    pub name: &'static str,
    pub result: Result<(), AnalysisError>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `analyze` for every analysis on `pool`, returning outcomes in input
/// order.
pub fn run_batch<A>(
    analyses: &mut [Box<A>],
    output_dir: &Path,
    pool: &WorkerPool,
) -> Vec<BatchOutcome>
where
    A: Analysis + ?Sized,
{
    let names = analyses.iter().map(|a| a.name()).collect::<Vec<_>>();
    tracing::info!(analyses = ?names, workers = pool.workers().get(), "running analyses");

    let results = pool.execute(analyses.iter_mut().collect(), |_, analysis| {
        let dir = output_dir.join(analysis.name());
        analysis.analyze(&dir)
    });

    names
        .into_iter()
        .zip(results)
        .map(|(name, result)| {
            let result = result.unwrap_or_else(|source| {
                Err(AnalysisError::Panicked {
                    analysis: name.to_owned(),
                    source,
                })
            });
            match &result {
                Ok(()) => tracing::info!(analysis = name, "analysis finished"),
                Err(e) => tracing::error!(analysis = name, error = %e, "analysis failed"),
            }
            BatchOutcome { name, result }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::{
        analyses::{ActionFactorDivergenceAnalysis, ValueAnalysis},
        config::{AnalysisConfiguration, AnalysisParams},
        engine::{Element, SeriesResult},
        record::{InteractionRecord, Records},
    };

    struct Exploding;

    impl Analysis for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn analyze(&mut self, _output_dir: &Path) -> Result<(), AnalysisError> {
            panic!("boom");
        }

        fn get_element_time(&self, _t: usize) -> Result<Element, AnalysisError> {
            unreachable!()
        }

        fn get_element_datapoint(&self, _record: &InteractionRecord) -> Result<Element, AnalysisError> {
            unreachable!()
        }

        fn series(&self) -> Option<&SeriesResult> {
            None
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let records = (0..6)
            .map(|t| InteractionRecord {
                values: vec![f64::from(t)],
                new_episode: t == 3,
                ..Default::default()
            })
            .collect::<Records>();
        let params = AnalysisParams {
            render_plots: false,
            ..Default::default()
        };
        let config = AnalysisConfiguration::new(params).unwrap();

        let mut analyses: Vec<Box<dyn Analysis>> = vec![
            Box::new(ValueAnalysis::new(records.clone(), config.clone(), "png")),
            // no action factors in the trace
            Box::new(ActionFactorDivergenceAnalysis::new(records, config, "png")),
            Box::new(Exploding),
        ];
        let pool = WorkerPool::new(NonZeroUsize::new(3).unwrap());
        let outcomes = run_batch(&mut analyses, dir.path(), &pool);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].name, "value");
        assert!(outcomes[0].is_ok());
        assert!(dir.path().join("value").join("value-time.csv").exists());
        assert!(matches!(
            outcomes[1].result,
            Err(AnalysisError::MalformedSequence { .. })
        ));
        assert!(matches!(
            outcomes[2].result,
            Err(AnalysisError::Panicked { .. })
        ));
        assert_eq!(analyses[0].get_element_time(5).unwrap().value, 5.0);
    }
}
