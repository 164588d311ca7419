//! Batch analysis command
//!
//! Loads a rollout, runs the selected analyses concurrently and writes each
//! analysis' figures and tables into `<output>/<analysis>/`. With
//! `--save-archives`, every successful analysis is also archived to
//! `<output>/<analysis>.ixa`.

use std::{collections::BTreeSet, fs, path::PathBuf};

use anyhow::Context;
use clap::Args;
use interestingness_analysis::{
    analyses::AnalysisKind, batch, config::AnalysisConfiguration,
    engine::DynPersistentAnalysis as _, pool::WorkerPool,
};

use crate::util;

const ARCHIVE_EXTENSION: &str = "ixa";

#[derive(Debug, Clone, Args)]
pub(crate) struct AnalyzeArg {
    /// Path to the interaction records JSON file
    pub records: PathBuf,

    /// Output directory for reports and archives
    #[arg(long, short)]
    pub output: PathBuf,

    /// Analysis configuration JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Analyses to run (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = ["value", "action-factor-divergence"])]
    pub analyses: Vec<AnalysisKind>,

    /// Image format of the figures, also used as file extension
    #[arg(long, default_value = "png")]
    pub image_format: String,

    /// Number of worker threads, overriding the configuration (0 or less uses
    /// every available core)
    #[arg(long, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Skip figure rendering, writing tables only
    #[arg(long)]
    pub no_plots: bool,

    /// Archive every successful analysis next to its report directory
    #[arg(long)]
    pub save_archives: bool,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let mut params = util::read_params_file(arg.config.as_ref())?;
    if let Some(workers) = arg.workers {
        params.num_workers = workers;
    }
    if arg.no_plots {
        params.render_plots = false;
    }
    let config = AnalysisConfiguration::new(params).context("Invalid analysis configuration")?;

    let records = util::read_records_file(&arg.records)?;
    tracing::info!(
        records = records.len(),
        path = %arg.records.display(),
        "loaded interaction records"
    );

    fs::create_dir_all(&arg.output).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            arg.output.display()
        )
    })?;

    let mut seen = BTreeSet::new();
    let mut analyses = arg
        .analyses
        .iter()
        .filter(|kind| seen.insert(kind.name()))
        .map(|kind| kind.build(records.clone(), config.clone(), &arg.image_format))
        .collect::<Vec<_>>();

    let pool = WorkerPool::from_config(&config);
    let outcomes = batch::run_batch(&mut analyses, &arg.output, &pool);

    let mut failed = 0;
    for (analysis, outcome) in analyses.iter_mut().zip(&outcomes) {
        match &outcome.result {
            Ok(()) => {
                println!("{}: ok", outcome.name);
                if arg.save_archives {
                    let path = arg
                        .output
                        .join(format!("{}.{ARCHIVE_EXTENSION}", outcome.name));
                    analysis
                        .save_archive(&path)
                        .with_context(|| format!("Failed to save archive: {}", path.display()))?;
                    println!("{}: saved {}", outcome.name, path.display());
                }
            }
            Err(e) => {
                failed += 1;
                println!("{}: FAILED: {e}", outcome.name);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} analyses failed", outcomes.len());
    }
    Ok(())
}
