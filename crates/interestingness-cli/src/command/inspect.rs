use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use interestingness_analysis::{
    analyses::{self, AnalysisKind},
    archive,
    engine::{Analysis as _, SeriesResult},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct InspectArg {
    /// Path to an analysis archive
    pub archive: PathBuf,

    /// Expected analysis kind; defaults to the kind recorded in the archive
    #[arg(long)]
    pub kind: Option<AnalysisKind>,

    /// Print the interestingness element at this timestep
    #[arg(long)]
    pub time: Option<usize>,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let context = || format!("Failed to load archive: {}", arg.archive.display());
    let bytes = archive::read_file(&arg.archive).with_context(context)?;
    let header = archive::peek_header(&bytes).with_context(context)?;
    let analysis = match arg.kind {
        Some(kind) => kind.load(&arg.archive),
        None => analyses::load_archive(&arg.archive),
    }
    .with_context(context)?;

    println!("Archive: {}", arg.archive.display());
    println!("  kind:     {}", header.kind);
    println!("  saved at: {}", header.saved_at);

    match analysis.series() {
        Some(result) => print_summary(result),
        None => println!("  (never analyzed)"),
    }

    if let Some(t) = arg.time {
        let element = analysis.get_element_time(t)?;
        println!();
        println!("t={t}: {} = {}", element.name, element.value);
    }
    Ok(())
}

fn print_summary(result: &SeriesResult) {
    let thresholds = result.thresholds();
    let outliers = &result.detection.outliers;
    let limit = |limit: Option<f64>| limit.map_or_else(|| "-".to_owned(), |v| format!("{v:.4}"));

    println!("  timesteps: {}", result.series.len());
    println!("  episodes:  {}", result.episodes.count());
    println!("  mean:      {:.4}", thresholds.mean);
    println!(
        "  high:      {} ({} outliers)",
        limit(thresholds.high),
        outliers.above.len()
    );
    println!(
        "  low:       {} ({} outliers)",
        limit(thresholds.low),
        outliers.below.len()
    );
}
